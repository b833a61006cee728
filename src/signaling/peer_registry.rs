use std::{collections::BTreeMap, fmt, time::Instant};

/// Identifier handed out at sign-in. Never reused.
pub type PeerId = u64;

const ANONYMOUS: &str = "anonymous";

/// A signed-in peer as listed to others.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    pub id: PeerId,
    pub name: String,
}

/// Notification line `name,id,1` announcing a peer that is online.
impl fmt::Display for PeerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},1", self.name, self.id)
    }
}

#[derive(Debug)]
struct PeerEntry {
    name: String,
    last_seen: Instant,
}

/// Tracks which peers are signed in and under which name.
#[derive(Debug)]
pub struct PeerRegistry {
    peers: BTreeMap<PeerId, PeerEntry>,
    next_id: PeerId,
}

impl Default for PeerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            peers: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Signs a peer in and returns its new id.
    ///
    /// # Parameters
    /// - `name`: display name; blank names become `anonymous`. Names need
    ///   not be unique, peers are told apart by id.
    pub fn sign_in(&mut self, name: &str) -> PeerId {
        let id = self.next_id;
        self.next_id += 1;
        let name = match name.trim() {
            "" => ANONYMOUS.to_owned(),
            trimmed => trimmed.to_owned(),
        };
        self.peers.insert(
            id,
            PeerEntry {
                name,
                last_seen: Instant::now(),
            },
        );
        id
    }

    /// Removes a peer; returns its name if it was signed in.
    pub fn sign_out(&mut self, id: PeerId) -> Option<String> {
        self.peers.remove(&id).map(|entry| entry.name)
    }

    pub fn contains(&self, id: PeerId) -> bool {
        self.peers.contains_key(&id)
    }

    pub fn name_for(&self, id: PeerId) -> Option<&str> {
        self.peers.get(&id).map(|entry| entry.name.as_str())
    }

    /// Records activity from `id`. Returns false for unknown peers.
    pub fn touch(&mut self, id: PeerId) -> bool {
        match self.peers.get_mut(&id) {
            Some(entry) => {
                entry.last_seen = Instant::now();
                true
            }
            None => false,
        }
    }

    pub fn last_seen(&self, id: PeerId) -> Option<Instant> {
        self.peers.get(&id).map(|entry| entry.last_seen)
    }

    /// Every signed-in peer, in sign-in order.
    pub fn peers(&self) -> Vec<PeerInfo> {
        self.peers
            .iter()
            .map(|(id, entry)| PeerInfo {
                id: *id,
                name: entry.name.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
