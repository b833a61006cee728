use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::sync::Notify;

use crate::{
    config::SignalingConfig,
    log::{LogSink, NoopLogSink},
    signaling::{
        peer_registry::{PeerId, PeerInfo, PeerRegistry},
        signal_message::SignalMessage,
        signaling_error::SignalingError,
    },
    sink_debug, sink_info, sink_warn,
};

/// What a `wait` hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The oldest message queued for the waiting peer.
    Message { from: PeerId, body: String },
    /// Nothing arrived in time; the peers currently signed in.
    Peers(Vec<PeerInfo>),
}

#[derive(Debug, Default)]
struct Mailbox {
    queue: VecDeque<(PeerId, String)>,
    ready: Arc<Notify>,
}

#[derive(Debug, Default)]
struct RelayState {
    registry: PeerRegistry,
    mailboxes: HashMap<PeerId, Mailbox>,
}

/// Relays opaque messages between signed-in peers.
///
/// Each peer has a FIFO mailbox. [`send`](Self::send) appends to the
/// addressee's mailbox and [`wait`](Self::wait) takes from the caller's own,
/// hanging until something arrives or the wait timeout passes. Signing out
/// discards the mailbox and wakes any waiter.
pub struct SignalingRelay {
    state: Mutex<RelayState>,
    wait_timeout: Duration,
    log: Arc<dyn LogSink>,
}

fn lock(state: &Mutex<RelayState>) -> MutexGuard<'_, RelayState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Default for SignalingRelay {
    fn default() -> Self {
        Self::with_log(&SignalingConfig::default(), Arc::new(NoopLogSink))
    }
}

impl SignalingRelay {
    pub fn with_log(config: &SignalingConfig, log: Arc<dyn LogSink>) -> Self {
        Self {
            state: Mutex::new(RelayState::default()),
            wait_timeout: Duration::from_millis(config.wait_timeout_ms),
            log,
        }
    }

    /// Signs a peer in.
    ///
    /// # Parameters
    /// - `name`: display name shown to the other peers.
    ///
    /// # Returns
    /// The new peer's id and the peer list, the new peer first and then the
    /// others in sign-in order.
    pub fn sign_in(&self, name: &str) -> (PeerId, Vec<PeerInfo>) {
        let mut state = lock(&self.state);
        let id = state.registry.sign_in(name);
        state.mailboxes.insert(id, Mailbox::default());
        let (mut peers, others): (Vec<_>, Vec<_>) =
            state.registry.peers().into_iter().partition(|p| p.id == id);
        if let Some(me) = peers.first() {
            sink_info!(self.log, "[SIG] peer {} signed in as '{}'", id, me.name);
        }
        peers.extend(others);
        (id, peers)
    }

    /// Signs a peer out and drops its queued messages. Unknown ids are
    /// ignored.
    pub fn sign_out(&self, id: PeerId) {
        let mut state = lock(&self.state);
        let Some(name) = state.registry.sign_out(id) else {
            return;
        };
        if let Some(mailbox) = state.mailboxes.remove(&id) {
            // A waiter between unlocking and awaiting still gets the permit.
            mailbox.ready.notify_waiters();
            mailbox.ready.notify_one();
            if !mailbox.queue.is_empty() {
                sink_debug!(
                    self.log,
                    "[SIG] dropped {} undelivered messages for peer {}",
                    mailbox.queue.len(),
                    id
                );
            }
        }
        sink_info!(self.log, "[SIG] peer {} ({}) signed out", id, name);
    }

    /// Queues `body` for `to`.
    ///
    /// # Errors
    /// `NotSignedIn` for an unknown sender, `UnknownPeer` for an unknown
    /// addressee. Nothing is queued in either case.
    pub fn send(
        &self,
        from: PeerId,
        to: PeerId,
        body: impl Into<String>,
    ) -> Result<(), SignalingError> {
        let body = body.into();
        let mut state = lock(&self.state);
        if !state.registry.touch(from) {
            sink_warn!(self.log, "[SIG] message from unknown peer {} to {}", from, to);
            return Err(SignalingError::NotSignedIn(from));
        }
        let Some(mailbox) = state.mailboxes.get_mut(&to) else {
            sink_warn!(self.log, "[SIG] peer {} sent to unknown peer {}", from, to);
            return Err(SignalingError::UnknownPeer(to));
        };
        mailbox.queue.push_back((from, body));
        mailbox.ready.notify_one();
        sink_debug!(self.log, "[SIG] queued message {} -> {}", from, to);
        Ok(())
    }

    /// Serializes `signal` and queues it for `to`.
    ///
    /// # Errors
    /// As [`send`](Self::send), plus `Malformed` if serialization fails.
    pub fn send_signal(
        &self,
        from: PeerId,
        to: PeerId,
        signal: &SignalMessage,
    ) -> Result<(), SignalingError> {
        self.send(from, to, signal.to_json()?)
    }

    /// Takes the oldest message queued for `id`, waiting up to the configured
    /// timeout for one. A wait that times out returns the peer list.
    ///
    /// # Errors
    /// `NotSignedIn` if `id` is not signed in or signs out while waiting.
    pub async fn wait(&self, id: PeerId) -> Result<Delivery, SignalingError> {
        let deadline = tokio::time::Instant::now() + self.wait_timeout;
        loop {
            let ready = {
                let mut state = lock(&self.state);
                if !state.registry.touch(id) {
                    return Err(SignalingError::NotSignedIn(id));
                }
                let Some(mailbox) = state.mailboxes.get_mut(&id) else {
                    return Err(SignalingError::NotSignedIn(id));
                };
                if let Some((from, body)) = mailbox.queue.pop_front() {
                    return Ok(Delivery::Message { from, body });
                }
                Arc::clone(&mailbox.ready)
            };
            let woken = tokio::time::timeout_at(deadline, ready.notified()).await;
            if woken.is_err() {
                return self.expire_wait(id);
            }
        }
    }

    /// Like [`wait`](Self::wait) but decodes the body.
    ///
    /// # Errors
    /// As [`wait`](Self::wait), plus `Malformed` for a body that is not a
    /// signal.
    pub async fn wait_signal(
        &self,
        id: PeerId,
    ) -> Result<Option<(PeerId, SignalMessage)>, SignalingError> {
        match self.wait(id).await? {
            Delivery::Message { from, body } => {
                Ok(Some((from, SignalMessage::from_json(&body)?)))
            }
            Delivery::Peers(_) => Ok(None),
        }
    }

    pub fn peers(&self) -> Vec<PeerInfo> {
        lock(&self.state).registry.peers()
    }

    pub fn is_signed_in(&self, id: PeerId) -> bool {
        lock(&self.state).registry.contains(id)
    }

    /// Messages waiting in the mailbox of `id`.
    pub fn pending(&self, id: PeerId) -> usize {
        lock(&self.state)
            .mailboxes
            .get(&id)
            .map_or(0, |mailbox| mailbox.queue.len())
    }

    fn expire_wait(&self, id: PeerId) -> Result<Delivery, SignalingError> {
        let mut state = lock(&self.state);
        let Some(mailbox) = state.mailboxes.get_mut(&id) else {
            return Err(SignalingError::NotSignedIn(id));
        };
        if let Some((from, body)) = mailbox.queue.pop_front() {
            return Ok(Delivery::Message { from, body });
        }
        Ok(Delivery::Peers(state.registry.peers()))
    }
}
