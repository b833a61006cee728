use std::collections::HashSet;

use rand::{RngCore, rngs::OsRng};

use crate::{
    negotiation::{
        credentials::{IceCredentials, generate_fingerprint},
        direction::Direction,
        media_section::MediaSection,
        sdp_type::SdpType,
        session_description::SessionDescription,
    },
    peer_connection::signaling_state::{DescriptionSide, SignalingState},
    rtc_error::RtcError,
    track::{Track, TrackId, TrackKind},
};

/// Options accepted by [`Negotiator::create_offer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OfferOptions {
    /// Generate fresh ICE credentials, restarting connectivity.
    pub ice_restart: bool,
}

/// Result of applying a description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applied {
    pub state: SignalingState,
    /// The local ICE credentials in effect changed.
    pub local_ice_restart: bool,
    /// The remote ICE credentials in effect changed.
    pub remote_ice_restart: bool,
}

/// A negotiated media section as seen from the local side.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Slot {
    mid: String,
    kind: TrackKind,
    track_id: Option<TrackId>,
    stream_id: Option<String>,
    /// Its track was removed; the section stays inactive for good.
    stopped: bool,
}

impl Slot {
    fn attach(&mut self, track: &Track) {
        self.track_id = Some(track.id().to_owned());
        self.stream_id = Some(track.stream_id().to_owned());
    }

    const fn offer_direction(&self) -> Direction {
        if self.track_id.is_some() {
            Direction::SendRecv
        } else if self.stopped {
            Direction::Inactive
        } else {
            Direction::RecvOnly
        }
    }
}

/// Session Description Negotiator.
///
/// Builds offers and answers from a snapshot of the local tracks, validates
/// descriptions against the signaling state and keeps the pending and current
/// descriptions of both sides.
#[derive(Debug)]
pub struct Negotiator {
    state: SignalingState,
    slots: Vec<Slot>,
    credentials: IceCredentials,
    /// Credentials in effect before an ICE restart offer, until it is answered.
    restart_from: Option<IceCredentials>,
    fingerprint: String,
    session_id: u64,
    session_version: u64,
    last_offer: Option<(Vec<Slot>, SessionDescription)>,
    pending_local: Option<SessionDescription>,
    current_local: Option<SessionDescription>,
    pending_remote: Option<SessionDescription>,
    current_remote: Option<SessionDescription>,
    applied_local_ufrag: Option<String>,
    applied_remote_ufrag: Option<String>,
}

impl Default for Negotiator {
    fn default() -> Self {
        Self::new()
    }
}

impl Negotiator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: SignalingState::Stable,
            slots: Vec::new(),
            credentials: IceCredentials::generate(),
            restart_from: None,
            fingerprint: generate_fingerprint(),
            session_id: u64::from(OsRng.next_u32()),
            session_version: 0,
            last_offer: None,
            pending_local: None,
            current_local: None,
            pending_remote: None,
            current_remote: None,
            applied_local_ufrag: None,
            applied_remote_ufrag: None,
        }
    }

    pub const fn state(&self) -> SignalingState {
        self.state
    }

    pub const fn credentials(&self) -> &IceCredentials {
        &self.credentials
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Pending local description if any, otherwise the current one.
    pub fn local_description(&self) -> Option<&SessionDescription> {
        self.pending_local.as_ref().or(self.current_local.as_ref())
    }

    /// Pending remote description if any, otherwise the current one.
    pub fn remote_description(&self) -> Option<&SessionDescription> {
        self.pending_remote.as_ref().or(self.current_remote.as_ref())
    }

    pub const fn current_local_description(&self) -> Option<&SessionDescription> {
        self.current_local.as_ref()
    }

    pub const fn current_remote_description(&self) -> Option<&SessionDescription> {
        self.current_remote.as_ref()
    }

    /// Creates an offer with one section per negotiated slot followed by one
    /// per new track, in registry order. Calling it again with the same tracks
    /// returns the same offer.
    ///
    /// # Errors
    /// `InvalidState` outside `Stable`/`HaveLocalOffer`, `Closed` after close.
    pub fn create_offer(
        &mut self,
        tracks: &[Track],
        options: OfferOptions,
    ) -> Result<SessionDescription, RtcError> {
        self.ensure_open()?;
        if !matches!(
            self.state,
            SignalingState::Stable | SignalingState::HaveLocalOffer
        ) {
            return Err(self.invalid_state("create_offer", None));
        }
        if options.ice_restart {
            let previous = std::mem::replace(&mut self.credentials, IceCredentials::generate());
            self.restart_from.get_or_insert(previous);
            self.last_offer = None;
        }

        let plan = self.plan_offer(tracks);
        if let Some((cached_plan, offer)) = &self.last_offer {
            if *cached_plan == plan {
                return Ok(offer.clone());
            }
        }

        let sections = plan
            .iter()
            .map(|slot| self.local_section(slot, slot.offer_direction()))
            .collect();
        self.session_version += 1;
        let offer = SessionDescription::new(SdpType::Offer, sections)
            .with_session(self.session_id, self.session_version);
        self.last_offer = Some((plan, offer.clone()));
        Ok(offer)
    }

    /// Creates an answer to the applied remote offer. Sections mirror the offer
    /// in order; each takes the first unmatched local track of its kind, and
    /// sections left without a track are `inactive`.
    ///
    /// # Errors
    /// `InvalidState` outside `HaveRemoteOffer`, `MalformedDescription` for an
    /// offer without sections or with duplicate mids, `Closed` after close.
    pub fn create_answer(&mut self, tracks: &[Track]) -> Result<SessionDescription, RtcError> {
        self.ensure_open()?;
        let Some(offer) = self
            .pending_remote
            .as_ref()
            .filter(|_| self.state == SignalingState::HaveRemoteOffer)
        else {
            return Err(self.invalid_state("create_answer", None));
        };
        offer.check_sections()?;

        let offered = offer.sections();
        let mut chosen: Vec<Option<&Track>> = vec![None; offered.len()];
        let mut used: HashSet<&str> = HashSet::new();

        // Sections negotiated before keep their track.
        for (i, section) in offered.iter().enumerate() {
            let kept = self
                .slot(section.mid())
                .and_then(|slot| slot.track_id.as_deref())
                .and_then(|id| tracks.iter().find(|t| t.id() == id))
                .filter(|t| t.kind() == section.kind());
            if let Some(track) = kept {
                used.insert(track.id());
                chosen[i] = Some(track);
            }
        }
        for (i, section) in offered.iter().enumerate() {
            let stopped = self.slot(section.mid()).is_some_and(|s| s.stopped);
            if chosen[i].is_some() || stopped || section.is_inactive() {
                continue;
            }
            if let Some(track) = tracks
                .iter()
                .find(|t| t.kind() == section.kind() && !used.contains(t.id()))
            {
                used.insert(track.id());
                chosen[i] = Some(track);
            }
        }

        let sections = offered
            .iter()
            .zip(chosen)
            .map(|(remote, track)| {
                let section = MediaSection::new(
                    remote.mid(),
                    remote.kind(),
                    track.map_or(Direction::Inactive, |_| remote.direction().answered()),
                )
                .with_transport(
                    self.credentials.ufrag(),
                    self.credentials.pwd(),
                    self.fingerprint.as_str(),
                );
                match track {
                    Some(t) => section.with_track(t.stream_id(), t.id()),
                    None => section,
                }
            })
            .collect();

        self.session_version += 1;
        Ok(SessionDescription::new(SdpType::Answer, sections)
            .with_session(self.session_id, self.session_version))
    }

    /// Applies a local description and advances the signaling state.
    ///
    /// # Errors
    /// `InvalidState` naming the rejected (type, state) pair,
    /// `MalformedDescription` for an answer not matching the remote offer,
    /// `Closed` after close.
    pub fn apply_local(&mut self, desc: SessionDescription) -> Result<Applied, RtcError> {
        self.ensure_open()?;
        let next = self.transition(DescriptionSide::Local, desc.sdp_type())?;

        match desc.sdp_type() {
            SdpType::Offer => {
                desc.check_unique_mids()?;
                self.check_keeps_negotiated(&desc)?;
                self.pending_local = Some(desc);
            }
            SdpType::Answer => {
                let Some(offer) = self.pending_remote.take() else {
                    return Err(self.invalid_state("set_local_description", Some(SdpType::Answer)));
                };
                if let Err(e) = desc.check_sections().and_then(|()| desc.check_answers(&offer)) {
                    self.pending_remote = Some(offer);
                    return Err(e);
                }
                self.commit(&desc);
                self.current_remote = Some(offer);
                self.current_local = Some(desc);
            }
            // Pranswer never reaches here: `transition` rejects it.
            SdpType::Rollback | SdpType::Pranswer => self.rollback(),
        }

        let local_ice_restart = self.note_local_ufrag();
        self.state = next;
        Ok(Applied {
            state: next,
            local_ice_restart,
            remote_ice_restart: false,
        })
    }

    /// Applies a remote description and advances the signaling state.
    ///
    /// # Errors
    /// `InvalidState` naming the rejected (type, state) pair,
    /// `MalformedDescription` for empty or inconsistent descriptions,
    /// `Closed` after close.
    pub fn apply_remote(&mut self, desc: SessionDescription) -> Result<Applied, RtcError> {
        self.ensure_open()?;
        let next = self.transition(DescriptionSide::Remote, desc.sdp_type())?;

        match desc.sdp_type() {
            SdpType::Offer => {
                desc.check_sections()?;
                self.check_keeps_negotiated(&desc)?;
                self.pending_remote = Some(desc);
            }
            SdpType::Answer => {
                let Some(offer) = self.pending_local.take() else {
                    return Err(
                        self.invalid_state("set_remote_description", Some(SdpType::Answer))
                    );
                };
                if let Err(e) = desc.check_sections().and_then(|()| desc.check_answers(&offer)) {
                    self.pending_local = Some(offer);
                    return Err(e);
                }
                self.commit(&offer);
                self.current_local = Some(offer);
                self.current_remote = Some(desc);
            }
            SdpType::Rollback | SdpType::Pranswer => self.rollback(),
        }

        let remote_ice_restart = self.note_remote_ufrag();
        self.state = next;
        Ok(Applied {
            state: next,
            local_ice_restart: false,
            remote_ice_restart,
        })
    }

    /// Moves to `Closed`. Descriptions stay readable.
    pub fn close(&mut self) {
        self.state = SignalingState::Closed;
        self.last_offer = None;
    }

    fn ensure_open(&self) -> Result<(), RtcError> {
        if self.state.is_closed() {
            return Err(RtcError::Closed);
        }
        Ok(())
    }

    fn transition(
        &self,
        side: DescriptionSide,
        sdp_type: SdpType,
    ) -> Result<SignalingState, RtcError> {
        let op = match side {
            DescriptionSide::Local => "set_local_description",
            DescriptionSide::Remote => "set_remote_description",
        };
        self.state
            .next(side, sdp_type)
            .ok_or_else(|| self.invalid_state(op, Some(sdp_type)))
    }

    const fn invalid_state(&self, op: &'static str, sdp_type: Option<SdpType>) -> RtcError {
        RtcError::InvalidState {
            op,
            state: self.state,
            sdp_type,
        }
    }

    /// Drops the pending descriptions. An unanswered ICE restart is undone.
    fn rollback(&mut self) {
        self.pending_local = None;
        self.pending_remote = None;
        if let Some(previous) = self.restart_from.take() {
            self.applied_local_ufrag = Some(previous.ufrag().to_owned());
            self.credentials = previous;
            self.last_offer = None;
        }
    }

    fn slot(&self, mid: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.mid == mid)
    }

    fn local_section(&self, slot: &Slot, direction: Direction) -> MediaSection {
        let section = MediaSection::new(slot.mid.as_str(), slot.kind, direction).with_transport(
            self.credentials.ufrag(),
            self.credentials.pwd(),
            self.fingerprint.as_str(),
        );
        match (&slot.stream_id, &slot.track_id) {
            (Some(stream), Some(track)) => section.with_track(stream.as_str(), track.as_str()),
            _ => section,
        }
    }

    /// Negotiated slots with removed tracks detached, then new tracks placed
    /// in free receive-only slots of their kind or in new slots.
    fn plan_offer(&self, tracks: &[Track]) -> Vec<Slot> {
        let live: HashSet<&str> = tracks.iter().map(Track::id).collect();
        let mut plan = self.slots.clone();
        for slot in &mut plan {
            if slot
                .track_id
                .as_deref()
                .is_some_and(|id| !live.contains(id))
            {
                slot.track_id = None;
                slot.stream_id = None;
                slot.stopped = true;
            }
        }

        for track in tracks {
            if plan
                .iter()
                .any(|s| s.track_id.as_deref() == Some(track.id()))
            {
                continue;
            }
            if let Some(free) = plan
                .iter_mut()
                .find(|s| s.track_id.is_none() && !s.stopped && s.kind == track.kind())
            {
                free.attach(track);
                continue;
            }
            let mut slot = Slot {
                mid: next_free_mid(&plan),
                kind: track.kind(),
                track_id: None,
                stream_id: None,
                stopped: false,
            };
            slot.attach(track);
            plan.push(slot);
        }
        plan
    }

    /// Records the sections of the local description of a completed exchange.
    fn commit(&mut self, local: &SessionDescription) {
        let slots = local
            .sections()
            .iter()
            .map(|section| {
                let stopped = self.slot(section.mid()).is_some_and(|prev| {
                    prev.stopped || (prev.track_id.is_some() && section.track_id().is_none())
                });
                Slot {
                    mid: section.mid().to_owned(),
                    kind: section.kind(),
                    track_id: section.track_id().map(str::to_owned),
                    stream_id: section.stream_id().map(str::to_owned),
                    stopped,
                }
            })
            .collect();
        self.slots = slots;
        self.last_offer = None;
        self.restart_from = None;
    }

    /// Sections negotiated before must keep their position and mid.
    fn check_keeps_negotiated(&self, desc: &SessionDescription) -> Result<(), RtcError> {
        for (i, slot) in self.slots.iter().enumerate() {
            if desc.sections().get(i).map(MediaSection::mid) != Some(slot.mid.as_str()) {
                return Err(RtcError::MalformedDescription(format!(
                    "negotiated section with mid '{}' is missing at index {i}",
                    slot.mid
                )));
            }
        }
        Ok(())
    }

    fn note_local_ufrag(&mut self) -> bool {
        let now = self
            .local_description()
            .and_then(SessionDescription::ice_ufrag)
            .map(str::to_owned);
        swap_ufrag(&mut self.applied_local_ufrag, now)
    }

    fn note_remote_ufrag(&mut self) -> bool {
        let now = self
            .remote_description()
            .and_then(SessionDescription::ice_ufrag)
            .map(str::to_owned);
        swap_ufrag(&mut self.applied_remote_ufrag, now)
    }
}

/// Stores `now` and reports whether it replaced a different known ufrag.
fn swap_ufrag(applied: &mut Option<String>, now: Option<String>) -> bool {
    let Some(now) = now else {
        return false;
    };
    let changed = applied.as_ref().is_some_and(|old| *old != now);
    *applied = Some(now);
    changed
}

fn next_free_mid(slots: &[Slot]) -> String {
    (slots.len()..)
        .map(|n| n.to_string())
        .find(|mid| slots.iter().all(|s| s.mid != *mid))
        .unwrap_or_default()
}
