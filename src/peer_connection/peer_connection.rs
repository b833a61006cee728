use std::{
    future::Future,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use tokio::{
    runtime::Handle,
    sync::{Mutex as AsyncMutex, mpsc, watch},
    task::JoinSet,
};

use crate::{
    config::RtcConfiguration,
    ice::{IceCandidate, IceCoordinator, PairAttempt, PairOutcome, RemoteCandidateOutcome},
    log::LogSink,
    media::{CaptureHandle, CaptureProvider, CodecFactory, MediaError},
    negotiation::{Negotiator, OfferOptions, SdpType, SessionDescription},
    peer_connection::{
        connection_state::{IceGatheringState, PeerConnectionState},
        events::PeerConnectionEvent,
        signaling_state::SignalingState,
    },
    rtc_error::RtcError,
    sink_debug, sink_error, sink_info, sink_warn,
    track::{Track, TrackId, TrackKind, TrackRegistry},
    transport::{IceTransport, TransportError, TransportEvent},
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Connectivity side of a connection: the coordinator plus the states it drives.
struct LinkState {
    ice: IceCoordinator,
    connection: PeerConnectionState,
    gathering: IceGatheringState,
    /// Sections local candidates were gathered for.
    gathered_mids: Vec<String>,
    /// Bumped by local ICE restarts; events of older gatherings are ignored.
    gather_epoch: u64,
}

struct Inner {
    config: RtcConfiguration,
    log: Arc<dyn LogSink>,
    transport: Arc<dyn IceTransport>,
    capture: Arc<dyn CaptureProvider>,
    codecs: Arc<dyn CodecFactory>,
    negotiator: AsyncMutex<Negotiator>,
    tracks: Mutex<TrackRegistry>,
    link: Mutex<LinkState>,
    captures: Mutex<Vec<(TrackId, CaptureHandle)>>,
    signaling_tx: watch::Sender<SignalingState>,
    connection_tx: watch::Sender<PeerConnectionState>,
    gathering_tx: watch::Sender<IceGatheringState>,
    /// Dropped on close so waiting readers see the end of the stream.
    event_tx: Mutex<Option<mpsc::UnboundedSender<PeerConnectionEvent>>>,
    event_rx: AsyncMutex<mpsc::UnboundedReceiver<PeerConnectionEvent>>,
    tasks: Mutex<JoinSet<()>>,
    runtime: Handle,
    closed: AtomicBool,
}

/// A peer connection: owns its track registry, negotiator and candidate
/// coordinator, and enforces the order of signaling calls.
///
/// Signaling operations (`create_*`, `set_*_description`) are serialized;
/// concurrent callers queue. Candidate operations never wait for them.
/// Background transport work runs on the tokio runtime that was current when
/// the connection was created and is cancelled by [`close`](Self::close),
/// which also runs on drop.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use peerlink::{
///     PeerConnectionFactory, RtcConfiguration, SignalingState, TrackKind, log::NoopLogSink,
/// };
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), peerlink::RtcError> {
/// let config = RtcConfiguration::default();
/// let factory = PeerConnectionFactory::from_config(&config, Arc::new(NoopLogSink));
/// let pc = factory.create_peer_connection(config)?;
/// pc.add_track(TrackKind::Audio, "mic")?;
///
/// let offer = pc.create_offer().await?;
/// pc.set_local_description(offer).await?;
/// assert_eq!(pc.signaling_state(), SignalingState::HaveLocalOffer);
/// # Ok(())
/// # }
/// ```
pub struct PeerConnection {
    inner: Arc<Inner>,
}

impl PeerConnection {
    /// # Errors
    /// `RtcError::Config` for an invalid configuration or when called outside
    /// a tokio runtime.
    pub(crate) fn new(
        config: RtcConfiguration,
        log: Arc<dyn LogSink>,
        transport: Arc<dyn IceTransport>,
        capture: Arc<dyn CaptureProvider>,
        codecs: Arc<dyn CodecFactory>,
    ) -> Result<Self, RtcError> {
        config.validate()?;
        let runtime = Handle::try_current()
            .map_err(|e| RtcError::Config(format!("a tokio runtime is required: {e}")))?;
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let ice = IceCoordinator::new(config.ice.role, config.ice.max_pairs, Arc::clone(&log));

        sink_info!(
            log,
            "[PC] created (transport={}, role={:?})",
            transport.name(),
            config.ice.role
        );

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                log,
                transport,
                capture,
                codecs,
                negotiator: AsyncMutex::new(Negotiator::new()),
                tracks: Mutex::new(TrackRegistry::new()),
                link: Mutex::new(LinkState {
                    ice,
                    connection: PeerConnectionState::New,
                    gathering: IceGatheringState::New,
                    gathered_mids: Vec::new(),
                    gather_epoch: 0,
                }),
                captures: Mutex::new(Vec::new()),
                signaling_tx: watch::Sender::new(SignalingState::Stable),
                connection_tx: watch::Sender::new(PeerConnectionState::New),
                gathering_tx: watch::Sender::new(IceGatheringState::New),
                event_tx: Mutex::new(Some(event_tx)),
                event_rx: AsyncMutex::new(event_rx),
                tasks: Mutex::new(JoinSet::new()),
                runtime,
                closed: AtomicBool::new(false),
            }),
        })
    }

    pub fn configuration(&self) -> &RtcConfiguration {
        &self.inner.config
    }

    // ---------------------------------------------------------------- tracks

    /// Adds a local track of `kind` to `stream_id`.
    ///
    /// # Errors
    /// `Closed` after close, `UnsupportedKind` when no codec handles `kind`.
    pub fn add_track(&self, kind: TrackKind, stream_id: &str) -> Result<TrackId, RtcError> {
        let inner = &self.inner;
        inner.ensure_open()?;
        inner.ensure_codec(kind)?;
        let id = lock(&inner.tracks).add_track(kind, stream_id);
        sink_info!(inner.log, "[PC] added {kind} track {id} to stream {stream_id}");
        inner.emit(PeerConnectionEvent::NegotiationNeeded);
        Ok(id)
    }

    /// Same as [`add_track`](Self::add_track) with the kind given by name.
    ///
    /// # Errors
    /// `InvalidKind` for a name other than `audio`/`video`, plus the errors of
    /// `add_track`.
    pub fn add_track_str(&self, kind: &str, stream_id: &str) -> Result<TrackId, RtcError> {
        self.inner.ensure_open()?;
        self.add_track(kind.parse()?, stream_id)
    }

    /// Starts capturing from `device_id` and adds a track fed by it.
    ///
    /// # Errors
    /// `Media` when the device is unknown or fails to start, plus the errors
    /// of `add_track`.
    pub fn add_track_from_device(
        &self,
        device_id: &str,
        stream_id: &str,
    ) -> Result<TrackId, RtcError> {
        let inner = &self.inner;
        inner.ensure_open()?;
        let device = inner
            .capture
            .find_device(device_id)
            .ok_or_else(|| MediaError::DeviceNotFound(device_id.to_owned()))?;
        inner.ensure_codec(device.kind)?;
        let handle = inner.capture.start_capture(device_id)?;

        let id = {
            let mut tracks = lock(&inner.tracks);
            let id = tracks.add_track(device.kind, stream_id);
            tracks.set_device(&id, device_id)?;
            id
        };
        lock(&inner.captures).push((id.clone(), handle));
        sink_info!(
            inner.log,
            "[PC] added {} track {id} from device '{}'",
            device.kind,
            device.name
        );
        inner.emit(PeerConnectionEvent::NegotiationNeeded);
        Ok(id)
    }

    /// Removes a track. Its media section stays negotiated as inactive.
    ///
    /// # Errors
    /// `Closed` after close, `NotFound` for an unknown id.
    pub fn remove_track(&self, track_id: &str) -> Result<(), RtcError> {
        let inner = &self.inner;
        inner.ensure_open()?;
        lock(&inner.tracks).remove_track(track_id)?;
        lock(&inner.captures).retain(|(id, handle)| {
            if id == track_id {
                handle.stop();
            }
            id != track_id
        });
        sink_info!(inner.log, "[PC] removed track {track_id}");
        inner.emit(PeerConnectionEvent::NegotiationNeeded);
        Ok(())
    }

    /// Mutes or unmutes a track without renegotiation.
    ///
    /// # Errors
    /// `Closed` after close, `NotFound` for an unknown id.
    pub fn set_track_enabled(&self, track_id: &str, enabled: bool) -> Result<(), RtcError> {
        self.inner.ensure_open()?;
        lock(&self.inner.tracks).set_enabled(track_id, enabled)
    }

    /// Local tracks in insertion order.
    pub fn list_tracks(&self) -> Vec<Track> {
        lock(&self.inner.tracks).snapshot()
    }

    // ------------------------------------------------------------- signaling

    /// # Errors
    /// See [`create_offer_with`](Self::create_offer_with).
    pub async fn create_offer(&self) -> Result<SessionDescription, RtcError> {
        self.create_offer_with(OfferOptions::default()).await
    }

    /// Creates an offer with one media section per track. Does not change the
    /// signaling state.
    ///
    /// # Errors
    /// `InvalidState` outside `Stable`/`HaveLocalOffer`, `Closed` after close.
    pub async fn create_offer_with(
        &self,
        options: OfferOptions,
    ) -> Result<SessionDescription, RtcError> {
        let inner = &self.inner;
        inner.ensure_open()?;
        let mut negotiator = inner.negotiator.lock().await;
        inner.sync_closed(&mut negotiator)?;
        let tracks = lock(&inner.tracks).snapshot();
        let offer = negotiator.create_offer(&tracks, options)?;
        sink_debug!(
            inner.log,
            "[SDP] offer v{} with {} sections (ice_restart={})",
            offer.session_version(),
            offer.sections().len(),
            options.ice_restart
        );
        Ok(offer)
    }

    /// Creates an answer to the applied remote offer.
    ///
    /// # Errors
    /// `InvalidState` outside `HaveRemoteOffer`, `MalformedDescription` for an
    /// unusable offer, `Closed` after close.
    pub async fn create_answer(&self) -> Result<SessionDescription, RtcError> {
        let inner = &self.inner;
        inner.ensure_open()?;
        let mut negotiator = inner.negotiator.lock().await;
        inner.sync_closed(&mut negotiator)?;
        let tracks = lock(&inner.tracks).snapshot();
        let answer = negotiator.create_answer(&tracks)?;
        sink_debug!(
            inner.log,
            "[SDP] answer with {} sections",
            answer.sections().len()
        );
        Ok(answer)
    }

    /// Applies a local offer, answer or rollback. Applying the first local
    /// description, or one with new sections or ICE credentials, starts
    /// candidate gathering.
    ///
    /// # Errors
    /// `InvalidState` naming the rejected (type, state) pair,
    /// `MalformedDescription` for an answer not matching the remote offer,
    /// `Closed` after close.
    pub async fn set_local_description(&self, desc: SessionDescription) -> Result<(), RtcError> {
        let inner = &self.inner;
        inner.ensure_open()?;
        let mut negotiator = inner.negotiator.lock().await;
        inner.sync_closed(&mut negotiator)?;

        let sdp_type = desc.sdp_type();
        let applied = match negotiator.apply_local(desc) {
            Ok(applied) => applied,
            Err(e) => {
                sink_warn!(inner.log, "[SDP] local {sdp_type} rejected: {e}");
                return Err(e);
            }
        };
        inner.publish_signaling(applied.state);
        let local = negotiator.local_description().cloned();
        drop(negotiator);

        if sdp_type != SdpType::Rollback {
            if let Some(local) = local {
                inner.after_local_applied(local, applied.local_ice_restart);
            }
        }
        Ok(())
    }

    /// Applies a remote offer, answer or rollback, then applies the remote
    /// candidates buffered so far. Buffered candidates that do not match the
    /// description are dropped and reported as
    /// [`PeerConnectionEvent::CandidateRejected`].
    ///
    /// # Errors
    /// `InvalidState` naming the rejected (type, state) pair,
    /// `MalformedDescription` for empty or inconsistent descriptions,
    /// `Closed` after close.
    pub async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), RtcError> {
        let inner = &self.inner;
        inner.ensure_open()?;
        let mut negotiator = inner.negotiator.lock().await;
        inner.sync_closed(&mut negotiator)?;

        let sdp_type = desc.sdp_type();
        let applied = match negotiator.apply_remote(desc) {
            Ok(applied) => applied,
            Err(e) => {
                sink_warn!(inner.log, "[SDP] remote {sdp_type} rejected: {e}");
                return Err(e);
            }
        };
        inner.publish_signaling(applied.state);
        let remote_mids: Option<Vec<String>> = negotiator
            .remote_description()
            .map(|d| d.mids().map(str::to_owned).collect());
        drop(negotiator);

        let report = {
            let mut link = lock(&inner.link);
            if applied.remote_ice_restart {
                sink_info!(inner.log, "[ICE] remote ICE restart");
                link.ice.restart(false, true);
                inner.reconnect_after_restart(&mut link);
            }
            match remote_mids {
                Some(mids) => Some(link.ice.set_remote_sections(mids)),
                None => {
                    link.ice.clear_remote_sections();
                    None
                }
            }
        };

        if let Some(report) = report {
            if !report.applied.is_empty() {
                sink_debug!(
                    inner.log,
                    "[ICE] applied {} buffered remote candidates",
                    report.applied.len()
                );
            }
            for (candidate, error) in report.rejected {
                sink_warn!(
                    inner.log,
                    "[ICE] dropped buffered candidate '{}': {error}",
                    candidate.candidate()
                );
                inner.emit(PeerConnectionEvent::CandidateRejected { candidate, error });
            }
        }
        inner.schedule_pairing();
        Ok(())
    }

    /// Pending local description if any, otherwise the current one.
    pub async fn local_description(&self) -> Option<SessionDescription> {
        self.inner.negotiator.lock().await.local_description().cloned()
    }

    /// Pending remote description if any, otherwise the current one.
    pub async fn remote_description(&self) -> Option<SessionDescription> {
        self.inner
            .negotiator
            .lock()
            .await
            .remote_description()
            .cloned()
    }

    // ------------------------------------------------------------ candidates

    /// Adds a remote candidate. Before a remote description is applied it is
    /// buffered; identical candidates are ignored.
    ///
    /// # Errors
    /// `Closed` after close, `UnknownMediaSection` when it names no section of
    /// the remote description.
    pub fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), RtcError> {
        let inner = &self.inner;
        inner.ensure_open()?;
        let outcome = lock(&inner.link).ice.add_remote(candidate)?;
        match outcome {
            RemoteCandidateOutcome::Added => inner.schedule_pairing(),
            RemoteCandidateOutcome::Buffered => {
                sink_debug!(inner.log, "[ICE] remote candidate buffered");
            }
            RemoteCandidateOutcome::Duplicate => {}
        }
        Ok(())
    }

    /// Adds a local candidate found outside the transport, as if gathered.
    ///
    /// # Errors
    /// `Closed` after close.
    pub fn add_local_candidate(&self, candidate: IceCandidate) -> Result<(), RtcError> {
        self.inner.ensure_open()?;
        self.inner.ingest_local(candidate);
        Ok(())
    }

    /// Marks local gathering complete.
    ///
    /// # Errors
    /// `Closed` after close.
    pub fn end_of_local_candidates(&self) -> Result<(), RtcError> {
        self.inner.ensure_open()?;
        let mut link = lock(&self.inner.link);
        self.inner.finish_gathering(&mut link);
        Ok(())
    }

    /// Local candidates in the order they were gathered or added.
    pub fn local_candidates(&self) -> Vec<IceCandidate> {
        lock(&self.inner.link).ice.local_candidates().to_vec()
    }

    /// Validated remote candidates. Buffered ones are not listed.
    pub fn remote_candidates(&self) -> Vec<IceCandidate> {
        lock(&self.inner.link).ice.remote_candidates().to_vec()
    }

    /// Mids of the sections with a working candidate pair, in connection order.
    pub fn connected_sections(&self) -> Vec<String> {
        lock(&self.inner.link).ice.connected_sections().to_vec()
    }

    // ---------------------------------------------------------------- states

    pub fn signaling_state(&self) -> SignalingState {
        *self.inner.signaling_tx.borrow()
    }

    pub fn connection_state(&self) -> PeerConnectionState {
        *self.inner.connection_tx.borrow()
    }

    pub fn ice_gathering_state(&self) -> IceGatheringState {
        *self.inner.gathering_tx.borrow()
    }

    pub fn subscribe_signaling_state(&self) -> watch::Receiver<SignalingState> {
        self.inner.signaling_tx.subscribe()
    }

    pub fn subscribe_connection_state(&self) -> watch::Receiver<PeerConnectionState> {
        self.inner.connection_tx.subscribe()
    }

    pub fn subscribe_ice_gathering_state(&self) -> watch::Receiver<IceGatheringState> {
        self.inner.gathering_tx.subscribe()
    }

    // ---------------------------------------------------------------- events

    /// Drains the events emitted so far without waiting.
    pub fn poll_events(&self) -> Vec<PeerConnectionEvent> {
        let mut out = Vec::new();
        if let Ok(mut rx) = self.inner.event_rx.try_lock() {
            while let Ok(ev) = rx.try_recv() {
                out.push(ev);
            }
        }
        out
    }

    /// Waits for the next event. `None` once the connection is closed and
    /// every event was read.
    pub async fn next_event(&self) -> Option<PeerConnectionEvent> {
        self.inner.event_rx.lock().await.recv().await
    }

    // ----------------------------------------------------------------- close

    /// Closes the connection: cancels transport work, discards buffered
    /// candidates, releases tracks and captures, and moves every state to
    /// `Closed`. Idempotent.
    pub fn close(&self) {
        let inner = &self.inner;
        if inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        lock(&inner.tasks).abort_all();
        {
            let mut link = lock(&inner.link);
            link.ice.clear();
            inner.set_connection(&mut link, PeerConnectionState::Closed, false);
        }
        if let Ok(mut negotiator) = inner.negotiator.try_lock() {
            negotiator.close();
        }
        inner.publish_signaling(SignalingState::Closed);
        lock(&inner.tracks).clear();
        for (_, handle) in lock(&inner.captures).drain(..) {
            handle.stop();
        }
        sink_info!(inner.log, "[PC] closed");
        lock(&inner.event_tx).take();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

impl Drop for PeerConnection {
    fn drop(&mut self) {
        self.close();
    }
}

impl Inner {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), RtcError> {
        if self.is_closed() {
            return Err(RtcError::Closed);
        }
        Ok(())
    }

    /// Called with the negotiator locked: a close that raced the lock wins.
    fn sync_closed(&self, negotiator: &mut Negotiator) -> Result<(), RtcError> {
        if self.is_closed() {
            negotiator.close();
            return Err(RtcError::Closed);
        }
        Ok(())
    }

    fn ensure_codec(&self, kind: TrackKind) -> Result<(), RtcError> {
        if self.codecs.supports(kind) {
            Ok(())
        } else {
            Err(RtcError::UnsupportedKind(kind))
        }
    }

    fn emit(&self, event: PeerConnectionEvent) {
        if let Some(tx) = lock(&self.event_tx).as_ref() {
            let _ = tx.send(event);
        }
    }

    fn publish_signaling(&self, state: SignalingState) {
        let changed = self.signaling_tx.send_if_modified(|current| {
            if *current == state || current.is_closed() {
                return false;
            }
            *current = state;
            true
        });
        if changed {
            sink_debug!(self.log, "[SDP] signaling state -> {state}");
            self.emit(PeerConnectionEvent::SignalingStateChanged(state));
        }
    }

    fn set_connection(&self, link: &mut LinkState, next: PeerConnectionState, ice_restart: bool) {
        if link.connection == next || !link.connection.can_transition_to(next, ice_restart) {
            return;
        }
        sink_info!(self.log, "[PC] connection {} -> {next}", link.connection);
        link.connection = next;
        self.connection_tx.send_replace(next);
        self.emit(PeerConnectionEvent::ConnectionStateChanged(next));
    }

    fn set_gathering(&self, link: &mut LinkState, next: IceGatheringState) {
        if link.gathering == next {
            return;
        }
        sink_debug!(self.log, "[ICE] gathering {} -> {next}", link.gathering);
        link.gathering = next;
        self.gathering_tx.send_replace(next);
        self.emit(PeerConnectionEvent::IceGatheringStateChanged(next));
    }

    /// Gathering never skips from `New` to `Complete`.
    fn start_gathering(&self, link: &mut LinkState) {
        if link.gathering == IceGatheringState::New {
            self.set_gathering(link, IceGatheringState::Gathering);
        }
    }

    fn reconnect_after_restart(&self, link: &mut LinkState) {
        if matches!(
            link.connection,
            PeerConnectionState::Failed | PeerConnectionState::Disconnected
        ) {
            self.set_connection(link, PeerConnectionState::Connecting, true);
        }
    }

    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = lock(&self.tasks);
        if self.is_closed() {
            return;
        }
        while tasks.try_join_next().is_some() {}
        tasks.spawn_on(fut, &self.runtime);
    }

    fn after_local_applied(self: &Arc<Self>, local: SessionDescription, ice_restart: bool) {
        let epoch = {
            let mut link = lock(&self.link);
            if ice_restart {
                sink_info!(self.log, "[ICE] local ICE restart");
                link.ice.restart(true, false);
                link.gathered_mids.clear();
                link.gather_epoch += 1;
                self.reconnect_after_restart(&mut link);
            }
            let fresh: Vec<String> = local
                .mids()
                .filter(|mid| !link.gathered_mids.iter().any(|g| g.as_str() == *mid))
                .map(str::to_owned)
                .collect();
            if fresh.is_empty() {
                return;
            }
            link.gathered_mids.extend(fresh);
            if ice_restart {
                self.set_gathering(&mut link, IceGatheringState::Gathering);
            } else {
                self.start_gathering(&mut link);
            }
            link.gather_epoch
        };
        self.spawn_gathering(local, epoch);
    }

    fn spawn_gathering(self: &Arc<Self>, local: SessionDescription, epoch: u64) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let transport = Arc::clone(&self.transport);
        let weak = Arc::downgrade(self);
        let pump = weak.clone();

        self.spawn(async move {
            if let Err(e) = transport.gather(&local, tx).await {
                if let Some(inner) = weak.upgrade() {
                    sink_error!(inner.log, "[ICE] gathering failed: {e}");
                    inner.emit(PeerConnectionEvent::Error(e.to_string()));
                }
            }
        });
        self.spawn(async move {
            while let Some(event) = rx.recv().await {
                let Some(inner) = pump.upgrade() else {
                    break;
                };
                inner.on_transport_event(event, epoch);
            }
        });
    }

    fn on_transport_event(self: &Arc<Self>, event: TransportEvent, epoch: u64) {
        if self.is_closed() {
            return;
        }
        match event {
            TransportEvent::CandidateGathered(candidate) => {
                if lock(&self.link).gather_epoch == epoch {
                    self.ingest_local(candidate);
                }
            }
            TransportEvent::GatheringComplete => {
                let mut link = lock(&self.link);
                if link.gather_epoch == epoch {
                    self.finish_gathering(&mut link);
                }
            }
            TransportEvent::LinkLost { sdp_mid } => {
                let mut link = lock(&self.link);
                if link.ice.link_lost(&sdp_mid) {
                    sink_warn!(self.log, "[ICE] link lost on section {sdp_mid}");
                    if link.ice.connected_sections().is_empty() {
                        self.set_connection(&mut link, PeerConnectionState::Disconnected, false);
                    }
                }
            }
            TransportEvent::LinkRestored { sdp_mid } => {
                let mut link = lock(&self.link);
                if link.ice.link_restored(&sdp_mid) {
                    sink_info!(self.log, "[ICE] link restored on section {sdp_mid}");
                    self.set_connection(&mut link, PeerConnectionState::Connected, false);
                }
            }
            TransportEvent::LinkFailed { sdp_mid } => {
                let mut link = lock(&self.link);
                if link.ice.link_failed(&sdp_mid) {
                    sink_warn!(self.log, "[ICE] link failed on section {sdp_mid}");
                    if link.ice.connected_sections().is_empty() && !link.ice.has_lost_sections() {
                        self.set_connection(&mut link, PeerConnectionState::Failed, false);
                    }
                }
            }
        }
    }

    fn ingest_local(self: &Arc<Self>, candidate: IceCandidate) {
        {
            let mut link = lock(&self.link);
            self.start_gathering(&mut link);
            link.ice.add_local(candidate.clone());
        }
        sink_debug!(self.log, "[ICE] local candidate {}", candidate.candidate());
        self.emit(PeerConnectionEvent::LocalCandidate(candidate));
        self.schedule_pairing();
    }

    fn finish_gathering(&self, link: &mut LinkState) {
        if link.gathering == IceGatheringState::Complete {
            return;
        }
        self.start_gathering(link);
        self.set_gathering(link, IceGatheringState::Complete);
        self.emit(PeerConnectionEvent::EndOfLocalCandidates);
        self.check_failed(link);
    }

    /// All pairs failed, nothing connected and no more local candidates.
    fn check_failed(&self, link: &mut LinkState) {
        if link.gathering == IceGatheringState::Complete
            && link.connection == PeerConnectionState::Connecting
            && link.ice.exhausted()
        {
            sink_warn!(self.log, "[ICE] every candidate pair failed");
            self.set_connection(link, PeerConnectionState::Failed, false);
        }
    }

    /// Issues connectivity attempts for the pairs waiting, highest priority
    /// first. Sections connected meanwhile are skipped.
    fn schedule_pairing(self: &Arc<Self>) {
        let attempts = {
            let mut link = lock(&self.link);
            if matches!(
                link.connection,
                PeerConnectionState::Failed | PeerConnectionState::Closed
            ) {
                return;
            }
            let attempts = link.ice.take_attempts();
            if attempts.is_empty() {
                return;
            }
            self.set_connection(&mut link, PeerConnectionState::Connecting, false);
            attempts
        };
        sink_debug!(self.log, "[ICE] checking {} candidate pairs", attempts.len());

        let weak = Arc::downgrade(self);
        let transport = Arc::clone(&self.transport);
        self.spawn(async move {
            for attempt in attempts {
                {
                    let Some(inner) = weak.upgrade() else {
                        return;
                    };
                    let mut link = lock(&inner.link);
                    if link.ice.is_section_connected(&attempt.sdp_mid) {
                        link.ice.release(&attempt);
                        continue;
                    }
                }
                let result = transport.try_connect(&attempt.local, &attempt.remote).await;
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                inner.on_pair_result(&attempt, result);
            }
        });
    }

    fn on_pair_result(&self, attempt: &PairAttempt, result: Result<(), TransportError>) {
        let mut link = lock(&self.link);
        match link.ice.record_result(attempt, result.is_ok()) {
            PairOutcome::SectionConnected(sdp_mid) => {
                sink_info!(self.log, "[ICE] section {sdp_mid} connected");
                self.emit(PeerConnectionEvent::SectionConnected { sdp_mid });
                self.set_connection(&mut link, PeerConnectionState::Connected, false);
            }
            PairOutcome::Failed => {
                if let Err(e) = &result {
                    sink_debug!(
                        self.log,
                        "[ICE] pair failed on section {}: {e}",
                        attempt.sdp_mid
                    );
                }
                self.check_failed(&mut link);
            }
            PairOutcome::Redundant | PairOutcome::Stale => {}
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use std::time::Duration;

    use super::*;
    use crate::{
        log::NoopLogSink,
        media::synthetic_capture::{SYNTHETIC_CAMERA_ID, SyntheticCaptureProvider},
        peer_connection::PeerConnectionFactory,
    };

    fn connection() -> PeerConnection {
        PeerConnectionFactory::from_config(&RtcConfiguration::default(), Arc::new(NoopLogSink))
            .create_peer_connection(RtcConfiguration::default())
            .unwrap()
    }

    #[tokio::test]
    async fn track_changes_ask_for_negotiation() {
        let pc = connection();
        let id = pc.add_track(TrackKind::Video, "s1").unwrap();
        pc.remove_track(&id).unwrap();
        assert_eq!(
            pc.poll_events(),
            vec![
                PeerConnectionEvent::NegotiationNeeded,
                PeerConnectionEvent::NegotiationNeeded
            ]
        );
        assert!(pc.poll_events().is_empty());
    }

    #[tokio::test]
    async fn add_track_str_validates_the_kind() {
        let pc = connection();
        assert_eq!(
            pc.add_track_str("screen", "s1"),
            Err(RtcError::InvalidKind("screen".into()))
        );
        let id = pc.add_track_str("audio", "s1").unwrap();
        assert_eq!(pc.list_tracks()[0].id(), id);
    }

    #[tokio::test]
    async fn device_tracks_carry_their_device() {
        let pc = connection();
        let id = pc.add_track_from_device(SYNTHETIC_CAMERA_ID, "cam").unwrap();
        let track = pc.list_tracks().into_iter().next().unwrap();
        assert_eq!(track.id(), id);
        assert_eq!(track.kind(), TrackKind::Video);
        assert_eq!(track.device_id(), Some(SYNTHETIC_CAMERA_ID));

        assert_eq!(
            pc.add_track_from_device("missing", "cam"),
            Err(RtcError::Media(MediaError::DeviceNotFound("missing".into())))
        );
        assert_eq!(pc.list_tracks().len(), 1);
    }

    #[tokio::test]
    async fn empty_capture_provider_has_no_devices() {
        let pc = PeerConnectionFactory::from_config(
            &RtcConfiguration::default(),
            Arc::new(NoopLogSink),
        )
        .with_capture_provider(Arc::new(SyntheticCaptureProvider::empty()))
        .create_peer_connection(RtcConfiguration::default())
        .unwrap();
        assert!(matches!(
            pc.add_track_from_device(SYNTHETIC_CAMERA_ID, "cam"),
            Err(RtcError::Media(MediaError::DeviceNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn disabling_a_track_keeps_the_offer() {
        let pc = connection();
        let id = pc.add_track(TrackKind::Audio, "s1").unwrap();
        let before = pc.create_offer().await.unwrap();
        pc.set_track_enabled(&id, false).unwrap();
        assert!(!pc.list_tracks()[0].enabled());
        assert_eq!(pc.create_offer().await.unwrap(), before);
        assert!(matches!(
            pc.set_track_enabled("nope", true),
            Err(RtcError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn failed_description_leaves_state_untouched() {
        let pc = connection();
        pc.add_track(TrackKind::Video, "s1").unwrap();
        let offer = pc.create_offer().await.unwrap();
        let answer = SessionDescription::new(SdpType::Answer, offer.sections().to_vec());

        let err = pc.set_local_description(answer).await.unwrap_err();
        assert!(matches!(err, RtcError::InvalidState { .. }));
        assert_eq!(pc.signaling_state(), SignalingState::Stable);
        assert_eq!(pc.ice_gathering_state(), IceGatheringState::New);
        assert!(pc.local_description().await.is_none());
    }

    #[tokio::test]
    async fn close_is_idempotent_and_final() {
        let pc = connection();
        pc.add_track(TrackKind::Audio, "s1").unwrap();
        let mut signaling = pc.subscribe_signaling_state();

        pc.close();
        pc.close();

        assert!(pc.is_closed());
        assert_eq!(pc.signaling_state(), SignalingState::Closed);
        assert_eq!(pc.connection_state(), PeerConnectionState::Closed);
        assert!(signaling.has_changed().unwrap());
        assert_eq!(*signaling.borrow_and_update(), SignalingState::Closed);
        assert!(pc.list_tracks().is_empty());

        let events = pc.poll_events();
        assert!(events.contains(&PeerConnectionEvent::SignalingStateChanged(
            SignalingState::Closed
        )));
        assert!(events.contains(&PeerConnectionEvent::ConnectionStateChanged(
            PeerConnectionState::Closed
        )));
        assert_eq!(pc.next_event().await, None);

        assert_eq!(pc.set_track_enabled("audio-1", true), Err(RtcError::Closed));
        assert_eq!(pc.end_of_local_candidates(), Err(RtcError::Closed));
        assert_eq!(pc.create_answer().await, Err(RtcError::Closed));
        assert_eq!(
            pc.set_remote_description(SessionDescription::rollback()).await,
            Err(RtcError::Closed)
        );
    }

    #[tokio::test]
    async fn manual_candidates_feed_the_local_log() {
        let pc = connection();
        let candidate = IceCandidate::new("candidate:1 1 udp 2130706431 127.0.0.1 5000 typ host", "0", 0);
        pc.add_local_candidate(candidate.clone()).unwrap();
        pc.end_of_local_candidates().unwrap();

        assert_eq!(pc.local_candidates(), vec![candidate.clone()]);
        assert_eq!(pc.ice_gathering_state(), IceGatheringState::Complete);
        let events = pc.poll_events();
        assert_eq!(
            events,
            vec![
                PeerConnectionEvent::IceGatheringStateChanged(IceGatheringState::Gathering),
                PeerConnectionEvent::LocalCandidate(candidate),
                PeerConnectionEvent::IceGatheringStateChanged(IceGatheringState::Complete),
                PeerConnectionEvent::EndOfLocalCandidates,
            ]
        );
    }

    #[tokio::test]
    async fn ending_an_empty_gathering_passes_through_gathering() {
        let pc = connection();
        let mut states = pc.subscribe_ice_gathering_state();
        pc.end_of_local_candidates().unwrap();

        assert_eq!(*states.borrow_and_update(), IceGatheringState::Complete);
        assert_eq!(
            pc.poll_events(),
            vec![
                PeerConnectionEvent::IceGatheringStateChanged(IceGatheringState::Gathering),
                PeerConnectionEvent::IceGatheringStateChanged(IceGatheringState::Complete),
                PeerConnectionEvent::EndOfLocalCandidates,
            ]
        );
    }

    #[tokio::test]
    async fn candidates_and_tracks_do_not_wait_for_a_parked_signaling_call() {
        let pc = connection();
        pc.add_track(TrackKind::Audio, "s1").unwrap();
        pc.poll_events();

        let held = pc.inner.negotiator.lock().await;
        let offer = pc.create_offer();
        tokio::pin!(offer);
        assert!(
            tokio::time::timeout(Duration::from_millis(20), &mut offer)
                .await
                .is_err(),
            "create_offer must queue behind the signaling lock"
        );

        let candidate = IceCandidate::new("candidate:1 1 udp 2130706431 127.0.0.1 5000 typ host", "0", 0);
        pc.add_ice_candidate(candidate).unwrap();
        pc.add_track(TrackKind::Video, "s1").unwrap();
        assert_eq!(lock(&pc.inner.link).ice.buffered_len(), 1);
        assert_eq!(pc.poll_events(), vec![PeerConnectionEvent::NegotiationNeeded]);

        drop(held);
        let offer = offer.await.unwrap();
        let kinds: Vec<_> = offer.sections().iter().map(|s| s.kind()).collect();
        assert_eq!(kinds, [TrackKind::Audio, TrackKind::Video]);
        assert_eq!(pc.signaling_state(), SignalingState::Stable);
    }
}
