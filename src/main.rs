use std::{process::ExitCode, sync::Arc, time::Duration};

use peerlink::{
    PeerConnection, PeerConnectionEvent, PeerConnectionFactory, PeerConnectionState,
    RtcConfiguration, RtcError, SessionDescription, TrackKind,
    log::{LogSink, TracingLogSink},
    media::synthetic_capture::SYNTHETIC_CAMERA_ID,
    signaling::{PeerId, SignalMessage, SignalingRelay},
    transport::TransportError,
};
use tracing_subscriber::EnvFilter;

const CALLER_STREAM: &str = "caller";
const CALLEE_STREAM: &str = "callee";
const CALL_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> ExitCode {
    let config = RtcConfiguration::default();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        transport = ?config.transport.mode,
        "peerlink starting"
    );

    match run(config).await {
        Ok(()) => {
            tracing::info!("all steps succeeded");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("stopped: {e}");
            ExitCode::FAILURE
        }
    }
}

fn step<T>(name: &str, result: Result<T, RtcError>) -> Result<T, RtcError> {
    match &result {
        Ok(_) => tracing::info!("[{name}] ok"),
        Err(e) => tracing::error!("[{name}] failed: {e}"),
    }
    result
}

async fn run(config: RtcConfiguration) -> Result<(), RtcError> {
    let log: Arc<dyn LogSink> = Arc::new(TracingLogSink);
    let factory = PeerConnectionFactory::from_config(&config, Arc::clone(&log));
    let relay = SignalingRelay::with_log(&config.signaling, log);

    let caller = step(
        "create connection",
        factory.create_peer_connection(config.clone()),
    )?;
    step("add video", caller.add_track(TrackKind::Video, CALLER_STREAM))?;
    step("add audio", caller.add_track(TrackKind::Audio, CALLER_STREAM))?;
    let capture = step("start capture", factory.start_capture(SYNTHETIC_CAMERA_ID))?;
    let offer = step("create offer", caller.create_offer().await)?;
    tracing::debug!("offer:\n{}", offer.to_sdp());

    let rendered = render(&factory, &relay, config, &caller, offer).await;
    capture.stop();
    step("render", rendered)
}

/// One side of the call and its id on the relay.
struct Endpoint<'a> {
    pc: &'a PeerConnection,
    id: PeerId,
}

/// Completes a loopback call against a second peer. Every description and
/// candidate travels through the relay in its JSON signaling form.
async fn render(
    factory: &PeerConnectionFactory,
    relay: &SignalingRelay,
    config: RtcConfiguration,
    caller: &PeerConnection,
    offer: SessionDescription,
) -> Result<(), RtcError> {
    let callee = factory.create_peer_connection(config)?;
    callee.add_track(TrackKind::Video, CALLEE_STREAM)?;
    callee.add_track(TrackKind::Audio, CALLEE_STREAM)?;
    let (caller_id, _) = relay.sign_in(CALLER_STREAM);
    let (callee_id, peers) = relay.sign_in(CALLEE_STREAM);
    tracing::debug!("signed in: {peers:?}");
    let caller = Endpoint {
        pc: caller,
        id: caller_id,
    };
    let callee = Endpoint {
        pc: &callee,
        id: callee_id,
    };

    caller.pc.set_local_description(offer.clone()).await?;
    relay.send_signal(caller.id, callee.id, &SignalMessage::from(&offer))?;
    let remote_offer = next_description(relay, callee.id).await?;
    callee.pc.set_remote_description(remote_offer).await?;
    let answer = callee.pc.create_answer().await?;
    callee.pc.set_local_description(answer.clone()).await?;
    relay.send_signal(callee.id, caller.id, &SignalMessage::from(&answer))?;
    let remote_answer = next_description(relay, caller.id).await?;
    caller.pc.set_remote_description(remote_answer).await?;

    let expected = offer.sections().len();
    let call = exchange(relay, &caller, &callee, expected);
    let connected = tokio::time::timeout(CALL_TIMEOUT, call)
        .await
        .map_err(|_| TransportError::Timeout)??;
    for mid in &connected {
        tracing::info!("media section {mid} connected");
    }

    relay.sign_out(callee.id);
    relay.sign_out(caller.id);
    callee.pc.close();
    caller.pc.close();
    Ok(())
}

async fn next_description(
    relay: &SignalingRelay,
    id: PeerId,
) -> Result<SessionDescription, RtcError> {
    match relay.wait_signal(id).await? {
        Some((_, signal)) => signal.into_description(),
        None => Err(TransportError::Timeout.into()),
    }
}

/// Hands every candidate queued for `to` to its connection.
async fn deliver(relay: &SignalingRelay, to: &Endpoint<'_>) -> Result<(), RtcError> {
    while relay.pending(to.id) > 0 {
        if let Some((_, SignalMessage::Candidate(candidate))) = relay.wait_signal(to.id).await? {
            to.pc.add_ice_candidate(candidate)?;
        }
    }
    Ok(())
}

/// Forwards candidates both ways until the caller has `expected` connected
/// sections.
async fn exchange(
    relay: &SignalingRelay,
    caller: &Endpoint<'_>,
    callee: &Endpoint<'_>,
    expected: usize,
) -> Result<Vec<String>, RtcError> {
    let mut connected = Vec::new();
    while connected.len() < expected {
        tokio::select! {
            Some(event) = caller.pc.next_event() => match event {
                PeerConnectionEvent::LocalCandidate(c) => {
                    relay.send_signal(caller.id, callee.id, &c.into())?;
                    deliver(relay, callee).await?;
                }
                PeerConnectionEvent::SectionConnected { sdp_mid } => connected.push(sdp_mid),
                PeerConnectionEvent::ConnectionStateChanged(PeerConnectionState::Failed) => {
                    return Err(TransportError::Unreachable("no candidate pair succeeded".into()).into());
                }
                _ => {}
            },
            Some(event) = callee.pc.next_event() => {
                if let PeerConnectionEvent::LocalCandidate(c) = event {
                    relay.send_signal(callee.id, caller.id, &c.into())?;
                    deliver(relay, caller).await?;
                }
            },
            else => return Err(RtcError::Closed),
        }
    }
    Ok(connected)
}
