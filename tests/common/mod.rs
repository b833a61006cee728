#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::{sync::Arc, time::Duration};

use peerlink::{
    PeerConnection, PeerConnectionEvent, PeerConnectionFactory, RtcConfiguration, TrackKind,
    log::NoopLogSink,
    transport::{IceTransport, LoopbackTransport},
};

pub const STEP: Duration = Duration::from_millis(5);
pub const MAX_STEPS: usize = 400;

pub fn factory() -> PeerConnectionFactory {
    PeerConnectionFactory::from_config(&RtcConfiguration::default(), Arc::new(NoopLogSink))
}

/// Factory whose connections share `transport`, so tests can drive its links.
pub fn loopback_factory() -> (PeerConnectionFactory, Arc<LoopbackTransport>) {
    let transport = Arc::new(LoopbackTransport::default());
    let shared: Arc<dyn IceTransport> = transport.clone();
    (factory().with_transport(shared), transport)
}

pub fn connection(factory: &PeerConnectionFactory) -> PeerConnection {
    factory
        .create_peer_connection(RtcConfiguration::default())
        .unwrap()
}

pub fn with_av(pc: &PeerConnection, stream: &str) {
    pc.add_track(TrackKind::Video, stream).unwrap();
    pc.add_track(TrackKind::Audio, stream).unwrap();
}

/// Full offer/answer from `caller` to `callee`.
pub async fn negotiate(caller: &PeerConnection, callee: &PeerConnection) {
    let offer = caller.create_offer().await.unwrap();
    caller.set_local_description(offer.clone()).await.unwrap();
    callee.set_remote_description(offer).await.unwrap();
    let answer = callee.create_answer().await.unwrap();
    callee.set_local_description(answer.clone()).await.unwrap();
    caller.set_remote_description(answer).await.unwrap();
}

/// Relays local candidates between the two peers until `done` holds,
/// returning every event each side emitted meanwhile.
pub async fn relay_until<F>(
    a: &PeerConnection,
    b: &PeerConnection,
    done: F,
) -> (Vec<PeerConnectionEvent>, Vec<PeerConnectionEvent>)
where
    F: Fn(&PeerConnection, &PeerConnection) -> bool,
{
    let mut seen_a = Vec::new();
    let mut seen_b = Vec::new();
    for _ in 0..MAX_STEPS {
        for event in a.poll_events() {
            if let PeerConnectionEvent::LocalCandidate(c) = &event {
                b.add_ice_candidate(c.clone()).unwrap();
            }
            seen_a.push(event);
        }
        for event in b.poll_events() {
            if let PeerConnectionEvent::LocalCandidate(c) = &event {
                a.add_ice_candidate(c.clone()).unwrap();
            }
            seen_b.push(event);
        }
        if done(a, b) {
            return (seen_a, seen_b);
        }
        tokio::time::sleep(STEP).await;
    }
    panic!(
        "condition not reached; a={:?} b={:?}",
        a.connection_state(),
        b.connection_state()
    );
}
