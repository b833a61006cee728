#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;

use peerlink::{
    PeerConnection, PeerConnectionEvent, PeerConnectionState, SdpType,
    config::SignalingConfig,
    log::NoopLogSink,
    signaling::{Delivery, PeerId, SignalMessage, SignalingError, SignalingRelay},
};

use common::{MAX_STEPS, STEP, connection, loopback_factory, with_av};

fn relay() -> SignalingRelay {
    SignalingRelay::with_log(
        &SignalingConfig {
            wait_timeout_ms: 50,
        },
        Arc::new(NoopLogSink),
    )
}

/// Posts the local candidates of `pc` to `to`.
fn post_candidates(relay: &SignalingRelay, pc: &PeerConnection, from: PeerId, to: PeerId) {
    for event in pc.poll_events() {
        if let PeerConnectionEvent::LocalCandidate(c) = event {
            relay.send_signal(from, to, &c.into()).unwrap();
        }
    }
}

/// Applies every candidate waiting in the mailbox of `id`.
async fn take_candidates(relay: &SignalingRelay, pc: &PeerConnection, id: PeerId) {
    while relay.pending(id) > 0 {
        let (_, signal) = relay.wait_signal(id).await.unwrap().unwrap();
        let SignalMessage::Candidate(c) = signal else {
            panic!("expected a candidate, got {signal:?}");
        };
        pc.add_ice_candidate(c).unwrap();
    }
}

#[tokio::test]
async fn call_negotiated_through_the_relay_connects() {
    let (f, _transport) = loopback_factory();
    let caller = connection(&f);
    let callee = connection(&f);
    with_av(&caller, "caller");
    with_av(&callee, "callee");

    let relay = relay();
    let (a, _) = relay.sign_in("caller");
    let (b, peers) = relay.sign_in("callee");
    assert_eq!(peers.len(), 2);

    let offer = caller.create_offer().await.unwrap();
    caller.set_local_description(offer.clone()).await.unwrap();
    relay.send_signal(a, b, &SignalMessage::from(&offer)).unwrap();

    let (from, signal) = relay.wait_signal(b).await.unwrap().unwrap();
    assert_eq!(from, a);
    let remote_offer = signal.into_description().unwrap();
    assert_eq!(remote_offer.sdp_type(), SdpType::Offer);
    callee.set_remote_description(remote_offer).await.unwrap();
    let answer = callee.create_answer().await.unwrap();
    callee.set_local_description(answer.clone()).await.unwrap();
    relay.send_signal(b, a, &SignalMessage::from(&answer)).unwrap();

    let (_, signal) = relay.wait_signal(a).await.unwrap().unwrap();
    caller
        .set_remote_description(signal.into_description().unwrap())
        .await
        .unwrap();

    for _ in 0..MAX_STEPS {
        post_candidates(&relay, &caller, a, b);
        post_candidates(&relay, &callee, b, a);
        take_candidates(&relay, &callee, b).await;
        take_candidates(&relay, &caller, a).await;
        if caller.connection_state() == PeerConnectionState::Connected
            && callee.connection_state() == PeerConnectionState::Connected
        {
            break;
        }
        tokio::time::sleep(STEP).await;
    }
    assert_eq!(caller.connection_state(), PeerConnectionState::Connected);
    assert_eq!(callee.connection_state(), PeerConnectionState::Connected);
    assert_eq!(callee.remote_candidates().len(), 2);
}

#[tokio::test]
async fn signed_out_peer_cannot_be_reached_or_wait() {
    let relay = relay();
    let (a, _) = relay.sign_in("caller");
    let (b, _) = relay.sign_in("callee");
    relay.send(a, b, "queued").unwrap();
    relay.sign_out(b);

    assert_eq!(relay.send(a, b, "late"), Err(SignalingError::UnknownPeer(b)));
    assert_eq!(relay.wait(b).await, Err(SignalingError::NotSignedIn(b)));
    assert_eq!(relay.peers().len(), 1);
}

#[tokio::test]
async fn idle_wait_reports_who_is_online() {
    let relay = relay();
    let (a, _) = relay.sign_in("caller");
    relay.sign_in("");

    let Delivery::Peers(peers) = relay.wait(a).await.unwrap() else {
        panic!("expected the peer list");
    };
    let names: Vec<_> = peers.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["caller", "anonymous"]);
    assert_eq!(relay.wait_signal(a).await.unwrap(), None);
}
