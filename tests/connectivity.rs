#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::{sync::Arc, time::Duration};

use peerlink::{
    IceCandidate, IceGatheringState, PeerConnectionEvent, PeerConnectionFactory,
    PeerConnectionState, RtcConfiguration, TrackKind,
    config::TransportMode,
    log::NoopLogSink,
    negotiation::OfferOptions,
};

use common::{connection, loopback_factory, negotiate, relay_until, with_av};

fn both_connected(a: &peerlink::PeerConnection, b: &peerlink::PeerConnection) -> bool {
    a.connected_sections().len() == 2 && b.connected_sections().len() == 2
}

#[tokio::test]
async fn loopback_call_connects_every_section() {
    let (f, _transport) = loopback_factory();
    let caller = connection(&f);
    let callee = connection(&f);
    with_av(&caller, "caller");
    with_av(&callee, "callee");

    negotiate(&caller, &callee).await;
    let (caller_events, _) = relay_until(&caller, &callee, both_connected).await;

    assert_eq!(caller.connection_state(), PeerConnectionState::Connected);
    assert_eq!(callee.connection_state(), PeerConnectionState::Connected);
    assert_eq!(caller.ice_gathering_state(), IceGatheringState::Complete);

    let mut sections = caller.connected_sections();
    sections.sort();
    assert_eq!(sections, ["0", "1"]);

    let states: Vec<_> = caller_events
        .iter()
        .filter_map(|e| match e {
            PeerConnectionEvent::ConnectionStateChanged(s) => Some(*s),
            _ => None,
        })
        .collect();
    assert_eq!(
        states,
        [PeerConnectionState::Connecting, PeerConnectionState::Connected]
    );
    assert!(caller_events.contains(&PeerConnectionEvent::EndOfLocalCandidates));
    assert_eq!(
        caller_events
            .iter()
            .filter(|e| matches!(e, PeerConnectionEvent::LocalCandidate(_)))
            .count(),
        2
    );
}

#[tokio::test]
async fn connection_state_is_observable_through_watch() {
    let (f, _transport) = loopback_factory();
    let caller = connection(&f);
    let callee = connection(&f);
    with_av(&caller, "caller");
    callee.add_track(TrackKind::Video, "callee").unwrap();
    let mut state = caller.subscribe_connection_state();

    negotiate(&caller, &callee).await;
    relay_until(&caller, &callee, |a, _| {
        a.connection_state() == PeerConnectionState::Connected
    })
    .await;

    let seen = tokio::time::timeout(
        Duration::from_secs(1),
        state.wait_for(|s| *s == PeerConnectionState::Connected),
    )
    .await
    .unwrap()
    .map(|s| *s)
    .unwrap();
    assert_eq!(seen, PeerConnectionState::Connected);
}

#[tokio::test]
async fn link_loss_disconnects_and_restoration_reconnects() {
    let (f, transport) = loopback_factory();
    let caller = connection(&f);
    let callee = connection(&f);
    with_av(&caller, "caller");
    with_av(&callee, "callee");
    negotiate(&caller, &callee).await;
    relay_until(&caller, &callee, both_connected).await;

    transport.drop_link("0");
    relay_until(&caller, &callee, |a, _| a.connected_sections() == ["1"]).await;
    assert_eq!(caller.connection_state(), PeerConnectionState::Connected);

    transport.drop_link("1");
    relay_until(&caller, &callee, |a, _| {
        a.connection_state() == PeerConnectionState::Disconnected
    })
    .await;

    transport.restore_link("1");
    relay_until(&caller, &callee, |a, b| {
        a.connection_state() == PeerConnectionState::Connected
            && b.connection_state() == PeerConnectionState::Connected
    })
    .await;
    assert_eq!(caller.connected_sections(), ["1"]);
}

#[tokio::test]
async fn failed_links_fail_the_connection() {
    let (f, transport) = loopback_factory();
    let caller = connection(&f);
    let callee = connection(&f);
    caller.add_track(TrackKind::Audio, "caller").unwrap();
    callee.add_track(TrackKind::Audio, "callee").unwrap();
    negotiate(&caller, &callee).await;
    relay_until(&caller, &callee, |a, b| {
        a.connected_sections().len() == 1 && b.connected_sections().len() == 1
    })
    .await;

    transport.fail_link("0");
    relay_until(&caller, &callee, |a, b| {
        a.connection_state() == PeerConnectionState::Failed
            && b.connection_state() == PeerConnectionState::Failed
    })
    .await;
}

#[tokio::test]
async fn ice_restart_recovers_a_failed_connection() {
    let (f, transport) = loopback_factory();
    let caller = connection(&f);
    let callee = connection(&f);
    caller.add_track(TrackKind::Audio, "caller").unwrap();
    callee.add_track(TrackKind::Audio, "callee").unwrap();
    negotiate(&caller, &callee).await;
    relay_until(&caller, &callee, |a, _| a.connected_sections().len() == 1).await;
    transport.fail_link("0");
    relay_until(&caller, &callee, |a, b| {
        a.connection_state() == PeerConnectionState::Failed
            && b.connection_state() == PeerConnectionState::Failed
    })
    .await;

    let offer = caller
        .create_offer_with(OfferOptions { ice_restart: true })
        .await
        .unwrap();
    caller.set_local_description(offer.clone()).await.unwrap();
    assert_eq!(caller.connection_state(), PeerConnectionState::Connecting);
    callee.set_remote_description(offer).await.unwrap();
    let answer = callee.create_answer().await.unwrap();
    callee.set_local_description(answer.clone()).await.unwrap();
    caller.set_remote_description(answer).await.unwrap();

    relay_until(&caller, &callee, |a, b| {
        a.connection_state() == PeerConnectionState::Connected
            && b.connection_state() == PeerConnectionState::Connected
    })
    .await;
}

#[tokio::test]
async fn without_a_transport_every_pair_fails() {
    let mut config = RtcConfiguration::default();
    config.transport.mode = TransportMode::None;
    let f = PeerConnectionFactory::from_config(&config, Arc::new(NoopLogSink));
    let caller = f.create_peer_connection(config.clone()).unwrap();
    let callee = f.create_peer_connection(config).unwrap();
    caller.add_track(TrackKind::Audio, "caller").unwrap();
    negotiate(&caller, &callee).await;

    // Nothing is gathered, so pairs only exist for candidates added by hand.
    caller
        .add_local_candidate(IceCandidate::new(
            "candidate:1 1 udp 2130706431 127.0.0.1 50500 typ host",
            "0",
            0,
        ))
        .unwrap();
    caller
        .add_ice_candidate(IceCandidate::new(
            "candidate:2 1 udp 2130706431 127.0.0.1 50501 typ host",
            "0",
            0,
        ))
        .unwrap();

    let mut state = caller.subscribe_connection_state();
    tokio::time::timeout(
        Duration::from_secs(2),
        state.wait_for(|s| *s == PeerConnectionState::Failed),
    )
    .await
    .unwrap()
    .unwrap();
    assert!(caller.connected_sections().is_empty());
    assert_eq!(caller.ice_gathering_state(), IceGatheringState::Complete);
}

#[tokio::test]
async fn close_cancels_connectivity_work() {
    let (f, _transport) = loopback_factory();
    let caller = connection(&f);
    let callee = connection(&f);
    with_av(&caller, "caller");
    with_av(&callee, "callee");
    negotiate(&caller, &callee).await;

    caller.close();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(caller.connection_state(), PeerConnectionState::Closed);
    assert!(caller.local_candidates().is_empty());
    assert!(caller.remote_candidates().is_empty());

    for event in callee.poll_events() {
        if let PeerConnectionEvent::LocalCandidate(c) = event {
            assert_eq!(
                caller.add_ice_candidate(c),
                Err(peerlink::RtcError::Closed)
            );
        }
    }
}

#[tokio::test]
async fn closed_connections_do_not_pile_up_on_a_shared_transport() {
    let (f, transport) = loopback_factory();
    for _ in 0..20 {
        let caller = connection(&f);
        let callee = connection(&f);
        caller.add_track(TrackKind::Audio, "caller").unwrap();
        negotiate(&caller, &callee).await;
        relay_until(&caller, &callee, |a, b| {
            a.ice_gathering_state() == IceGatheringState::Complete
                && b.ice_gathering_state() == IceGatheringState::Complete
        })
        .await;
        caller.close();
        callee.close();
    }
    tokio::time::sleep(Duration::from_millis(20)).await;

    let caller = connection(&f);
    let callee = connection(&f);
    caller.add_track(TrackKind::Audio, "caller").unwrap();
    negotiate(&caller, &callee).await;
    relay_until(&caller, &callee, |a, b| {
        a.ice_gathering_state() == IceGatheringState::Complete
            && b.ice_gathering_state() == IceGatheringState::Complete
    })
    .await;
    assert_eq!(transport.link_count(), 2);
}
