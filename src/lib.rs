//! peerlink is the signaling and connection-setup engine of a WebRTC peer.
//!
//! It keeps the local media tracks of a connection, negotiates media sections
//! through SDP offers and answers, coordinates ICE candidates between the two
//! peers and drives the signaling, connection and gathering state machines.
//! Packet transport, capture hardware and codecs sit behind traits so the
//! engine runs against in-process implementations as well as real ones.
//!
//! The crate is structured into several modules, each responsible for one
//! part of connection setup.

/// Configuration loading and validation.
pub mod config;
/// Candidate parsing, pairing and the candidate coordinator.
pub mod ice;
/// Logging utilities shared by every component.
pub mod log;
/// Capture providers and codec capabilities.
pub mod media;
/// Offer/answer generation and the session description model.
pub mod negotiation;
/// The peer connection and its state machines.
pub mod peer_connection;
/// The error type returned by public operations.
pub mod rtc_error;
/// SDP (Session Description Protocol) parsing and building.
pub mod sdp;
/// Relay that carries descriptions and candidates between signed-in peers.
pub mod signaling;
/// Local media tracks and streams.
pub mod track;
/// Transport abstraction and its built-in implementations.
pub mod transport;

pub use config::RtcConfiguration;
pub use ice::IceCandidate;
pub use negotiation::{SdpType, SessionDescription};
pub use peer_connection::{
    IceGatheringState, PeerConnection, PeerConnectionEvent, PeerConnectionFactory,
    PeerConnectionState, SignalingState,
};
pub use rtc_error::RtcError;
pub use track::{Track, TrackKind};
