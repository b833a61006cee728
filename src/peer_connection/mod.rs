//! The peer connection: signaling and connection state machines on top of the
//! negotiator and the candidate coordinator.

pub mod connection_state;
pub mod events;
pub mod factory;
#[allow(clippy::module_inception)]
pub mod peer_connection;
pub mod signaling_state;

pub use connection_state::{IceGatheringState, PeerConnectionState};
pub use events::PeerConnectionEvent;
pub use factory::PeerConnectionFactory;
pub use peer_connection::PeerConnection;
pub use signaling_state::{DescriptionSide, SignalingState};
