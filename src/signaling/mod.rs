//! In-process signaling relay: peers sign in under a name, post messages to
//! one another and collect them with a long-polling `wait`.

pub mod peer_registry;
pub mod relay;
pub mod signal_message;
pub mod signaling_error;

pub use peer_registry::{PeerId, PeerInfo, PeerRegistry};
pub use relay::{Delivery, SignalingRelay};
pub use signal_message::SignalMessage;
pub use signaling_error::SignalingError;
