use thiserror::Error;

use crate::signaling::peer_registry::PeerId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalingError {
    /// The sender or waiter is not signed in.
    #[error("peer {0} is not signed in")]
    NotSignedIn(PeerId),
    /// The addressee is not signed in.
    #[error("target peer {0} not found")]
    UnknownPeer(PeerId),
    #[error("malformed signal: {0}")]
    Malformed(String),
}
