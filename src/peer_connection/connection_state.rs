use std::fmt;

/// Aggregate connectivity of a peer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PeerConnectionState {
    #[default]
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl PeerConnectionState {
    /// Whether `self -> next` is legal. `Failed` and `Disconnected` only go back
    /// to `Connecting` after an ICE restart.
    pub const fn can_transition_to(self, next: Self, ice_restart: bool) -> bool {
        use PeerConnectionState::{Closed, Connected, Connecting, Disconnected, Failed, New};
        match (self, next) {
            (Closed, _) => false,
            (_, Closed)
            | (New, Connecting)
            | (Connecting, Connected | Failed)
            | (Connected, Disconnected | Failed)
            | (Disconnected, Connected | Failed) => true,
            (Failed | Disconnected, Connecting) => ice_restart,
            _ => false,
        }
    }
}

impl fmt::Display for PeerConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Failed => "failed",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Progress of local candidate gathering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IceGatheringState {
    #[default]
    New,
    Gathering,
    Complete,
}

impl fmt::Display for IceGatheringState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::Gathering => "gathering",
            Self::Complete => "complete",
        };
        f.write_str(s)
    }
}
