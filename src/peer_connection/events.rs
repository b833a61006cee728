use crate::{
    ice::IceCandidate,
    peer_connection::{
        connection_state::{IceGatheringState, PeerConnectionState},
        signaling_state::SignalingState,
    },
    rtc_error::RtcError,
};

/// Notifications emitted by a peer connection, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerConnectionEvent {
    SignalingStateChanged(SignalingState),
    ConnectionStateChanged(PeerConnectionState),
    IceGatheringStateChanged(IceGatheringState),
    /// A local candidate was gathered; send it to the remote peer.
    LocalCandidate(IceCandidate),
    /// No more local candidates will follow.
    EndOfLocalCandidates,
    /// A media section got its first working candidate pair.
    SectionConnected { sdp_mid: String },
    /// A buffered remote candidate failed validation once the remote
    /// description arrived and was dropped.
    CandidateRejected {
        candidate: IceCandidate,
        error: RtcError,
    },
    /// The track set changed; a new offer is needed to signal it.
    NegotiationNeeded,
    /// A background transport operation failed.
    Error(String),
}
