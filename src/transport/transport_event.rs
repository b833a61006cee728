use crate::ice::IceCandidate;

/// Asynchronous notifications pushed by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    CandidateGathered(IceCandidate),
    GatheringComplete,
    /// Connectivity of a connected section dropped; it may come back.
    LinkLost { sdp_mid: String },
    LinkRestored { sdp_mid: String },
    /// Connectivity of a section is gone for good.
    LinkFailed { sdp_mid: String },
}
