use crate::ice::{ice_candidate::IceCandidate, ice_role::IceRole};

/// Check state of a candidate pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidatePairState {
    Waiting,
    InProgress,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidatePair {
    pub local: IceCandidate,
    pub remote: IceCandidate,
    /// Media section both candidates belong to.
    pub sdp_mid: String,
    pub priority: u64,
    pub state: CandidatePairState,
}

impl CandidatePair {
    pub fn new(local: IceCandidate, remote: IceCandidate, sdp_mid: String, priority: u64) -> Self {
        Self {
            local,
            remote,
            sdp_mid,
            priority,
            state: CandidatePairState::Waiting,
        }
    }

    /// RFC 8445 §6.1.2.3: `2^32*MIN(G,D) + 2*MAX(G,D) + (G>D?1:0)`, where G is
    /// the controlling agent's candidate priority and D the controlled one's.
    pub const fn pair_priority(local: u32, remote: u32, role: IceRole) -> u64 {
        let (g, d) = match role {
            IceRole::Controlling => (local as u64, remote as u64),
            IceRole::Controlled => (remote as u64, local as u64),
        };
        let (min, max) = if g < d { (g, d) } else { (d, g) };
        (min << 32)
            .saturating_add(2 * max)
            .saturating_add(if g > d { 1 } else { 0 })
    }
}
