//! ICE Candidate Coordinator: candidate logs, buffering, pairing and
//! per-section connectivity.

pub mod candidate_line;
pub mod candidate_pair;
pub mod candidate_type;
pub mod coordinator;
pub mod ice_candidate;
pub mod ice_role;

pub use candidate_line::CandidateLine;
pub use candidate_pair::{CandidatePair, CandidatePairState};
pub use candidate_type::CandidateType;
pub use coordinator::{
    FlushReport, IceCoordinator, MAX_PAIR_LIMIT, PairAttempt, PairOutcome, RemoteCandidateOutcome,
};
pub use ice_candidate::IceCandidate;
pub use ice_role::IceRole;
