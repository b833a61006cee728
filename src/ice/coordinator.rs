use std::{collections::VecDeque, sync::Arc};

use crate::{
    ice::{
        candidate_pair::{CandidatePair, CandidatePairState},
        ice_candidate::IceCandidate,
        ice_role::IceRole,
    },
    log::LogSink,
    rtc_error::RtcError,
    sink_debug, sink_warn,
};

/// Reasonable upper bound to avoid combinatorial explosion.
pub const MAX_PAIR_LIMIT: usize = 100;

pub type PairId = usize;

/// A pair handed out for a connectivity attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairAttempt {
    /// Pairing generation the attempt belongs to; bumped by ICE restarts.
    pub generation: u64,
    pub pair_id: PairId,
    pub sdp_mid: String,
    pub local: IceCandidate,
    pub remote: IceCandidate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCandidateOutcome {
    /// No remote description yet; applied when one is set.
    Buffered,
    /// Identical candidate already known.
    Duplicate,
    Added,
}

/// Buffered candidates processed when a remote description is set.
#[derive(Debug, Default)]
pub struct FlushReport {
    pub applied: Vec<IceCandidate>,
    pub rejected: Vec<(IceCandidate, RtcError)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairOutcome {
    /// First success of its section.
    SectionConnected(String),
    /// Succeeded but the section was already connected.
    Redundant,
    Failed,
    /// Result from before an ICE restart or close.
    Stale,
}

/// ICE Candidate Coordinator.
///
/// Keeps the ordered local and remote candidate logs, buffers remote
/// candidates that arrive before a remote description, forms candidate pairs
/// per media section and tracks which sections are connected.
pub struct IceCoordinator {
    role: IceRole,
    max_pairs: usize,
    local: Vec<IceCandidate>,
    remote: Vec<IceCandidate>,
    buffered: VecDeque<IceCandidate>,
    remote_mids: Option<Vec<String>>,
    pairs: Vec<CandidatePair>,
    connected: Vec<String>,
    lost: Vec<String>,
    generation: u64,
    limit_reached: bool,
    log: Arc<dyn LogSink>,
}

impl IceCoordinator {
    pub fn new(role: IceRole, max_pairs: usize, log: Arc<dyn LogSink>) -> Self {
        Self {
            role,
            max_pairs,
            local: Vec::new(),
            remote: Vec::new(),
            buffered: VecDeque::new(),
            remote_mids: None,
            pairs: Vec::new(),
            connected: Vec::new(),
            lost: Vec::new(),
            generation: 0,
            limit_reached: false,
            log,
        }
    }

    /// Appends to the local log and pairs it with known remote candidates.
    pub fn add_local(&mut self, candidate: IceCandidate) {
        let new: Vec<CandidatePair> = self
            .remote
            .iter()
            .filter_map(|remote| self.make_pair(&candidate, remote))
            .collect();
        self.local.push(candidate);
        self.push_pairs(new);
    }

    /// Buffers, ignores or validates and pairs a remote candidate.
    ///
    /// # Errors
    /// `RtcError::UnknownMediaSection` when its mid / m-line index does not
    /// name a section of the remote description.
    pub fn add_remote(
        &mut self,
        candidate: IceCandidate,
    ) -> Result<RemoteCandidateOutcome, RtcError> {
        let Some(mids) = &self.remote_mids else {
            if self.buffered.contains(&candidate) {
                return Ok(RemoteCandidateOutcome::Duplicate);
            }
            self.buffered.push_back(candidate);
            return Ok(RemoteCandidateOutcome::Buffered);
        };
        let candidate = resolve(candidate, mids)?;
        Ok(self.ingest_remote(candidate))
    }

    /// Records the mids of the remote description and applies the buffered
    /// candidates in arrival order. Invalid ones are dropped and reported.
    pub fn set_remote_sections(&mut self, mids: Vec<String>) -> FlushReport {
        let mut report = FlushReport::default();
        while let Some(candidate) = self.buffered.pop_front() {
            match resolve(candidate.clone(), &mids) {
                Ok(c) => {
                    if self.ingest_remote(c.clone()) == RemoteCandidateOutcome::Added {
                        report.applied.push(c);
                    }
                }
                Err(e) => report.rejected.push((candidate, e)),
            }
        }
        self.remote_mids = Some(mids);
        report
    }

    /// Forgets the remote sections; later remote candidates are buffered again.
    pub fn clear_remote_sections(&mut self) {
        self.remote_mids = None;
    }

    pub const fn has_remote_sections(&self) -> bool {
        self.remote_mids.is_some()
    }

    /// Waiting pairs of sections not yet connected, highest priority first.
    /// They are marked in progress.
    pub fn take_attempts(&mut self) -> Vec<PairAttempt> {
        let mut attempts: Vec<(u64, PairAttempt)> = Vec::new();
        for (pair_id, pair) in self.pairs.iter_mut().enumerate() {
            if pair.state != CandidatePairState::Waiting || self.connected.contains(&pair.sdp_mid)
            {
                continue;
            }
            pair.state = CandidatePairState::InProgress;
            attempts.push((
                pair.priority,
                PairAttempt {
                    generation: self.generation,
                    pair_id,
                    sdp_mid: pair.sdp_mid.clone(),
                    local: pair.local.clone(),
                    remote: pair.remote.clone(),
                },
            ));
        }
        attempts.sort_by(|a, b| b.0.cmp(&a.0));
        attempts.into_iter().map(|(_, a)| a).collect()
    }

    /// Whether the section of an attempt got connected in the meantime.
    pub fn is_section_connected(&self, sdp_mid: &str) -> bool {
        self.connected.iter().any(|m| m == sdp_mid)
    }

    /// Puts an attempt that was skipped back to waiting.
    pub fn release(&mut self, attempt: &PairAttempt) {
        if attempt.generation != self.generation {
            return;
        }
        if let Some(pair) = self.pairs.get_mut(attempt.pair_id) {
            if pair.state == CandidatePairState::InProgress {
                pair.state = CandidatePairState::Waiting;
            }
        }
    }

    /// Stores the result of a connectivity attempt.
    pub fn record_result(&mut self, attempt: &PairAttempt, succeeded: bool) -> PairOutcome {
        if attempt.generation != self.generation {
            return PairOutcome::Stale;
        }
        let Some(pair) = self.pairs.get_mut(attempt.pair_id) else {
            return PairOutcome::Stale;
        };
        if !succeeded {
            pair.state = CandidatePairState::Failed;
            return PairOutcome::Failed;
        }
        pair.state = CandidatePairState::Succeeded;
        if self.is_section_connected(&attempt.sdp_mid) {
            return PairOutcome::Redundant;
        }
        self.connected.push(attempt.sdp_mid.clone());
        PairOutcome::SectionConnected(attempt.sdp_mid.clone())
    }

    /// Every pair failed and no section connected.
    pub fn exhausted(&self) -> bool {
        !self.pairs.is_empty()
            && self.connected.is_empty()
            && self
                .pairs
                .iter()
                .all(|p| p.state == CandidatePairState::Failed)
    }

    /// Marks a connected section as lost. Returns whether it was connected.
    pub fn link_lost(&mut self, sdp_mid: &str) -> bool {
        let Some(pos) = self.connected.iter().position(|m| m == sdp_mid) else {
            return false;
        };
        let mid = self.connected.remove(pos);
        self.lost.push(mid);
        true
    }

    /// Restores a section lost earlier. Returns whether it was lost.
    pub fn link_restored(&mut self, sdp_mid: &str) -> bool {
        let Some(pos) = self.lost.iter().position(|m| m == sdp_mid) else {
            return false;
        };
        let mid = self.lost.remove(pos);
        self.connected.push(mid);
        true
    }

    /// Drops a section for good. Returns whether it was connected or lost.
    pub fn link_failed(&mut self, sdp_mid: &str) -> bool {
        let before = self.connected.len() + self.lost.len();
        self.connected.retain(|m| m != sdp_mid);
        self.lost.retain(|m| m != sdp_mid);
        before != self.connected.len() + self.lost.len()
    }

    pub fn connected_sections(&self) -> &[String] {
        &self.connected
    }

    pub fn has_lost_sections(&self) -> bool {
        !self.lost.is_empty()
    }

    /// ICE restart: pairs and connectivity are dropped and re-formed from the
    /// candidates that survive. `local`/`remote` select which log is cleared.
    pub fn restart(&mut self, local: bool, remote: bool) {
        self.generation += 1;
        self.pairs.clear();
        self.connected.clear();
        self.lost.clear();
        self.limit_reached = false;
        if local {
            self.local.clear();
        }
        if remote {
            self.remote.clear();
        }
        let new: Vec<CandidatePair> = self
            .local
            .iter()
            .flat_map(|l| self.remote.iter().map(move |r| (l, r)))
            .filter_map(|(l, r)| self.make_pair(l, r))
            .collect();
        self.push_pairs(new);
    }

    /// Discards everything, buffered candidates included.
    pub fn clear(&mut self) {
        self.generation += 1;
        self.local.clear();
        self.remote.clear();
        self.buffered.clear();
        self.remote_mids = None;
        self.pairs.clear();
        self.connected.clear();
        self.lost.clear();
    }

    pub fn local_candidates(&self) -> &[IceCandidate] {
        &self.local
    }

    pub fn remote_candidates(&self) -> &[IceCandidate] {
        &self.remote
    }

    pub fn buffered_len(&self) -> usize {
        self.buffered.len()
    }

    pub fn pairs(&self) -> &[CandidatePair] {
        &self.pairs
    }

    pub const fn pair_limit_reached(&self) -> bool {
        self.limit_reached
    }

    fn ingest_remote(&mut self, candidate: IceCandidate) -> RemoteCandidateOutcome {
        if self.remote.contains(&candidate) {
            sink_debug!(
                self.log,
                "[ICE] duplicate remote candidate ignored: {}",
                candidate.candidate()
            );
            return RemoteCandidateOutcome::Duplicate;
        }
        let new: Vec<CandidatePair> = self
            .local
            .iter()
            .filter_map(|local| self.make_pair(local, &candidate))
            .collect();
        self.remote.push(candidate);
        self.push_pairs(new);
        RemoteCandidateOutcome::Added
    }

    fn make_pair(&self, local: &IceCandidate, remote: &IceCandidate) -> Option<CandidatePair> {
        if local.sdp_mid() != remote.sdp_mid() {
            return None;
        }
        let priority = match (local.parsed(), remote.parsed()) {
            (Some(l), Some(r)) => {
                if !l.compatible_with(&r) {
                    sink_debug!(
                        self.log,
                        "[ICE] incompatible pair skipped (local={}, remote={})",
                        l.address,
                        r.address
                    );
                    return None;
                }
                CandidatePair::pair_priority(l.priority, r.priority, self.role)
            }
            // opaque connectivity strings
            _ => 0,
        };
        Some(CandidatePair::new(
            local.clone(),
            remote.clone(),
            local.sdp_mid().to_owned(),
            priority,
        ))
    }

    fn push_pairs(&mut self, new: Vec<CandidatePair>) {
        for pair in new {
            if self.pairs.len() >= self.max_pairs {
                if !self.limit_reached {
                    sink_warn!(
                        self.log,
                        "[ICE] maximum candidate pair limit reached ({})",
                        self.max_pairs
                    );
                }
                self.limit_reached = true;
                return;
            }
            self.pairs.push(pair);
        }
    }
}

/// Validates a remote candidate against the remote section mids and fills in
/// a missing mid from its m-line index.
fn resolve(candidate: IceCandidate, mids: &[String]) -> Result<IceCandidate, RtcError> {
    let section = usize::try_from(candidate.sdp_mline_index())
        .ok()
        .and_then(|i| mids.get(i));
    match section {
        Some(mid) if candidate.sdp_mid().is_empty() => Ok(candidate.with_mid(mid)),
        Some(mid) if candidate.sdp_mid() == mid => Ok(candidate),
        _ => Err(RtcError::UnknownMediaSection {
            sdp_mid: candidate.sdp_mid().to_owned(),
            sdp_mline_index: candidate.sdp_mline_index(),
            sections: mids.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::log::NoopLogSink;

    fn coordinator() -> IceCoordinator {
        IceCoordinator::new(IceRole::Controlling, MAX_PAIR_LIMIT, Arc::new(NoopLogSink))
    }

    fn host(ip: &str, port: u16, mid: &str, index: u32) -> IceCandidate {
        IceCandidate::new(
            format!("candidate:1 1 udp 2130706431 {ip} {port} typ host"),
            mid,
            index,
        )
    }

    fn two_sections() -> Vec<String> {
        vec!["0".into(), "1".into()]
    }

    #[test]
    fn remote_candidates_are_buffered_until_sections_are_known() {
        let mut ice = coordinator();
        let c = host("10.0.0.2", 5000, "0", 0);
        assert_eq!(ice.add_remote(c.clone()).unwrap(), RemoteCandidateOutcome::Buffered);
        assert!(ice.remote_candidates().is_empty());
        assert_eq!(ice.buffered_len(), 1);

        let report = ice.set_remote_sections(two_sections());
        assert_eq!(report.applied, vec![c.clone()]);
        assert!(report.rejected.is_empty());
        assert_eq!(ice.remote_candidates(), [c]);
        assert_eq!(ice.buffered_len(), 0);
    }

    #[test]
    fn invalid_buffered_candidates_are_rejected_on_flush() {
        let mut ice = coordinator();
        ice.add_remote(host("10.0.0.2", 5000, "0", 0)).unwrap();
        ice.add_remote(host("10.0.0.3", 5000, "9", 7)).unwrap();
        let report = ice.set_remote_sections(two_sections());
        assert_eq!(report.applied.len(), 1);
        assert_eq!(report.rejected.len(), 1);
        assert!(matches!(
            report.rejected[0].1,
            RtcError::UnknownMediaSection { sdp_mline_index: 7, sections: 2, .. }
        ));
    }

    #[test]
    fn mline_index_out_of_range_is_unknown_section() {
        let mut ice = coordinator();
        ice.set_remote_sections(two_sections());
        let err = ice.add_remote(host("10.0.0.2", 1, "0", 7)).unwrap_err();
        assert_eq!(
            err,
            RtcError::UnknownMediaSection {
                sdp_mid: "0".into(),
                sdp_mline_index: 7,
                sections: 2
            }
        );
        assert!(ice.add_remote(host("10.0.0.2", 1, "1", 0)).is_err(), "mid/index mismatch");
        assert!(ice.remote_candidates().is_empty());
    }

    #[test]
    fn missing_mid_is_taken_from_index() {
        let mut ice = coordinator();
        ice.set_remote_sections(two_sections());
        ice.add_remote(host("10.0.0.2", 1, "", 1)).unwrap();
        assert_eq!(ice.remote_candidates()[0].sdp_mid(), "1");
    }

    #[test]
    fn duplicate_remote_candidates_are_ignored() {
        let mut ice = coordinator();
        ice.set_remote_sections(two_sections());
        let c = host("10.0.0.2", 1, "0", 0);
        assert_eq!(ice.add_remote(c.clone()).unwrap(), RemoteCandidateOutcome::Added);
        assert_eq!(ice.add_remote(c).unwrap(), RemoteCandidateOutcome::Duplicate);
        assert_eq!(ice.remote_candidates().len(), 1);
    }

    #[test]
    fn local_log_keeps_duplicates_in_order() {
        let mut ice = coordinator();
        let c = host("10.0.0.1", 1, "0", 0);
        ice.add_local(c.clone());
        ice.add_local(c);
        assert_eq!(ice.local_candidates().len(), 2);
    }

    #[test]
    fn pairs_only_form_within_a_section_and_compatible_families() {
        let mut ice = coordinator();
        ice.set_remote_sections(two_sections());
        ice.add_local(host("10.0.0.1", 1, "0", 0));
        ice.add_local(host("::1", 1, "0", 0));
        ice.add_local(host("10.0.0.1", 2, "1", 1));
        ice.add_remote(host("10.0.0.2", 1, "0", 0)).unwrap();

        assert_eq!(ice.pairs().len(), 1);
        assert_eq!(ice.pairs()[0].sdp_mid, "0");
        assert!(ice.pairs()[0].priority > 0);
    }

    #[test]
    fn opaque_candidates_pair_with_zero_priority() {
        let mut ice = coordinator();
        ice.set_remote_sections(two_sections());
        ice.add_local(IceCandidate::new("local-token", "0", 0));
        ice.add_remote(IceCandidate::new("remote-token", "0", 0)).unwrap();
        assert_eq!(ice.pairs().len(), 1);
        assert_eq!(ice.pairs()[0].priority, 0);
    }

    #[test]
    fn attempts_come_highest_priority_first() {
        let mut ice = coordinator();
        ice.set_remote_sections(two_sections());
        ice.add_local(IceCandidate::new(
            "candidate:1 1 udp 100 10.0.0.1 1 typ relay",
            "0",
            0,
        ));
        ice.add_local(host("10.0.0.1", 2, "0", 0));
        ice.add_remote(host("10.0.0.2", 1, "0", 0)).unwrap();

        let attempts = ice.take_attempts();
        assert_eq!(attempts.len(), 2);
        assert!(attempts[0].local.candidate().contains("typ host"));
        assert!(ice.take_attempts().is_empty(), "already in progress");
    }

    #[test]
    fn first_success_connects_section_once() {
        let mut ice = coordinator();
        ice.set_remote_sections(two_sections());
        ice.add_local(host("10.0.0.1", 1, "0", 0));
        ice.add_local(host("10.0.0.1", 2, "0", 0));
        ice.add_remote(host("10.0.0.2", 1, "0", 0)).unwrap();

        let attempts = ice.take_attempts();
        assert_eq!(
            ice.record_result(&attempts[0], true),
            PairOutcome::SectionConnected("0".into())
        );
        assert_eq!(ice.record_result(&attempts[1], true), PairOutcome::Redundant);
        assert_eq!(ice.connected_sections(), ["0".to_owned()]);

        // connected sections are not evaluated again
        ice.add_remote(host("10.0.0.3", 1, "0", 0)).unwrap();
        assert!(ice.take_attempts().is_empty());
    }

    #[test]
    fn exhausted_when_every_pair_failed() {
        let mut ice = coordinator();
        ice.set_remote_sections(two_sections());
        ice.add_local(host("10.0.0.1", 1, "0", 0));
        ice.add_remote(host("10.0.0.2", 1, "0", 0)).unwrap();
        assert!(!ice.exhausted());

        let attempts = ice.take_attempts();
        assert_eq!(ice.record_result(&attempts[0], false), PairOutcome::Failed);
        assert!(ice.exhausted());
    }

    #[test]
    fn restart_makes_old_results_stale() {
        let mut ice = coordinator();
        ice.set_remote_sections(two_sections());
        ice.add_local(host("10.0.0.1", 1, "0", 0));
        ice.add_remote(host("10.0.0.2", 1, "0", 0)).unwrap();
        let attempts = ice.take_attempts();

        ice.restart(true, false);
        assert!(ice.local_candidates().is_empty());
        assert!(ice.pairs().is_empty());
        assert_eq!(ice.record_result(&attempts[0], true), PairOutcome::Stale);
        assert!(ice.connected_sections().is_empty());
    }

    #[test]
    fn lost_and_restored_links() {
        let mut ice = coordinator();
        ice.set_remote_sections(two_sections());
        ice.add_local(host("10.0.0.1", 1, "0", 0));
        ice.add_remote(host("10.0.0.2", 1, "0", 0)).unwrap();
        let attempts = ice.take_attempts();
        ice.record_result(&attempts[0], true);

        assert!(ice.link_lost("0"));
        assert!(ice.connected_sections().is_empty());
        assert!(!ice.link_lost("0"));
        assert!(ice.link_restored("0"));
        assert_eq!(ice.connected_sections(), ["0".to_owned()]);
        assert!(ice.link_failed("0"));
        assert!(!ice.link_restored("0"));
    }

    #[test]
    fn pair_count_is_capped() {
        let mut ice = IceCoordinator::new(IceRole::Controlled, 3, Arc::new(NoopLogSink));
        ice.set_remote_sections(two_sections());
        for port in 1..=4 {
            ice.add_local(host("10.0.0.1", port, "0", 0));
        }
        ice.add_remote(host("10.0.0.2", 1, "0", 0)).unwrap();
        assert_eq!(ice.pairs().len(), 3);
        assert!(ice.pair_limit_reached());
    }

    #[test]
    fn clear_discards_buffered_candidates() {
        let mut ice = coordinator();
        ice.add_remote(host("10.0.0.2", 1, "0", 0)).unwrap();
        ice.clear();
        assert_eq!(ice.buffered_len(), 0);
        assert!(!ice.has_remote_sections());
    }
}
