//! Tally snapshot read model.
//!
//! # Invariants
//! - `candidates` is ordered by `ballot_number` ascending.
//! - `total_votes == sum(candidates[*].vote_count) == voters_voted` for
//!   every snapshot read from a consistent store.
//! - `sequence` equals `total_votes`: each commit adds exactly one vote, so
//!   the vote total doubles as a monotone commit sequence.
//! - `sequence` only advances on vote commits. Snapshots published after a
//!   candidate or voter registration repeat the previous sequence, so
//!   observers must not drop a snapshot just because its sequence is old.

use crate::model::candidate::{BallotNumber, CandidateId};
use serde::Serialize;

/// Current vote count of one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateTally {
    pub candidate_id: CandidateId,
    pub ballot_number: BallotNumber,
    pub name: String,
    pub vote_count: u64,
}

/// Point-in-time view of all candidates' counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TallySnapshot {
    /// Commits applied so far; unchanged by registrations.
    pub sequence: u64,
    pub candidates: Vec<CandidateTally>,
    pub total_votes: u64,
    pub voters_voted: u64,
    pub voters_registered: u64,
}

impl TallySnapshot {
    /// Returns the tally for one candidate, if it is on the ballot.
    pub fn count_for(&self, candidate_id: CandidateId) -> Option<u64> {
        self.candidates
            .iter()
            .find(|tally| tally.candidate_id == candidate_id)
            .map(|tally| tally.vote_count)
    }

    /// Candidates ordered by vote count (descending), ties by ballot number.
    pub fn ranked(&self) -> Vec<&CandidateTally> {
        let mut ranked: Vec<&CandidateTally> = self.candidates.iter().collect();
        ranked.sort_by(|left, right| {
            right
                .vote_count
                .cmp(&left.vote_count)
                .then(left.ballot_number.cmp(&right.ballot_number))
        });
        ranked
    }

    /// Turnout in basis points (0..=10000); zero when nobody is registered.
    pub fn turnout_bps(&self) -> u32 {
        if self.voters_registered == 0 {
            return 0;
        }
        (self.voters_voted * 10_000 / self.voters_registered) as u32
    }

    /// Returns whether the aggregate counters agree with each other.
    pub fn is_consistent(&self) -> bool {
        let sum: u64 = self.candidates.iter().map(|tally| tally.vote_count).sum();
        sum == self.total_votes && self.total_votes == self.voters_voted
    }
}

#[cfg(test)]
mod tests {
    use super::{CandidateTally, TallySnapshot};
    use uuid::Uuid;

    fn tally(ballot_number: u32, vote_count: u64) -> CandidateTally {
        CandidateTally {
            candidate_id: Uuid::new_v4(),
            ballot_number,
            name: format!("candidate {ballot_number}"),
            vote_count,
        }
    }

    fn snapshot(candidates: Vec<CandidateTally>, voters_registered: u64) -> TallySnapshot {
        let total: u64 = candidates.iter().map(|tally| tally.vote_count).sum();
        TallySnapshot {
            sequence: total,
            candidates,
            total_votes: total,
            voters_voted: total,
            voters_registered,
        }
    }

    #[test]
    fn ranked_orders_by_votes_then_ballot_number() {
        let current = snapshot(vec![tally(1, 3), tally(2, 5), tally(3, 3)], 20);
        let order: Vec<u32> = current
            .ranked()
            .into_iter()
            .map(|tally| tally.ballot_number)
            .collect();
        assert_eq!(order, vec![2, 1, 3]);
    }

    #[test]
    fn turnout_and_consistency() {
        let current = snapshot(vec![tally(1, 1), tally(2, 2)], 4);
        assert_eq!(current.turnout_bps(), 7_500);
        assert!(current.is_consistent());

        let empty = snapshot(vec![], 0);
        assert_eq!(empty.turnout_bps(), 0);

        let mut broken = current.clone();
        broken.voters_voted += 1;
        assert!(!broken.is_consistent());
    }
}
