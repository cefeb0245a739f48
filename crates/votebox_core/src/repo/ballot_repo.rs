//! Ballot commit protocol and tally reads over SQLite.
//!
//! # Responsibility
//! - Apply one vote as a single all-or-nothing unit: flip the voter's
//!   `voted` flag and increment exactly one candidate's `vote_count`.
//! - Read consistent tally snapshots from the same store.
//!
//! # Invariants
//! - Both mutations share one `BEGIN IMMEDIATE` transaction; any early
//!   return or error drops the transaction, which rolls both back.
//! - The voter transition is a conditional update (`voted = 0 -> 1`); the
//!   candidate increment only runs when that update changed exactly one row.
//! - `sum(candidates.vote_count) == count(voters.voted = 1)` after every
//!   commit and rollback.

use super::candidate_repo::candidate_exists;
use super::voter_repo::voted_flag;
use super::{parse_count, parse_uuid, RepoError, RepoResult};
use crate::model::candidate::CandidateId;
use crate::model::tally::{CandidateTally, TallySnapshot};
use crate::model::voter::VoterId;
use rusqlite::{Connection, Transaction, TransactionBehavior};

/// Result of one commit attempt that reached a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Both halves applied; `sequence` is the vote total after this commit.
    Committed { sequence: u64 },
    InvalidCandidate,
    UnknownVoter,
    AlreadyVoted,
}

/// Repository interface for the vote commit and tally reads.
pub trait BallotRepository {
    fn commit_vote(
        &self,
        voter_id: VoterId,
        candidate_id: CandidateId,
    ) -> RepoResult<CommitOutcome>;
    fn read_tally(&self) -> RepoResult<TallySnapshot>;
}

/// SQLite-backed ballot repository.
pub struct SqliteBallotRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBallotRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl BallotRepository for SqliteBallotRepository<'_> {
    fn commit_vote(
        &self,
        voter_id: VoterId,
        candidate_id: CandidateId,
    ) -> RepoResult<CommitOutcome> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        if !candidate_exists(&tx, candidate_id)? {
            return Ok(CommitOutcome::InvalidCandidate);
        }
        match voted_flag(&tx, voter_id)? {
            None => return Ok(CommitOutcome::UnknownVoter),
            Some(true) => return Ok(CommitOutcome::AlreadyVoted),
            Some(false) => {}
        }

        let flipped = tx.execute(
            "UPDATE voters
             SET voted = 1
             WHERE uuid = ?1
               AND voted = 0;",
            [voter_id.to_string()],
        )?;
        if flipped == 0 {
            return Ok(CommitOutcome::AlreadyVoted);
        }

        let incremented = tx.execute(
            "UPDATE candidates
             SET vote_count = vote_count + 1
             WHERE uuid = ?1;",
            [candidate_id.to_string()],
        )?;
        if incremented != 1 {
            return Err(RepoError::InvalidData(format!(
                "tally increment for candidate {candidate_id} changed {incremented} rows"
            )));
        }

        let sequence = total_votes(&tx)?;
        tx.commit()?;
        Ok(CommitOutcome::Committed { sequence })
    }

    fn read_tally(&self) -> RepoResult<TallySnapshot> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)?;

        let mut candidates = Vec::new();
        {
            let mut stmt = tx.prepare(
                "SELECT uuid, ballot_number, name, vote_count
                 FROM candidates
                 ORDER BY ballot_number ASC;",
            )?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let uuid_text: String = row.get(0)?;
                candidates.push(CandidateTally {
                    candidate_id: parse_uuid(&uuid_text, "candidates.uuid")?,
                    ballot_number: row.get(1)?,
                    name: row.get(2)?,
                    vote_count: parse_count(row.get(3)?, "candidates.vote_count")?,
                });
            }
        }

        let (voters_voted, voters_registered): (i64, i64) = tx.query_row(
            "SELECT COALESCE(SUM(voted), 0), COUNT(*) FROM voters;",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        tx.commit()?;

        let total_votes = candidates.iter().map(|tally| tally.vote_count).sum();
        Ok(TallySnapshot {
            sequence: total_votes,
            candidates,
            total_votes,
            voters_voted: parse_count(voters_voted, "SUM(voters.voted)")?,
            voters_registered: parse_count(voters_registered, "COUNT(voters)")?,
        })
    }
}

fn total_votes(conn: &Connection) -> RepoResult<u64> {
    let total: i64 = conn.query_row(
        "SELECT COALESCE(SUM(vote_count), 0) FROM candidates;",
        [],
        |row| row.get(0),
    )?;
    parse_count(total, "SUM(candidates.vote_count)")
}
