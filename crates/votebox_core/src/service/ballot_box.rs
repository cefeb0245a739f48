//! Ballot box: the single writer of votes.
//!
//! # Responsibility
//! - Validate and atomically commit one vote per voter.
//! - Notify the tally broadcaster exactly once per successful commit.
//!
//! # Invariants
//! - Precondition order: candidate exists, voter exists, voter not voted.
//! - All commits are linearized by the store lock; the conditional voter
//!   update inside one transaction gates the tally increment.
//! - Only transient, fully rolled-back failures are retried.
//! - Retries, and the busy waits before them, run under the store lock. An
//!   outside writer that stalls holds every store user off for up to about
//!   `max_commit_attempts` times the configured busy timeout.
//! - Broadcast failures are logged and never reach the voter.

use crate::model::candidate::CandidateId;
use crate::model::voter::VoterId;
use crate::repo::ballot_repo::{BallotRepository, CommitOutcome, SqliteBallotRepository};
use crate::repo::RepoError;
use crate::service::store::{StoreError, VoteStore};
use crate::service::tally_broadcaster::TallyBroadcaster;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default number of commit attempts for transient store conflicts.
pub const DEFAULT_MAX_COMMIT_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(10);

/// Proof of a committed vote.
///
/// Carries no candidate information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteReceipt {
    pub voter_id: VoterId,
    /// Total votes after this commit; strictly increasing across commits.
    pub sequence: u64,
}

/// Underlying cause of a `ServerError`.
#[derive(Debug)]
pub enum ServerFault {
    Store(StoreError),
    Repo(RepoError),
}

impl Display for ServerFault {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

/// Rejected or failed vote.
#[derive(Debug)]
pub enum VoteError {
    InvalidCandidate(CandidateId),
    UnknownVoter(VoterId),
    AlreadyVoted(VoterId),
    /// Store unavailable or commit failed; nothing was applied.
    ServerError(ServerFault),
}

impl VoteError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCandidate(_) => "invalid_candidate",
            Self::UnknownVoter(_) => "unknown_voter",
            Self::AlreadyVoted(_) => "already_voted",
            Self::ServerError(_) => "server_error",
        }
    }

    /// Expected outcomes that must be shown to the voter and not retried.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, Self::ServerError(_))
    }
}

impl Display for VoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCandidate(id) => write!(f, "candidate is not on the ballot: {id}"),
            Self::UnknownVoter(id) => write!(f, "voter not registered: {id}"),
            Self::AlreadyVoted(id) => write!(f, "voter has already voted: {id}"),
            Self::ServerError(fault) => write!(f, "vote could not be recorded: {fault}"),
        }
    }
}

impl Error for VoteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ServerError(ServerFault::Store(err)) => Some(err),
            Self::ServerError(ServerFault::Repo(err)) => Some(err),
            _ => None,
        }
    }
}

pub type VoteResult = Result<VoteReceipt, VoteError>;

/// Vote commit service.
pub struct BallotBox {
    store: VoteStore,
    broadcaster: Arc<TallyBroadcaster>,
    max_commit_attempts: u32,
}

impl BallotBox {
    pub fn new(
        store: VoteStore,
        broadcaster: Arc<TallyBroadcaster>,
        max_commit_attempts: u32,
    ) -> Self {
        Self {
            store,
            broadcaster,
            max_commit_attempts: max_commit_attempts.max(1),
        }
    }

    /// Casts one vote for `candidate_id` on behalf of an authenticated voter.
    ///
    /// # Contract
    /// - `Ok` means the voter flag and the candidate tally were committed
    ///   together, and live observers were sent the new tally.
    /// - Repeating the call for the same voter returns `AlreadyVoted`.
    /// - `ServerError` means no part of the vote was applied.
    pub fn cast_vote(&self, voter_id: VoterId, candidate_id: CandidateId) -> VoteResult {
        let started_at = Instant::now();
        let conn = self.store.lock().map_err(|err| {
            error!(
                "event=vote_commit module=ballot status=error voter_id={} error_code=store_unavailable error={}",
                voter_id, err
            );
            VoteError::ServerError(ServerFault::Store(err))
        })?;
        let repo = SqliteBallotRepository::new(&conn);

        let mut attempt = 1;
        let outcome = loop {
            match repo.commit_vote(voter_id, candidate_id) {
                Ok(outcome) => break outcome,
                Err(err) if err.is_transient() && attempt < self.max_commit_attempts => {
                    warn!(
                        "event=vote_commit module=ballot status=retry voter_id={} attempt={} error={}",
                        voter_id, attempt, err
                    );
                    attempt += 1;
                    std::thread::sleep(RETRY_BACKOFF * attempt);
                }
                Err(err) => {
                    error!(
                        "event=vote_commit module=ballot status=error voter_id={} attempt={} duration_ms={} error_code=commit_failed error={}",
                        voter_id,
                        attempt,
                        started_at.elapsed().as_millis(),
                        err
                    );
                    return Err(VoteError::ServerError(ServerFault::Repo(err)));
                }
            }
        };

        let rejection = match outcome {
            CommitOutcome::Committed { sequence } => {
                info!(
                    "event=vote_commit module=ballot status=ok voter_id={} sequence={} attempt={} duration_ms={}",
                    voter_id,
                    sequence,
                    attempt,
                    started_at.elapsed().as_millis()
                );
                if let Err(err) = self.broadcaster.publish_from(&conn) {
                    warn!(
                        "event=broadcast module=ballot status=error sequence={} error={}",
                        sequence, err
                    );
                }
                return Ok(VoteReceipt { voter_id, sequence });
            }
            CommitOutcome::InvalidCandidate => VoteError::InvalidCandidate(candidate_id),
            CommitOutcome::UnknownVoter => VoteError::UnknownVoter(voter_id),
            CommitOutcome::AlreadyVoted => VoteError::AlreadyVoted(voter_id),
        };

        info!(
            "event=vote_commit module=ballot status=rejected voter_id={} reason={}",
            voter_id,
            rejection.code()
        );
        Err(rejection)
    }
}
