//! Candidate administration use-case service.
//!
//! # Responsibility
//! - Register ballot options before (or during) voting.
//! - Read candidates in ballot order.
//!
//! # Invariants
//! - Never touches `vote_count`.
//! - A successful registration publishes a fresh tally so live views pick
//!   up the new candidate.

use crate::model::candidate::{
    BallotNumber, Candidate, CandidateId, CandidateValidationError, NewCandidate,
};
use crate::repo::candidate_repo::{CandidateRepository, SqliteCandidateRepository};
use crate::repo::RepoError;
use crate::service::store::{StoreError, VoteStore};
use crate::service::tally_broadcaster::TallyBroadcaster;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Errors from candidate administration.
#[derive(Debug)]
pub enum CandidateError {
    InvalidInput(CandidateValidationError),
    DuplicateBallotNumber(BallotNumber),
    NotFound(CandidateId),
    Store(StoreError),
    Repo(RepoError),
}

impl Display for CandidateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(err) => write!(f, "{err}"),
            Self::DuplicateBallotNumber(number) => {
                write!(f, "ballot number {number} is already used")
            }
            Self::NotFound(id) => write!(f, "candidate not found: {id}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CandidateError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidInput(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CandidateValidationError> for CandidateError {
    fn from(value: CandidateValidationError) -> Self {
        Self::InvalidInput(value)
    }
}

impl From<StoreError> for CandidateError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<RepoError> for CandidateError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::CandidateValidation(err) => Self::InvalidInput(err),
            RepoError::DuplicateBallotNumber(number) => Self::DuplicateBallotNumber(number),
            other => Self::Repo(other),
        }
    }
}

/// Administrator-facing candidate service.
pub struct CandidateRegistry {
    store: VoteStore,
    broadcaster: Arc<TallyBroadcaster>,
}

impl CandidateRegistry {
    pub fn new(store: VoteStore, broadcaster: Arc<TallyBroadcaster>) -> Self {
        Self { store, broadcaster }
    }

    /// Adds a candidate with zero votes.
    ///
    /// # Errors
    /// - `InvalidInput` for a zero ballot number or blank required field.
    /// - `DuplicateBallotNumber` when the number is taken.
    pub fn register(&self, input: NewCandidate) -> Result<Candidate, CandidateError> {
        let candidate = input.into_candidate()?;
        let conn = self.store.lock()?;
        if let Err(err) = SqliteCandidateRepository::new(&conn).create_candidate(&candidate) {
            warn!(
                "event=candidate_register module=candidates status=rejected ballot_number={} error={}",
                candidate.ballot_number, err
            );
            return Err(err.into());
        }
        info!(
            "event=candidate_register module=candidates status=ok candidate_id={} ballot_number={}",
            candidate.id, candidate.ballot_number
        );

        if let Err(err) = self.broadcaster.publish_from(&conn) {
            warn!(
                "event=broadcast module=candidates status=error candidate_id={} error={}",
                candidate.id, err
            );
        }
        Ok(candidate)
    }

    /// Loads one candidate, including its current tally.
    pub fn get(&self, candidate_id: CandidateId) -> Result<Candidate, CandidateError> {
        let conn = self.store.lock()?;
        SqliteCandidateRepository::new(&conn)
            .get_candidate(candidate_id)?
            .ok_or(CandidateError::NotFound(candidate_id))
    }

    /// Lists all candidates by ballot number.
    pub fn list(&self) -> Result<Vec<Candidate>, CandidateError> {
        let conn = self.store.lock()?;
        Ok(SqliteCandidateRepository::new(&conn).list_candidates()?)
    }
}
