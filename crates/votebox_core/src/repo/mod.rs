//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts over voters,
//!   candidates and ballot commits.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository writes validate input before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Only `ballot_repo` writes `voters.voted` and `candidates.vote_count`.

use crate::db::DbError;
use crate::model::candidate::{BallotNumber, CandidateValidationError};
use crate::model::voter::VoterValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod ballot_repo;
pub mod candidate_repo;
pub mod voter_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by voter, candidate and ballot persistence.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    VoterValidation(VoterValidationError),
    CandidateValidation(CandidateValidationError),
    /// Name already registered; carries the existing holder's class label.
    DuplicateVoterName {
        name: String,
        class_label: String,
    },
    DuplicateBallotNumber(BallotNumber),
    /// Persisted rows violate a storage invariant.
    InvalidData(String),
}

impl RepoError {
    /// Returns whether retrying the failed unit may succeed without risk of
    /// double application.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Db(err) if err.is_transient())
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::VoterValidation(err) => write!(f, "{err}"),
            Self::CandidateValidation(err) => write!(f, "{err}"),
            Self::DuplicateVoterName { name, class_label } => write!(
                f,
                "voter name `{name}` is already registered by class {class_label}"
            ),
            Self::DuplicateBallotNumber(number) => {
                write!(f, "ballot number {number} is already in use")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted election data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::VoterValidation(err) => Some(err),
            Self::CandidateValidation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<VoterValidationError> for RepoError {
    fn from(value: VoterValidationError) -> Self {
        Self::VoterValidation(value)
    }
}

impl From<CandidateValidationError> for RepoError {
    fn from(value: CandidateValidationError) -> Self {
        Self::CandidateValidation(value)
    }
}

fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

fn parse_flag(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid flag value `{other}` in {column}"
        ))),
    }
}

fn parse_count(value: i64, column: &str) -> RepoResult<u64> {
    u64::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("negative count `{value}` in {column}")))
}
