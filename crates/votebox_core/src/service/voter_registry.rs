//! Voter registry use-case service.
//!
//! # Responsibility
//! - Register voters and answer identity/eligibility lookups.
//! - Push a fresh tally after each registration so live turnout stays
//!   current.
//! - Serve the filtered participant roster.
//!
//! # Invariants
//! - `has_voted` reads the authoritative store on every call.
//! - No API here can change a voter's `voted` flag.

use crate::model::voter::{Voter, VoterId, VoterValidationError};
use crate::repo::voter_repo::{SqliteVoterRepository, VoterListQuery, VoterRepository};
use crate::repo::RepoError;
use crate::service::store::{StoreError, VoteStore};
use crate::service::tally_broadcaster::TallyBroadcaster;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Errors from voter registry operations.
#[derive(Debug)]
pub enum RegistryError {
    UnknownVoter(VoterId),
    InvalidInput(VoterValidationError),
    DuplicateName { name: String, class_label: String },
    Store(StoreError),
    Repo(RepoError),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownVoter(id) => write!(f, "voter not registered: {id}"),
            Self::InvalidInput(err) => write!(f, "{err}"),
            Self::DuplicateName { name, class_label } => write!(
                f,
                "name {} is already used by class {class_label}",
                name.to_uppercase()
            ),
            Self::Store(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidInput(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for RegistryError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<VoterValidationError> for RegistryError {
    fn from(value: VoterValidationError) -> Self {
        Self::InvalidInput(value)
    }
}

impl From<RepoError> for RegistryError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::VoterValidation(err) => Self::InvalidInput(err),
            RepoError::DuplicateVoterName { name, class_label } => {
                Self::DuplicateName { name, class_label }
            }
            other => Self::Repo(other),
        }
    }
}

/// One roster page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoterPage {
    pub voters: Vec<Voter>,
    /// Number of voters matching the filters across all pages.
    pub total: u64,
    /// 1-based page index derived from `offset / limit`.
    pub page: u64,
    pub total_pages: u64,
    pub applied_limit: u32,
}

/// Read/registration facade over stored voters.
pub struct VoterRegistry {
    store: VoteStore,
    broadcaster: Arc<TallyBroadcaster>,
}

impl VoterRegistry {
    pub fn new(store: VoteStore, broadcaster: Arc<TallyBroadcaster>) -> Self {
        Self { store, broadcaster }
    }

    /// Registers a new voter who has not voted yet and publishes the new
    /// registration count to live observers.
    ///
    /// # Errors
    /// - `InvalidInput` for a blank name or unknown class label.
    /// - `DuplicateName` when the normalized name is taken.
    pub fn register(&self, name: &str, class_label: &str) -> Result<Voter, RegistryError> {
        let voter = Voter::new(name, class_label)?;
        let conn = self.store.lock()?;
        if let Err(err) = SqliteVoterRepository::new(&conn).create_voter(&voter) {
            warn!(
                "event=voter_register module=registry status=rejected error={}",
                err
            );
            return Err(err.into());
        }
        info!(
            "event=voter_register module=registry status=ok voter_id={} class_label={}",
            voter.id, voter.class_label
        );

        if let Err(err) = self.broadcaster.publish_from(&conn) {
            warn!(
                "event=broadcast module=registry status=error voter_id={} error={}",
                voter.id, err
            );
        }
        Ok(voter)
    }

    /// Looks up one voter by id.
    pub fn lookup(&self, voter_id: VoterId) -> Result<Voter, RegistryError> {
        let conn = self.store.lock()?;
        SqliteVoterRepository::new(&conn)
            .get_voter(voter_id)?
            .ok_or(RegistryError::UnknownVoter(voter_id))
    }

    /// Returns the committed `voted` flag of one voter.
    pub fn has_voted(&self, voter_id: VoterId) -> Result<bool, RegistryError> {
        let conn = self.store.lock()?;
        SqliteVoterRepository::new(&conn)
            .voted_flag(voter_id)?
            .ok_or(RegistryError::UnknownVoter(voter_id))
    }

    /// Lists one filtered roster page together with paging totals.
    pub fn list(&self, query: &VoterListQuery) -> Result<VoterPage, RegistryError> {
        let conn = self.store.lock()?;
        let repo = SqliteVoterRepository::new(&conn);
        let total = repo.count_voters(query)?;
        let voters = repo.list_voters(query)?;

        let applied_limit = query.applied_limit();
        let limit = u64::from(applied_limit);
        Ok(VoterPage {
            voters,
            total,
            page: u64::from(query.offset) / limit + 1,
            total_pages: total.div_ceil(limit),
            applied_limit,
        })
    }
}
