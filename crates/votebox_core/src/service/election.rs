//! Election facade wiring store, registries, ballot box and broadcaster.
//!
//! # Responsibility
//! - Build every component around one shared [`VoteStore`].
//! - Expose the collaborator-facing operations in one place.
//! - Tear down the observer registry when the election shuts down.

use crate::config::{ConfigError, ElectionConfig};
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::candidate::CandidateId;
use crate::model::tally::TallySnapshot;
use crate::model::voter::VoterId;
use crate::service::ballot_box::{BallotBox, VoteResult};
use crate::service::candidate_registry::CandidateRegistry;
use crate::service::store::VoteStore;
use crate::service::tally_broadcaster::{
    BroadcastError, ObserverHandle, ObserverId, TallyBroadcaster,
};
use crate::service::voter_registry::{RegistryError, VoterRegistry};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Startup failures.
#[derive(Debug)]
pub enum ElectionError {
    Config(ConfigError),
    Db(DbError),
}

impl Display for ElectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "invalid election config: {err}"),
            Self::Db(err) => write!(f, "election store unavailable: {err}"),
        }
    }
}

impl Error for ElectionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Db(err) => Some(err),
        }
    }
}

impl From<ConfigError> for ElectionError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<DbError> for ElectionError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

/// One running election.
pub struct Election {
    store: VoteStore,
    voters: VoterRegistry,
    candidates: CandidateRegistry,
    ballot_box: BallotBox,
    broadcaster: Arc<TallyBroadcaster>,
}

impl Election {
    /// Opens the configured store and builds all components.
    pub fn open(config: &ElectionConfig) -> Result<Self, ElectionError> {
        config.validate()?;
        let conn = match &config.db_path {
            Some(path) => open_db(path)?,
            None => open_db_in_memory()?,
        };
        conn.busy_timeout(config.busy_timeout()).map_err(DbError::from)?;
        info!(
            "event=election_start module=election status=ok mode={} max_commit_attempts={} observer_queue_capacity={} busy_timeout_ms={}",
            if config.db_path.is_some() { "file" } else { "memory" },
            config.max_commit_attempts,
            config.observer_queue_capacity,
            config.busy_timeout_ms
        );
        Ok(Self::with_store(VoteStore::new(conn), config))
    }

    /// In-memory election with default settings.
    pub fn open_in_memory() -> Result<Self, ElectionError> {
        Self::open(&ElectionConfig::default())
    }

    /// Builds an election around an existing store.
    pub fn with_store(store: VoteStore, config: &ElectionConfig) -> Self {
        let broadcaster = Arc::new(TallyBroadcaster::new(
            store.clone(),
            config.observer_queue_capacity,
        ));
        Self {
            voters: VoterRegistry::new(store.clone(), Arc::clone(&broadcaster)),
            candidates: CandidateRegistry::new(store.clone(), Arc::clone(&broadcaster)),
            ballot_box: BallotBox::new(
                store.clone(),
                Arc::clone(&broadcaster),
                config.max_commit_attempts,
            ),
            broadcaster,
            store,
        }
    }

    pub fn store(&self) -> &VoteStore {
        &self.store
    }

    pub fn voters(&self) -> &VoterRegistry {
        &self.voters
    }

    pub fn candidates(&self) -> &CandidateRegistry {
        &self.candidates
    }

    pub fn ballot_box(&self) -> &BallotBox {
        &self.ballot_box
    }

    pub fn broadcaster(&self) -> &Arc<TallyBroadcaster> {
        &self.broadcaster
    }

    pub fn cast_vote(&self, voter_id: VoterId, candidate_id: CandidateId) -> VoteResult {
        self.ballot_box.cast_vote(voter_id, candidate_id)
    }

    pub fn has_voted(&self, voter_id: VoterId) -> Result<bool, RegistryError> {
        self.voters.has_voted(voter_id)
    }

    pub fn subscribe(&self) -> ObserverHandle {
        self.broadcaster.subscribe()
    }

    pub fn unsubscribe(&self, handle: &ObserverHandle) {
        self.broadcaster.unsubscribe(handle)
    }

    pub fn unsubscribe_id(&self, id: ObserverId) {
        self.broadcaster.unsubscribe_id(id)
    }

    pub fn snapshot(&self) -> Result<TallySnapshot, BroadcastError> {
        self.broadcaster.snapshot()
    }

    /// Closes all live observers. Idempotent; also runs on drop.
    pub fn shutdown(&self) {
        self.broadcaster.shutdown();
    }
}

impl Drop for Election {
    fn drop(&mut self) {
        self.shutdown();
    }
}
