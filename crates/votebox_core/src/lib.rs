//! Core of the votebox election service.
//!
//! Owns the vote-commit protocol and live tally broadcast; this crate is the
//! single source of truth for the one-voter-one-vote invariant.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, ElectionConfig};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use model::candidate::{BallotNumber, Candidate, CandidateId, NewCandidate};
pub use model::tally::{CandidateTally, TallySnapshot};
pub use model::voter::{all_class_labels, Voter, VoterId, STAFF_CLASS_LABEL};
pub use repo::voter_repo::{VotedFilter, VoterListQuery};
pub use repo::{RepoError, RepoResult};
pub use service::ballot_box::{BallotBox, ServerFault, VoteError, VoteReceipt, VoteResult};
pub use service::candidate_registry::{CandidateError, CandidateRegistry};
pub use service::election::{Election, ElectionError};
pub use service::store::{StoreError, VoteStore};
pub use service::tally_broadcaster::{
    BroadcastError, BroadcastReport, ObserverHandle, ObserverId, TallyBroadcaster,
};
pub use service::voter_registry::{RegistryError, VoterPage, VoterRegistry};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
