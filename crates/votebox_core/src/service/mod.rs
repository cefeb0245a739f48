//! Election use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls under the shared store lock.
//! - Keep presentation/session layers decoupled from storage details.

pub mod ballot_box;
pub mod candidate_registry;
pub mod election;
pub mod store;
pub mod tally_broadcaster;
pub mod voter_registry;
