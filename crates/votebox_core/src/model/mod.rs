//! Election domain model.
//!
//! # Responsibility
//! - Define voter, candidate and tally records shared by repositories and
//!   services.
//! - Keep input normalization/validation next to the types it protects.
//!
//! # Invariants
//! - Every voter and candidate is identified by a stable UUID.
//! - No model type records which candidate a voter chose.

pub mod candidate;
pub mod tally;
pub mod voter;
