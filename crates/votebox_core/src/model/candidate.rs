//! Candidate domain model.
//!
//! # Responsibility
//! - Define ballot options and their aggregate vote counter.
//! - Validate administrator input before persistence.
//!
//! # Invariants
//! - `ballot_number` is positive and unique per election.
//! - `vote_count` is never written by administration code; only a ballot
//!   commit increments it, by exactly one.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable candidate identifier.
pub type CandidateId = Uuid;

/// Human-facing number printed on the ballot.
pub type BallotNumber = u32;

/// One option on the ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub ballot_number: BallotNumber,
    /// Lowercased display name.
    pub name: String,
    pub vision: String,
    pub mission: String,
    pub detail: Option<String>,
    /// Public path of an already stored photo; uploads happen elsewhere.
    pub photo_path: Option<String>,
    pub vote_count: u64,
}

/// Administrator input for a new candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewCandidate {
    pub ballot_number: BallotNumber,
    pub name: String,
    pub vision: String,
    pub mission: String,
    pub detail: Option<String>,
    pub photo_path: Option<String>,
}

/// Validation failures for candidate input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateValidationError {
    ZeroBallotNumber,
    BlankField(&'static str),
}

impl Display for CandidateValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroBallotNumber => write!(f, "ballot number must be greater than zero"),
            Self::BlankField(field) => write!(f, "candidate {field} must not be blank"),
        }
    }
}

impl Error for CandidateValidationError {}

impl NewCandidate {
    /// Validates and normalizes input into a zero-vote candidate record.
    pub fn into_candidate(self) -> Result<Candidate, CandidateValidationError> {
        if self.ballot_number == 0 {
            return Err(CandidateValidationError::ZeroBallotNumber);
        }
        let name = required(&self.name, "name")?.to_lowercase();
        let vision = required(&self.vision, "vision")?.to_string();
        let mission = required(&self.mission, "mission")?.to_string();

        Ok(Candidate {
            id: Uuid::new_v4(),
            ballot_number: self.ballot_number,
            name,
            vision,
            mission,
            detail: optional(self.detail),
            photo_path: optional(self.photo_path),
            vote_count: 0,
        })
    }
}

fn required<'a>(value: &'a str, field: &'static str) -> Result<&'a str, CandidateValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CandidateValidationError::BlankField(field));
    }
    Ok(trimmed)
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|inner| inner.trim().to_string())
        .filter(|inner| !inner.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{CandidateValidationError, NewCandidate};

    fn input() -> NewCandidate {
        NewCandidate {
            ballot_number: 1,
            name: " Ayu Lestari ".to_string(),
            vision: "A greener school".to_string(),
            mission: "Plant trees".to_string(),
            detail: Some("   ".to_string()),
            photo_path: Some("/assets/1.png".to_string()),
        }
    }

    #[test]
    fn into_candidate_normalizes_fields() {
        let candidate = input().into_candidate().unwrap();
        assert_eq!(candidate.name, "ayu lestari");
        assert_eq!(candidate.detail, None);
        assert_eq!(candidate.photo_path.as_deref(), Some("/assets/1.png"));
        assert_eq!(candidate.vote_count, 0);
    }

    #[test]
    fn into_candidate_rejects_zero_number_and_blank_fields() {
        let zero = NewCandidate {
            ballot_number: 0,
            ..input()
        };
        assert_eq!(
            zero.into_candidate().unwrap_err(),
            CandidateValidationError::ZeroBallotNumber
        );

        let blank_mission = NewCandidate {
            mission: " ".to_string(),
            ..input()
        };
        assert_eq!(
            blank_mission.into_candidate().unwrap_err(),
            CandidateValidationError::BlankField("mission")
        );
    }
}
