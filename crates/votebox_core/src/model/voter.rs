//! Voter domain model.
//!
//! # Responsibility
//! - Define the registered-participant record and its one-shot `voted` flag.
//! - Normalize names and validate class/group labels at registration.
//!
//! # Invariants
//! - `voted` only ever transitions `false -> true`, through a ballot commit.
//! - `name` is stored trimmed and lowercase; it is unique per election.
//! - `class_label` is one of [`all_class_labels`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable voter identifier supplied by the authentication layer.
pub type VoterId = Uuid;

/// Label used for staff voters who are not in a school class.
pub const STAFF_CLASS_LABEL: &str = "Guru/Karyawan";

const GRADE_LEVELS: [&str; 3] = ["X", "XI", "XII"];
const CLASSES_PER_GRADE: u8 = 9;

static CLASS_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(X|XI|XII)-[1-9]$").expect("valid class label regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Registered participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    pub id: VoterId,
    /// Display name, trimmed and lowercased.
    pub name: String,
    /// Class or group label, e.g. `XI-3`.
    pub class_label: String,
    pub voted: bool,
}

/// Validation failures for voter registration input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoterValidationError {
    BlankName,
    UnknownClassLabel(String),
}

impl Display for VoterValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "voter name must not be blank"),
            Self::UnknownClassLabel(value) => write!(f, "unknown class label: `{value}`"),
        }
    }
}

impl Error for VoterValidationError {}

impl Voter {
    /// Builds a not-yet-voted voter from raw registration input.
    pub fn new(name: &str, class_label: &str) -> Result<Self, VoterValidationError> {
        Ok(Self {
            id: Uuid::new_v4(),
            name: normalize_voter_name(name)?,
            class_label: normalize_class_label(class_label)?,
            voted: false,
        })
    }
}

/// Trims, collapses inner whitespace and lowercases a voter name.
pub fn normalize_voter_name(value: &str) -> Result<String, VoterValidationError> {
    let collapsed = WHITESPACE_RE.replace_all(value.trim(), " ");
    if collapsed.is_empty() {
        return Err(VoterValidationError::BlankName);
    }
    Ok(collapsed.to_lowercase())
}

/// Validates a class label, accepting case-insensitive grade prefixes.
pub fn normalize_class_label(value: &str) -> Result<String, VoterValidationError> {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case(STAFF_CLASS_LABEL) {
        return Ok(STAFF_CLASS_LABEL.to_string());
    }
    let upper = trimmed.to_ascii_uppercase();
    if CLASS_LABEL_RE.is_match(&upper) {
        return Ok(upper);
    }
    Err(VoterValidationError::UnknownClassLabel(trimmed.to_string()))
}

/// Returns every accepted class label: staff first, then grades in order.
pub fn all_class_labels() -> Vec<String> {
    let mut labels = Vec::with_capacity(1 + GRADE_LEVELS.len() * CLASSES_PER_GRADE as usize);
    labels.push(STAFF_CLASS_LABEL.to_string());
    for grade in GRADE_LEVELS {
        for index in 1..=CLASSES_PER_GRADE {
            labels.push(format!("{grade}-{index}"));
        }
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed_collapsed_and_lowercased() {
        assert_eq!(
            normalize_voter_name("  Budi   SANTOSO ").unwrap(),
            "budi santoso"
        );
        assert_eq!(
            normalize_voter_name(" \t ").unwrap_err(),
            VoterValidationError::BlankName
        );
    }

    #[test]
    fn class_labels_accept_known_values_only() {
        assert_eq!(normalize_class_label("xi-3").unwrap(), "XI-3");
        assert_eq!(
            normalize_class_label("guru/karyawan").unwrap(),
            STAFF_CLASS_LABEL
        );
        assert!(matches!(
            normalize_class_label("XIII-1"),
            Err(VoterValidationError::UnknownClassLabel(_))
        ));
        assert!(normalize_class_label("X-0").is_err());
        assert!(normalize_class_label("X-10").is_err());
    }

    #[test]
    fn all_class_labels_lists_staff_then_grades() {
        let labels = all_class_labels();
        assert_eq!(labels.len(), 28);
        assert_eq!(labels[0], STAFF_CLASS_LABEL);
        assert_eq!(labels[1], "X-1");
        assert_eq!(labels[27], "XII-9");
        assert!(labels
            .iter()
            .all(|label| normalize_class_label(label).as_deref() == Ok(label.as_str())));
    }

    #[test]
    fn new_voter_starts_not_voted() {
        let voter = Voter::new("Siti", "X-1").unwrap();
        assert!(!voter.voted);
        assert_eq!(voter.name, "siti");
    }
}
