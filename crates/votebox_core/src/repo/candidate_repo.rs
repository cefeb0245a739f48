//! Candidate repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist administrator-created candidates.
//! - Read candidate records in ballot order.
//!
//! # Invariants
//! - `vote_count` is inserted as zero and never updated here.
//! - Listing is deterministic: `ballot_number ASC`.

use super::{parse_count, parse_uuid, RepoError, RepoResult};
use crate::model::candidate::{Candidate, CandidateId, CandidateValidationError};
use rusqlite::{params, Connection, OptionalExtension, Row};

const CANDIDATE_SELECT_SQL: &str = "SELECT
    uuid,
    ballot_number,
    name,
    vision,
    mission,
    detail,
    photo_path,
    vote_count
FROM candidates";

/// Repository interface for candidate records.
pub trait CandidateRepository {
    fn create_candidate(&self, candidate: &Candidate) -> RepoResult<CandidateId>;
    fn get_candidate(&self, id: CandidateId) -> RepoResult<Option<Candidate>>;
    fn list_candidates(&self) -> RepoResult<Vec<Candidate>>;
}

/// SQLite-backed candidate repository.
pub struct SqliteCandidateRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCandidateRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CandidateRepository for SqliteCandidateRepository<'_> {
    fn create_candidate(&self, candidate: &Candidate) -> RepoResult<CandidateId> {
        if candidate.ballot_number == 0 {
            return Err(CandidateValidationError::ZeroBallotNumber.into());
        }
        if candidate.vote_count != 0 {
            return Err(RepoError::InvalidData(format!(
                "new candidate {} must start with zero votes",
                candidate.id
            )));
        }

        let taken: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM candidates WHERE ballot_number = ?1;",
                [candidate.ballot_number],
                |row| row.get(0),
            )
            .optional()?;
        if taken.is_some() {
            return Err(RepoError::DuplicateBallotNumber(candidate.ballot_number));
        }

        self.conn.execute(
            "INSERT INTO candidates (
                uuid,
                ballot_number,
                name,
                vision,
                mission,
                detail,
                photo_path,
                vote_count
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0);",
            params![
                candidate.id.to_string(),
                candidate.ballot_number,
                candidate.name.as_str(),
                candidate.vision.as_str(),
                candidate.mission.as_str(),
                candidate.detail.as_deref(),
                candidate.photo_path.as_deref(),
            ],
        )?;

        Ok(candidate.id)
    }

    fn get_candidate(&self, id: CandidateId) -> RepoResult<Option<Candidate>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CANDIDATE_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_candidate_row(row)?));
        }
        Ok(None)
    }

    fn list_candidates(&self) -> RepoResult<Vec<Candidate>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CANDIDATE_SELECT_SQL} ORDER BY ballot_number ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut candidates = Vec::new();
        while let Some(row) = rows.next()? {
            candidates.push(parse_candidate_row(row)?);
        }
        Ok(candidates)
    }
}

/// Returns whether a candidate row exists.
pub(crate) fn candidate_exists(conn: &Connection, id: CandidateId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM candidates WHERE uuid = ?1);",
        [id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn parse_candidate_row(row: &Row<'_>) -> RepoResult<Candidate> {
    let uuid_text: String = row.get("uuid")?;
    Ok(Candidate {
        id: parse_uuid(&uuid_text, "candidates.uuid")?,
        ballot_number: row.get("ballot_number")?,
        name: row.get("name")?,
        vision: row.get("vision")?,
        mission: row.get("mission")?,
        detail: row.get("detail")?,
        photo_path: row.get("photo_path")?,
        vote_count: parse_count(row.get("vote_count")?, "candidates.vote_count")?,
    })
}
