//! Voter repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist registered voters and read their one-shot `voted` flag.
//! - Serve filtered, paginated roster queries.
//!
//! # Invariants
//! - This repository never writes `voters.voted`; see `ballot_repo`.
//! - `voted_flag` always reads the row, there is no cache.
//! - Roster order is newest registration first (`rowid DESC`).

use super::{parse_count, parse_flag, parse_uuid, RepoError, RepoResult};
use crate::model::voter::{normalize_class_label, Voter, VoterId, VoterValidationError};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const VOTER_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    class_label,
    voted
FROM voters";

/// Default roster page size.
pub const VOTER_LIST_DEFAULT_LIMIT: u32 = 50;
/// Upper bound for roster page size.
pub const VOTER_LIST_MAX_LIMIT: u32 = 500;

/// Voted-state filter for roster queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VotedFilter {
    #[default]
    All,
    Voted,
    NotVoted,
}

/// Filter and pagination options for roster listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoterListQuery {
    /// Case-insensitive substring match on the voter name.
    pub search: Option<String>,
    pub class_label: Option<String>,
    pub voted: VotedFilter,
    /// `None` applies [`VOTER_LIST_DEFAULT_LIMIT`].
    pub limit: Option<u32>,
    pub offset: u32,
}

impl VoterListQuery {
    /// Effective page size, clamped to `1..=VOTER_LIST_MAX_LIMIT`.
    pub fn applied_limit(&self) -> u32 {
        self.limit
            .unwrap_or(VOTER_LIST_DEFAULT_LIMIT)
            .clamp(1, VOTER_LIST_MAX_LIMIT)
    }
}

/// Repository interface for voter records.
pub trait VoterRepository {
    fn create_voter(&self, voter: &Voter) -> RepoResult<VoterId>;
    fn get_voter(&self, id: VoterId) -> RepoResult<Option<Voter>>;
    fn voted_flag(&self, id: VoterId) -> RepoResult<Option<bool>>;
    fn list_voters(&self, query: &VoterListQuery) -> RepoResult<Vec<Voter>>;
    fn count_voters(&self, query: &VoterListQuery) -> RepoResult<u64>;
}

/// SQLite-backed voter repository.
pub struct SqliteVoterRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteVoterRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl VoterRepository for SqliteVoterRepository<'_> {
    fn create_voter(&self, voter: &Voter) -> RepoResult<VoterId> {
        if voter.name.trim().is_empty() {
            return Err(VoterValidationError::BlankName.into());
        }
        normalize_class_label(&voter.class_label)?;

        let existing_class: Option<String> = self
            .conn
            .query_row(
                "SELECT class_label FROM voters WHERE name = ?1;",
                [voter.name.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(class_label) = existing_class {
            return Err(RepoError::DuplicateVoterName {
                name: voter.name.clone(),
                class_label,
            });
        }

        self.conn.execute(
            "INSERT INTO voters (uuid, name, class_label, voted)
             VALUES (?1, ?2, ?3, 0);",
            params![
                voter.id.to_string(),
                voter.name.as_str(),
                voter.class_label.as_str(),
            ],
        )?;

        Ok(voter.id)
    }

    fn get_voter(&self, id: VoterId) -> RepoResult<Option<Voter>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{VOTER_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_voter_row(row)?));
        }
        Ok(None)
    }

    fn voted_flag(&self, id: VoterId) -> RepoResult<Option<bool>> {
        voted_flag(self.conn, id)
    }

    fn list_voters(&self, query: &VoterListQuery) -> RepoResult<Vec<Voter>> {
        let (where_sql, mut bind_values) = roster_filter(query)?;
        let sql = format!("{VOTER_SELECT_SQL}{where_sql} ORDER BY rowid DESC LIMIT ? OFFSET ?");
        bind_values.push(Value::Integer(i64::from(query.applied_limit())));
        bind_values.push(Value::Integer(i64::from(query.offset)));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut voters = Vec::new();
        while let Some(row) = rows.next()? {
            voters.push(parse_voter_row(row)?);
        }
        Ok(voters)
    }

    fn count_voters(&self, query: &VoterListQuery) -> RepoResult<u64> {
        let (where_sql, bind_values) = roster_filter(query)?;
        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM voters{where_sql}"),
            params_from_iter(bind_values),
            |row| row.get(0),
        )?;
        parse_count(total, "COUNT(voters)")
    }
}

/// Reads the `voted` flag of one voter; `None` when the voter is unknown.
pub(crate) fn voted_flag(conn: &Connection, id: VoterId) -> RepoResult<Option<bool>> {
    let value: Option<i64> = conn
        .query_row(
            "SELECT voted FROM voters WHERE uuid = ?1;",
            [id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    value
        .map(|flag| parse_flag(flag, "voters.voted"))
        .transpose()
}

fn roster_filter(query: &VoterListQuery) -> RepoResult<(String, Vec<Value>)> {
    let mut sql = String::from(" WHERE 1 = 1");
    let mut bind_values: Vec<Value> = Vec::new();

    if let Some(search) = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        sql.push_str(" AND name LIKE ? ESCAPE '\\'");
        bind_values.push(Value::Text(format!(
            "%{}%",
            escape_like(&search.to_lowercase())
        )));
    }

    if let Some(class_label) = query
        .class_label
        .as_deref()
        .filter(|value| !value.trim().is_empty())
    {
        let normalized = normalize_class_label(class_label)?;
        sql.push_str(" AND class_label = ?");
        bind_values.push(Value::Text(normalized));
    }

    match query.voted {
        VotedFilter::All => {}
        VotedFilter::Voted => sql.push_str(" AND voted = 1"),
        VotedFilter::NotVoted => sql.push_str(" AND voted = 0"),
    }

    Ok((sql, bind_values))
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn parse_voter_row(row: &Row<'_>) -> RepoResult<Voter> {
    let uuid_text: String = row.get("uuid")?;
    Ok(Voter {
        id: parse_uuid(&uuid_text, "voters.uuid")?,
        name: row.get("name")?,
        class_label: row.get("class_label")?,
        voted: parse_flag(row.get("voted")?, "voters.voted")?,
    })
}

#[cfg(test)]
mod tests {
    use super::{escape_like, VoterListQuery, VOTER_LIST_DEFAULT_LIMIT, VOTER_LIST_MAX_LIMIT};

    #[test]
    fn escape_like_escapes_wildcards() {
        assert_eq!(escape_like("a%b_c\\d"), "a\\%b\\_c\\\\d");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn applied_limit_defaults_and_clamps() {
        assert_eq!(
            VoterListQuery::default().applied_limit(),
            VOTER_LIST_DEFAULT_LIMIT
        );
        let zero = VoterListQuery {
            limit: Some(0),
            ..VoterListQuery::default()
        };
        assert_eq!(zero.applied_limit(), 1);
        let huge = VoterListQuery {
            limit: Some(10_000),
            ..VoterListQuery::default()
        };
        assert_eq!(huge.applied_limit(), VOTER_LIST_MAX_LIMIT);
    }
}
