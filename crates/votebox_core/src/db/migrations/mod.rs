//! Election schema history.
//!
//! 1. `voters` and `candidates`, with the CHECK constraints that keep
//!    `voted` a 0/1 flag, ballot numbers positive and tallies non-negative.
//! 2. Roster indexes on `voters(voted)` and `voters(class_label)`.
//!
//! A store is either fully at one version or untouched: all pending steps
//! share one transaction, and `PRAGMA user_version` records the result.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "voters_and_candidates",
        sql: include_str!("0001_init.sql"),
    },
    Migration {
        version: 2,
        name: "roster_indexes",
        sql: include_str!("0002_roster_indexes.sql"),
    },
];

/// Schema version a freshly opened store ends up at.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Brings the election schema up to [`latest_version`].
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the store was written by a newer build;
///   nothing is touched in that case.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let current_version = current_user_version(conn)?;
    let latest = latest_version();

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    if current_version == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in MIGRATIONS
        .iter()
        .filter(|migration| migration.version > current_version)
    {
        tx.execute_batch(migration.sql)?;
        tx.pragma_update(None, "user_version", migration.version)?;
        debug!(
            "event=db_migrate_step module=db version={} name={}",
            migration.version, migration.name
        );
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={}",
        current_version, latest
    );
    Ok(())
}

fn current_user_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}
