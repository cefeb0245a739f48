//! Shared handle to the authoritative election store.
//!
//! # Responsibility
//! - Own the single SQLite connection behind one serialization lock.
//! - Hand out short-lived guarded access to registries, the ballot box and
//!   the broadcaster.
//!
//! # Invariants
//! - Every read and write of voter/candidate state goes through `lock()`,
//!   so there is no second copy that could diverge.
//! - Lock order is store first, then any broadcaster-internal lock.

use crate::db::{open_db_in_memory, DbResult};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard};

/// Failure to acquire the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A previous holder panicked mid-operation.
    Poisoned,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Poisoned => write!(f, "election store lock is poisoned"),
        }
    }
}

impl Error for StoreError {}

/// Cloneable handle to the one election connection.
#[derive(Clone)]
pub struct VoteStore {
    conn: Arc<Mutex<Connection>>,
}

impl VoteStore {
    /// Wraps an already migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Opens (and migrates) a private in-memory store.
    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    /// Acquires the serialization lock. Poisoning is reported, not unwrapped.
    pub fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Runs `f` with the connection while holding the lock.
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> T) -> Result<T, StoreError> {
        let conn = self.lock()?;
        Ok(f(&conn))
    }
}
