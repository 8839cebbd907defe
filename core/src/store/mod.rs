//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! Ledger components call store methods; they never execute SQL directly.

use crate::{
    error::{LedgerError, LedgerResult},
    types::{timestamp_from_sql, Timestamp},
};
use rusqlite::{types::Type, Connection, Transaction, TransactionBehavior};
use std::time::Duration;

mod account;
mod contribution;
mod event;
mod group;
mod transaction;

pub struct LedgerStore {
    conn: Connection,
}

impl LedgerStore {
    /// Open (or create) the ledger database at `path`.
    ///
    /// Writers on other connections wait up to `busy_timeout` for the
    /// write lock before the operation fails with a storage error.
    pub fn open(path: &str, busy_timeout: Duration) -> LedgerResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        conn.busy_timeout(busy_timeout)?;
        // WAL mode only for real files (:memory: ignores it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> LedgerResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order. Safe to run repeatedly.
    pub fn migrate(&self) -> LedgerResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_esusu.sql"))?;
        Ok(())
    }

    // ── Transactions ───────────────────────────────────────────

    /// Start a write transaction that takes the database write lock up
    /// front, so a read-check-write sequence cannot interleave with
    /// another writer. Dropping the guard without commit rolls back.
    pub fn begin_write(&self) -> LedgerResult<Transaction<'_>> {
        Ok(Transaction::new_unchecked(
            &self.conn,
            TransactionBehavior::Immediate,
        )?)
    }

    /// Start a read transaction for a consistent multi-query snapshot.
    pub fn begin_read(&self) -> LedgerResult<Transaction<'_>> {
        Ok(Transaction::new_unchecked(
            &self.conn,
            TransactionBehavior::Deferred,
        )?)
    }
}

/// Map a stored timestamp column back into a `Timestamp`.
pub(crate) fn read_timestamp(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Timestamp> {
    let raw: String = row.get(idx)?;
    timestamp_from_sql(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parse a stored enum column, surfacing unknown values as a conversion failure.
pub(crate) fn read_enum<T>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = crate::types::ParseEnumError>,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Build a storage error for a failure that did not originate in SQLite
/// (used by the orchestrator's failure injection).
pub(crate) fn synthetic_failure(message: String) -> LedgerError {
    LedgerError::Storage(rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_IOERR),
        Some(message),
    ))
}
