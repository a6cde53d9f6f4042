//! Per-call transactional sessions over the settings database.
//!
//! # Responsibility
//! - Hand out one connection per store call.
//! - Run one action inside one IMMEDIATE transaction: commit on success,
//!   roll back on any error.
//!
//! # Invariants
//! - No partial write is ever committed.
//! - File-backed factories never share a connection between calls.
//! - The in-memory factory shares its single connection behind a mutex, so
//!   calls against it are serialized.

use super::open::{open_db, open_db_in_memory, open_session};
use super::{DbError, DbResult};
use log::{debug, error, warn};
use parking_lot::Mutex;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::time::Instant;

enum SessionSource {
    File(PathBuf),
    Shared(Mutex<Connection>),
}

/// Transaction wrapper used by every settings store call.
pub struct SessionFactory {
    source: SessionSource,
}

impl SessionFactory {
    /// Opens (and migrates) a file-backed settings database.
    ///
    /// The bootstrap connection is closed again; each later call opens its
    /// own connection.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref().to_path_buf();
        drop(open_db(&path)?);
        Ok(Self {
            source: SessionSource::File(path),
        })
    }

    /// Opens a private in-memory settings database.
    pub fn in_memory() -> DbResult<Self> {
        Ok(Self {
            source: SessionSource::Shared(Mutex::new(open_db_in_memory()?)),
        })
    }

    /// Storage mode label used in log lines.
    pub fn mode(&self) -> &'static str {
        match self.source {
            SessionSource::File(_) => "file",
            SessionSource::Shared(_) => "memory",
        }
    }

    /// Database file path for file-backed factories.
    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            SessionSource::File(path) => Some(path.as_path()),
            SessionSource::Shared(_) => None,
        }
    }

    /// Runs an action that can only fail through the store itself.
    pub fn execute<T>(
        &self,
        action: impl FnOnce(&Transaction<'_>) -> rusqlite::Result<T>,
    ) -> DbResult<T> {
        self.try_execute(|tx| action(tx).map_err(DbError::from))
    }

    /// Runs an action that may fail with a domain error.
    ///
    /// Domain errors roll the transaction back and propagate unchanged; store
    /// failures while opening, beginning or committing are converted through
    /// `From<DbError>`.
    pub fn try_execute<T, E>(
        &self,
        action: impl FnOnce(&Transaction<'_>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<DbError> + Display,
    {
        match &self.source {
            SessionSource::File(path) => {
                let mut conn = open_session(path).map_err(|err| {
                    error!(
                        "event=store_session module=db status=error mode=file error_code=session_open_failed error={err}"
                    );
                    E::from(err)
                })?;
                run_in_transaction(&mut conn, action)
            }
            SessionSource::Shared(conn) => {
                let mut guard = conn.lock();
                run_in_transaction(&mut guard, action)
            }
        }
    }
}

fn run_in_transaction<T, E>(
    conn: &mut Connection,
    action: impl FnOnce(&Transaction<'_>) -> Result<T, E>,
) -> Result<T, E>
where
    E: From<DbError> + Display,
{
    let started_at = Instant::now();
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|err| {
            error!("event=store_tx module=db status=error error_code=tx_begin_failed error={err}");
            E::from(DbError::from(err))
        })?;

    match action(&tx) {
        Ok(value) => {
            tx.commit().map_err(|err| {
                error!(
                    "event=store_tx module=db status=error error_code=tx_commit_failed error={err}"
                );
                E::from(DbError::from(err))
            })?;
            debug!(
                "event=store_tx module=db status=ok duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(value)
        }
        Err(err) => {
            match tx.rollback() {
                Ok(()) => warn!(
                    "event=store_tx module=db status=rolled_back duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                ),
                Err(rollback_err) => error!(
                    "event=store_tx module=db status=error error_code=tx_rollback_failed error={} cause={}",
                    rollback_err, err
                ),
            }
            Err(err)
        }
    }
}
