//! # Unit of Work
//!
//! One SQLite transaction that holds the writer lock from its first
//! statement until commit or rollback.
//!
//! ## Locking Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Worker A                          Worker B                            │
//! │                                                                         │
//! │  begin()                                                               │
//! │   └─ UPDATE ledger_sequence ──► writer lock ✓  batch 41                │
//! │                                    begin()                             │
//! │  lock position (qty 24)             └─ UPDATE ledger_sequence          │
//! │  write 24 → 22                          ... waits (busy timeout)        │
//! │  commit() ──► lock released                                            │
//! │                                         writer lock ✓  batch 42        │
//! │                                    lock position (qty 22)              │
//! │                                    ...                                 │
//! │                                                                         │
//! │  B never sees A's previous quantity. If the wait exceeds the busy      │
//! │  timeout, begin() fails with LockTimeout and nothing was written.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! SQLite has no row locks, so claiming the database writer lock up front is
//! the exclusive lock on every position at once. Units of work therefore
//! never deadlock against each other.
//!
//! A unit of work that is dropped without `commit` rolls back.

use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};

/// An open transaction plus the batch number stamped on its movements.
#[derive(Debug)]
pub struct UnitOfWork {
    tx: Option<Transaction<'static, Sqlite>>,
    batch_no: i64,
}

impl UnitOfWork {
    /// Starts a transaction and claims the writer lock.
    pub async fn begin(pool: &SqlitePool) -> DbResult<Self> {
        let mut tx = pool.begin().await?;

        let batch_no: i64 = sqlx::query_scalar(
            "UPDATE ledger_sequence SET value = value + 1 WHERE id = 1 RETURNING value",
        )
        .fetch_one(&mut *tx)
        .await?;

        debug!(batch_no, "Unit of work started");

        Ok(UnitOfWork {
            tx: Some(tx),
            batch_no,
        })
    }

    /// Number shared by every movement written in this unit of work.
    pub fn batch_no(&self) -> i64 {
        self.batch_no
    }

    pub fn is_active(&self) -> bool {
        self.tx.is_some()
    }

    /// The transaction's connection.
    ///
    /// Fails with [`DbError::NoActiveTransaction`] after commit or rollback.
    pub fn conn(&mut self) -> DbResult<&mut SqliteConnection> {
        self.tx.as_deref_mut().ok_or(DbError::NoActiveTransaction)
    }

    pub async fn commit(&mut self) -> DbResult<()> {
        let tx = self.tx.take().ok_or(DbError::NoActiveTransaction)?;
        tx.commit().await?;
        debug!(batch_no = self.batch_no, "Unit of work committed");
        Ok(())
    }

    pub async fn rollback(&mut self) -> DbResult<()> {
        let tx = self.tx.take().ok_or(DbError::NoActiveTransaction)?;
        tx.rollback().await?;
        debug!(batch_no = self.batch_no, "Unit of work rolled back");
        Ok(())
    }

    /// Rolls back and returns `err`.
    ///
    /// A failing rollback is logged; the caller still gets the error that
    /// caused the abort.
    pub async fn abort<T>(mut self, err: DbError) -> DbResult<T> {
        if self.is_active() {
            if let Err(rollback_err) = self.rollback().await {
                warn!(
                    batch_no = self.batch_no,
                    error = %rollback_err,
                    "Rollback failed after aborted unit of work"
                );
            }
        }
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{file_db_with_lock_timeout, memory_db, remove_db_files};
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn test_batch_numbers_increase() {
        let db = memory_db().await;

        let mut first = db.begin().await.unwrap();
        let a = first.batch_no();
        first.commit().await.unwrap();

        let mut second = db.begin().await.unwrap();
        let b = second.batch_no();
        second.rollback().await.unwrap();

        assert!(b > a);
    }

    #[tokio::test]
    async fn test_conn_after_commit_fails() {
        let db = memory_db().await;

        let mut uow = db.begin().await.unwrap();
        assert!(uow.conn().is_ok());
        uow.commit().await.unwrap();

        assert!(!uow.is_active());
        assert!(matches!(uow.conn(), Err(DbError::NoActiveTransaction)));
        assert!(matches!(uow.commit().await, Err(DbError::NoActiveTransaction)));
    }

    #[tokio::test]
    async fn test_abort_returns_original_error() {
        let db = memory_db().await;

        let uow = db.begin().await.unwrap();
        let result: DbResult<()> = uow.abort(DbError::not_found("Product", "ghost")).await;

        assert!(matches!(result, Err(DbError::NotFound { .. })));
        // The connection went back to the pool; a new unit of work can start.
        let mut next = db.begin().await.unwrap();
        next.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_second_writer_times_out_with_retryable_error() {
        let (db, path) = file_db_with_lock_timeout(2, Duration::from_millis(200)).await;

        let mut holder = db.begin().await.unwrap();

        let started = Instant::now();
        let err = db.begin().await.unwrap_err();
        assert!(matches!(err, DbError::LockTimeout(_)), "got {err:?}");
        assert!(err.is_retryable());
        assert!(started.elapsed() >= Duration::from_millis(150));

        // Once the holder is done, the same call goes through.
        holder.commit().await.unwrap();
        let mut retried = db.begin().await.unwrap();
        assert!(retried.batch_no() > holder.batch_no());
        retried.rollback().await.unwrap();

        db.close().await;
        remove_db_files(&path);
    }
}
