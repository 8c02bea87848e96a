//! Transaction hold-time monitoring
//!
//! A batch holds the SQLite write lock for as long as its transaction is
//! open, so acquisition wait and hold time are logged on every release.

use arms_common::Result;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::time::Instant;

/// Transaction wrapper that logs acquisition and release timing
pub struct MonitoredTransaction<'c> {
    tx: Transaction<'c, Sqlite>,
    caller: &'static str,
    acquired_at: Instant,
}

impl<'c> MonitoredTransaction<'c> {
    /// Connection the staged writes go through
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut *self.tx
    }

    /// Commit the transaction and log how long it was held
    pub async fn commit(self) -> Result<()> {
        let held_ms = self.acquired_at.elapsed().as_millis();
        self.tx.commit().await?;

        if held_ms > 2000 {
            tracing::warn!(
                caller = self.caller,
                held_ms = held_ms,
                "LONG TRANSACTION - write lock held for extended period"
            );
        } else if held_ms > 1000 {
            tracing::info!(
                caller = self.caller,
                held_ms = held_ms,
                "Transaction held longer than expected (>1s)"
            );
        } else {
            tracing::debug!(caller = self.caller, held_ms = held_ms, "Transaction released (commit)");
        }

        Ok(())
    }

    /// Roll the transaction back and log how long it was held
    pub async fn rollback(self) -> Result<()> {
        let held_ms = self.acquired_at.elapsed().as_millis();
        self.tx.rollback().await?;

        if held_ms > 2000 {
            tracing::warn!(
                caller = self.caller,
                held_ms = held_ms,
                "LONG TRANSACTION - write lock held for extended period before rollback"
            );
        } else {
            tracing::debug!(caller = self.caller, held_ms = held_ms, "Transaction released (rollback)");
        }

        Ok(())
    }
}

/// Begin a monitored transaction
///
/// Logs the time spent waiting for a pooled connection: warn above 1s,
/// info above 500ms, debug otherwise.
pub async fn begin_monitored<'c>(pool: &'c SqlitePool, caller: &'static str) -> Result<MonitoredTransaction<'c>> {
    let start = Instant::now();
    tracing::debug!(caller = caller, "Connection acquisition requested");

    let tx = pool.begin().await?;

    let wait_ms = start.elapsed().as_millis();
    if wait_ms > 1000 {
        tracing::warn!(
            caller = caller,
            wait_ms = wait_ms,
            "SLOW CONNECTION ACQUISITION - another batch may hold the database"
        );
    } else if wait_ms > 500 {
        tracing::info!(
            caller = caller,
            wait_ms = wait_ms,
            "Connection acquisition slower than expected (>500ms)"
        );
    } else {
        tracing::debug!(caller = caller, wait_ms = wait_ms, "Connection acquired");
    }

    Ok(MonitoredTransaction {
        tx,
        caller,
        acquired_at: Instant::now(),
    })
}
