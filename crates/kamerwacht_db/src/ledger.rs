//! Notification ledger operations.
//!
//! The ledger is append-only and enforces at-most-once delivery per
//! (userid, identifier). Callers are expected to hold the pipeline's
//! coordination lock around the check + insert pair; this module does not
//! lock anything itself.

use chrono::Local;
use tracing::warn;

use crate::error::Result;
use crate::types::LedgerEntry;
use crate::UserDb;

impl UserDb {
    /// Has this user already been notified about this identifier?
    ///
    /// Lookup failures are treated as "not notified": queries are
    /// best-effort and must never block delivery.
    pub async fn was_notified(&self, userid: &str, identifier: &str) -> bool {
        let res = sqlx::query(
            "SELECT identifier FROM sentNotification WHERE userid = ? AND identifier = ?",
        )
        .bind(userid)
        .bind(identifier)
        .fetch_optional(self.pool())
        .await;

        match res {
            Ok(row) => row.is_some(),
            Err(err) => {
                warn!(userid, identifier, error = %err, "Ledger lookup failed, treating as not notified");
                false
            }
        }
    }

    /// Append one ledger entry, stamped with the current local time.
    pub async fn record_notified(
        &self,
        userid: &str,
        identifier: &str,
        soort: &str,
        scanner_id: &str,
    ) -> Result<()> {
        let when = Local::now().format("%Y-%m-%dT%H:%M:%S").to_string();
        sqlx::query(
            r#"
            INSERT INTO sentNotification (identifier, userid, soort, timestamp, scannerId)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(identifier)
        .bind(userid)
        .bind(soort)
        .bind(&when)
        .bind(scanner_id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// All ledger entries for one user, oldest first.
    pub async fn ledger_entries(&self, userid: &str) -> Result<Vec<LedgerEntry>> {
        let entries = sqlx::query_as::<_, LedgerEntry>(
            "SELECT * FROM sentNotification WHERE userid = ? ORDER BY timestamp ASC, identifier ASC",
        )
        .bind(userid)
        .fetch_all(self.pool())
        .await?;
        Ok(entries)
    }

    /// Total number of ledger entries.
    pub async fn ledger_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sentNotification")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }
}
