//! Schema creation for the user-side database.
//!
//! All CREATE TABLE statements live here - single source of truth. The
//! record corpus is populated by a separate ingestion job and is opened
//! read-only, so no corpus DDL appears in this crate.

use crate::error::Result;
use crate::UserDb;
use tracing::info;

impl UserDb {
    /// Ensure all tables exist.
    pub(crate) async fn ensure_schema(&self) -> Result<()> {
        // Enable WAL mode for better concurrent access
        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(self.pool())
            .await?;
        sqlx::query("PRAGMA synchronous=NORMAL")
            .execute(self.pool())
            .await?;

        // Saved scanners: one row per configured query
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS scanners (
                id        TEXT PRIMARY KEY,
                userid    TEXT NOT NULL,
                soort     TEXT NOT NULL,
                cutoff    TEXT NOT NULL DEFAULT '',
                zoekterm  TEXT,
                nummer    TEXT,
                commissie TEXT
            )"#,
        )
        .execute(self.pool())
        .await?;

        // Notification ledger: append-only record of delivered (user, identifier) pairs
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS sentNotification (
                identifier TEXT NOT NULL,
                userid     TEXT NOT NULL,
                soort      TEXT NOT NULL,
                timestamp  TEXT NOT NULL,
                scannerId  TEXT NOT NULL
            )"#,
        )
        .execute(self.pool())
        .await?;

        sqlx::query(
            r#"CREATE INDEX IF NOT EXISTS idx_sentnotification_user_identifier
                ON sentNotification(userid, identifier)"#,
        )
        .execute(self.pool())
        .await?;

        // User directory: userid -> delivery address
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS users (
                user  TEXT PRIMARY KEY,
                email TEXT NOT NULL
            )"#,
        )
        .execute(self.pool())
        .await?;

        info!("User database schema verified");
        Ok(())
    }
}
