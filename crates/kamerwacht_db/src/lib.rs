//! Unified database layer for kamerwacht
//!
//! This crate provides a single source of truth for all database access.
//! Two stores are involved:
//!
//! - [`UserDb`]: the read-write user side: saved scanners, the
//!   notification ledger, and the user directory.
//! - [`CorpusDb`]: the read-only record corpus populated by the separate
//!   ingestion job, with bounded connection leasing for scan workers.
//!
//! # Usage
//!
//! ```rust,ignore
//! use kamerwacht_db::{UserDb, CorpusDb, Result};
//!
//! let users = UserDb::open("user.sqlite3").await?;
//! let scanners = users.load_scanner_configs().await?;
//!
//! let corpus = CorpusDb::open("tkindex.sqlite3", 5).await?;
//! let mut lease = corpus.lease().await?;
//! ```

mod corpus;
mod error;
mod ledger;
mod scanners;
mod schema;
mod types;
mod users;

pub use corpus::{CorpusDb, CorpusLease};
pub use error::{DbError, Result};
pub use scanners::today_marker;
pub use types::{LedgerEntry, ScannerConfig};

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::info;

/// The user-side database: scanner configuration, notification ledger,
/// user directory.
///
/// This is the ONLY way to access the user store. Do not use raw sqlx
/// elsewhere.
#[derive(Clone)]
pub struct UserDb {
    pool: SqlitePool,
}

impl UserDb {
    /// Open or create a database at the given path.
    ///
    /// Creates all tables if they don't exist.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let url = format!("sqlite:{}?mode=rwc", path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let db = Self { pool };
        db.ensure_schema().await?;

        info!(path = %path.display(), "User database opened");

        Ok(db)
    }

    /// Open an existing database (fails if not exists).
    pub async fn open_existing(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(DbError::not_found(format!(
                "Database not found: {}",
                path.display()
            )));
        }

        let url = format!("sqlite:{}?mode=rw", path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        Ok(Self { pool })
    }

    /// Get the underlying connection pool (escape hatch for complex queries).
    ///
    /// Prefer using the typed methods instead.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection.
    pub async fn close(self) {
        self.pool.close().await;
    }
}
