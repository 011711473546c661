//! Read path over the ingested record corpus.
//!
//! The corpus file is produced by a separate ingestion job; this side only
//! ever reads it. `CorpusDb` bounds the number of concurrently leased
//! handles: `lease()` blocks when the pool is exhausted and the handle
//! returns itself to the pool on drop, on every exit path.

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::{Row, Sqlite, SqliteConnection};
use std::path::Path;
use tracing::info;

use crate::error::{DbError, Result};

/// A leased corpus handle. Exclusive to the holder until dropped.
pub type CorpusLease = PoolConnection<Sqlite>;

/// Read-only handle pool over the record corpus.
#[derive(Clone)]
pub struct CorpusDb {
    pool: SqlitePool,
}

impl CorpusDb {
    /// Open the corpus read-only with at most `max_leases` concurrent handles.
    pub async fn open(path: impl AsRef<Path>, max_leases: u32) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(DbError::not_found(format!(
                "Corpus database not found: {}",
                path.display()
            )));
        }

        let url = format!("sqlite:{}?mode=ro", path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(max_leases)
            .connect(&url)
            .await?;

        info!(path = %path.display(), max_leases, "Corpus opened read-only");

        Ok(Self { pool })
    }

    /// Lease a handle, blocking until one is available.
    pub async fn lease(&self) -> Result<CorpusLease> {
        Ok(self.pool.acquire().await?)
    }

    /// Human-readable description for a record identifier, leasing a
    /// handle for the duration of the lookup.
    pub async fn describe_identifier(&self, identifier: &str) -> Result<String> {
        let mut lease = self.lease().await?;
        Self::describe_identifier_on(&mut lease, identifier).await
    }

    /// Description lookup on an already-leased handle.
    ///
    /// Probes documents, then meetings, then activities; the first
    /// non-empty result wins. Returns an empty string when the identifier
    /// matches none of the three.
    pub async fn describe_identifier_on(
        conn: &mut SqliteConnection,
        identifier: &str,
    ) -> Result<String> {
        let doc = sqlx::query("SELECT onderwerp FROM Document WHERE nummer = ?")
            .bind(identifier)
            .fetch_optional(&mut *conn)
            .await?;
        if let Some(row) = doc {
            let onderwerp: Option<String> = row.try_get("onderwerp")?;
            return Ok(onderwerp.unwrap_or_default());
        }

        let meeting = sqlx::query("SELECT titel FROM Vergadering WHERE id = ?")
            .bind(identifier)
            .fetch_optional(&mut *conn)
            .await?;
        if let Some(row) = meeting {
            let titel: Option<String> = row.try_get("titel")?;
            return Ok(titel.unwrap_or_default());
        }

        let activity = sqlx::query(
            "SELECT soort || ' ' || onderwerp AS onderwerp, datum FROM Activiteit WHERE nummer = ?",
        )
        .bind(identifier)
        .fetch_optional(&mut *conn)
        .await?;
        if let Some(row) = activity {
            let onderwerp: Option<String> = row.try_get("onderwerp")?;
            let datum: Option<String> = row.try_get("datum")?;
            let mut resp = onderwerp.unwrap_or_default();
            match datum {
                Some(mut datum) if !datum.is_empty() => {
                    // 2024-05-01T10:00:00 -> 2024-05-01 10:00:00
                    if datum.len() > 10 {
                        datum.replace_range(10..11, " ");
                    }
                    resp += &format!(" ({datum})");
                }
                _ => resp += " (nog geen datum)",
            }
            return Ok(resp);
        }

        Ok(String::new())
    }
}
