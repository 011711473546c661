//! Scanner configuration operations.

use chrono::Local;

use crate::error::Result;
use crate::types::ScannerConfig;
use crate::UserDb;

/// Today's date in the cutoff column format (`%Y-%m-%d`).
///
/// Cutoffs are advanced to this marker at the end of every run, so a
/// scanner's window always moves forward even on a run with zero matches.
pub fn today_marker() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

impl UserDb {
    /// Load all configured scanner rows.
    pub async fn load_scanner_configs(&self) -> Result<Vec<ScannerConfig>> {
        let configs = sqlx::query_as::<_, ScannerConfig>(
            "SELECT id, userid, soort, cutoff, zoekterm, nummer, commissie FROM scanners ORDER BY rowid",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(configs)
    }

    /// Create a scanner row.
    pub async fn add_scanner(&self, config: &ScannerConfig) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO scanners (id, userid, soort, cutoff, zoekterm, nummer, commissie)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&config.id)
        .bind(&config.userid)
        .bind(&config.soort)
        .bind(&config.cutoff)
        .bind(&config.zoekterm)
        .bind(&config.nummer)
        .bind(&config.commissie)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Update a scanner's resume cutoff.
    pub async fn advance_cutoff(&self, scanner_id: &str, cutoff: &str) -> Result<()> {
        sqlx::query("UPDATE scanners SET cutoff = ? WHERE id = ?")
            .bind(cutoff)
            .bind(scanner_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Fetch one scanner's current cutoff.
    pub async fn scanner_cutoff(&self, scanner_id: &str) -> Result<String> {
        let cutoff: Option<String> =
            sqlx::query_scalar("SELECT cutoff FROM scanners WHERE id = ?")
                .bind(scanner_id)
                .fetch_optional(self.pool())
                .await?;
        cutoff.ok_or_else(|| crate::DbError::not_found(format!("No scanner '{scanner_id}'")))
    }
}
