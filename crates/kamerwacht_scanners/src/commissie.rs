//! Committee scanner: matches activities scheduled for a committee.

use async_trait::async_trait;
use sqlx::SqliteConnection;

use kamerwacht_db::ScannerConfig;

use crate::{ScanError, Scanner, ScannerHit, CUTOFF_CLAUSE};

pub struct CommissieScanner {
    id: String,
    userid: String,
    cutoff: String,
    commissie_id: String,
}

pub(crate) fn make(config: &ScannerConfig) -> Result<Box<dyn Scanner>, ScanError> {
    let commissie_id = config
        .commissie
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| {
            ScanError::Config(format!("scanner '{}' has no commissie id", config.id))
        })?;

    Ok(Box::new(CommissieScanner {
        id: config.id.clone(),
        userid: config.userid.clone(),
        cutoff: config.cutoff.clone(),
        commissie_id: commissie_id.to_string(),
    }))
}

#[async_trait]
impl Scanner for CommissieScanner {
    fn id(&self) -> &str {
        &self.id
    }

    fn userid(&self) -> &str {
        &self.userid
    }

    fn soort(&self) -> &str {
        "commissie"
    }

    async fn describe(&self, conn: &mut SqliteConnection) -> Result<String, ScanError> {
        let naam: Option<String> = sqlx::query_scalar("SELECT naam FROM Commissie WHERE id = ?")
            .bind(&self.commissie_id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(match naam.filter(|n| !n.is_empty()) {
            Some(naam) => format!("Commissie {naam}"),
            None => format!("Commissie {}", self.commissie_id),
        })
    }

    async fn get(&self, conn: &mut SqliteConnection) -> Result<Vec<ScannerHit>, ScanError> {
        let sql = format!(
            "SELECT nummer FROM Activiteit \
             WHERE commissieId = ? AND {CUTOFF_CLAUSE} \
             ORDER BY datum ASC, nummer ASC"
        );
        let rows = sqlx::query_scalar::<_, String>(&sql)
            .bind(&self.commissie_id)
            .bind(&self.cutoff)
            .bind(&self.cutoff)
            .fetch_all(&mut *conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|identifier| ScannerHit { identifier })
            .collect())
    }
}
