//! Dossier scanner: matches documents filed under a kamerstukdossier
//! number.

use async_trait::async_trait;
use sqlx::SqliteConnection;

use kamerwacht_db::ScannerConfig;

use crate::{ScanError, Scanner, ScannerHit, CUTOFF_CLAUSE};

pub struct DossierScanner {
    id: String,
    userid: String,
    cutoff: String,
    nummer: String,
}

pub(crate) fn make(config: &ScannerConfig) -> Result<Box<dyn Scanner>, ScanError> {
    let nummer = config
        .nummer
        .as_deref()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| {
            ScanError::Config(format!("scanner '{}' has no dossier nummer", config.id))
        })?;

    Ok(Box::new(DossierScanner {
        id: config.id.clone(),
        userid: config.userid.clone(),
        cutoff: config.cutoff.clone(),
        nummer: nummer.to_string(),
    }))
}

#[async_trait]
impl Scanner for DossierScanner {
    fn id(&self) -> &str {
        &self.id
    }

    fn userid(&self) -> &str {
        &self.userid
    }

    fn soort(&self) -> &str {
        "dossier"
    }

    async fn describe(&self, conn: &mut SqliteConnection) -> Result<String, ScanError> {
        let titel: Option<String> =
            sqlx::query_scalar("SELECT titel FROM Kamerstukdossier WHERE nummer = ?")
                .bind(&self.nummer)
                .fetch_optional(&mut *conn)
                .await?;

        Ok(match titel.filter(|t| !t.is_empty()) {
            Some(titel) => format!("Dossier {} ({})", self.nummer, titel),
            None => format!("Dossier {}", self.nummer),
        })
    }

    async fn get(&self, conn: &mut SqliteConnection) -> Result<Vec<ScannerHit>, ScanError> {
        let sql = format!(
            "SELECT nummer FROM Document \
             WHERE dossiernummer = ? AND {CUTOFF_CLAUSE} \
             ORDER BY datum ASC, nummer ASC"
        );
        let rows = sqlx::query_scalar::<_, String>(&sql)
            .bind(&self.nummer)
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
