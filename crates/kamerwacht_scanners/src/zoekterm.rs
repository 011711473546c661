//! Search-term scanner: matches documents whose subject or title contains
//! a configured term.

use async_trait::async_trait;
use sqlx::SqliteConnection;

use kamerwacht_db::ScannerConfig;

use crate::{ScanError, Scanner, ScannerHit, CUTOFF_CLAUSE};

pub struct ZoektermScanner {
    id: String,
    userid: String,
    cutoff: String,
    term: String,
}

pub(crate) fn make(config: &ScannerConfig) -> Result<Box<dyn Scanner>, ScanError> {
    let term = config
        .zoekterm
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ScanError::Config(format!("scanner '{}' has no zoekterm", config.id)))?;

    Ok(Box::new(ZoektermScanner {
        id: config.id.clone(),
        userid: config.userid.clone(),
        cutoff: config.cutoff.clone(),
        term: term.to_string(),
    }))
}

#[async_trait]
impl Scanner for ZoektermScanner {
    fn id(&self) -> &str {
        &self.id
    }

    fn userid(&self) -> &str {
        &self.userid
    }

    fn soort(&self) -> &str {
        "zoekterm"
    }

    async fn describe(&self, _conn: &mut SqliteConnection) -> Result<String, ScanError> {
        Ok(format!("Zoekterm '{}'", self.term))
    }

    async fn get(&self, conn: &mut SqliteConnection) -> Result<Vec<ScannerHit>, ScanError> {
        let sql = format!(
            "SELECT nummer FROM Document \
             WHERE (onderwerp LIKE ? OR titel LIKE ?) AND {CUTOFF_CLAUSE} \
             ORDER BY datum ASC, nummer ASC"
        );
        let pattern = format!("%{}%", self.term);
        let rows = sqlx::query_scalar::<_, String>(&sql)
            .bind(&pattern)
            .bind(&pattern)
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

#[cfg(test)]
mod tests {
    use crate::{Scanner, ScannerRegistry};
    use kamerwacht_db::{CorpusDb, ScannerConfig, UserDb};
    use kamerwacht_test_utils::{temp_user_db, CorpusBuilder};
    use tempfile::TempDir;

    async fn scanner_for(db: &UserDb, cutoff: &str) -> Box<dyn Scanner> {
        db.add_scanner(&ScannerConfig {
            id: "s1".to_string(),
            userid: "alice".to_string(),
            soort: "zoekterm".to_string(),
            cutoff: cutoff.to_string(),
            zoekterm: Some("stikstof".to_string()),
            nummer: None,
            commissie: None,
        })
        .await
        .unwrap();
        ScannerRegistry::with_default_kinds()
            .load(db)
            .await
            .unwrap()
            .remove(0)
    }

    #[tokio::test]
    async fn test_matches_subject_and_title_since_cutoff() {
        let tmp = TempDir::new().unwrap();
        let db = temp_user_db(&tmp).await;
        let corpus_path = CorpusBuilder::new(&tmp)
            .await
            .document("2024D00001", "Stikstofbeleid", "", "2024-05-02", "")
            .await
            .document("2024D00002", "", "Kaderwet stikstof", "2024-05-03", "")
            .await
            .document("2024D00003", "Woningbouw", "", "2024-05-04", "")
            .await
            .document("2023D09999", "Stikstofplafond", "", "2023-01-01", "")
            .await
            .finish()
            .await;
        let corpus = CorpusDb::open(&corpus_path, 2).await.unwrap();

        let scanner = scanner_for(&db, "2024-01-01").await;
        let mut lease = corpus.lease().await.unwrap();

        let hits = scanner.get(&mut lease).await.unwrap();
        let identifiers: Vec<&str> = hits.iter().map(|h| h.identifier.as_str()).collect();
        assert_eq!(identifiers, ["2024D00001", "2024D00002"]);

        assert_eq!(
            scanner.describe(&mut lease).await.unwrap(),
            "Zoekterm 'stikstof'"
        );
    }

    #[tokio::test]
    async fn test_empty_cutoff_has_no_lower_bound() {
        let tmp = TempDir::new().unwrap();
        let db = temp_user_db(&tmp).await;
        let corpus_path = CorpusBuilder::new(&tmp)
            .await
            .document("2023D09999", "Stikstofplafond", "", "2023-01-01", "")
            .await
            .finish()
            .await;
        let corpus = CorpusDb::open(&corpus_path, 2).await.unwrap();

        let scanner = scanner_for(&db, "").await;
        let mut lease = corpus.lease().await.unwrap();

        let hits = scanner.get(&mut lease).await.unwrap();
        assert_eq!(hits.len(), 1);
    }
}
