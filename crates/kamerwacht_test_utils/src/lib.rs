//! Temp-database fixtures for kamerwacht tests.
//!
//! # Usage
//!
//! ```rust,ignore
//! use kamerwacht_test_utils::{temp_user_db, CorpusBuilder};
//!
//! #[tokio::test]
//! async fn test_scan() {
//!     let tmp = tempfile::TempDir::new().unwrap();
//!     let users = temp_user_db(&tmp).await;
//!
//!     let corpus_path = CorpusBuilder::new(&tmp)
//!         .await
//!         .document("2024D00001", "Stikstofbeleid", "", "2024-05-01", "")
//!         .await
//!         .finish()
//!         .await;
//!     // ...
//! }
//! ```

use std::path::PathBuf;

use sqlx::sqlite::SqlitePool;
use tempfile::TempDir;

use kamerwacht_db::UserDb;

/// Open a fresh user database inside the given temp dir.
pub async fn temp_user_db(tmp: &TempDir) -> UserDb {
    UserDb::open(tmp.path().join("user.sqlite3"))
        .await
        .expect("open temp user db")
}

/// Builds a corpus file with the tables the scanners and the description
/// chain read, seeded row by row.
pub struct CorpusBuilder {
    pool: SqlitePool,
    path: PathBuf,
}

impl CorpusBuilder {
    /// Create an empty corpus database inside the given temp dir.
    pub async fn new(tmp: &TempDir) -> Self {
        let path = tmp.path().join("corpus.sqlite3");
        let url = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&url).await.expect("create corpus db");

        for ddl in [
            "CREATE TABLE Document (nummer TEXT, soort TEXT, onderwerp TEXT, titel TEXT, datum TEXT, dossiernummer TEXT)",
            "CREATE TABLE Vergadering (id TEXT, titel TEXT, datum TEXT)",
            "CREATE TABLE Activiteit (nummer TEXT, soort TEXT, onderwerp TEXT, datum TEXT, commissieId TEXT)",
            "CREATE TABLE Commissie (id TEXT, naam TEXT)",
            "CREATE TABLE Kamerstukdossier (nummer TEXT, titel TEXT)",
        ] {
            sqlx::query(ddl).execute(&pool).await.expect("corpus ddl");
        }

        Self { pool, path }
    }

    pub async fn document(
        self,
        nummer: &str,
        onderwerp: &str,
        titel: &str,
        datum: &str,
        dossiernummer: &str,
    ) -> Self {
        sqlx::query(
            "INSERT INTO Document (nummer, soort, onderwerp, titel, datum, dossiernummer) \
             VALUES (?, 'Brief', ?, ?, ?, ?)",
        )
        .bind(nummer)
        .bind(onderwerp)
        .bind(titel)
        .bind(datum)
        .bind(dossiernummer)
        .execute(&self.pool)
        .await
        .expect("insert document");
        self
    }

    pub async fn vergadering(self, id: &str, titel: &str, datum: &str) -> Self {
        sqlx::query("INSERT INTO Vergadering (id, titel, datum) VALUES (?, ?, ?)")
            .bind(id)
            .bind(titel)
            .bind(datum)
            .execute(&self.pool)
            .await
            .expect("insert vergadering");
        self
    }

    pub async fn activiteit(
        self,
        nummer: &str,
        soort: &str,
        onderwerp: &str,
        datum: Option<&str>,
        commissie_id: &str,
    ) -> Self {
        sqlx::query(
            "INSERT INTO Activiteit (nummer, soort, onderwerp, datum, commissieId) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(nummer)
        .bind(soort)
        .bind(onderwerp)
        .bind(datum)
        .bind(commissie_id)
        .execute(&self.pool)
        .await
        .expect("insert activiteit");
        self
    }

    pub async fn commissie(self, id: &str, naam: &str) -> Self {
        sqlx::query("INSERT INTO Commissie (id, naam) VALUES (?, ?)")
            .bind(id)
            .bind(naam)
            .execute(&self.pool)
            .await
            .expect("insert commissie");
        self
    }

    pub async fn kamerstukdossier(self, nummer: &str, titel: &str) -> Self {
        sqlx::query("INSERT INTO Kamerstukdossier (nummer, titel) VALUES (?, ?)")
            .bind(nummer)
            .bind(titel)
            .execute(&self.pool)
            .await
            .expect("insert kamerstukdossier");
        self
    }

    /// Close the seeding pool and hand back the corpus path.
    pub async fn finish(self) -> PathBuf {
        self.pool.close().await;
        self.path
    }
}
