//! End-to-end pipeline tests: scan, ledger, grouping, dispatch, cutoffs.

use std::sync::Arc;

use sqlx::SqliteConnection;
use tempfile::TempDir;

use kamerwacht_alert::{MemoryMailer, Pipeline, PipelineConfig};
use kamerwacht_db::{today_marker, CorpusDb, ScannerConfig, UserDb};
use kamerwacht_scanners::{ScanError, Scanner, ScannerHit, ScannerRegistry};
use kamerwacht_test_utils::{temp_user_db, CorpusBuilder};

fn zoekterm_row(id: &str, userid: &str, term: &str) -> ScannerConfig {
    ScannerConfig {
        id: id.to_string(),
        userid: userid.to_string(),
        soort: "zoekterm".to_string(),
        cutoff: String::new(),
        zoekterm: Some(term.to_string()),
        nummer: None,
        commissie: None,
    }
}

fn pipeline(users: &UserDb, corpus: &CorpusDb, mailer: &Arc<MemoryMailer>) -> Pipeline {
    Pipeline::new(
        users.clone(),
        corpus.clone(),
        mailer.clone(),
        PipelineConfig {
            workers: 4,
            dry_run: false,
        },
    )
}

/// A scanner whose `get` always fails, for isolation tests.
struct BrokenScanner {
    id: String,
    userid: String,
}

#[async_trait::async_trait]
impl Scanner for BrokenScanner {
    fn id(&self) -> &str {
        &self.id
    }

    fn userid(&self) -> &str {
        &self.userid
    }

    fn soort(&self) -> &str {
        "broken"
    }

    async fn describe(&self, _conn: &mut SqliteConnection) -> Result<String, ScanError> {
        Ok(format!("Broken {}", self.id))
    }

    async fn get(&self, _conn: &mut SqliteConnection) -> Result<Vec<ScannerHit>, ScanError> {
        Err(ScanError::Config("synthetic failure".to_string()))
    }
}

fn make_broken(config: &ScannerConfig) -> Result<Box<dyn Scanner>, ScanError> {
    Ok(Box::new(BrokenScanner {
        id: config.id.clone(),
        userid: config.userid.clone(),
    }))
}

#[tokio::test]
async fn test_at_most_once_and_grouping() {
    let tmp = TempDir::new().unwrap();
    let users = temp_user_db(&tmp).await;
    users.set_user_email("alice", "alice@example.nl").await.unwrap();
    users.add_scanner(&zoekterm_row("s1", "alice", "stikstof")).await.unwrap();
    users.add_scanner(&zoekterm_row("s2", "alice", "beleid")).await.unwrap();

    let corpus_path = CorpusBuilder::new(&tmp)
        .await
        // Matched by both scanners
        .document(
            "76423359-0db5-4503-8e41-b8440ab71faf",
            "Stikstofbeleid",
            "",
            "2024-05-01",
            "",
        )
        .await
        // Matched by the stikstof scanner alone
        .document("2024D00002", "Stikstofplafond", "", "2024-05-02", "")
        .await
        .finish()
        .await;
    let corpus = CorpusDb::open(&corpus_path, 4).await.unwrap();

    let mailer = Arc::new(MemoryMailer::new());
    let registry = ScannerRegistry::with_default_kinds();

    let summary = pipeline(&users, &corpus, &mailer).run(&registry).await.unwrap();

    assert_eq!(summary.scanners_run, 2);
    assert_eq!(summary.new_hits, 2);
    assert_eq!(summary.digests_sent, 1);
    assert_eq!(summary.dispatch_failures, 0);

    // Exactly one ledger entry per (user, identifier), no matter how many
    // scanners matched it
    let entries = users.ledger_entries("alice").await.unwrap();
    assert_eq!(entries.len(), 2);
    let identifiers: Vec<&str> = entries.iter().map(|e| e.identifier.as_str()).collect();
    assert!(identifiers.contains(&"76423359-0db5-4503-8e41-b8440ab71faf"));
    assert!(identifiers.contains(&"2024D00002"));

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    let mail = &sent[0];
    assert_eq!(mail.to, "alice@example.nl");
    assert_eq!(
        mail.subject,
        "[kamerwacht alert] Zoekterm 'stikstof', Zoekterm 'beleid'"
    );

    // The doubly-matched record appears once, attributed to both scanners;
    // the singly-matched record sits in its own group
    assert!(mail.text.contains("Zoekterm 'stikstof', Zoekterm 'beleid':"));
    assert!(mail
        .text
        .contains("- 76423359: Stikstofbeleid [76423359-0db5-4503-8e41-b8440ab71faf]"));
    assert!(mail.text.contains("- 2024D00002: Stikstofplafond"));
    assert_eq!(mail.text.matches("76423359-0db5").count(), 1);

    assert!(mail.html.contains("<li><strong>76423359</strong>: Stikstofbeleid</li>"));
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let users = temp_user_db(&tmp).await;
    users.set_user_email("alice", "alice@example.nl").await.unwrap();
    users.add_scanner(&zoekterm_row("s1", "alice", "stikstof")).await.unwrap();

    let corpus_path = CorpusBuilder::new(&tmp)
        .await
        .document("2024D00001", "Stikstofbeleid", "", "2024-05-01", "")
        .await
        .finish()
        .await;
    let corpus = CorpusDb::open(&corpus_path, 4).await.unwrap();
    let registry = ScannerRegistry::with_default_kinds();

    let mailer1 = Arc::new(MemoryMailer::new());
    let first = pipeline(&users, &corpus, &mailer1).run(&registry).await.unwrap();
    assert_eq!(first.digests_sent, 1);
    assert_eq!(mailer1.sent().len(), 1);
    let count_after_first = users.ledger_count().await.unwrap();

    // No new source data: the ledger suppresses everything.
    // The cutoff alone would not (the record is from the past, but the
    // first run already delivered it today).
    let mailer2 = Arc::new(MemoryMailer::new());
    let second = pipeline(&users, &corpus, &mailer2).run(&registry).await.unwrap();

    assert_eq!(second.new_hits, 0);
    assert_eq!(second.digests_sent, 0);
    assert_eq!(users.ledger_count().await.unwrap(), count_after_first);
    assert!(mailer2.sent().is_empty());
}

#[tokio::test]
async fn test_failing_scanner_does_not_affect_others() {
    let tmp = TempDir::new().unwrap();
    let users = temp_user_db(&tmp).await;
    users.set_user_email("alice", "alice@example.nl").await.unwrap();
    users.set_user_email("bob", "bob@example.nl").await.unwrap();

    users
        .add_scanner(&ScannerConfig {
            id: "s1".to_string(),
            userid: "alice".to_string(),
            soort: "broken".to_string(),
            cutoff: String::new(),
            zoekterm: None,
            nummer: None,
            commissie: None,
        })
        .await
        .unwrap();
    users.add_scanner(&zoekterm_row("s2", "bob", "wonen")).await.unwrap();

    let corpus_path = CorpusBuilder::new(&tmp)
        .await
        .document("2024D00007", "Woningbouw en wonen", "", "2024-05-01", "")
        .await
        .finish()
        .await;
    let corpus = CorpusDb::open(&corpus_path, 4).await.unwrap();

    let mut registry = ScannerRegistry::with_default_kinds();
    registry.register("broken", make_broken);

    let mailer = Arc::new(MemoryMailer::new());
    let summary = pipeline(&users, &corpus, &mailer).run(&registry).await.unwrap();

    assert_eq!(summary.scanners_run, 2);
    assert_eq!(summary.new_hits, 1);
    assert_eq!(summary.digests_sent, 1);

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "bob@example.nl");

    // The failed scanner's cutoff still advanced
    let marker = today_marker();
    assert_eq!(users.scanner_cutoff("s1").await.unwrap(), marker);
    assert_eq!(users.scanner_cutoff("s2").await.unwrap(), marker);
}

#[tokio::test]
async fn test_missing_email_fails_that_user_only() {
    let tmp = TempDir::new().unwrap();
    let users = temp_user_db(&tmp).await;
    // alice has no users row
    users.set_user_email("bob", "bob@example.nl").await.unwrap();
    users.add_scanner(&zoekterm_row("s1", "alice", "stikstof")).await.unwrap();
    users.add_scanner(&zoekterm_row("s2", "bob", "stikstof")).await.unwrap();

    let corpus_path = CorpusBuilder::new(&tmp)
        .await
        .document("2024D00001", "Stikstofbeleid", "", "2024-05-01", "")
        .await
        .finish()
        .await;
    let corpus = CorpusDb::open(&corpus_path, 4).await.unwrap();
    let registry = ScannerRegistry::with_default_kinds();

    let mailer = Arc::new(MemoryMailer::new());
    let summary = pipeline(&users, &corpus, &mailer).run(&registry).await.unwrap();

    assert_eq!(summary.digests_sent, 1);
    assert_eq!(summary.dispatch_failures, 1);

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "bob@example.nl");
}

#[tokio::test]
async fn test_zero_hit_scanner_cutoff_still_advances() {
    let tmp = TempDir::new().unwrap();
    let users = temp_user_db(&tmp).await;
    users.add_scanner(&zoekterm_row("s1", "alice", "nergens-te-vinden")).await.unwrap();

    let corpus_path = CorpusBuilder::new(&tmp).await.finish().await;
    let corpus = CorpusDb::open(&corpus_path, 4).await.unwrap();
    let registry = ScannerRegistry::with_default_kinds();

    let mailer = Arc::new(MemoryMailer::new());
    let summary = pipeline(&users, &corpus, &mailer).run(&registry).await.unwrap();

    assert_eq!(summary.new_hits, 0);
    assert_eq!(summary.digests_sent, 0);
    assert!(mailer.sent().is_empty());
    assert_eq!(users.scanner_cutoff("s1").await.unwrap(), today_marker());
}

#[tokio::test]
async fn test_dry_run_writes_ledger_but_sends_nothing() {
    let tmp = TempDir::new().unwrap();
    let users = temp_user_db(&tmp).await;
    users.set_user_email("alice", "alice@example.nl").await.unwrap();
    users.add_scanner(&zoekterm_row("s1", "alice", "stikstof")).await.unwrap();

    let corpus_path = CorpusBuilder::new(&tmp)
        .await
        .document("2024D00001", "Stikstofbeleid", "", "2024-05-01", "")
        .await
        .finish()
        .await;
    let corpus = CorpusDb::open(&corpus_path, 4).await.unwrap();
    let registry = ScannerRegistry::with_default_kinds();

    let mailer = Arc::new(MemoryMailer::new());
    let pipeline = Pipeline::new(
        users.clone(),
        corpus.clone(),
        mailer.clone(),
        PipelineConfig {
            workers: 2,
            dry_run: true,
        },
    );

    let summary = pipeline.run(&registry).await.unwrap();

    assert_eq!(summary.digests_sent, 1);
    assert!(mailer.sent().is_empty());
    assert_eq!(users.ledger_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_pool_drains_more_scanners_than_workers() {
    let tmp = TempDir::new().unwrap();
    let users = temp_user_db(&tmp).await;

    let mut builder = CorpusBuilder::new(&tmp).await;
    for n in 0..6 {
        let userid = format!("user{n}");
        users.set_user_email(&userid, &format!("{userid}@example.nl")).await.unwrap();
        users
            .add_scanner(&zoekterm_row(&format!("s{n}"), &userid, &format!("onderwerp{n}")))
            .await
            .unwrap();
        builder = builder
            .document(&format!("2024D0000{n}"), &format!("Over onderwerp{n}"), "", "2024-05-01", "")
            .await;
    }
    let corpus_path = builder.finish().await;
    let corpus = CorpusDb::open(&corpus_path, 4).await.unwrap();
    let registry = ScannerRegistry::with_default_kinds();

    let mailer = Arc::new(MemoryMailer::new());
    let summary = pipeline(&users, &corpus, &mailer).run(&registry).await.unwrap();

    assert_eq!(summary.scanners_run, 6);
    assert_eq!(summary.new_hits, 6);
    assert_eq!(summary.digests_sent, 6);
    assert_eq!(mailer.sent().len(), 6);
    assert_eq!(users.ledger_count().await.unwrap(), 6);
}
