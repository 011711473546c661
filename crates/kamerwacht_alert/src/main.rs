//! kamerwacht alert sweep binary.
//!
//! Runs one sweep and exits: scan every configured scanner, mail every
//! user with new hits one digest, advance the cutoffs.
//!
//! Usage:
//!     kamerwacht-alert --user-db user.sqlite3 --corpus-db tkindex.sqlite3

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use kamerwacht_alert::{AlertArgs, Mailer, Pipeline, PipelineConfig, SmtpMailer};
use kamerwacht_db::{CorpusDb, UserDb};
use kamerwacht_logging::{init_logging, LogConfig};
use kamerwacht_scanners::ScannerRegistry;

#[tokio::main]
async fn main() -> Result<()> {
    let args = AlertArgs::parse();

    init_logging(LogConfig {
        app_name: "kamerwacht-alert",
        verbose: args.verbose,
        log_file: args.log_file.clone(),
    })?;

    info!("Starting kamerwacht alert sweep");
    info!("  User db:   {}", args.user_db.display());
    info!("  Corpus db: {}", args.corpus_db.display());
    info!("  Workers:   {}", args.workers);

    // Failure to open either store is the only hard abort
    let users = UserDb::open(&args.user_db)
        .await
        .context("Cannot open user database")?;
    let corpus = CorpusDb::open(&args.corpus_db, args.workers.max(2) as u32)
        .await
        .context("Cannot open corpus database")?;

    let registry = ScannerRegistry::with_default_kinds();
    let mailer: Arc<dyn Mailer> = Arc::new(SmtpMailer::new(&args.relay, &args.sender)?);

    let pipeline = Pipeline::new(
        users,
        corpus,
        mailer,
        PipelineConfig {
            workers: args.workers,
            dry_run: args.dry_run,
        },
    );

    pipeline.run(&registry).await?;

    Ok(())
}
