//! kamerwacht alert sweep
//!
//! Scans the ingested record corpus once on behalf of every registered
//! scanner, consolidates the newly-matching records per user, and sends
//! each user a single digest email.

pub mod digest;
pub mod mailer;
pub mod pipeline;
pub mod render;

pub use mailer::{MailError, Mailer, MemoryMailer, OutgoingMail, SmtpMailer};
pub use pipeline::{Pipeline, PipelineConfig, RunSummary, DEFAULT_WORKERS};
pub use render::{DigestRenderer, RenderError};

use std::path::PathBuf;

#[derive(clap::Parser, Debug)]
#[command(name = "kamerwacht-alert", about = "Scan-and-alert sweep for kamerwacht")]
pub struct AlertArgs {
    /// User database (scanners, ledger, user directory)
    #[arg(long, env = "KAMERWACHT_USER_DB", default_value = "user.sqlite3")]
    pub user_db: PathBuf,

    /// Ingested record corpus (opened read-only)
    #[arg(long, env = "KAMERWACHT_CORPUS_DB", default_value = "tkindex.sqlite3")]
    pub corpus_db: PathBuf,

    /// Number of scan workers
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// SMTP relay host for outbound digests
    #[arg(long, env = "KAMERWACHT_RELAY", default_value = "127.0.0.1")]
    pub relay: String,

    /// Sender address on outbound digests
    #[arg(long, env = "KAMERWACHT_SENDER", default_value = "kamerwacht@localhost")]
    pub sender: String,

    /// Render and log digests instead of sending them
    #[arg(long)]
    pub dry_run: bool,

    /// Append logs to this file in addition to stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Verbose (debug-level) logging
    #[arg(short, long)]
    pub verbose: bool,
}
