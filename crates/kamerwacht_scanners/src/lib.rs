//! Saved-query scanners over the record corpus.
//!
//! A scanner is one user's saved query, tagged with a kind (`soort`). The
//! kind selects a factory from [`ScannerRegistry`] at load time; rows with
//! a kind no factory is registered for are skipped, not errors, so newer
//! configuration rows survive older binaries.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::SqliteConnection;
use thiserror::Error;
use tracing::{debug, warn};

use kamerwacht_db::{ScannerConfig, UserDb};

mod commissie;
mod dossier;
mod zoekterm;

pub use commissie::CommissieScanner;
pub use dossier::DossierScanner;
pub use zoekterm::ZoektermScanner;

/// Scanner execution errors.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Database error: {0}")]
    Db(#[from] kamerwacht_db::DbError),

    #[error("Invalid scanner configuration: {0}")]
    Config(String),
}

/// One record matched by a scanner in the current run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerHit {
    /// Opaque record identifier: a document number, meeting id, or
    /// activity number, distinguished by shape.
    pub identifier: String,
}

/// One saved query. Executed by exactly one worker per run; read-only
/// afterwards, so the aggregation phase may call `describe` concurrently.
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Configuration row id.
    fn id(&self) -> &str;

    /// Owning user.
    fn userid(&self) -> &str;

    /// Kind tag.
    fn soort(&self) -> &str;

    /// Short human-readable label, rendered via the leased corpus handle.
    async fn describe(&self, conn: &mut SqliteConnection) -> Result<String, ScanError>;

    /// Execute the saved query. An expected empty result is `Ok(vec![])`,
    /// never an error. Must not mutate shared state.
    async fn get(&self, conn: &mut SqliteConnection) -> Result<Vec<ScannerHit>, ScanError>;
}

/// Factory: typed configuration row in, boxed scanner out.
pub type ScannerFactory = fn(&ScannerConfig) -> Result<Box<dyn Scanner>, ScanError>;

/// Kind-tag → factory table. Built once at startup and passed by
/// reference into the load step.
pub struct ScannerRegistry {
    factories: HashMap<String, ScannerFactory>,
}

impl ScannerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry with all built-in kinds registered.
    pub fn with_default_kinds() -> Self {
        let mut registry = Self::new();
        registry.register("zoekterm", zoekterm::make);
        registry.register("dossier", dossier::make);
        registry.register("commissie", commissie::make);
        registry
    }

    /// Register a factory for a kind tag, replacing any previous one.
    pub fn register(&mut self, soort: &str, factory: ScannerFactory) {
        self.factories.insert(soort.to_string(), factory);
    }

    /// Load all configured scanners from the user database.
    ///
    /// Unknown kinds are skipped silently; a known kind whose
    /// configuration is invalid is logged and skipped, and the load
    /// continues.
    pub async fn load(&self, db: &UserDb) -> Result<Vec<Box<dyn Scanner>>, ScanError> {
        let configs = db.load_scanner_configs().await?;
        let mut scanners: Vec<Box<dyn Scanner>> = Vec::with_capacity(configs.len());

        for config in &configs {
            let Some(factory) = self.factories.get(&config.soort) else {
                debug!(id = %config.id, soort = %config.soort, "No factory for scanner kind, skipping");
                continue;
            };
            match factory(config) {
                Ok(scanner) => scanners.push(scanner),
                Err(err) => {
                    warn!(id = %config.id, soort = %config.soort, error = %err, "Skipping misconfigured scanner");
                }
            }
        }

        Ok(scanners)
    }
}

/// Shared WHERE fragment for the resume cutoff. The scanner binds its
/// cutoff twice; an empty cutoff means "no lower bound".
pub(crate) const CUTOFF_CLAUSE: &str = "(? = '' OR datum >= ?)";
