//! Row types for kamerwacht database entities.

use serde::{Deserialize, Serialize};

/// One row of the `scanners` table: identity, owner, kind tag, resume
/// cutoff, and the kind-specific columns the matching factory consumes.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScannerConfig {
    /// Unique scanner identifier
    pub id: String,
    /// Owning user
    pub userid: String,
    /// Kind tag, selects the factory at load time
    pub soort: String,
    /// Resume marker; empty means "no lower bound"
    pub cutoff: String,
    /// Search term (`zoekterm` scanners)
    pub zoekterm: Option<String>,
    /// Dossier number (`dossier` scanners)
    pub nummer: Option<String>,
    /// Committee id (`commissie` scanners)
    pub commissie: Option<String>,
}

/// One row of the `sentNotification` ledger.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LedgerEntry {
    pub identifier: String,
    pub userid: String,
    pub soort: String,
    /// Local time, `%Y-%m-%dT%H:%M:%S`
    pub timestamp: String,
    #[sqlx(rename = "scannerId")]
    pub scanner_id: String,
}
