//! The scan-and-dispatch pipeline.
//!
//! One run: load scanners → fan out over a fixed worker pool → fan in to a
//! shared per-user hit map with ledger checks → join → group per user →
//! render and dispatch one digest per user → advance every scanner's
//! cutoff.
//!
//! The aggregation map and the ledger check+append share one coordination
//! lock. The lock is held per hit, never across a scan, so ledger
//! check-then-insert is atomic relative to every other worker: when two
//! scanners of the same user surface the same identifier concurrently, the
//! second one to acquire the lock joins the first one's attribution set
//! and the ledger receives exactly one entry for the pair.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use kamerwacht_db::{today_marker, CorpusDb, UserDb};
use kamerwacht_scanners::{ScanError, Scanner, ScannerRegistry};

use crate::digest::{
    display_token, group_by_scanner_set, subject, DigestGroup, DigestHit, DigestPayload,
};
use crate::mailer::{Mailer, OutgoingMail};
use crate::render::DigestRenderer;

/// Number of concurrent scan workers when not overridden.
pub const DEFAULT_WORKERS: usize = 4;

/// userid → identifier → indexes of the scanners that matched it.
type HitMap = BTreeMap<String, BTreeMap<String, BTreeSet<usize>>>;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Worker count; workers pull scanners from a shared index, so a slow
    /// scanner never stalls the others.
    pub workers: usize,
    /// Render and log digests without sending them. Ledger writes and
    /// cutoff advancement still happen.
    pub dry_run: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            dry_run: false,
        }
    }
}

/// Outcome counters for one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub scanners_run: usize,
    pub new_hits: usize,
    pub digests_sent: usize,
    pub dispatch_failures: usize,
}

pub struct Pipeline {
    users: UserDb,
    corpus: CorpusDb,
    mailer: Arc<dyn Mailer>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        users: UserDb,
        corpus: CorpusDb,
        mailer: Arc<dyn Mailer>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            users,
            corpus,
            mailer,
            config,
        }
    }

    /// Execute one full sweep.
    pub async fn run(&self, registry: &ScannerRegistry) -> Result<RunSummary> {
        let scanners = registry
            .load(&self.users)
            .await
            .context("Failed to load scanners")?;
        info!(count = scanners.len(), "Loaded scanners");

        let scanners: Arc<[Box<dyn Scanner>]> = scanners.into();

        let all = self.scan_all(Arc::clone(&scanners)).await;
        let new_hits = all.values().map(|content| content.len()).sum();

        let mut summary = RunSummary {
            scanners_run: scanners.len(),
            new_hits,
            ..RunSummary::default()
        };

        let renderer = DigestRenderer::new().context("Failed to load digest templates")?;
        for (userid, content) in &all {
            match self
                .dispatch_for_user(&scanners, &renderer, userid, content)
                .await
            {
                Ok(()) => summary.digests_sent += 1,
                Err(err) => {
                    // One user's failure never aborts the run
                    error!(%userid, error = %err, "Digest dispatch failed");
                    summary.dispatch_failures += 1;
                }
            }
        }

        // Every scanner's window advances, hits or not, failure or not.
        let marker = today_marker();
        for scanner in scanners.iter() {
            self.users
                .advance_cutoff(scanner.id(), &marker)
                .await
                .with_context(|| format!("Failed to advance cutoff for '{}'", scanner.id()))?;
        }

        info!(?summary, "Sweep finished");
        Ok(summary)
    }

    /// Fan out over the worker pool and fan in to the shared hit map.
    /// Returns only after every worker has finished.
    async fn scan_all(&self, scanners: Arc<[Box<dyn Scanner>]>) -> HitMap {
        let state = Arc::new(Mutex::new(HitMap::new()));
        let next = Arc::new(AtomicUsize::new(0));

        let mut workers = Vec::with_capacity(self.config.workers);
        for worker_id in 0..self.config.workers {
            let scanners = Arc::clone(&scanners);
            let state = Arc::clone(&state);
            let next = Arc::clone(&next);
            let users = self.users.clone();
            let corpus = self.corpus.clone();

            workers.push(tokio::spawn(async move {
                // One leased corpus handle per worker, held for its lifetime
                let mut lease = match corpus.lease().await {
                    Ok(lease) => lease,
                    Err(err) => {
                        error!(worker_id, error = %err, "Worker could not lease a corpus handle");
                        return;
                    }
                };

                // Next-free-slot claim: no two workers run the same scanner,
                // and no worker sits idle while unclaimed scanners remain.
                loop {
                    let n = next.fetch_add(1, Ordering::SeqCst);
                    if n >= scanners.len() {
                        break;
                    }
                    let scanner = scanners[n].as_ref();
                    if let Err(err) = run_scanner(n, scanner, &mut lease, &users, &state).await {
                        warn!(scanner = scanner.id(), error = %err, "Scanner failed");
                    }
                }
            }));
        }

        // Hard barrier: aggregation never starts while a worker is running
        for worker in workers {
            if let Err(err) = worker.await {
                error!(error = %err, "Scan worker panicked");
            }
        }

        let mut state = state.lock().await;
        std::mem::take(&mut *state)
    }

    /// Group, render, and send one user's digest.
    async fn dispatch_for_user(
        &self,
        scanners: &[Box<dyn Scanner>],
        renderer: &DigestRenderer,
        userid: &str,
        content: &BTreeMap<String, BTreeSet<usize>>,
    ) -> Result<()> {
        let grouped = group_by_scanner_set(content);

        // Each scanner label is rendered once per digest
        let mut matched: BTreeSet<usize> = BTreeSet::new();
        for scanner_set in grouped.keys() {
            matched.extend(scanner_set.iter().copied());
        }
        let mut labels: BTreeMap<usize, String> = BTreeMap::new();
        for &index in &matched {
            let mut lease = self.corpus.lease().await?;
            let label = scanners[index].describe(&mut lease).await?;
            labels.insert(index, label);
        }

        let mut groups = Vec::with_capacity(grouped.len());
        for (scanner_set, identifiers) in &grouped {
            let scannernames = scanner_set.iter().map(|index| labels[index].clone()).collect();

            let mut hits = Vec::with_capacity(identifiers.len());
            for identifier in identifiers {
                let description = self.corpus.describe_identifier(identifier).await?;
                hits.push(DigestHit {
                    nummer: identifier.clone(),
                    dispnummer: display_token(identifier),
                    description,
                });
            }
            groups.push(DigestGroup { scannernames, hits });
        }
        let payload = DigestPayload { payload: groups };
        debug!(userid, payload = %serde_json::to_string(&payload).unwrap_or_default(), "Digest payload");

        let all_labels: Vec<String> = labels.into_values().collect();
        let mail = OutgoingMail {
            to: self.users.email_for_user(userid).await?,
            subject: subject(&all_labels),
            text: renderer.render_text(&payload)?,
            html: renderer.render_html(&payload)?,
        };

        if self.config.dry_run {
            info!(userid, to = %mail.to, subject = %mail.subject, "Dry run, digest not sent");
            return Ok(());
        }

        self.mailer.send(&mail).await?;
        info!(userid, to = %mail.to, "Digest sent");
        Ok(())
    }
}

/// Run one claimed scanner and feed its hits through the ledger check into
/// the shared map. Errors from `describe` or `get` abort only this
/// scanner's iteration.
async fn run_scanner(
    index: usize,
    scanner: &dyn Scanner,
    lease: &mut kamerwacht_db::CorpusLease,
    users: &UserDb,
    state: &Mutex<HitMap>,
) -> std::result::Result<(), ScanError> {
    let label = scanner.describe(&mut *lease).await?;
    info!(scanner = %label, "Running scanner");

    let hits = scanner.get(&mut *lease).await?;

    for hit in hits {
        // Coordination lock: ledger check, map insert, and ledger append
        // are one atomic step with respect to all other workers.
        let mut all = state.lock().await;

        // Already accepted this run (by another of this user's scanners):
        // attribute it to this scanner too, without a second ledger entry.
        if let Some(matched_by) = all
            .get_mut(scanner.userid())
            .and_then(|content| content.get_mut(&hit.identifier))
        {
            matched_by.insert(index);
            continue;
        }
        if users.was_notified(scanner.userid(), &hit.identifier).await {
            debug!(identifier = %hit.identifier, "Skipping already-notified record");
            continue;
        }
        info!(identifier = %hit.identifier, "New record");
        all.entry(scanner.userid().to_string())
            .or_default()
            .insert(hit.identifier.clone(), BTreeSet::from([index]));
        users
            .record_notified(scanner.userid(), &hit.identifier, scanner.soort(), scanner.id())
            .await?;
    }

    Ok(())
}
