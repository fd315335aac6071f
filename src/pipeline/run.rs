// src/pipeline/run.rs

//! Per-source orchestration: fetch, diff, notify, commit.
//!
//! Each source walks `Fetching -> Diffing -> Notifying -> Committing -> Done`
//! on its own. A failure while fetching or diffing leaves the stored snapshot
//! untouched. A failed fan-out still commits, so the same change is not
//! announced again on the next run. Sources never affect each other.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::error::AppError;
use crate::locale::Locales;
use crate::models::{Config, Snapshot};
use crate::notify::{DeliveryAttempt, DeliveryChannel, Notifier, Renderer};
use crate::pipeline::{CircuitBreaker, RunBudget, backfill_degraded, collapse_duplicates, diff};
use crate::services::{ScrapeOutcome, SourceRegistry, SourceScraper};
use crate::storage::{SnapshotStore, SubscriberDirectory};

/// Stages of one source run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetching,
    Diffing,
    Notifying,
    Committing,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetching => "fetching",
            Stage::Diffing => "diffing",
            Stage::Notifying => "notifying",
            Stage::Committing => "committing",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Terminal state of one source run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SourceState {
    Done,
    Failed { stage: Stage, error: String },
}

/// What happened to one source during a run.
#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub source_id: String,
    pub display_name: String,
    pub state: SourceState,

    pub entries: usize,
    pub skipped_entries: Vec<String>,
    pub detail_total: usize,
    pub detail_failures: usize,
    pub detail_skipped: usize,

    pub added: usize,
    pub removed: usize,
    pub modified: usize,

    pub deliveries: Vec<DeliveryAttempt>,

    /// Set when the subscriber list could not be read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_error: Option<String>,

    /// The drop guard rejected the scrape. It keeps doing so against the same
    /// stored snapshot until a forced run accepts the smaller programme.
    pub guard_blocked: bool,

    pub committed: bool,
}

impl SourceReport {
    fn new(source_id: &str, display_name: &str) -> Self {
        Self {
            source_id: source_id.to_string(),
            display_name: display_name.to_string(),
            state: SourceState::Done,
            entries: 0,
            skipped_entries: Vec::new(),
            detail_total: 0,
            detail_failures: 0,
            detail_skipped: 0,
            added: 0,
            removed: 0,
            modified: 0,
            deliveries: Vec::new(),
            notify_error: None,
            guard_blocked: false,
            committed: false,
        }
    }

    fn record_scrape(&mut self, outcome: &ScrapeOutcome) {
        self.skipped_entries = outcome.skipped_entries.clone();
        self.detail_total = outcome.detail_total;
        self.detail_failures = outcome.detail_failures;
        self.detail_skipped = outcome.detail_skipped;
    }

    fn fail(mut self, stage: Stage, error: AppError) -> Self {
        self.state = SourceState::Failed {
            stage,
            error: error.to_string(),
        };
        self
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, SourceState::Failed { .. })
    }

    pub fn failed_deliveries(&self) -> usize {
        self.deliveries.iter().filter(|a| !a.is_delivered()).count()
    }
}

/// Result of one pipeline run, sources in registry order.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sources: Vec<SourceReport>,
}

impl RunReport {
    pub fn failed_sources(&self) -> impl Iterator<Item = &SourceReport> {
        self.sources.iter().filter(|s| s.is_failed())
    }

    pub fn has_failures(&self) -> bool {
        self.failed_sources().next().is_some()
    }

    /// Sources whose scrape the drop guard rejected.
    pub fn guard_blocked(&self) -> impl Iterator<Item = &SourceReport> {
        self.sources.iter().filter(|s| s.guard_blocked)
    }
}

/// Switches for one run.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Skip the drop guard
    pub force: bool,
    /// Persist the new snapshot; off for dry runs
    pub commit: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            force: false,
            commit: true,
        }
    }
}

/// Runs every registered source through the snapshot-diff-notify cycle.
pub struct Pipeline {
    registry: SourceRegistry,
    snapshots: Arc<dyn SnapshotStore>,
    subscribers: Arc<dyn SubscriberDirectory>,
    notifier: Notifier,
    guard: CircuitBreaker,
    max_concurrent_sources: usize,
    notify_first_run: bool,
}

impl Pipeline {
    pub fn new(
        registry: SourceRegistry,
        snapshots: Arc<dyn SnapshotStore>,
        subscribers: Arc<dyn SubscriberDirectory>,
        notifier: Notifier,
    ) -> Self {
        Self {
            registry,
            snapshots,
            subscribers,
            notifier,
            guard: CircuitBreaker::new(),
            max_concurrent_sources: 1,
            notify_first_run: true,
        }
    }

    /// Wire a pipeline from configuration around the given collaborators.
    pub fn from_config(
        config: &Config,
        registry: SourceRegistry,
        snapshots: Arc<dyn SnapshotStore>,
        subscribers: Arc<dyn SubscriberDirectory>,
        channel: Arc<dyn DeliveryChannel>,
        locales: Arc<Locales>,
    ) -> Self {
        let notifier = Notifier::new(
            channel,
            locales,
            Renderer::new(config.notify.max_screenings_per_entry),
            config.notify.max_concurrent_deliveries,
        );
        Self::new(registry, snapshots, subscribers, notifier)
            .with_guard(CircuitBreaker::with_config(config.guard.clone()))
            .with_max_concurrent_sources(config.pipeline.max_concurrent_sources)
            .with_notify_first_run(config.pipeline.notify_first_run)
    }

    pub fn with_guard(mut self, guard: CircuitBreaker) -> Self {
        self.guard = guard;
        self
    }

    pub fn with_max_concurrent_sources(mut self, max: usize) -> Self {
        self.max_concurrent_sources = max.max(1);
        self
    }

    pub fn with_notify_first_run(mut self, enabled: bool) -> Self {
        self.notify_first_run = enabled;
        self
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Process every registered source.
    pub async fn run(&self, budget: &RunBudget, options: RunOptions) -> RunReport {
        let started_at = Utc::now();
        log::info!(
            "Starting run over {} source(s) (force={}, commit={})",
            self.registry.len(),
            options.force,
            options.commit
        );

        let mut reports: Vec<(usize, SourceReport)> =
            stream::iter(self.registry.all().iter().enumerate())
                .map(|(i, scraper)| async move {
                    (i, self.run_source(scraper.as_ref(), budget, options).await)
                })
                .buffer_unordered(self.max_concurrent_sources)
                .collect()
                .await;
        reports.sort_by_key(|(i, _)| *i);

        let report = RunReport {
            started_at,
            finished_at: Utc::now(),
            sources: reports.into_iter().map(|(_, report)| report).collect(),
        };

        let failed = report.failed_sources().count();
        log::info!(
            "Run finished in {}ms: {} source(s) ok, {} failed",
            (report.finished_at - report.started_at).num_milliseconds(),
            report.sources.len() - failed,
            failed
        );
        report
    }

    /// Process one source, absorbing every error into the report.
    pub async fn run_source(
        &self,
        scraper: &dyn SourceScraper,
        budget: &RunBudget,
        options: RunOptions,
    ) -> SourceReport {
        let source_id = scraper.source_id();
        let display_name = scraper.display_name();
        let mut report = SourceReport::new(source_id, display_name);

        log::info!("[{source_id}] Fetching {}", scraper.source_url());
        let outcome = match scraper.scrape(budget).await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("[{source_id}] Fetch failed: {e}");
                return report.fail(Stage::Fetching, e);
            }
        };
        report.record_scrape(&outcome);
        for skipped in &outcome.skipped_entries {
            log::warn!("[{source_id}] Skipped {skipped}");
        }

        let prior = match self.snapshots.load(source_id).await {
            Ok(prior) => prior,
            Err(e) => {
                log::error!("[{source_id}] Loading the stored snapshot failed: {e}");
                return report.fail(Stage::Diffing, e);
            }
        };

        let ScrapeOutcome {
            mut entries,
            degraded,
            ..
        } = outcome;
        if let Some(prior) = &prior {
            backfill_degraded(&prior.entries, &mut entries, &degraded);
        }
        let entries = collapse_duplicates(entries);
        report.entries = entries.len();

        if options.force {
            log::debug!("[{source_id}] Drop guard bypassed");
        } else if let Err(e) =
            self.guard
                .validate(source_id, entries.len(), prior.as_ref().map(Snapshot::len))
        {
            log::warn!(
                "[{source_id}] Stored snapshot kept; rerun with force if the programme shrank"
            );
            report.guard_blocked = true;
            return report.fail(Stage::Diffing, e);
        }

        let changeset = diff(prior.as_ref().map(|s| s.entries.as_slice()), &entries);
        report.added = changeset.added.len();
        report.removed = changeset.removed.len();
        report.modified = changeset.modified.len();
        log::info!(
            "[{source_id}] {} entries: {} added, {} removed, {} modified",
            entries.len(),
            report.added,
            report.removed,
            report.modified
        );

        if changeset.is_empty() {
            log::debug!("[{source_id}] Nothing to announce");
        } else if prior.is_none() && !self.notify_first_run {
            log::info!(
                "[{source_id}] First snapshot, not announcing {} entries",
                report.added
            );
        } else {
            match self.subscribers.list_subscribers(source_id).await {
                Ok(subscribers) => {
                    report.deliveries = self
                        .notifier
                        .notify(&changeset, source_id, display_name, &subscribers)
                        .await;
                }
                Err(e) => {
                    log::error!("[{source_id}] Notification skipped, subscribers unavailable: {e}");
                    report.notify_error = Some(e.to_string());
                }
            }
        }

        if !options.commit {
            log::info!("[{source_id}] Dry run, snapshot not saved");
            return report;
        }
        let snapshot = Snapshot::capture(source_id, entries);
        if let Err(e) = self.snapshots.save(source_id, &snapshot).await {
            log::error!(
                "[{source_id}] Saving the snapshot failed, next run will repeat this diff: {e}"
            );
            return report.fail(Stage::Committing, e);
        }
        report.committed = true;
        report
    }
}
