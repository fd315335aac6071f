//! In-memory collaborators shared by unit tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{ProgramEntry, Snapshot, Subscriber};
use crate::notify::{DeliveryChannel, OutboundMessage};
use crate::pipeline::RunBudget;
use crate::services::{ScrapeOutcome, SourceScraper};
use crate::storage::{SnapshotStore, SubscriberDirectory};

/// Scraper returning a fixed outcome, or always failing with a fetch error.
pub struct ScriptedScraper {
    source_id: String,
    outcome: Option<ScrapeOutcome>,
}

impl ScriptedScraper {
    pub fn ok(source_id: &str, entries: Vec<ProgramEntry>) -> Self {
        Self::with_outcome(source_id, ScrapeOutcome::from_entries(entries))
    }

    pub fn with_outcome(source_id: &str, outcome: ScrapeOutcome) -> Self {
        Self {
            source_id: source_id.to_string(),
            outcome: Some(outcome),
        }
    }

    pub fn failing(source_id: &str) -> Self {
        Self {
            source_id: source_id.to_string(),
            outcome: None,
        }
    }
}

#[async_trait]
impl SourceScraper for ScriptedScraper {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn display_name(&self) -> &str {
        &self.source_id
    }

    fn source_url(&self) -> &str {
        "https://kino.example.com/programm"
    }

    async fn scrape(&self, _budget: &RunBudget) -> Result<ScrapeOutcome> {
        self.outcome
            .clone()
            .ok_or_else(|| AppError::fetch(self.source_url(), "connection refused"))
    }
}

/// Delivery channel that records sends and fails for chosen recipients.
#[derive(Default)]
pub struct RecordingChannel {
    failing: HashSet<String>,
    sent: Mutex<Vec<(String, OutboundMessage)>>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(recipients: &[&str]) -> Self {
        Self {
            failing: recipients.iter().map(|r| r.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Successful sends in order.
    pub fn sent(&self) -> Vec<(String, OutboundMessage)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeliveryChannel for RecordingChannel {
    async fn send(&self, recipient_id: &str, message: &OutboundMessage) -> Result<()> {
        if self.failing.contains(recipient_id) {
            return Err(AppError::delivery(
                recipient_id,
                "bot was blocked by the user",
            ));
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient_id.to_string(), message.clone()));
        Ok(())
    }
}

/// Store whose reads or writes always fail.
pub struct FailingStore {
    fail_load: bool,
}

impl FailingStore {
    /// Fails `load` and `list_subscribers`; `save` succeeds.
    pub fn on_load() -> Self {
        Self { fail_load: true }
    }

    /// Fails `save`; reads find nothing.
    pub fn on_save() -> Self {
        Self { fail_load: false }
    }
}

#[async_trait]
impl SnapshotStore for FailingStore {
    async fn load(&self, source_id: &str) -> Result<Option<Snapshot>> {
        if self.fail_load {
            return Err(AppError::storage(source_id, "permission denied"));
        }
        Ok(None)
    }

    async fn save(&self, source_id: &str, _snapshot: &Snapshot) -> Result<()> {
        if self.fail_load {
            return Ok(());
        }
        Err(AppError::storage(source_id, "disk full"))
    }
}

#[async_trait]
impl SubscriberDirectory for FailingStore {
    async fn list_subscribers(&self, _source_id: &str) -> Result<Vec<Subscriber>> {
        if self.fail_load {
            return Err(AppError::storage("subscribers.json", "permission denied"));
        }
        Ok(Vec::new())
    }
}
