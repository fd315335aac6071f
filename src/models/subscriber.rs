//! Notification recipient with per-source subscriptions.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Subscription entry matching every source.
pub const ALL_SOURCES: &str = "*";

/// A recipient and their preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    /// Delivery-channel recipient identifier (e.g. a Telegram chat id)
    pub recipient_id: String,

    /// Subscribed source identifiers; `"*"` subscribes to all sources
    #[serde(default)]
    pub sources: BTreeSet<String>,

    /// Preferred language code, e.g. "de" or "en-GB"
    #[serde(default)]
    pub language: Option<String>,
}

impl Subscriber {
    pub fn new(recipient_id: impl Into<String>) -> Self {
        Self {
            recipient_id: recipient_id.into(),
            sources: BTreeSet::new(),
            language: None,
        }
    }

    /// Subscribe to a source.
    pub fn with_source(mut self, source_id: impl Into<String>) -> Self {
        self.sources.insert(source_id.into());
        self
    }

    /// Set the preferred language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Whether this recipient wants notifications for the given source.
    pub fn is_subscribed(&self, source_id: &str) -> bool {
        self.sources.contains(source_id) || self.sources.contains(ALL_SOURCES)
    }
}
