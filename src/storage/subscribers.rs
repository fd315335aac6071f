//! Read-only access to the subscriber directory.
//!
//! Two document shapes are accepted. The legacy bot state file is
//! `{"subscribers": [chat_id, ...]}`; each bare id subscribes to every source
//! with the default language. Full records carry their own sources and
//! language and may appear either in that wrapper or as a top-level array.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Result;
use crate::models::{ALL_SOURCES, Subscriber};

/// Read-only view of the subscriber store.
#[async_trait]
pub trait SubscriberDirectory: Send + Sync {
    /// Subscribers that want notifications for `source_id`.
    async fn list_subscribers(&self, source_id: &str) -> Result<Vec<Subscriber>>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Record {
    LegacyId(i64),
    LegacyText(String),
    Full(Subscriber),
}

impl From<Record> for Subscriber {
    fn from(record: Record) -> Self {
        match record {
            Record::LegacyId(id) => Subscriber::new(id.to_string()).with_source(ALL_SOURCES),
            Record::LegacyText(id) => Subscriber::new(id).with_source(ALL_SOURCES),
            Record::Full(subscriber) => subscriber,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Document {
    Wrapped { subscribers: Vec<Record> },
    List(Vec<Record>),
}

/// Parse a subscriber document. Duplicate recipients keep their first record.
pub fn parse_subscribers(bytes: &[u8]) -> serde_json::Result<Vec<Subscriber>> {
    let records = match serde_json::from_slice(bytes)? {
        Document::Wrapped { subscribers } => subscribers,
        Document::List(records) => records,
    };

    let mut seen = std::collections::HashSet::new();
    Ok(records
        .into_iter()
        .map(Subscriber::from)
        .filter(|subscriber| seen.insert(subscriber.recipient_id.clone()))
        .collect())
}

/// Fixed in-memory subscriber list.
#[derive(Debug, Clone, Default)]
pub struct StaticSubscribers {
    subscribers: Vec<Subscriber>,
}

impl StaticSubscribers {
    pub fn new(subscribers: Vec<Subscriber>) -> Self {
        Self { subscribers }
    }
}

#[async_trait]
impl SubscriberDirectory for StaticSubscribers {
    async fn list_subscribers(&self, source_id: &str) -> Result<Vec<Subscriber>> {
        Ok(self
            .subscribers
            .iter()
            .filter(|subscriber| subscriber.is_subscribed(source_id))
            .cloned()
            .collect())
    }
}
