//! Changeset fan-out to subscribers.
//!
//! Every subscriber of a source receives at most one message per non-empty
//! changeset category, rendered in their language. Deliveries are
//! independent: a failed recipient is recorded and the rest continue.

mod render;
mod telegram;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::Serialize;

use crate::error::Result;
use crate::locale::Locales;
use crate::models::{Subscriber, TelegramConfig};
use crate::pipeline::{ChangeKind, Changeset};

pub use render::{CAPTION_LIMIT, MESSAGE_LIMIT, Renderer};
pub use telegram::TelegramChannel;

/// A rendered message with an optional media reference (e.g. a poster URL).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
}

/// External push channel.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Send one message to one recipient; failures are `AppError::Delivery`.
    async fn send(&self, recipient_id: &str, message: &OutboundMessage) -> Result<()>;
}

/// Result of one send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Delivered,
    Failed { error: String },
}

/// One attempted send to one recipient for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryAttempt {
    pub recipient_id: String,
    pub category: ChangeKind,
    pub language: String,
    pub outcome: DeliveryOutcome,
}

impl DeliveryAttempt {
    pub fn is_delivered(&self) -> bool {
        self.outcome == DeliveryOutcome::Delivered
    }
}

/// Turns a changeset into per-recipient, per-language messages.
pub struct Notifier {
    channel: Arc<dyn DeliveryChannel>,
    locales: Arc<Locales>,
    renderer: Renderer,
    concurrency: usize,
}

impl Notifier {
    pub fn new(
        channel: Arc<dyn DeliveryChannel>,
        locales: Arc<Locales>,
        renderer: Renderer,
        concurrency: usize,
    ) -> Self {
        Self {
            channel,
            locales,
            renderer,
            concurrency: concurrency.max(1),
        }
    }

    /// Notify every subscriber of `source_id` about `changeset`.
    ///
    /// Attempts are returned in subscriber order, categories in
    /// Added, Modified, Removed order.
    pub async fn notify(
        &self,
        changeset: &Changeset,
        source_id: &str,
        display_name: &str,
        subscribers: &[Subscriber],
    ) -> Vec<DeliveryAttempt> {
        if changeset.is_empty() {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let recipients: Vec<(&str, &str)> = subscribers
            .iter()
            .filter(|s| s.is_subscribed(source_id))
            .filter(|s| seen.insert(s.recipient_id.as_str()))
            .map(|s| {
                let (code, _) = self.locales.resolve(s.language.as_deref());
                (s.recipient_id.as_str(), code)
            })
            .collect();
        if recipients.is_empty() {
            log::info!("[{source_id}] No subscribers to notify");
            return Vec::new();
        }

        // Render once per language in use.
        let mut rendered = HashMap::new();
        for &(_, code) in &recipients {
            if rendered.contains_key(code) {
                continue;
            }
            let (_, locale) = self.locales.resolve(Some(code));
            let messages: Vec<_> = ChangeKind::ALL
                .into_iter()
                .filter_map(|kind| {
                    self.renderer
                        .render(kind, changeset, display_name, locale)
                        .map(|message| (kind, message))
                })
                .collect();
            rendered.insert(code, messages);
        }
        let rendered = &rendered;

        let attempts: Vec<Vec<DeliveryAttempt>> = stream::iter(recipients)
            .map(|(recipient_id, code)| async move {
                let mut attempts = Vec::new();
                for (kind, message) in rendered.get(code).into_iter().flatten() {
                    let outcome = match self.channel.send(recipient_id, message).await {
                        Ok(()) => DeliveryOutcome::Delivered,
                        Err(e) => {
                            log::warn!(
                                "[{source_id}] Delivery of {kind} to {recipient_id} failed: {e}"
                            );
                            DeliveryOutcome::Failed {
                                error: e.to_string(),
                            }
                        }
                    };
                    attempts.push(DeliveryAttempt {
                        recipient_id: recipient_id.to_string(),
                        category: *kind,
                        language: code.to_string(),
                        outcome,
                    });
                }
                attempts
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let attempts: Vec<DeliveryAttempt> = attempts.into_iter().flatten().collect();
        let failed = attempts.iter().filter(|a| !a.is_delivered()).count();
        log::info!(
            "[{source_id}] Sent {} message(s), {} failed",
            attempts.len() - failed,
            failed
        );
        attempts
    }
}

/// The Telegram channel, or the logging channel for dry runs.
pub fn delivery_channel(
    client: &Client,
    config: &TelegramConfig,
    dry_run: bool,
) -> Result<Arc<dyn DeliveryChannel>> {
    if dry_run {
        return Ok(Arc::new(LogChannel));
    }
    Ok(Arc::new(TelegramChannel::new(client.clone(), config)?))
}

/// Channel that only logs messages, for dry runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogChannel;

#[async_trait]
impl DeliveryChannel for LogChannel {
    async fn send(&self, recipient_id: &str, message: &OutboundMessage) -> Result<()> {
        log::info!(
            "[dry-run] to {recipient_id}{}:\n{}",
            message
                .media
                .as_deref()
                .map(|media| format!(" (media {media})"))
                .unwrap_or_default(),
            message.text
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProgramEntry;
    use crate::pipeline::diff;
    use crate::test_support::RecordingChannel;

    fn notifier(channel: Arc<RecordingChannel>) -> Notifier {
        Notifier::new(
            channel,
            Arc::new(Locales::builtin("en")),
            Renderer::new(8),
            2,
        )
    }

    fn changeset() -> Changeset {
        let prior = vec![ProgramEntry::new("Old")];
        let current = vec![ProgramEntry::new("New")];
        diff(Some(&prior), &current)
    }

    #[tokio::test]
    async fn test_one_message_per_category_and_recipient() {
        let channel = Arc::new(RecordingChannel::new());
        let subscribers = vec![
            Subscriber::new("1").with_source("kino"),
            Subscriber::new("2")
                .with_source("kino")
                .with_language("de-DE"),
            Subscriber::new("1").with_source("kino"),
            Subscriber::new("3").with_source("other"),
        ];

        let attempts = notifier(channel.clone())
            .notify(&changeset(), "kino", "Kino", &subscribers)
            .await;

        // Two recipients times Added + Removed.
        assert_eq!(attempts.len(), 4);
        assert!(attempts.iter().all(DeliveryAttempt::is_delivered));
        assert_eq!(
            attempts.iter().map(|a| a.category).collect::<Vec<_>>(),
            vec![
                ChangeKind::Added,
                ChangeKind::Removed,
                ChangeKind::Added,
                ChangeKind::Removed
            ]
        );
        assert_eq!(attempts[2].language, "de");

        let sent = channel.sent();
        assert_eq!(sent.len(), 4);
        let german = sent.iter().find(|(id, _)| id == "2").unwrap();
        assert!(german.1.text.starts_with("✨ <b>Neu im Kino</b>"));
    }

    #[tokio::test]
    async fn test_failed_recipient_does_not_stop_others() {
        let channel = Arc::new(RecordingChannel::failing_for(&["2"]));
        let subscribers: Vec<Subscriber> = ["1", "2", "3"]
            .into_iter()
            .map(|id| Subscriber::new(id).with_source("kino"))
            .collect();
        let changeset = diff(None, &[ProgramEntry::new("Film A")]);

        let attempts = notifier(channel.clone())
            .notify(&changeset, "kino", "Kino", &subscribers)
            .await;

        assert_eq!(attempts.len(), 3);
        let failed: Vec<&str> = attempts
            .iter()
            .filter(|a| !a.is_delivered())
            .map(|a| a.recipient_id.as_str())
            .collect();
        assert_eq!(failed, vec!["2"]);
        assert_eq!(channel.sent().len(), 2);
    }

    #[test]
    fn test_dry_run_needs_no_token() {
        let client = Client::new();
        let config = TelegramConfig::default();
        assert!(delivery_channel(&client, &config, true).is_ok());
        assert!(delivery_channel(&client, &config, false).is_err());
    }

    #[tokio::test]
    async fn test_empty_changeset_sends_nothing() {
        let channel = Arc::new(RecordingChannel::new());
        let attempts = notifier(channel.clone())
            .notify(
                &Changeset::default(),
                "kino",
                "Kino",
                &[Subscriber::new("1").with_source("kino")],
            )
            .await;
        assert!(attempts.is_empty());
        assert!(channel.sent().is_empty());
    }
}
