//! Changeset rendering into HTML-formatted messages.

use std::collections::BTreeSet;

use unicode_segmentation::UnicodeSegmentation;

use crate::locale::{MessageLocale, fill};
use crate::models::{ProgramEntry, Screening};
use crate::notify::OutboundMessage;
use crate::pipeline::{ChangeKind, Changeset, Field, FieldChange, ModifiedEntry};
use crate::utils::{escape_html, truncate_graphemes};

/// Maximum length of a text message.
pub const MESSAGE_LIMIT: usize = 4096;

/// Maximum length of a photo caption.
pub const CAPTION_LIMIT: usize = 1024;

/// Longest before/after value shown for a changed field.
const FIELD_VALUE_LIMIT: usize = 120;

/// Renders one message per changeset category.
#[derive(Debug, Clone)]
pub struct Renderer {
    max_screenings: usize,
    max_length: usize,
}

impl Renderer {
    pub fn new(max_screenings: usize) -> Self {
        Self {
            max_screenings: max_screenings.max(1),
            max_length: MESSAGE_LIMIT,
        }
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// Render the `kind` category of a changeset, `None` if it is empty.
    pub fn render(
        &self,
        kind: ChangeKind,
        changeset: &Changeset,
        display_name: &str,
        locale: &MessageLocale,
    ) -> Option<OutboundMessage> {
        let source = escape_html(display_name);
        let (header, blocks): (&str, Vec<String>) = match kind {
            ChangeKind::Added => (
                locale.added_header.as_str(),
                changeset
                    .added
                    .iter()
                    .map(|entry| self.added_block(entry, locale))
                    .collect(),
            ),
            ChangeKind::Modified => (
                locale.modified_header.as_str(),
                changeset
                    .modified
                    .iter()
                    .map(|modified| self.modified_block(modified, locale))
                    .collect(),
            ),
            ChangeKind::Removed => (
                locale.removed_header.as_str(),
                changeset.removed.iter().map(title_line).collect(),
            ),
        };
        if blocks.is_empty() {
            return None;
        }

        let text = self.assemble(&fill(header, &[("source", &source)]), &blocks, locale);
        let media = match kind {
            ChangeKind::Added if changeset.added.len() == 1 => changeset.added[0].poster.clone(),
            _ => None,
        };
        Some(OutboundMessage { text, media })
    }

    /// Join header and blocks, replacing blocks that do not fit with a "more" line.
    fn assemble(&self, header: &str, blocks: &[String], locale: &MessageLocale) -> String {
        let mut text = header.to_string();
        let mut length = grapheme_len(&text);

        for (i, block) in blocks.iter().enumerate() {
            let remaining_after = blocks.len() - i - 1;
            let block_length = grapheme_len(block) + 2;
            let reserve = if remaining_after > 0 {
                more_line_len(locale, remaining_after)
            } else {
                0
            };

            if length + block_length + reserve > self.max_length {
                let more = fill(
                    &locale.more_entries,
                    &[("count", &(blocks.len() - i).to_string())],
                );
                if length + 2 + grapheme_len(&more) <= self.max_length {
                    text.push_str("\n\n");
                    text.push_str(&more);
                }
                break;
            }

            text.push_str("\n\n");
            text.push_str(block);
            length += block_length;
        }
        text
    }

    fn added_block(&self, entry: &ProgramEntry, locale: &MessageLocale) -> String {
        let mut lines = vec![title_line(entry)];

        let mut facts: Vec<String> = Vec::new();
        if let Some(rating) = &entry.age_rating {
            facts.push(escape_html(rating));
        }
        if let Some(minutes) = entry.duration_minutes {
            facts.push(escape_html(&locale.format_duration(minutes)));
        }
        if !entry.tags.is_empty() {
            facts.push(escape_html(&entry.tags.join(", ")));
        }
        if !facts.is_empty() {
            lines.push(format!("<i>{}</i>", facts.join(" · ")));
        }

        let screenings: BTreeSet<&Screening> = entry.screenings.iter().collect();
        self.push_screenings(&mut lines, "•", screenings.into_iter(), locale);
        lines.join("\n")
    }

    fn modified_block(&self, modified: &ModifiedEntry, locale: &MessageLocale) -> String {
        let mut lines = vec![title_line(&modified.current)];

        for change in &modified.delta.fields {
            lines.push(field_line(change, locale));
        }

        let delta = &modified.delta;
        if !delta.screenings_added.is_empty() {
            lines.push(format!("{}:", escape_html(&locale.screenings_added)));
            let sorted: BTreeSet<&Screening> = delta.screenings_added.iter().collect();
            self.push_screenings(&mut lines, "+", sorted.into_iter(), locale);
        }
        if !delta.screenings_removed.is_empty() {
            lines.push(format!("{}:", escape_html(&locale.screenings_removed)));
            let sorted: BTreeSet<&Screening> = delta.screenings_removed.iter().collect();
            self.push_screenings(&mut lines, "−", sorted.into_iter(), locale);
        }
        lines.join("\n")
    }

    fn push_screenings<'a>(
        &self,
        lines: &mut Vec<String>,
        bullet: &str,
        screenings: impl ExactSizeIterator<Item = &'a Screening>,
        locale: &MessageLocale,
    ) {
        let total = screenings.len();
        for screening in screenings.take(self.max_screenings) {
            lines.push(format!(
                "{bullet} {}",
                escape_html(&locale.format_screening(screening))
            ));
        }
        if total > self.max_screenings {
            let more = fill(
                &locale.more_screenings,
                &[("count", &(total - self.max_screenings).to_string())],
            );
            lines.push(escape_html(&more));
        }
    }
}

fn title_line(entry: &ProgramEntry) -> String {
    let title = escape_html(&entry.title);
    match &entry.detail_url {
        Some(url) => format!("🎬 <b><a href=\"{}\">{title}</a></b>", escape_html(url)),
        None => format!("🎬 <b>{title}</b>"),
    }
}

fn field_line(change: &FieldChange, locale: &MessageLocale) -> String {
    let label = match change.field {
        Field::Title => &locale.field_title,
        Field::Tags => &locale.field_tags,
        Field::AgeRating => &locale.field_age_rating,
        Field::Duration => &locale.field_duration,
        Field::Description => &locale.field_description,
    };
    let render_value = |value: &Option<String>| match value {
        Some(value) if change.field == Field::Duration => value
            .parse::<u32>()
            .map(|minutes| locale.format_duration(minutes))
            .unwrap_or_else(|_| value.clone()),
        Some(value) => truncate_graphemes(value, FIELD_VALUE_LIMIT),
        None => locale.field_empty.clone(),
    };
    escape_html(&fill(
        &locale.field_changed,
        &[
            ("field", label),
            ("before", &render_value(&change.before)),
            ("after", &render_value(&change.after)),
        ],
    ))
}

fn grapheme_len(text: &str) -> usize {
    text.graphemes(true).count()
}

fn more_line_len(locale: &MessageLocale, count: usize) -> usize {
    2 + grapheme_len(&fill(
        &locale.more_entries,
        &[("count", &count.to_string())],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::diff;
    use chrono::{NaiveDate, NaiveTime};

    fn screening(day: u32, hour: u32) -> Screening {
        Screening::new(
            NaiveDate::from_ymd_opt(2025, 10, day).unwrap(),
            NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            "Saal 1",
            "OV",
        )
    }

    fn entry(id: &str, title: &str) -> ProgramEntry {
        let mut entry = ProgramEntry::new(title);
        entry.external_id = Some(id.to_string());
        entry.screenings = vec![screening(20, 20)];
        entry
    }

    #[test]
    fn test_added_message() {
        let mut film = entry("1", "Tom & Jerry");
        film.age_rating = Some("FSK 6".into());
        film.duration_minutes = Some(90);
        film.poster = Some("https://kino.example.com/p.jpg".into());
        film.detail_url = Some("https://kino.example.com/film/1".into());
        let changeset = diff(None, &[film]);

        let message = Renderer::new(8)
            .render(
                ChangeKind::Added,
                &changeset,
                "Kino <Mitte>",
                &MessageLocale::german(),
            )
            .unwrap();

        assert!(
            message
                .text
                .starts_with("✨ <b>Neu im Kino &lt;Mitte&gt;</b>")
        );
        assert!(
            message.text.contains(
                "🎬 <b><a href=\"https://kino.example.com/film/1\">Tom &amp; Jerry</a></b>"
            )
        );
        assert!(message.text.contains("<i>FSK 6 · 90 Min.</i>"));
        assert!(message.text.contains("• Mo 20.10. 20:00 · Saal 1 · OV"));
        assert_eq!(
            message.media.as_deref(),
            Some("https://kino.example.com/p.jpg")
        );
    }

    #[test]
    fn test_media_only_for_single_added_entry() {
        let mut a = entry("1", "A");
        a.poster = Some("https://kino.example.com/a.jpg".into());
        let changeset = diff(None, &[a, entry("2", "B")]);
        let message = Renderer::new(8)
            .render(
                ChangeKind::Added,
                &changeset,
                "Kino",
                &MessageLocale::default(),
            )
            .unwrap();
        assert!(message.media.is_none());
    }

    #[test]
    fn test_empty_category_renders_nothing() {
        let changeset = diff(None, &[entry("1", "A")]);
        let renderer = Renderer::new(8);
        assert!(
            renderer
                .render(
                    ChangeKind::Removed,
                    &changeset,
                    "Kino",
                    &MessageLocale::default()
                )
                .is_none()
        );
    }

    #[test]
    fn test_modified_message_lists_changes() {
        let prior = vec![entry("1", "Film A")];
        let mut current = prior.clone();
        current[0].duration_minutes = Some(101);
        current[0].screenings = vec![screening(21, 18)];
        let changeset = diff(Some(&prior), &current);

        let message = Renderer::new(8)
            .render(
                ChangeKind::Modified,
                &changeset,
                "Kino",
                &MessageLocale::default(),
            )
            .unwrap();

        assert!(message.text.starts_with("🔄 <b>Updated at Kino</b>"));
        assert!(message.text.contains("Running time: none → 101 min"));
        assert!(
            message
                .text
                .contains("New showtimes:\n+ Tue 21/10 18:00 · Saal 1 · OV")
        );
        assert!(
            message
                .text
                .contains("Cancelled showtimes:\n− Mon 20/10 20:00 · Saal 1 · OV")
        );
        assert!(message.media.is_none());
    }

    #[test]
    fn test_screening_list_is_capped() {
        let mut film = entry("1", "Film A");
        film.screenings = (10..20).map(|day| screening(day, 20)).collect();
        let changeset = diff(None, &[film]);

        let message = Renderer::new(3)
            .render(
                ChangeKind::Added,
                &changeset,
                "Kino",
                &MessageLocale::default(),
            )
            .unwrap();
        assert_eq!(message.text.matches("• ").count(), 3);
        assert!(message.text.contains("… and 7 more showtimes"));
    }

    #[test]
    fn test_long_changeset_respects_limit() {
        let entries: Vec<ProgramEntry> = (0..200)
            .map(|i| {
                entry(
                    &i.to_string(),
                    &format!("A fairly long film title number {i}"),
                )
            })
            .collect();
        let changeset = diff(Some(&entries), &[]);

        let message = Renderer::new(8)
            .with_max_length(500)
            .render(
                ChangeKind::Removed,
                &changeset,
                "Kino",
                &MessageLocale::default(),
            )
            .unwrap();

        assert!(grapheme_len(&message.text) <= 500);
        assert!(message.text.contains(" more"));
        assert!(message.text.contains("number 0"));
    }
}
