//! Programme entry and screening data structures.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// A single showing of a programme entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Screening {
    /// Calendar date of the showing
    pub date: NaiveDate,

    /// Start time (local to the venue)
    pub time: NaiveTime,

    /// Room or venue label, e.g. "Saal 1"
    pub room: String,

    /// Language/subtitle variant, e.g. "OV", "OmU"
    pub variant: String,
}

impl Screening {
    pub fn new(
        date: NaiveDate,
        time: NaiveTime,
        room: impl Into<String>,
        variant: impl Into<String>,
    ) -> Self {
        Self {
            date,
            time,
            room: room.into(),
            variant: variant.into(),
        }
    }
}

/// A film or event listed by a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramEntry {
    /// Title as shown on the listing
    pub title: String,

    /// Categorical tags (genre, series, ...), in listing order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Age rating code, e.g. "FSK 12"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_rating: Option<String>,

    /// Running time in minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,

    /// Free-text synopsis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Poster URL (presentation only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,

    /// Detail page URL (presentation only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_url: Option<String>,

    /// Identifier assigned by the source, if it exposes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,

    /// Showings in listing order
    #[serde(default)]
    pub screenings: Vec<Screening>,
}

/// Key used to match an entry across two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdentityKey {
    /// Identifier assigned by the source
    External(String),
    /// Normalized title, used when no identifier is available
    Title(String),
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityKey::External(id) => write!(f, "id:{id}"),
            IdentityKey::Title(title) => write!(f, "title:{title}"),
        }
    }
}

impl ProgramEntry {
    /// Create an entry with only a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            tags: Vec::new(),
            age_rating: None,
            duration_minutes: None,
            description: None,
            poster: None,
            detail_url: None,
            external_id: None,
            screenings: Vec::new(),
        }
    }

    /// The source identifier, if present and non-blank.
    pub fn external_key(&self) -> Option<&str> {
        self.external_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Title normalized for matching: lowercase, alphanumeric words only.
    ///
    /// Falls back to the trimmed raw title when normalization strips everything
    /// (titles made of punctuation only), so the key is never empty for a
    /// non-empty title.
    pub fn normalized_title(&self) -> String {
        let normalized = normalize_title(&self.title);
        if normalized.is_empty() {
            self.title.trim().to_string()
        } else {
            normalized
        }
    }

    /// Stable identity key: external id when present, else normalized title.
    pub fn identity_key(&self) -> IdentityKey {
        match self.external_key() {
            Some(id) => IdentityKey::External(id.to_string()),
            None => IdentityKey::Title(self.normalized_title()),
        }
    }

    /// Screenings as a set (order irrelevant, duplicates collapse).
    pub fn screening_set(&self) -> BTreeSet<&Screening> {
        self.screenings.iter().collect()
    }

    /// Equality over comparable fields.
    ///
    /// Ignores `poster`, `detail_url` and `external_id`; compares screenings as a set.
    pub fn same_content(&self, other: &ProgramEntry) -> bool {
        self.title == other.title
            && self.tags == other.tags
            && self.age_rating == other.age_rating
            && self.duration_minutes == other.duration_minutes
            && self.description == other.description
            && self.screening_set() == other.screening_set()
    }

    /// Add screenings from another listing of the same entry, keeping order
    /// and skipping duplicates.
    pub fn merge_screenings(&mut self, other: &ProgramEntry) {
        for screening in &other.screenings {
            if !self.screenings.contains(screening) {
                self.screenings.push(screening.clone());
            }
        }
    }

    /// Fill absent detail-page fields from a prior version of the same entry.
    pub fn backfill_from(&mut self, prior: &ProgramEntry) {
        if self.description.is_none() {
            self.description = prior.description.clone();
        }
        if self.duration_minutes.is_none() {
            self.duration_minutes = prior.duration_minutes;
        }
        if self.age_rating.is_none() {
            self.age_rating = prior.age_rating.clone();
        }
        if self.poster.is_none() {
            self.poster = prior.poster.clone();
        }
        if self.tags.is_empty() {
            self.tags = prior.tags.clone();
        }
    }
}

/// Lowercase a title and reduce it to alphanumeric words separated by single spaces.
pub fn normalize_title(title: &str) -> String {
    title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
