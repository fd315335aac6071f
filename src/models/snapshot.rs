//! Snapshot of one source at one point in time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ProgramEntry;

/// Full state of a source's listing as captured by one successful scrape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Source identifier (registry and storage key)
    pub source_id: String,

    /// When the scrape finished
    pub captured_at: DateTime<Utc>,

    /// Entries in listing order
    pub entries: Vec<ProgramEntry>,
}

impl Snapshot {
    pub fn new(
        source_id: impl Into<String>,
        captured_at: DateTime<Utc>,
        entries: Vec<ProgramEntry>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            captured_at,
            entries,
        }
    }

    /// Capture the given entries now.
    pub fn capture(source_id: impl Into<String>, entries: Vec<ProgramEntry>) -> Self {
        Self::new(source_id, Utc::now(), entries)
    }

    /// Serialize to the stored JSON representation.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }

    /// Deserialize from the stored JSON representation.
    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Screening;
    use chrono::{NaiveDate, NaiveTime, TimeZone};

    #[test]
    fn test_json_round_trip_is_exact() {
        let mut entry = ProgramEntry::new("Die Unschuld");
        entry.external_id = Some("4711".into());
        entry.tags = vec!["Drama".into(), "Japan".into()];
        entry.age_rating = Some("FSK 12".into());
        entry.duration_minutes = Some(127);
        entry.description = Some("Ein Junge, \"anders\" als die anderen.\nZweite Zeile".into());
        entry.poster = Some("https://example.com/p.jpg".into());
        entry.screenings = vec![Screening::new(
            NaiveDate::from_ymd_opt(2025, 10, 20).unwrap(),
            NaiveTime::from_hms_opt(20, 15, 0).unwrap(),
            "Meisengeige",
            "OmU",
        )];

        let captured_at = Utc.with_ymd_and_hms(2025, 10, 19, 6, 30, 0).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        let snapshot = Snapshot::new(
            "meisengeige",
            captured_at,
            vec![entry, ProgramEntry::new("Kurzfilmnacht")],
        );

        let bytes = snapshot.to_json().unwrap();
        let restored = Snapshot::from_json(&bytes).unwrap();
        assert_eq!(restored, snapshot);
    }

    #[test]
    fn test_missing_optional_fields_deserialize() {
        let json = r#"{
            "source_id": "meisengeige",
            "captured_at": "2025-10-19T06:30:00Z",
            "entries": [{"title": "Film A"}]
        }"#;
        let snapshot = Snapshot::from_json(json.as_bytes()).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.entries[0].screenings.is_empty());
        assert!(snapshot.entries[0].external_id.is_none());
    }
}
