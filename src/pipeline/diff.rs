//! Changeset calculation between two entry sets.
//!
//! Entries are matched by identity: first by external id where both sides
//! carry one, then by normalized title where at least one side lacks an id.
//! The second pass keeps an id that appears or disappears between scrapes from
//! turning into a spurious Added + Removed pair.
//!
//! Output order is deterministic: Added and Modified follow the current
//! listing order, Removed follows the prior listing order.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::models::{IdentityKey, ProgramEntry, Screening};

/// Changeset category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

impl ChangeKind {
    /// Categories in notification order.
    pub const ALL: [ChangeKind; 3] = [ChangeKind::Added, ChangeKind::Modified, ChangeKind::Removed];
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangeKind::Added => "added",
            ChangeKind::Removed => "removed",
            ChangeKind::Modified => "modified",
        };
        f.write_str(name)
    }
}

/// Comparable entry field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Title,
    Tags,
    AgeRating,
    Duration,
    Description,
}

/// One changed field with its rendered before/after values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub field: Field,
    pub before: Option<String>,
    pub after: Option<String>,
}

/// Field-level difference between two versions of an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntryDelta {
    pub fields: Vec<FieldChange>,
    pub screenings_added: Vec<Screening>,
    pub screenings_removed: Vec<Screening>,
}

impl EntryDelta {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
            && self.screenings_added.is_empty()
            && self.screenings_removed.is_empty()
    }

    /// Compute the delta from `prior` to `current`.
    pub fn between(prior: &ProgramEntry, current: &ProgramEntry) -> Self {
        let mut fields = Vec::new();
        let mut compare = |field: Field, before: Option<String>, after: Option<String>| {
            if before != after {
                fields.push(FieldChange {
                    field,
                    before,
                    after,
                });
            }
        };

        compare(
            Field::Title,
            Some(prior.title.clone()),
            Some(current.title.clone()),
        );
        compare(
            Field::Tags,
            join_tags(&prior.tags),
            join_tags(&current.tags),
        );
        compare(
            Field::AgeRating,
            prior.age_rating.clone(),
            current.age_rating.clone(),
        );
        compare(
            Field::Duration,
            prior.duration_minutes.map(|m| m.to_string()),
            current.duration_minutes.map(|m| m.to_string()),
        );
        compare(
            Field::Description,
            prior.description.clone(),
            current.description.clone(),
        );

        let prior_set = prior.screening_set();
        let current_set = current.screening_set();

        Self {
            fields,
            screenings_added: unique_missing(&current.screenings, &prior_set),
            screenings_removed: unique_missing(&prior.screenings, &current_set),
        }
    }
}

/// Tags compare as an ordered list; the joined form is only for display.
fn join_tags(tags: &[String]) -> Option<String> {
    (!tags.is_empty()).then(|| tags.join(", "))
}

/// Screenings of `list` (deduplicated, in order) that are not in `other`.
fn unique_missing(list: &[Screening], other: &BTreeSet<&Screening>) -> Vec<Screening> {
    let mut seen = HashSet::new();
    list.iter()
        .filter(|s| !other.contains(s) && seen.insert(*s))
        .cloned()
        .collect()
}

/// An entry present on both sides whose comparable fields differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModifiedEntry {
    pub prior: ProgramEntry,
    pub current: ProgramEntry,
    pub delta: EntryDelta,
}

/// Difference between two entry sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Changeset {
    pub added: Vec<ProgramEntry>,
    pub removed: Vec<ProgramEntry>,
    pub modified: Vec<ModifiedEntry>,
}

impl Changeset {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    /// Get the total number of changes.
    pub fn change_count(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }

    /// Number of changes in one category.
    pub fn count(&self, kind: ChangeKind) -> usize {
        match kind {
            ChangeKind::Added => self.added.len(),
            ChangeKind::Removed => self.removed.len(),
            ChangeKind::Modified => self.modified.len(),
        }
    }

    /// Categories with at least one change, in notification order.
    pub fn non_empty_kinds(&self) -> Vec<ChangeKind> {
        ChangeKind::ALL
            .into_iter()
            .filter(|kind| self.count(*kind) > 0)
            .collect()
    }
}

/// Compute the changeset from `prior` (absent on a first run) to `current`.
pub fn diff(prior: Option<&[ProgramEntry]>, current: &[ProgramEntry]) -> Changeset {
    let Some(prior) = prior else {
        return Changeset {
            added: first_occurrences(current)
                .into_iter()
                .map(|i| current[i].clone())
                .collect(),
            ..Changeset::default()
        };
    };

    let matches = match_entries(prior, current);
    let mut changeset = Changeset::default();
    let mut prior_matched = vec![false; prior.len()];

    for (i, matched) in matches.iter().enumerate() {
        match matched {
            Match::Prior(j) => {
                prior_matched[*j] = true;
                let (before, after) = (&prior[*j], &current[i]);
                if !before.same_content(after) {
                    changeset.modified.push(ModifiedEntry {
                        prior: before.clone(),
                        current: after.clone(),
                        delta: EntryDelta::between(before, after),
                    });
                }
            }
            Match::New => changeset.added.push(current[i].clone()),
            Match::Duplicate => {
                log::debug!("Ignoring duplicate entry '{}'", current[i].title);
            }
        }
    }

    let prior_unique: HashSet<usize> = first_occurrences(prior).into_iter().collect();
    changeset.removed = prior
        .iter()
        .enumerate()
        .filter(|(j, _)| !prior_matched[*j] && prior_unique.contains(j))
        .map(|(_, entry)| entry.clone())
        .collect();

    changeset
}

/// Per-current-entry matching result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Match {
    /// Same logical item as the prior entry at this index
    Prior(usize),
    /// No counterpart in the prior set
    New,
    /// Repeats an identity key already seen earlier in the current set
    Duplicate,
}

/// Indices of the first entry for every identity key, in order.
fn first_occurrences(entries: &[ProgramEntry]) -> Vec<usize> {
    let mut seen = HashSet::new();
    entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| seen.insert(entry.identity_key()))
        .map(|(i, _)| i)
        .collect()
}

fn match_entries(prior: &[ProgramEntry], current: &[ProgramEntry]) -> Vec<Match> {
    let prior_unique = first_occurrences(prior);
    let current_unique: HashSet<usize> = first_occurrences(current).into_iter().collect();

    let mut by_id: HashMap<&str, usize> = HashMap::new();
    let mut by_title: HashMap<String, Vec<usize>> = HashMap::new();
    for &j in &prior_unique {
        if let Some(id) = prior[j].external_key() {
            by_id.insert(id, j);
        }
        by_title
            .entry(prior[j].normalized_title())
            .or_default()
            .push(j);
    }

    let mut matches: Vec<Match> = (0..current.len())
        .map(|i| {
            if current_unique.contains(&i) {
                Match::New
            } else {
                Match::Duplicate
            }
        })
        .collect();
    let mut taken = vec![false; prior.len()];

    // Pass 1: external ids on both sides.
    for (i, entry) in current.iter().enumerate() {
        if matches[i] != Match::New {
            continue;
        }
        if let Some(&j) = entry.external_key().and_then(|id| by_id.get(id)) {
            matches[i] = Match::Prior(j);
            taken[j] = true;
        }
    }

    // Pass 2: normalized title where at least one side has no id.
    for (i, entry) in current.iter().enumerate() {
        if matches[i] != Match::New {
            continue;
        }
        let Some(candidates) = by_title.get(&entry.normalized_title()) else {
            continue;
        };
        let found = candidates.iter().copied().find(|&j| {
            !taken[j] && (entry.external_key().is_none() || prior[j].external_key().is_none())
        });
        if let Some(j) = found {
            matches[i] = Match::Prior(j);
            taken[j] = true;
        }
    }

    matches
}

/// Carry detail-page fields forward for entries whose detail fetch was skipped or failed.
pub fn backfill_degraded(prior: &[ProgramEntry], current: &mut [ProgramEntry], degraded: &[usize]) {
    if degraded.is_empty() {
        return;
    }
    let matches = match_entries(prior, current);
    for &i in degraded {
        if let Some(Match::Prior(j)) = matches.get(i) {
            current[i].backfill_from(&prior[*j]);
        }
    }
}

/// Merge entries sharing an identity key: first occurrence wins, screenings are unioned.
pub fn collapse_duplicates(entries: Vec<ProgramEntry>) -> Vec<ProgramEntry> {
    let mut index: HashMap<IdentityKey, usize> = HashMap::new();
    let mut collapsed: Vec<ProgramEntry> = Vec::with_capacity(entries.len());
    for entry in entries {
        match index.get(&entry.identity_key()) {
            Some(&pos) => collapsed[pos].merge_screenings(&entry),
            None => {
                index.insert(entry.identity_key(), collapsed.len());
                collapsed.push(entry);
            }
        }
    }
    collapsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn screening(day: u32, hour: u32) -> Screening {
        Screening::new(
            NaiveDate::from_ymd_opt(2025, 10, day).unwrap(),
            NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            "Room1",
            "OV",
        )
    }

    fn entry(id: Option<&str>, title: &str, screenings: Vec<Screening>) -> ProgramEntry {
        let mut entry = ProgramEntry::new(title);
        entry.external_id = id.map(str::to_string);
        entry.screenings = screenings;
        entry
    }

    fn titles(entries: &[ProgramEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.title.as_str()).collect()
    }

    fn sample() -> Vec<ProgramEntry> {
        vec![
            entry(Some("f1"), "Film A", vec![screening(20, 20)]),
            entry(
                Some("f2"),
                "Film B",
                vec![screening(21, 18), screening(22, 20)],
            ),
            entry(None, "Film C", vec![]),
        ]
    }

    #[test]
    fn test_diff_is_reflexive() {
        let a = sample();
        assert!(diff(Some(&a), &a).is_empty());
    }

    #[test]
    fn test_absent_prior_adds_everything() {
        let current = sample();
        let changeset = diff(None, &current);
        assert_eq!(changeset.added, current);
        assert!(changeset.removed.is_empty());
        assert!(changeset.modified.is_empty());
    }

    #[test]
    fn test_disjoint_sets() {
        let a = sample();
        let b = vec![
            entry(Some("f9"), "Film X", vec![screening(20, 20)]),
            entry(None, "Film Y", vec![]),
        ];
        let changeset = diff(Some(&a), &b);
        assert_eq!(changeset.removed, a);
        assert_eq!(changeset.added, b);
        assert!(changeset.modified.is_empty());
    }

    #[test]
    fn test_new_screening_is_modification() {
        // Monday 20:00 is known; Tuesday 20:00 appears.
        let prior = vec![entry(Some("f1"), "Film A", vec![screening(20, 20)])];
        let current = vec![entry(
            Some("f1"),
            "Film A",
            vec![screening(20, 20), screening(21, 20)],
        )];

        let changeset = diff(Some(&prior), &current);
        assert!(changeset.added.is_empty());
        assert!(changeset.removed.is_empty());
        assert_eq!(changeset.modified.len(), 1);

        let delta = &changeset.modified[0].delta;
        assert_eq!(delta.screenings_added, vec![screening(21, 20)]);
        assert!(delta.screenings_removed.is_empty());
        assert!(delta.fields.is_empty());
    }

    #[test]
    fn test_removed_entry() {
        let prior = vec![
            entry(Some("f1"), "Film A", vec![screening(20, 20)]),
            entry(Some("f2"), "Film B", vec![screening(21, 20)]),
        ];
        let current = vec![entry(Some("f1"), "Film A", vec![screening(20, 20)])];

        let changeset = diff(Some(&prior), &current);
        assert_eq!(titles(&changeset.removed), vec!["Film B"]);
        assert!(changeset.added.is_empty());
        assert!(changeset.modified.is_empty());
    }

    #[test]
    fn test_screening_order_and_duplicates_ignored() {
        let prior = vec![entry(
            Some("f1"),
            "Film A",
            vec![screening(20, 20), screening(21, 20)],
        )];
        let current = vec![entry(
            Some("f1"),
            "Film A",
            vec![screening(21, 20), screening(20, 20), screening(21, 20)],
        )];
        assert!(diff(Some(&prior), &current).is_empty());
    }

    #[test]
    fn test_missing_id_on_one_side_matches_by_title() {
        let prior = vec![entry(None, "Film A", vec![screening(20, 20)])];
        let current = vec![entry(Some("f1"), "  film a ", vec![screening(20, 20)])];

        let changeset = diff(Some(&prior), &current);
        assert!(changeset.added.is_empty());
        assert!(changeset.removed.is_empty());
        // The raw title differs, so this is a title modification, not a new film.
        assert_eq!(changeset.modified.len(), 1);
        assert_eq!(changeset.modified[0].delta.fields[0].field, Field::Title);

        // An id gained with an unchanged title is not a change at all.
        let current = vec![entry(Some("f1"), "Film A", vec![screening(20, 20)])];
        assert!(diff(Some(&prior), &current).is_empty());
    }

    #[test]
    fn test_different_ids_never_match_by_title() {
        let prior = vec![entry(Some("f1"), "Film A", vec![])];
        let current = vec![entry(Some("f2"), "Film A", vec![])];

        let changeset = diff(Some(&prior), &current);
        assert_eq!(changeset.added.len(), 1);
        assert_eq!(changeset.removed.len(), 1);
    }

    #[test]
    fn test_retitled_entry_with_stable_id() {
        let prior = vec![entry(Some("f1"), "Film A", vec![])];
        let mut renamed = entry(Some("f1"), "Film A (OmU)", vec![]);
        renamed.duration_minutes = Some(101);
        let changeset = diff(Some(&prior), &[renamed]);

        assert_eq!(changeset.modified.len(), 1);
        let fields: Vec<Field> = changeset.modified[0]
            .delta
            .fields
            .iter()
            .map(|c| c.field)
            .collect();
        assert_eq!(fields, vec![Field::Title, Field::Duration]);
        assert_eq!(
            changeset.modified[0].delta.fields[1].after.as_deref(),
            Some("101")
        );
    }

    #[test]
    fn test_presentation_fields_ignored() {
        let prior = sample();
        let mut current = sample();
        current[0].poster = Some("https://example.com/new.jpg".into());
        current[1].detail_url = Some("https://example.com/f2".into());
        assert!(diff(Some(&prior), &current).is_empty());
    }

    #[test]
    fn test_output_order_follows_listing() {
        let prior = vec![
            entry(None, "Removed 2", vec![]),
            entry(None, "Kept", vec![screening(20, 20)]),
            entry(None, "Removed 1", vec![]),
        ];
        let current = vec![
            entry(None, "New 2", vec![]),
            entry(None, "Kept", vec![screening(20, 21)]),
            entry(None, "New 1", vec![]),
        ];

        for _ in 0..3 {
            let changeset = diff(Some(&prior), &current);
            assert_eq!(titles(&changeset.added), vec!["New 2", "New 1"]);
            assert_eq!(titles(&changeset.removed), vec!["Removed 2", "Removed 1"]);
            assert_eq!(changeset.modified.len(), 1);
        }
    }

    #[test]
    fn test_each_key_in_at_most_one_list() {
        let prior = vec![
            entry(Some("a"), "A", vec![]),
            entry(Some("b"), "B", vec![]),
            entry(None, "C", vec![]),
        ];
        let current = vec![
            entry(Some("b"), "B2", vec![]),
            entry(None, "C", vec![]),
            entry(None, "C", vec![screening(20, 20)]),
            entry(Some("d"), "D", vec![]),
        ];
        let changeset = diff(Some(&prior), &current);

        let mut keys: Vec<IdentityKey> = changeset
            .added
            .iter()
            .chain(changeset.removed.iter())
            .map(ProgramEntry::identity_key)
            .chain(changeset.modified.iter().map(|m| m.current.identity_key()))
            .collect();
        let total = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), total);
        assert_eq!(changeset.change_count(), 3); // a removed, b modified, d added
    }

    #[test]
    fn test_non_empty_kinds() {
        let changeset = diff(None, &sample());
        assert_eq!(changeset.non_empty_kinds(), vec![ChangeKind::Added]);
        assert_eq!(changeset.count(ChangeKind::Added), 3);
    }

    #[test]
    fn test_backfill_degraded() {
        let mut prior_entry = entry(Some("f1"), "Film A", vec![screening(20, 20)]);
        prior_entry.description = Some("Synopsis".into());
        prior_entry.duration_minutes = Some(90);
        let prior = vec![prior_entry];

        let mut current = vec![
            entry(Some("f1"), "Film A", vec![screening(20, 20)]),
            entry(Some("f2"), "Film B", vec![]),
        ];
        backfill_degraded(&prior, &mut current, &[0, 1]);

        assert_eq!(current[0].description.as_deref(), Some("Synopsis"));
        assert_eq!(current[0].duration_minutes, Some(90));
        assert!(current[1].description.is_none());
        assert!(diff(Some(&prior), &current[..1]).is_empty());
    }

    #[test]
    fn test_collapse_duplicates() {
        let collapsed = collapse_duplicates(vec![
            entry(Some("f1"), "Film A", vec![screening(20, 20)]),
            entry(None, "Film B", vec![]),
            entry(
                Some("f1"),
                "Film A",
                vec![screening(21, 20), screening(20, 20)],
            ),
        ]);
        assert_eq!(titles(&collapsed), vec!["Film A", "Film B"]);
        assert_eq!(
            collapsed[0].screenings,
            vec![screening(20, 20), screening(21, 20)]
        );
    }
}
