// src/locale.rs

//! Message templates per language.
//!
//! Templates use named placeholders (`{source}`, `{count}` ...) that are
//! substituted with [`fill`]. A locale file is a TOML document with one table
//! per language code; keys it leaves out keep their English default.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use chrono::Datelike;
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::Screening;

static ENGLISH: LazyLock<MessageLocale> = LazyLock::new(MessageLocale::default);

/// Templates and labels for one language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageLocale {
    pub added_header: String,
    pub modified_header: String,
    pub removed_header: String,

    /// Closing line when entries did not fit into one message
    pub more_entries: String,
    /// Closing line of a truncated showtime list
    pub more_screenings: String,

    pub screenings_added: String,
    pub screenings_removed: String,

    /// `{field}: {before} → {after}`
    pub field_changed: String,
    pub field_empty: String,

    pub field_title: String,
    pub field_tags: String,
    pub field_age_rating: String,
    pub field_duration: String,
    pub field_description: String,

    /// `{minutes}`
    pub duration: String,

    /// Weekday abbreviations, Monday first
    pub weekdays: Vec<String>,
    /// chrono format string for screening dates
    pub date_format: String,
    /// chrono format string for screening times
    pub time_format: String,
}

impl Default for MessageLocale {
    fn default() -> Self {
        Self {
            added_header: "✨ <b>New at {source}</b>".to_string(),
            modified_header: "🔄 <b>Updated at {source}</b>".to_string(),
            removed_header: "❌ <b>No longer at {source}</b>".to_string(),
            more_entries: "… and {count} more".to_string(),
            more_screenings: "… and {count} more showtimes".to_string(),
            screenings_added: "New showtimes".to_string(),
            screenings_removed: "Cancelled showtimes".to_string(),
            field_changed: "{field}: {before} → {after}".to_string(),
            field_empty: "none".to_string(),
            field_title: "Title".to_string(),
            field_tags: "Tags".to_string(),
            field_age_rating: "Age rating".to_string(),
            field_duration: "Running time".to_string(),
            field_description: "Description".to_string(),
            duration: "{minutes} min".to_string(),
            weekdays: ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]
                .map(String::from)
                .to_vec(),
            date_format: "%d/%m".to_string(),
            time_format: "%H:%M".to_string(),
        }
    }
}

impl MessageLocale {
    /// Built-in German templates.
    pub fn german() -> Self {
        Self {
            added_header: "✨ <b>Neu im {source}</b>".to_string(),
            modified_header: "🔄 <b>Geändert im {source}</b>".to_string(),
            removed_header: "❌ <b>Nicht mehr im {source}</b>".to_string(),
            more_entries: "… und {count} weitere".to_string(),
            more_screenings: "… und {count} weitere Vorstellungen".to_string(),
            screenings_added: "Neue Vorstellungen".to_string(),
            screenings_removed: "Entfallene Vorstellungen".to_string(),
            field_changed: "{field}: {before} → {after}".to_string(),
            field_empty: "keine Angabe".to_string(),
            field_title: "Titel".to_string(),
            field_tags: "Kategorien".to_string(),
            field_age_rating: "Altersfreigabe".to_string(),
            field_duration: "Laufzeit".to_string(),
            field_description: "Beschreibung".to_string(),
            duration: "{minutes} Min.".to_string(),
            weekdays: ["Mo", "Di", "Mi", "Do", "Fr", "Sa", "So"]
                .map(String::from)
                .to_vec(),
            date_format: "%d.%m.".to_string(),
            time_format: "%H:%M".to_string(),
        }
    }

    /// One-line showtime, e.g. `Mon 20/10 20:00 · Saal 1 · OV`.
    pub fn format_screening(&self, screening: &Screening) -> String {
        let weekday = self
            .weekdays
            .get(screening.date.weekday().num_days_from_monday() as usize)
            .map(String::as_str)
            .unwrap_or_default();
        // An invalid format string fails the write instead of panicking.
        let mut line = String::new();
        let _ = write!(
            line,
            "{} {} {}",
            weekday,
            screening.date.format(&self.date_format),
            screening.time.format(&self.time_format)
        );
        let mut line = line.trim().to_string();
        for extra in [&screening.room, &screening.variant] {
            if !extra.is_empty() {
                line.push_str(" · ");
                line.push_str(extra);
            }
        }
        line
    }

    pub fn format_duration(&self, minutes: u32) -> String {
        fill(&self.duration, &[("minutes", &minutes.to_string())])
    }

    fn validate(&self, code: &str) -> Result<()> {
        if self.weekdays.len() != 7 {
            return Err(AppError::validation(format!(
                "locale '{code}' must define 7 weekdays, found {}",
                self.weekdays.len()
            )));
        }
        for (name, format) in [
            ("date_format", &self.date_format),
            ("time_format", &self.time_format),
        ] {
            let invalid = StrftimeItems::new(format).any(|item| matches!(item, Item::Error));
            if format.trim().is_empty() || invalid {
                return Err(AppError::validation(format!(
                    "locale '{code}' has an invalid {name} '{format}'"
                )));
            }
        }
        Ok(())
    }
}

/// Substitute `{name}` placeholders.
pub fn fill<V: AsRef<str>>(template: &str, values: &[(&str, V)]) -> String {
    values
        .iter()
        .fold(template.to_string(), |text, (name, value)| {
            text.replace(&format!("{{{name}}}"), value.as_ref())
        })
}

/// All known languages plus the fallback language.
#[derive(Debug, Clone)]
pub struct Locales {
    default_language: String,
    languages: BTreeMap<String, MessageLocale>,
}

impl Locales {
    /// Built-in English and German templates.
    pub fn builtin(default_language: &str) -> Self {
        let mut languages = BTreeMap::new();
        languages.insert("en".to_string(), MessageLocale::default());
        languages.insert("de".to_string(), MessageLocale::german());
        Self {
            default_language: normalize_code(default_language),
            languages,
        }
    }

    /// Built-in templates extended by a TOML locale document.
    pub fn from_toml(content: &str, default_language: &str) -> Result<Self> {
        let extra: BTreeMap<String, MessageLocale> = toml::from_str(content)?;
        let mut locales = Self::builtin(default_language);
        for (code, locale) in extra {
            locales.languages.insert(normalize_code(&code), locale);
        }
        Ok(locales)
    }

    /// Load a locale file, falling back to the built-in templates on any error.
    pub fn load_or_builtin(path: Option<&Path>, default_language: &str) -> Self {
        let Some(path) = path else {
            return Self::builtin(default_language);
        };
        let loaded = fs::read_to_string(path)
            .map_err(AppError::from)
            .and_then(|content| Self::from_toml(&content, default_language));
        match loaded {
            Ok(locales) => locales,
            Err(e) => {
                log::warn!(
                    "Failed to load locale from {:?}: {}. Using built-in templates.",
                    path,
                    e
                );
                Self::builtin(default_language)
            }
        }
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.languages.keys().map(String::as_str)
    }

    /// Resolve a preference: exact code, then primary subtag, then the default.
    pub fn resolve(&self, language: Option<&str>) -> (&str, &MessageLocale) {
        if let Some(requested) = language.map(normalize_code) {
            let primary = requested.split('-').next().unwrap_or_default();
            for candidate in [requested.as_str(), primary] {
                if let Some((code, locale)) = self.languages.get_key_value(candidate) {
                    return (code.as_str(), locale);
                }
            }
        }
        match self.languages.get_key_value(&self.default_language) {
            Some((code, locale)) => (code.as_str(), locale),
            None => ("en", &*ENGLISH),
        }
    }

    /// Check that the default language exists and every locale is well formed.
    pub fn validate(&self) -> Result<()> {
        if !self.languages.contains_key(&self.default_language) {
            return Err(AppError::validation(format!(
                "default language '{}' has no templates",
                self.default_language
            )));
        }
        for (code, locale) in &self.languages {
            locale.validate(code)?;
        }
        Ok(())
    }
}

impl Default for Locales {
    fn default() -> Self {
        Self::builtin("en")
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().replace('_', "-").to_lowercase()
}
