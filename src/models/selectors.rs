// src/models/selectors.rs

//! CSS selectors for scraping a programme listing.

use serde::{Deserialize, Serialize};

/// CSS selectors for a listing page and its optional detail pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSelectors {
    /// Selector for each programme entry on the listing page
    pub entry_selector: String,

    /// Selector for the title element within an entry
    pub title_selector: String,

    /// Attribute of the entry element carrying the source's identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_attr: Option<String>,

    /// Selector for the detail link (defaults to the first link in the title)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_selector: Option<String>,

    /// HTML attribute name for extracting links (usually "href")
    #[serde(default = "default_link_attr")]
    pub link_attr: String,

    /// Selector matching each tag element within an entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_selector: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_rating_selector: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_selector: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_selector: Option<String>,

    /// Selector for the poster image within an entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_selector: Option<String>,

    /// Attribute holding the poster URL (usually "src")
    #[serde(default = "default_poster_attr")]
    pub poster_attr: String,

    /// Screening row selectors
    pub screening: ScreeningSelectors,

    /// Detail page selectors; no detail fetches happen when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<DetailSelectors>,
}

/// Selectors for one screening row within an entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningSelectors {
    /// Selector for each screening row
    pub row_selector: String,

    /// Attribute on the row (or on `time_selector`'s element) with an ISO date-time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datetime_attr: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_selector: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_selector: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_selector: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_selector: Option<String>,
}

/// Selectors applied to an entry's detail page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetailSelectors {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_selector: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_selector: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_rating_selector: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_selector: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_selector: Option<String>,
}

fn default_link_attr() -> String {
    "href".to_string()
}

fn default_poster_attr() -> String {
    "src".to_string()
}

impl ListingSelectors {
    /// All configured selector strings, for validation.
    pub fn all(&self) -> Vec<&str> {
        let mut selectors = vec![
            self.entry_selector.as_str(),
            self.title_selector.as_str(),
            self.screening.row_selector.as_str(),
        ];
        let optional = [
            &self.link_selector,
            &self.tag_selector,
            &self.age_rating_selector,
            &self.duration_selector,
            &self.description_selector,
            &self.poster_selector,
            &self.screening.date_selector,
            &self.screening.time_selector,
            &self.screening.room_selector,
            &self.screening.variant_selector,
        ];
        selectors.extend(optional.into_iter().filter_map(|s| s.as_deref()));
        if let Some(detail) = &self.detail {
            let detail_selectors = [
                &detail.description_selector,
                &detail.duration_selector,
                &detail.age_rating_selector,
                &detail.tag_selector,
                &detail.poster_selector,
            ];
            selectors.extend(detail_selectors.into_iter().filter_map(|s| s.as_deref()));
        }
        selectors
    }

    /// Selectors for the Meisengeige programme page.
    pub fn meisengeige() -> Self {
        Self {
            entry_selector: "div.film".to_string(),
            title_selector: ".film-title".to_string(),
            id_attr: Some("data-film-id".to_string()),
            link_selector: Some(".film-title a".to_string()),
            link_attr: default_link_attr(),
            tag_selector: Some(".film-tags li".to_string()),
            age_rating_selector: Some(".film-fsk".to_string()),
            duration_selector: Some(".film-duration".to_string()),
            description_selector: None,
            poster_selector: Some("img.film-poster".to_string()),
            poster_attr: default_poster_attr(),
            screening: ScreeningSelectors {
                row_selector: ".showtimes .showtime".to_string(),
                datetime_attr: Some("data-start".to_string()),
                date_selector: Some(".date".to_string()),
                time_selector: Some(".time".to_string()),
                room_selector: Some(".room".to_string()),
                variant_selector: Some(".variant".to_string()),
            },
            detail: Some(DetailSelectors {
                description_selector: Some(".film-synopsis".to_string()),
                duration_selector: Some(".film-facts .duration".to_string()),
                age_rating_selector: Some(".film-facts .fsk".to_string()),
                tag_selector: Some(".film-facts .genre".to_string()),
                poster_selector: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_includes_detail_selectors() {
        let selectors = ListingSelectors::meisengeige();
        let all = selectors.all();
        assert!(all.contains(&"div.film"));
        assert!(all.contains(&".film-synopsis"));
        assert!(all.contains(&".showtimes .showtime"));
    }

    #[test]
    fn test_defaults_from_toml() {
        let toml_str = r#"
            entry_selector = "li.event"
            title_selector = "h2"

            [screening]
            row_selector = "time"
            datetime_attr = "datetime"
        "#;
        let selectors: ListingSelectors = toml::from_str(toml_str).unwrap();
        assert_eq!(selectors.link_attr, "href");
        assert_eq!(selectors.poster_attr, "src");
        assert!(selectors.detail.is_none());
        assert_eq!(selectors.all().len(), 3);
    }
}
