// src/services/listing.rs

//! Selector-driven listing scraper.
//!
//! Fetches a source's listing page, parses every entry with the configured
//! CSS selectors and then, if detail selectors are configured, fetches one
//! detail page per entry to fill optional fields.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{HttpConfig, ProgramEntry, Screening, SourceConfig};
use crate::pipeline::RunBudget;
use crate::services::parse::{
    first_attr, first_text, inner_text, parse_date, parse_datetime_attr, parse_duration,
    parse_time, parse_time_beside_date,
};
use crate::services::{ScrapeOutcome, SourceScraper};
use crate::utils::http::fetch_text;
use crate::utils::{extract_entry_id, resolve_url};

struct EntrySelectors {
    entry: Selector,
    title: Selector,
    link: Option<Selector>,
    anchor: Selector,
    tag: Option<Selector>,
    age_rating: Option<Selector>,
    duration: Option<Selector>,
    description: Option<Selector>,
    poster: Option<Selector>,
    screening_row: Selector,
    screening_date: Option<Selector>,
    screening_time: Option<Selector>,
    screening_room: Option<Selector>,
    screening_variant: Option<Selector>,
}

struct DetailPageSelectors {
    description: Option<Selector>,
    duration: Option<Selector>,
    age_rating: Option<Selector>,
    tag: Option<Selector>,
    poster: Option<Selector>,
}

/// Optional fields found on a detail page.
#[derive(Debug, Default, PartialEq)]
struct DetailFields {
    description: Option<String>,
    duration_minutes: Option<u32>,
    age_rating: Option<String>,
    tags: Vec<String>,
    poster: Option<String>,
}

impl DetailFields {
    fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.duration_minutes.is_none()
            && self.age_rating.is_none()
            && self.tags.is_empty()
            && self.poster.is_none()
    }

    /// Fill fields the listing did not provide; listing values win.
    fn apply_to(self, entry: &mut ProgramEntry) {
        if entry.description.is_none() {
            entry.description = self.description;
        }
        if entry.duration_minutes.is_none() {
            entry.duration_minutes = self.duration_minutes;
        }
        if entry.age_rating.is_none() {
            entry.age_rating = self.age_rating;
        }
        if entry.tags.is_empty() {
            entry.tags = self.tags;
        }
        if entry.poster.is_none() {
            entry.poster = self.poster;
        }
    }
}

enum DetailResult {
    Fetched(DetailFields),
    Failed(AppError),
    Skipped,
}

/// Scraper for sources described entirely by configuration.
pub struct HtmlListingScraper {
    config: SourceConfig,
    client: Client,
    base_url: Url,
    selectors: EntrySelectors,
    detail: Option<DetailPageSelectors>,
    request_delay: Duration,
    concurrency: usize,
}

impl HtmlListingScraper {
    /// Create a scraper, compiling all configured selectors.
    pub fn new(config: SourceConfig, client: Client, http: &HttpConfig) -> Result<Self> {
        let base_url = Url::parse(&config.url)?;
        let s = &config.selectors;

        let selectors = EntrySelectors {
            entry: parse_selector(&s.entry_selector)?,
            title: parse_selector(&s.title_selector)?,
            link: parse_optional(&s.link_selector)?,
            anchor: parse_selector("a[href]")?,
            tag: parse_optional(&s.tag_selector)?,
            age_rating: parse_optional(&s.age_rating_selector)?,
            duration: parse_optional(&s.duration_selector)?,
            description: parse_optional(&s.description_selector)?,
            poster: parse_optional(&s.poster_selector)?,
            screening_row: parse_selector(&s.screening.row_selector)?,
            screening_date: parse_optional(&s.screening.date_selector)?,
            screening_time: parse_optional(&s.screening.time_selector)?,
            screening_room: parse_optional(&s.screening.room_selector)?,
            screening_variant: parse_optional(&s.screening.variant_selector)?,
        };

        let detail = match &s.detail {
            Some(d) => Some(DetailPageSelectors {
                description: parse_optional(&d.description_selector)?,
                duration: parse_optional(&d.duration_selector)?,
                age_rating: parse_optional(&d.age_rating_selector)?,
                tag: parse_optional(&d.tag_selector)?,
                poster: parse_optional(&d.poster_selector)?,
            }),
            None => None,
        };

        Ok(Self {
            config,
            client,
            base_url,
            selectors,
            detail,
            request_delay: Duration::from_millis(http.request_delay_ms),
            concurrency: http.max_concurrent.max(1),
        })
    }

    /// Parse a listing page into entries plus the descriptions of skipped entries.
    fn parse_listing(
        &self,
        html: &str,
        today: NaiveDate,
    ) -> Result<(Vec<ProgramEntry>, Vec<String>)> {
        let document = Html::parse_document(html);
        let rows: Vec<ElementRef> = document.select(&self.selectors.entry).collect();
        if rows.is_empty() {
            return Err(AppError::parse(
                &self.config.id,
                format!(
                    "listing matched no entries for '{}'",
                    self.config.selectors.entry_selector
                ),
            ));
        }

        let mut entries = Vec::with_capacity(rows.len());
        let mut skipped = Vec::new();
        for (position, row) in rows.iter().enumerate() {
            match self.parse_entry(row, today) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    log::warn!(
                        "[{}] Skipping entry #{}: {}",
                        self.config.id,
                        position + 1,
                        e
                    );
                    skipped.push(format!("entry #{}: {}", position + 1, e));
                }
            }
        }

        if entries.is_empty() {
            return Err(AppError::parse(
                &self.config.id,
                format!("all {} listed entries failed to parse", rows.len()),
            ));
        }
        Ok((entries, skipped))
    }

    fn parse_entry(&self, row: &ElementRef, today: NaiveDate) -> Result<ProgramEntry> {
        let s = &self.selectors;
        let cfg = &self.config.selectors;

        let title_elem = row
            .select(&s.title)
            .next()
            .ok_or_else(|| AppError::parse(&self.config.id, "entry has no title element"))?;
        let title = inner_text(title_elem);
        if title.is_empty() {
            return Err(AppError::parse(&self.config.id, "entry title is empty"));
        }

        let mut entry = ProgramEntry::new(title.as_str());

        let href = match &s.link {
            Some(link) => first_attr(row, link, &cfg.link_attr),
            None => title_elem
                .value()
                .attr(&cfg.link_attr)
                .map(str::to_string)
                .or_else(|| first_attr(&title_elem, &s.anchor, "href")),
        };
        entry.detail_url = href.map(|href| resolve_url(&self.base_url, &href));

        entry.external_id = cfg
            .id_attr
            .as_deref()
            .and_then(|attr| row.value().attr(attr))
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .or_else(|| entry.detail_url.as_deref().and_then(extract_entry_id));

        if let Some(tag) = &s.tag {
            entry.tags = collect_tags(row, tag);
        }
        entry.age_rating = s.age_rating.as_ref().and_then(|sel| first_text(row, sel));
        entry.duration_minutes = s
            .duration
            .as_ref()
            .and_then(|sel| first_text(row, sel))
            .and_then(|text| parse_duration(&text));
        entry.description = s.description.as_ref().and_then(|sel| first_text(row, sel));
        entry.poster = s
            .poster
            .as_ref()
            .and_then(|sel| first_attr(row, sel, &cfg.poster_attr))
            .map(|src| resolve_url(&self.base_url, &src));

        for screening_row in row.select(&s.screening_row) {
            let screening = self
                .parse_screening(&screening_row, today)
                .map_err(|e| AppError::parse(format!("{} '{}'", self.config.id, title), e))?;
            entry.screenings.push(screening);
        }

        Ok(entry)
    }

    fn parse_screening(
        &self,
        row: &ElementRef,
        today: NaiveDate,
    ) -> std::result::Result<Screening, String> {
        let s = &self.selectors;
        let time_elem = s
            .screening_time
            .as_ref()
            .and_then(|sel| row.select(sel).next());

        let from_attr = self
            .config
            .selectors
            .screening
            .datetime_attr
            .as_deref()
            .and_then(|attr| {
                row.value()
                    .attr(attr)
                    .or_else(|| time_elem.and_then(|el| el.value().attr(attr)))
            })
            .and_then(parse_datetime_attr);

        let (date, time) = match from_attr {
            Some(date_time) => date_time,
            None => {
                let date_text = match &s.screening_date {
                    Some(sel) => first_text(row, sel).unwrap_or_default(),
                    None => inner_text(*row),
                };
                let (time_text, time) = match time_elem {
                    Some(el) => {
                        let text = inner_text(el);
                        let time = parse_time(&text);
                        (text, time)
                    }
                    None => {
                        let text = inner_text(*row);
                        let time = parse_time_beside_date(&text);
                        (text, time)
                    }
                };
                let date = parse_date(&date_text, today)
                    .ok_or_else(|| format!("unparsable screening date '{date_text}'"))?;
                let time =
                    time.ok_or_else(|| format!("unparsable screening time '{time_text}'"))?;
                (date, time)
            }
        };

        let room = s
            .screening_room
            .as_ref()
            .and_then(|sel| first_text(row, sel))
            .unwrap_or_default();
        let variant = s
            .screening_variant
            .as_ref()
            .and_then(|sel| first_text(row, sel))
            .unwrap_or_default();

        Ok(Screening::new(date, time, room, variant))
    }

    fn parse_detail(
        &self,
        selectors: &DetailPageSelectors,
        url: &str,
        html: &str,
    ) -> Result<DetailFields> {
        let document = Html::parse_document(html);
        let root = document.root_element();

        let fields = DetailFields {
            description: selectors
                .description
                .as_ref()
                .and_then(|sel| first_text(&root, sel)),
            duration_minutes: selectors
                .duration
                .as_ref()
                .and_then(|sel| first_text(&root, sel))
                .and_then(|text| parse_duration(&text)),
            age_rating: selectors
                .age_rating
                .as_ref()
                .and_then(|sel| first_text(&root, sel)),
            tags: selectors
                .tag
                .as_ref()
                .map(|sel| collect_tags(&root, sel))
                .unwrap_or_default(),
            poster: selectors
                .poster
                .as_ref()
                .and_then(|sel| first_attr(&root, sel, &self.config.selectors.poster_attr))
                .map(|src| resolve_url(&self.base_url, &src)),
        };

        if fields.is_empty() {
            return Err(AppError::parse(
                url,
                "detail page matched none of the detail selectors",
            ));
        }
        Ok(fields)
    }

    async fn fetch_detail(
        &self,
        selectors: &DetailPageSelectors,
        url: &str,
    ) -> Result<DetailFields> {
        let html = fetch_text(&self.client, url).await?;
        self.parse_detail(selectors, url, &html)
    }

    /// Fetch detail pages concurrently, stopping new fetches once the budget is spent.
    async fn enrich(&self, outcome: &mut ScrapeOutcome, budget: &RunBudget) {
        let Some(selectors) = &self.detail else {
            return;
        };

        let jobs: Vec<(usize, String)> = outcome
            .entries
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| entry.detail_url.clone().map(|url| (i, url)))
            .collect();
        outcome.detail_total = jobs.len();

        let mut results = stream::iter(jobs)
            .map(|(i, url)| async move {
                if budget.is_exhausted() {
                    return (i, url, DetailResult::Skipped);
                }
                match self.fetch_detail(selectors, &url).await {
                    Ok(fields) => (i, url, DetailResult::Fetched(fields)),
                    Err(e) => (i, url, DetailResult::Failed(e)),
                }
            })
            .buffer_unordered(self.concurrency);

        while let Some((i, url, result)) = results.next().await {
            match result {
                DetailResult::Fetched(fields) => fields.apply_to(&mut outcome.entries[i]),
                DetailResult::Failed(e) => {
                    log::warn!("[{}] Detail page {} failed: {}", self.config.id, url, e);
                    outcome.detail_failures += 1;
                    outcome.degraded.push(i);
                }
                DetailResult::Skipped => {
                    outcome.detail_skipped += 1;
                    outcome.degraded.push(i);
                    continue;
                }
            }

            if !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }
        }

        outcome.degraded.sort_unstable();
        if outcome.detail_skipped > 0 {
            log::warn!(
                "[{}] Time budget exhausted: skipped {} of {} detail pages",
                self.config.id,
                outcome.detail_skipped,
                outcome.detail_total
            );
        }
    }
}

#[async_trait]
impl SourceScraper for HtmlListingScraper {
    fn source_id(&self) -> &str {
        &self.config.id
    }

    fn display_name(&self) -> &str {
        &self.config.display_name
    }

    fn source_url(&self) -> &str {
        &self.config.url
    }

    async fn scrape(&self, budget: &RunBudget) -> Result<ScrapeOutcome> {
        let html = fetch_text(&self.client, &self.config.url).await?;
        let (entries, skipped_entries) = self.parse_listing(&html, Local::now().date_naive())?;

        let mut outcome = ScrapeOutcome {
            entries,
            skipped_entries,
            ..ScrapeOutcome::default()
        };
        self.enrich(&mut outcome, budget).await;

        log::info!(
            "[{}] Scraped {} entries ({} skipped, {} detail failures, {} detail skipped)",
            self.config.id,
            outcome.entries.len(),
            outcome.skipped_entries.len(),
            outcome.detail_failures,
            outcome.detail_skipped
        );
        Ok(outcome)
    }
}

/// Non-empty tag texts in document order, without repeats.
fn collect_tags(element: &ElementRef, selector: &Selector) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in element.select(selector).map(inner_text) {
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

fn parse_optional(s: &Option<String>) -> Result<Option<Selector>> {
    s.as_deref().map(parse_selector).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListingSelectors;
    use chrono::NaiveTime;
    use httpmock::prelude::*;

    fn film(id: &str, title: &str, start: &str) -> String {
        format!(
            r#"<div class="film" data-film-id="{id}">
                <h2 class="film-title"><a href="/film/{id}">{title}</a></h2>
                <ul class="film-tags"><li>Drama</li><li>Drama</li><li>OmU</li></ul>
                <span class="film-fsk">FSK 12</span>
                <img class="film-poster" src="/img/{id}.jpg">
                <div class="showtimes">
                    <div class="showtime" data-start="{start}">
                        <span class="room">Saal 1</span><span class="variant">OV</span>
                    </div>
                </div>
            </div>"#
        )
    }

    fn page(films: &[String]) -> String {
        format!("<html><body>{}</body></html>", films.join("\n"))
    }

    fn detail_page(synopsis: &str) -> String {
        format!(
            r#"<html><body>
                <div class="film-synopsis">{synopsis}</div>
                <div class="film-facts"><span class="duration">1h 45min</span></div>
            </body></html>"#
        )
    }

    fn make_scraper(url: String, detail: bool) -> HtmlListingScraper {
        let mut selectors = ListingSelectors::meisengeige();
        if !detail {
            selectors.detail = None;
        }
        scraper_with(url, selectors)
    }

    fn scraper_with(url: String, selectors: ListingSelectors) -> HtmlListingScraper {
        let http = HttpConfig {
            request_delay_ms: 0,
            ..HttpConfig::default()
        };
        let config = SourceConfig {
            id: "kino".to_string(),
            display_name: "Kino".to_string(),
            url,
            selectors,
        };
        let client = crate::utils::http::create_async_client(&http).unwrap();
        HtmlListingScraper::new(config, client, &http).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 19).unwrap()
    }

    #[test]
    fn test_parse_entry_fields() {
        let scraper = make_scraper("https://kino.example.com/programm/".to_string(), false);
        let html = page(&[film("101", "Die Unschuld", "2025-10-20T20:00:00+02:00")]);

        let (entries, skipped) = scraper.parse_listing(&html, today()).unwrap();
        assert!(skipped.is_empty());
        let entry = &entries[0];
        assert_eq!(entry.title, "Die Unschuld");
        assert_eq!(entry.external_id.as_deref(), Some("101"));
        assert_eq!(entry.tags, vec!["Drama".to_string(), "OmU".to_string()]);
        assert_eq!(entry.age_rating.as_deref(), Some("FSK 12"));
        assert_eq!(
            entry.detail_url.as_deref(),
            Some("https://kino.example.com/film/101")
        );
        assert_eq!(
            entry.poster.as_deref(),
            Some("https://kino.example.com/img/101.jpg")
        );
        assert_eq!(
            entry.screenings,
            vec![Screening::new(
                NaiveDate::from_ymd_opt(2025, 10, 20).unwrap(),
                NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
                "Saal 1",
                "OV"
            )]
        );
    }

    #[test]
    fn test_screening_text_fallback() {
        let scraper = make_scraper("https://kino.example.com/".to_string(), false);
        let html = r#"<div class="film"><h2 class="film-title">Film B</h2>
            <div class="showtimes"><div class="showtime">
                <span class="date">Di, 21.10.</span><span class="time">18.30 Uhr</span>
            </div></div></div>"#;

        let (entries, _) = scraper.parse_listing(html, today()).unwrap();
        let screening = &entries[0].screenings[0];
        assert_eq!(
            screening.date,
            NaiveDate::from_ymd_opt(2025, 10, 21).unwrap()
        );
        assert_eq!(screening.time, NaiveTime::from_hms_opt(18, 30, 0).unwrap());
        assert_eq!(screening.room, "");
        assert!(entries[0].external_id.is_none());
    }

    #[test]
    fn test_screening_row_text_only() {
        let mut selectors = ListingSelectors::meisengeige();
        selectors.detail = None;
        selectors.screening.date_selector = None;
        selectors.screening.time_selector = None;
        selectors.screening.datetime_attr = None;
        let scraper = scraper_with("https://kino.example.com/".to_string(), selectors);
        let html = r#"<div class="film"><h2 class="film-title">Film C</h2>
            <div class="showtimes"><div class="showtime">Di, 21.10. 18:30</div></div></div>"#;

        let (entries, skipped) = scraper.parse_listing(html, today()).unwrap();
        assert!(skipped.is_empty());
        let screening = &entries[0].screenings[0];
        assert_eq!(
            screening.date,
            NaiveDate::from_ymd_opt(2025, 10, 21).unwrap()
        );
        assert_eq!(screening.time, NaiveTime::from_hms_opt(18, 30, 0).unwrap());
    }

    #[test]
    fn test_one_malformed_entry_is_skipped() {
        let scraper = make_scraper("https://kino.example.com/".to_string(), false);
        let html = page(&[
            film("1", "Film A", "2025-10-20T20:00"),
            film("2", "Film B", "2025-10-20T20:00"),
            // No title.
            r#"<div class="film" data-film-id="3"><p>kaputt</p></div>"#.to_string(),
            film("4", "Film D", "2025-10-20T20:00"),
            film("5", "Film E", "2025-10-20T20:00"),
        ]);

        let (entries, skipped) = scraper.parse_listing(&html, today()).unwrap();
        let titles: Vec<&str> = entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Film A", "Film B", "Film D", "Film E"]);
        assert_eq!(skipped.len(), 1);
        assert!(skipped[0].starts_with("entry #3"));
    }

    #[test]
    fn test_unparsable_screening_skips_entry() {
        let scraper = make_scraper("https://kino.example.com/".to_string(), false);
        let html = page(&[
            film("1", "Film A", "2025-10-20T20:00"),
            r#"<div class="film"><h2 class="film-title">Film B</h2>
                <div class="showtimes"><div class="showtime"><span class="time">bald</span></div></div>
            </div>"#
                .to_string(),
        ]);

        let (entries, skipped) = scraper.parse_listing(&html, today()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(skipped.len(), 1);
    }

    #[test]
    fn test_layout_change_is_source_parse_error() {
        let scraper = make_scraper("https://kino.example.com/".to_string(), false);
        let result = scraper.parse_listing("<html><body><p>Relaunch!</p></body></html>", today());
        assert!(matches!(result, Err(AppError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_scrape_five_entries_with_one_fault() {
        let server = MockServer::start_async().await;
        let html = page(&[
            film("1", "Film A", "2025-10-20T20:00"),
            film("2", "Film B", "2025-10-20T20:00"),
            r#"<div class="film"><span>no title</span></div>"#.to_string(),
            film("4", "Film D", "2025-10-20T20:00"),
            film("5", "Film E", "2025-10-20T20:00"),
        ]);
        let listing = server
            .mock_async(|when, then| {
                when.method(GET).path("/programm/");
                then.status(200).body(html);
            })
            .await;

        let scraper = make_scraper(server.url("/programm/"), false);
        let outcome = scraper.scrape(&RunBudget::unlimited()).await.unwrap();

        listing.assert_async().await;
        assert_eq!(outcome.entries.len(), 4);
        assert_eq!(outcome.skipped_entries.len(), 1);
        assert_eq!(outcome.detail_total, 0);
    }

    #[tokio::test]
    async fn test_detail_failure_degrades_entry() {
        let server = MockServer::start_async().await;
        let html = page(&[
            film("1", "Film A", "2025-10-20T20:00"),
            film("2", "Film B", "2025-10-21T20:00"),
        ]);
        server
            .mock_async(|when, then| {
                when.method(GET).path("/programm/");
                then.status(200).body(html);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/film/1");
                then.status(200).body(detail_page("Ein stilles Drama."));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/film/2");
                then.status(503);
            })
            .await;

        let scraper = make_scraper(server.url("/programm/"), true);
        let outcome = scraper.scrape(&RunBudget::unlimited()).await.unwrap();

        assert_eq!(outcome.entries.len(), 2);
        assert_eq!(outcome.detail_total, 2);
        assert_eq!(outcome.detail_failures, 1);
        assert_eq!(outcome.degraded, vec![1]);

        let first = &outcome.entries[0];
        assert_eq!(first.description.as_deref(), Some("Ein stilles Drama."));
        assert_eq!(first.duration_minutes, Some(105));
        // Listing tags win over detail tags.
        assert_eq!(first.tags, vec!["Drama".to_string(), "OmU".to_string()]);

        let second = &outcome.entries[1];
        assert!(second.description.is_none());
        assert_eq!(second.screenings.len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_budget_skips_detail_pages() {
        let server = MockServer::start_async().await;
        let html = page(&[film("1", "Film A", "2025-10-20T20:00")]);
        server
            .mock_async(|when, then| {
                when.method(GET).path("/programm/");
                then.status(200).body(html);
            })
            .await;
        let detail = server
            .mock_async(|when, then| {
                when.method(GET).path("/film/1");
                then.status(200).body(detail_page("x"));
            })
            .await;

        let scraper = make_scraper(server.url("/programm/"), true);
        let budget = RunBudget::new(Duration::ZERO);
        let outcome = scraper.scrape(&budget).await.unwrap();

        assert_eq!(detail.hits_async().await, 0);
        assert_eq!(outcome.entries.len(), 1);
        assert_eq!(outcome.detail_skipped, 1);
        assert_eq!(outcome.degraded, vec![0]);
    }

    #[tokio::test]
    async fn test_listing_error_status_is_fetch_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/programm/");
                then.status(500);
            })
            .await;

        let scraper = make_scraper(server.url("/programm/"), false);
        let result = scraper.scrape(&RunBudget::unlimited()).await;
        assert!(matches!(result, Err(AppError::Fetch { .. })));
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let mut selectors = ListingSelectors::meisengeige();
        selectors.entry_selector = "[[invalid".to_string();
        let http = HttpConfig::default();
        let config = SourceConfig {
            id: "kino".to_string(),
            display_name: "Kino".to_string(),
            url: "https://kino.example.com/".to_string(),
            selectors,
        };
        let client = crate::utils::http::create_async_client(&http).unwrap();
        assert!(matches!(
            HtmlListingScraper::new(config, client, &http),
            Err(AppError::Selector { .. })
        ));
    }
}
