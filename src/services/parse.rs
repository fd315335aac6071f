//! Text extraction and date/time parsing helpers for listing pages.

use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate, NaiveTime};
use regex::Regex;
use scraper::{ElementRef, Selector};

use crate::utils::clean_text;

type LazyRegex = OnceLock<Option<Regex>>;

static DOTTED_DATE_RE: LazyRegex = OnceLock::new();
static ISO_DATE_RE: LazyRegex = OnceLock::new();
static TIME_RE: LazyRegex = OnceLock::new();
static ISO_DATETIME_RE: LazyRegex = OnceLock::new();
static HOURS_RE: LazyRegex = OnceLock::new();
static MINUTES_RE: LazyRegex = OnceLock::new();
static NUMBER_RE: LazyRegex = OnceLock::new();

fn dotted_date_re() -> Option<&'static Regex> {
    compiled(&DOTTED_DATE_RE, r"\b(\d{1,2})\.(\d{1,2})\.(\d{4}|\d{2})?")
}

fn iso_date_re() -> Option<&'static Regex> {
    compiled(&ISO_DATE_RE, r"\b(\d{4})-(\d{2})-(\d{2})\b")
}

fn compiled(cell: &'static LazyRegex, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

/// Whitespace-normalized text content of an element.
pub fn inner_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

/// Text of the first match of `selector` below `element`, if non-empty.
pub fn first_text(element: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(inner_text)
        .filter(|text| !text.is_empty())
}

/// Attribute of the first match of `selector` below `element`.
pub fn first_attr(element: &ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    element
        .select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Parse a listing date such as `Mo, 20.10.`, `20.10.2025` or `2025-10-20`.
///
/// Dates without a year take the year that puts them closest to `today`,
/// so a December listing showing `03.01.` resolves to next January.
pub fn parse_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    if let Some(caps) = iso_date_re()?.captures(text) {
        return NaiveDate::from_ymd_opt(
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        );
    }

    let caps = dotted_date_re()?.captures(text)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    match caps.get(3) {
        Some(year) => {
            let mut year: i32 = year.as_str().parse().ok()?;
            if year < 100 {
                year += 2000;
            }
            NaiveDate::from_ymd_opt(year, month, day)
        }
        None => infer_year(day, month, today),
    }
}

fn infer_year(day: u32, month: u32, today: NaiveDate) -> Option<NaiveDate> {
    [today.year() - 1, today.year(), today.year() + 1]
        .into_iter()
        .filter_map(|year| NaiveDate::from_ymd_opt(year, month, day))
        .min_by_key(|date| (*date - today).num_days().abs())
}

/// Parse a start time such as `20:00`, `20.15 Uhr` or `9:30`.
pub fn parse_time(text: &str) -> Option<NaiveTime> {
    let caps = compiled(&TIME_RE, r"\b(\d{1,2})[:.](\d{2})\b")?.captures(text)?;
    NaiveTime::from_hms_opt(caps[1].parse().ok()?, caps[2].parse().ok()?, 0)
}

/// Parse the start time from text that also carries the date, such as a
/// whole screening row reading `Di, 21.10. 18:30`.
///
/// Date matches are removed first so `21.10.` is not read as a time.
pub fn parse_time_beside_date(text: &str) -> Option<NaiveTime> {
    let text = iso_date_re()?.replace_all(text, " ");
    let text = dotted_date_re()?.replace_all(&text, " ");
    parse_time(&text)
}

/// Parse the local date and time from an ISO-8601 attribute value.
///
/// Any offset is ignored: the listing's wall-clock time is what subscribers see.
pub fn parse_datetime_attr(value: &str) -> Option<(NaiveDate, NaiveTime)> {
    let caps = compiled(
        &ISO_DATETIME_RE,
        r"(\d{4})-(\d{2})-(\d{2})[T ](\d{1,2}):(\d{2})",
    )?
    .captures(value)?;
    let date = NaiveDate::from_ymd_opt(
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    )?;
    let time = NaiveTime::from_hms_opt(caps[4].parse().ok()?, caps[5].parse().ok()?, 0)?;
    Some((date, time))
}

/// Parse a running time such as `105 Min.`, `1h 45min`, `2 Std. 5 Min` or `98`.
///
/// Values that overflow are treated as unparsable.
pub fn parse_duration(text: &str) -> Option<u32> {
    let capture =
        |re: Option<&Regex>| -> Option<u32> { re?.captures(text).and_then(|c| c[1].parse().ok()) };
    let hours = capture(compiled(&HOURS_RE, r"(?i)(\d+)\s*(?:h\b|std)"));
    let minutes = capture(compiled(&MINUTES_RE, r"(?i)(\d+)\s*(?:min|m\b)"));

    let total = match (hours, minutes) {
        (None, None) => capture(compiled(&NUMBER_RE, r"\b(\d{2,3})\b")),
        (h, m) => h.unwrap_or(0).checked_mul(60)?.checked_add(m.unwrap_or(0)),
    };
    total.filter(|minutes| *minutes > 0)
}
