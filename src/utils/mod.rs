//! Utility functions and helpers.

pub mod http;

use regex::Regex;
use std::sync::OnceLock;
use unicode_segmentation::UnicodeSegmentation;
use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Collapse all whitespace runs into single spaces and trim.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract an entry ID from a detail URL (looks for common patterns).
pub fn extract_entry_id(url: &str) -> Option<String> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        // Common patterns: ?id=123, &film=123, /film/123-some-title, /event/123
        [
            r"[?&](?:id|film|filmid|film_id|event|eventid|movie)=(\w+)",
            r"/(?:film|filme|movie|event|veranstaltung|programm)/(\d+)",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    });

    patterns.iter().find_map(|pattern| {
        pattern
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|id| id.as_str().to_string())
    })
}

/// Escape text for Telegram's HTML parse mode.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Truncate to at most `max` grapheme clusters, appending an ellipsis when cut.
pub fn truncate_graphemes(text: &str, max: usize) -> String {
    if text.graphemes(true).count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(1);
    let mut truncated: String = text.graphemes(true).take(keep).collect();
    truncated.push('…');
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("https://example.com/programm/").unwrap();
        assert_eq!(
            resolve_url(&base, "film.html"),
            "https://example.com/programm/film.html"
        );
        assert_eq!(
            resolve_url(&base, "/root.html"),
            "https://example.com/root.html"
        );
        assert_eq!(
            resolve_url(&base, "https://other.com/x"),
            "https://other.com/x"
        );
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  Die \n\t Unschuld  "), "Die Unschuld");
        assert_eq!(clean_text("   "), "");
    }

    #[test]
    fn test_extract_entry_id() {
        assert_eq!(
            extract_entry_id("https://example.com/film/4711-die-unschuld"),
            Some("4711".to_string())
        );
        assert_eq!(
            extract_entry_id("https://example.com/detail?film=abc12"),
            Some("abc12".to_string())
        );
        assert_eq!(extract_entry_id("https://example.com/about"), None);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("Tom & Jerry <3"), "Tom &amp; Jerry &lt;3");
    }

    #[test]
    fn test_truncate_graphemes() {
        assert_eq!(truncate_graphemes("short", 10), "short");
        assert_eq!(truncate_graphemes("abcdef", 4), "abc…");
        // Combined characters are never split.
        assert_eq!(
            truncate_graphemes("e\u{301}e\u{301}e\u{301}", 2),
            "e\u{301}…"
        );
    }
}
