//! Time-range extraction: maps a query to a trailing window in hours.

use chrono::{Local, Timelike};
use regex::Regex;
use std::sync::OnceLock;

const DEFAULT_WINDOW_HOURS: u32 = 24;

/// Literal phrase table. First match wins, so declaration order is
/// load-bearing: e.g. "last 24 hours" must precede nothing that could
/// shadow it, and "last hour" sits before the numeric fallback.
const PHRASES: &[(&str, PhraseWindow)] = &[
    ("last hour", PhraseWindow::Fixed(1)),
    ("past hour", PhraseWindow::Fixed(1)),
    ("last 2 hours", PhraseWindow::Fixed(2)),
    ("last 3 hours", PhraseWindow::Fixed(3)),
    ("last 6 hours", PhraseWindow::Fixed(6)),
    ("last 12 hours", PhraseWindow::Fixed(12)),
    ("last day", PhraseWindow::Fixed(24)),
    ("last 24 hours", PhraseWindow::Fixed(24)),
    ("last week", PhraseWindow::Fixed(168)),
    ("last 7 days", PhraseWindow::Fixed(168)),
    ("today", PhraseWindow::HourOfDay),
    ("yesterday", PhraseWindow::Fixed(24)),
];

#[derive(Clone, Copy)]
enum PhraseWindow {
    Fixed(u32),
    /// "today" means "since local midnight", approximated as the current
    /// hour of day.
    HourOfDay,
}

fn hours_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"last (\d+) hours?").unwrap())
}

fn days_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"last (\d+) days?").unwrap())
}

/// Extract the window in hours from a query. Always a positive integer;
/// defaults to 24 when nothing matches.
pub fn extract_time_range(query: &str) -> u32 {
    extract_at(query, Local::now().hour())
}

fn extract_at(query: &str, current_hour: u32) -> u32 {
    let lowered = query.to_lowercase();

    for (phrase, window) in PHRASES {
        if lowered.contains(phrase) {
            return match window {
                PhraseWindow::Fixed(hours) => *hours,
                // Clamped so a query at 00:xx still yields a usable window.
                PhraseWindow::HourOfDay => current_hour.max(1),
            };
        }
    }

    if let Some(caps) = hours_re().captures(&lowered) {
        if let Ok(hours) = caps[1].parse::<u32>() {
            return hours.max(1);
        }
    }
    if let Some(caps) = days_re().captures(&lowered) {
        if let Ok(days) = caps[1].parse::<u32>() {
            return (days * 24).max(1);
        }
    }

    DEFAULT_WINDOW_HOURS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_phrases() {
        assert_eq!(extract_at("what happened in the last hour", 15), 1);
        assert_eq!(extract_at("summarize the last week", 15), 168);
        assert_eq!(extract_at("recap of yesterday", 15), 24);
        assert_eq!(extract_at("show me the last 12 hours", 15), 12);
    }

    #[test]
    fn test_today_uses_hour_of_day() {
        assert_eq!(extract_at("what happened today", 15), 15);
        // Clamped at midnight
        assert_eq!(extract_at("what happened today", 0), 1);
    }

    #[test]
    fn test_numeric_fallbacks() {
        assert_eq!(extract_at("summarize the last 3 hours", 15), 3);
        assert_eq!(extract_at("activity over the last 5 days", 15), 120);
    }

    #[test]
    fn test_table_order_beats_fallback() {
        // "last 24 hours" is in the literal table, not the numeric path
        assert_eq!(extract_at("the last 24 hours please", 15), 24);
        // Literal "last hour" wins before the numeric pattern sees it
        assert_eq!(extract_at("in the last hour", 15), 1);
    }

    #[test]
    fn test_default() {
        assert_eq!(extract_at("hello", 15), 24);
        assert_eq!(extract_at("", 15), 24);
    }
}
