//! Normalized inbound event records and the derived-metadata helpers the
//! store uses when a platform event arrives without counts.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// A chat message event as delivered by the platform adapter.
///
/// Counts are optional: when absent they are derived from the text at
/// upsert time. `word_count` is always derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEvent {
    pub id: String,
    pub channel_id: String,
    pub user_id: String,
    pub text: String,
    /// Unix seconds, fractional.
    pub timestamp: f64,
    pub thread_id: Option<String>,
    pub message_type: Option<String>,
    pub mention_count: Option<i64>,
    pub link_count: Option<i64>,
    pub attachment_count: Option<i64>,
}

fn mention_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<@[A-Z0-9]+>").unwrap())
}

fn link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://\S+").unwrap())
}

/// Occurrences of the platform mention token (`<@USERID>`).
pub fn mention_count(text: &str) -> i64 {
    mention_re().find_iter(text).count() as i64
}

/// Occurrences of http(s) URLs.
pub fn link_count(text: &str) -> i64 {
    link_re().find_iter(text).count() as i64
}

/// Whitespace-delimited token count.
pub fn word_count(text: &str) -> i64 {
    text.split_whitespace().count() as i64
}
