//! Multi-label intent detection over a free-text query.
//!
//! A fixed, declaration-ordered table of case-insensitive patterns; every
//! matching entry fires. No match is a valid outcome and downstream falls
//! back to plain search behavior.

use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Summary,
    UserStats,
    Search,
    TimeQuery,
    Sentiment,
    Help,
    Report,
    Thread,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Summary => "summary",
            Intent::UserStats => "userStats",
            Intent::Search => "search",
            Intent::TimeQuery => "timeQuery",
            Intent::Sentiment => "sentiment",
            Intent::Help => "help",
            Intent::Report => "report",
            Intent::Thread => "thread",
        }
    }
}

/// Table order decides the order of the returned set, so keep it stable.
fn intent_table() -> &'static [(Intent, Regex)] {
    static TABLE: OnceLock<Vec<(Intent, Regex)>> = OnceLock::new();
    TABLE.get_or_init(|| {
        vec![
            (Intent::Summary, Regex::new(r"(?i)summarize|summary|recap|overview|brief").unwrap()),
            (Intent::UserStats, Regex::new(r"(?i)who.*talked|message.*count|most active|top.*user").unwrap()),
            (Intent::Search, Regex::new(r"(?i)find|search|look for|where.*said|mentioned").unwrap()),
            (Intent::TimeQuery, Regex::new(r"(?i)when|what time|last.*message|recent").unwrap()),
            (Intent::Sentiment, Regex::new(r"(?i)mood|sentiment|feeling|tone|vibe").unwrap()),
            (Intent::Help, Regex::new(r"(?i)help|what can you do|commands|how to").unwrap()),
            (Intent::Report, Regex::new(r"(?i)report|analytics|statistics|metrics").unwrap()),
            (Intent::Thread, Regex::new(r"(?i)thread|conversation|discussion about").unwrap()),
        ]
    })
}

/// Every intent whose pattern matches the query, in table order.
pub fn detect_intents(query: &str) -> Vec<Intent> {
    intent_table()
        .iter()
        .filter(|(_, pattern)| pattern.is_match(query))
        .map(|(intent, _)| *intent)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_intents() {
        assert!(detect_intents("who talked the most today?").contains(&Intent::UserStats));
        assert!(detect_intents("find messages about launch").contains(&Intent::Search));
        assert!(detect_intents("what's the mood in here").contains(&Intent::Sentiment));
        assert!(detect_intents("summarize the last 3 hours").contains(&Intent::Summary));
    }

    #[test]
    fn test_multiple_intents_in_table_order() {
        let intents = detect_intents("search recent threads and summarize them");
        // Summary declared before Search declared before TimeQuery/Thread
        assert_eq!(
            intents,
            vec![Intent::Summary, Intent::Search, Intent::TimeQuery, Intent::Thread]
        );
    }

    #[test]
    fn test_no_intent_is_valid() {
        assert!(detect_intents("hello there").is_empty());
        assert!(detect_intents("").is_empty());
    }

    #[test]
    fn test_case_insensitive() {
        assert!(detect_intents("SUMMARIZE EVERYTHING").contains(&Intent::Summary));
    }
}
