//! Context assembly: turns a raw query into a relevance-ranked,
//! time-windowed, intent-aware context payload.
//!
//! Per request: detect intents, extract the window, check the cache, run
//! only the store calls the intents ask for, render the non-empty sections
//! in a fixed order, cache the result. Section failures are logged and the
//! section is dropped; assembly itself never fails.

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::ContextCache;
use crate::db::{
    ChannelSummary, Database, MessageHit, SentimentBreakdown, ThreadMatch, UserActivity,
};
use crate::error::EngineResult;
use crate::intent::{self, Intent};
use crate::timerange;

/// How many search hits the rendered context includes.
const MESSAGE_SECTION_LIMIT: usize = 10;
/// How many matched threads the rendered context includes.
const THREAD_SECTION_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextResult {
    pub context_text: String,
    pub intents: Vec<String>,
    pub window_hours: u32,
}

/// The structured sections behind a rendered context, in render order.
#[derive(Debug, Default)]
pub struct ContextSections {
    pub user_activity: Vec<UserActivity>,
    pub summary: Option<ChannelSummary>,
    pub sentiment: Option<SentimentBreakdown>,
    pub messages: Vec<MessageHit>,
    pub threads: Vec<ThreadMatch>,
}

impl ContextSections {
    /// Concatenate the non-empty sections with headers. Presentation for a
    /// specific chat surface is an adapter concern; this is the neutral
    /// text form handed to the generation backend.
    pub fn render(&self) -> String {
        let mut out = String::new();

        if !self.user_activity.is_empty() {
            out.push_str("User Activity Statistics:\n");
            for (index, user) in self.user_activity.iter().enumerate() {
                let position = match index {
                    0 => "#1",
                    1 => "#2",
                    2 => "#3",
                    _ => "-",
                };
                out.push_str(&format!(
                    "{position} {}: {} messages\n",
                    user.user_display, user.message_count
                ));
            }
            out.push('\n');
        }

        if let Some(summary) = &self.summary {
            out.push_str("Channel Summary:\n");
            out.push_str(&format!("- Total Messages: {}\n", summary.message_count));
            out.push_str(&format!("- Active Users: {}\n", summary.unique_users));
            out.push_str(&format!(
                "- Peak Hour: {}\n",
                summary.peak_hour.as_deref().unwrap_or("N/A")
            ));
            out.push_str(&format!(
                "- Most Active User: {}\n\n",
                summary.most_active_user.as_deref().unwrap_or("N/A")
            ));
        }

        if let Some(sentiment) = &self.sentiment {
            out.push_str("Sentiment Analysis:\n");
            out.push_str(&format!("- Positive: {}%\n", sentiment.positive));
            out.push_str(&format!("- Neutral: {}%\n", sentiment.neutral));
            out.push_str(&format!("- Negative: {}%\n\n", sentiment.negative));
        }

        if !self.messages.is_empty() {
            out.push_str("Relevant Messages:\n");
            for hit in &self.messages {
                let time = format_timestamp(hit.message.timestamp);
                let channel = hit.channel_name.as_deref().unwrap_or("DM");
                let user = hit
                    .user_display
                    .as_deref()
                    .unwrap_or(hit.message.user_id.as_str());
                out.push_str(&format!("[{time}] #{channel} @{user}: {}\n", hit.message.text));
            }
            out.push('\n');
        }

        if !self.threads.is_empty() {
            out.push_str("Related Threads:\n");
            for thread in &self.threads {
                out.push_str(&format!("- {}\n", thread.summary));
            }
            out.push('\n');
        }

        out.trim_end().to_string()
    }
}

fn format_timestamp(timestamp: f64) -> String {
    Utc.timestamp_opt(timestamp as i64, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

pub struct ContextAssembler {
    db: Database,
    cache: Arc<ContextCache>,
}

impl ContextAssembler {
    pub fn new(db: Database, cache: Arc<ContextCache>) -> Self {
        Self { db, cache }
    }

    /// Assemble context for a query, optionally scoped to one channel.
    /// Never fails: the worst case is an empty context string.
    pub async fn assemble(&self, query: &str, channel_id: Option<&str>) -> ContextResult {
        let intents = intent::detect_intents(query);
        let window_hours = timerange::extract_time_range(query);
        let key = cache_key(query, channel_id, &intents);

        if let Some(cached) = self.cache.get(&key) {
            debug!("Context: cache hit for {:?}", query);
            return cached;
        }

        let mut sections = ContextSections::default();

        if intents.contains(&Intent::UserStats) {
            sections.user_activity = self
                .section("user_activity", move |db| db.user_activity(window_hours))
                .await
                .unwrap_or_default();
        }

        if intents.contains(&Intent::Summary) || intents.contains(&Intent::Report) {
            let channel = channel_id.map(str::to_string);
            sections.summary = self
                .section("channel_summary", move |db| {
                    db.channel_summary(channel.as_deref(), window_hours)
                })
                .await
                // A zero-message summary carries no context; drop it.
                .filter(|summary| summary.message_count > 0);
        }

        if intents.contains(&Intent::Sentiment) {
            let channel = channel_id.map(str::to_string);
            sections.sentiment = self
                .section("sentiment", move |db| {
                    db.sentiment(channel.as_deref(), window_hours)
                })
                .await;
        }

        let query_owned = query.to_string();
        let mut hits = self
            .section("search", move |db| {
                db.search_messages(&query_owned, window_hours)
            })
            .await
            .unwrap_or_default();
        hits.truncate(MESSAGE_SECTION_LIMIT);
        sections.messages = hits;

        if intents.contains(&Intent::Thread) {
            let query_owned = query.to_string();
            let mut threads = self
                .section("threads", move |db| {
                    db.threads_matching(&query_owned, window_hours)
                })
                .await
                .unwrap_or_default();
            threads.truncate(THREAD_SECTION_LIMIT);
            sections.threads = threads;
        }

        let result = ContextResult {
            context_text: sections.render(),
            intents: intents.iter().map(|i| i.as_str().to_string()).collect(),
            window_hours,
        };
        self.cache.insert(key, result.clone());
        result
    }

    /// Run one store call off the async thread; a failure logs and yields
    /// `None` so the section is omitted instead of aborting the assembly.
    async fn section<T, F>(&self, name: &'static str, call: F) -> Option<T>
    where
        T: Send + 'static,
        F: FnOnce(Database) -> EngineResult<T> + Send + 'static,
    {
        let db = self.db.clone();
        match tokio::task::spawn_blocking(move || call(db)).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                warn!("Context: {} section failed, omitting: {}", name, e);
                None
            }
            Err(e) => {
                warn!("Context: {} section task panicked, omitting: {}", name, e);
                None
            }
        }
    }
}

fn cache_key(query: &str, channel_id: Option<&str>, intents: &[Intent]) -> String {
    let mut names: Vec<&str> = intents.iter().map(|i| i.as_str()).collect();
    names.sort_unstable();
    format!(
        "context|{}|{}|{}",
        query.trim().to_lowercase(),
        channel_id.unwrap_or(""),
        names.join(",")
    )
}
