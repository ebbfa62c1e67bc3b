//! Row types returned by the message store. All of them serialize, since
//! the analytics queries are also consumed by report/export adapters.

use serde::{Deserialize, Serialize};

/// A message as persisted, with derived metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub channel_id: String,
    pub user_id: String,
    pub text: String,
    /// Unix seconds, fractional (platform event timestamps carry sub-second
    /// precision).
    pub timestamp: f64,
    /// Id of the thread-starting message, if this is a reply.
    pub thread_id: Option<String>,
    pub message_type: String,
    pub mentions_count: i64,
    pub links_count: i64,
    pub attachments_count: i64,
    pub word_count: i64,
}

/// A search result: the message plus its relevance tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageHit {
    #[serde(flatten)]
    pub message: MessageRecord,
    /// 3 = contains the whole query phrase, 2 = contains at least one term.
    pub relevance_score: i64,
    /// Display name of the author, when the user is known.
    pub user_display: Option<String>,
    /// Channel name, when the channel is known.
    pub channel_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub id: String,
    pub name: String,
    pub is_private: bool,
    pub topic: Option<String>,
    pub purpose: Option<String>,
    pub member_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub display_name: Option<String>,
    pub real_name: Option<String>,
    pub email: Option<String>,
    pub status: Option<String>,
    pub timezone: Option<String>,
    pub is_bot: bool,
}

/// Windowed aggregate over one channel (or all channels).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub message_count: i64,
    pub unique_users: i64,
    pub first_message: Option<f64>,
    pub last_message: Option<f64>,
    /// Mean word count per message.
    pub avg_message_length: Option<f64>,
    pub total_mentions: i64,
    pub total_links: i64,
    pub thread_count: i64,
    /// "Name (N messages)" for the busiest author in the window.
    pub most_active_user: Option<String>,
    /// "HH:00" (UTC) for the busiest hour bucket in the window.
    pub peak_hour: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserActivity {
    pub user_display: String,
    pub user_id: String,
    pub message_count: i64,
    pub avg_message_length: Option<f64>,
    pub total_mentions: i64,
}

/// Keyword-heuristic sentiment split, in whole percentages.
///
/// A message can count toward both positive and negative, so
/// `neutral` (100 - positive - negative) can go below zero. Known edge
/// case, kept as-is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SentimentBreakdown {
    pub positive: i64,
    pub negative: i64,
    pub neutral: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadMatch {
    pub thread_id: String,
    pub reply_count: i64,
    /// Comma-joined distinct participant display names.
    pub participants: Option<String>,
    pub last_reply: f64,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourBucket {
    /// "00".."23", UTC hour of day.
    pub hour: String,
    pub message_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStats {
    pub total_messages: i64,
    pub total_users: i64,
    pub total_channels: i64,
    pub total_queries: i64,
    pub messages_last_24h: i64,
}

/// One completed context-assembly request, for the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryLogEntry {
    pub user_id: Option<String>,
    pub query: String,
    /// Comma-joined intent names, in detection order.
    pub intents: String,
    pub response_length: i64,
    pub response_time_ms: i64,
    pub timestamp: f64,
}
