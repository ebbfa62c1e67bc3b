use rusqlite::{Connection, OptionalExtension};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::{EngineError, EngineResult};
use crate::ingest::{self, MessageEvent};

pub mod records;
mod schema;

pub use records::*;

/// Hard cap on grouped thread results and user-activity rows.
const GROUP_LIMIT: usize = 20;

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    search_limit: usize,
}

fn now_secs() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Start of a trailing window of `hours`, evaluated at call time.
fn window_floor(hours: u32) -> f64 {
    now_secs() - f64::from(hours) * 3600.0
}

fn message_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRecord> {
    Ok(MessageRecord {
        id: row.get(0)?,
        channel_id: row.get(1)?,
        user_id: row.get(2)?,
        text: row.get(3)?,
        timestamp: row.get(4)?,
        thread_id: row.get(5)?,
        message_type: row.get(6)?,
        mentions_count: row.get(7)?,
        links_count: row.get(8)?,
        attachments_count: row.get(9)?,
        word_count: row.get(10)?,
    })
}

const MESSAGE_COLUMNS: &str = "m.id, m.channel_id, m.user_id, m.text, m.timestamp, m.thread_id, \
     m.message_type, m.mentions_count, m.links_count, m.attachments_count, m.word_count";

impl Database {
    pub fn new(config: &Config) -> EngineResult<Self> {
        let conn = Connection::open(&config.database_url)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            search_limit: config.search_result_limit,
        })
    }

    pub fn execute_init(&self) -> EngineResult<()> {
        info!("Database: initializing schema");
        let conn = self.conn.lock().unwrap();
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch(schema::SCHEMA)?;
        debug!("Database: schema initialized");
        Ok(())
    }

    // --- Upserts (last-write-wins by platform id) ---

    /// Insert-or-replace a message by platform id. Derived metadata
    /// (mention/link/word counts) is computed here when the event did not
    /// carry it.
    pub fn upsert_message(&self, event: &MessageEvent) -> EngineResult<()> {
        if event.id.is_empty() {
            return Err(EngineError::Validation("message id is required".into()));
        }
        if event.channel_id.is_empty() || event.user_id.is_empty() {
            return Err(EngineError::Validation(
                "message channel_id and user_id are required".into(),
            ));
        }
        if event.text.is_empty() {
            return Err(EngineError::Validation("message text is required".into()));
        }

        let mentions = event
            .mention_count
            .unwrap_or_else(|| ingest::mention_count(&event.text));
        let links = event
            .link_count
            .unwrap_or_else(|| ingest::link_count(&event.text));
        let attachments = event.attachment_count.unwrap_or(0);
        let words = ingest::word_count(&event.text);
        let message_type = event.message_type.as_deref().unwrap_or("message");

        debug!(
            "Database: upserting message {} from user {} in channel {}",
            event.id, event.user_id, event.channel_id
        );
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO messages
             (id, channel_id, user_id, text, timestamp, thread_id, message_type,
              mentions_count, links_count, attachments_count, word_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            (
                &event.id,
                &event.channel_id,
                &event.user_id,
                &event.text,
                event.timestamp,
                &event.thread_id,
                message_type,
                mentions,
                links,
                attachments,
                words,
            ),
        )?;
        Ok(())
    }

    pub fn upsert_channel(&self, channel: &ChannelRecord) -> EngineResult<()> {
        if channel.id.is_empty() || channel.name.is_empty() {
            return Err(EngineError::Validation(
                "channel id and name are required".into(),
            ));
        }
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO channels
             (id, name, is_private, topic, purpose, member_count, last_activity, last_updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)",
            (
                &channel.id,
                &channel.name,
                channel.is_private,
                &channel.topic,
                &channel.purpose,
                channel.member_count,
            ),
        )?;
        Ok(())
    }

    pub fn upsert_user(&self, user: &UserRecord) -> EngineResult<()> {
        if user.id.is_empty() || user.name.is_empty() {
            return Err(EngineError::Validation("user id and name are required".into()));
        }
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO users
             (id, name, display_name, real_name, email, status, timezone, is_bot,
              last_seen, last_updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)",
            (
                &user.id,
                &user.name,
                &user.display_name,
                &user.real_name,
                &user.email,
                &user.status,
                &user.timezone,
                user.is_bot,
            ),
        )?;
        Ok(())
    }

    // --- Relevance search ---

    /// Tiered keyword search inside a trailing window: 3 if the text
    /// contains the whole query as a substring, 2 if it contains any
    /// individual term. Rows matching no term are not eligible. Ordered by
    /// score, then recency.
    pub fn search_messages(&self, query: &str, window_hours: u32) -> EngineResult<Vec<MessageHit>> {
        let lowered = query.to_lowercase();
        let terms: Vec<&str> = lowered.split_whitespace().collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let term_conditions = vec!["LOWER(m.text) LIKE ?"; terms.len()].join(" OR ");
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS},
                    COALESCE(u.display_name, u.name) AS user_display,
                    c.name AS channel_name,
                    (CASE
                       WHEN LOWER(m.text) LIKE ? THEN 3
                       WHEN {term_conditions} THEN 2
                       ELSE 1
                     END) AS relevance_score
             FROM messages m
             LEFT JOIN channels c ON m.channel_id = c.id
             LEFT JOIN users u ON m.user_id = u.id
             WHERE m.timestamp > ? AND ({term_conditions})
             ORDER BY relevance_score DESC, m.timestamp DESC
             LIMIT ?"
        );

        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        params.push(Box::new(format!("%{lowered}%")));
        for term in &terms {
            params.push(Box::new(format!("%{term}%")));
        }
        params.push(Box::new(window_floor(window_hours)));
        for term in &terms {
            params.push(Box::new(format!("%{term}%")));
        }
        params.push(Box::new(self.search_limit));

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let params_slice: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt.query_map(&params_slice[..], |row| {
            Ok(MessageHit {
                message: message_from_row(row)?,
                user_display: row.get(11)?,
                channel_name: row.get(12)?,
                relevance_score: row.get(13)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        debug!("Database: search for {:?} returned {} results", query, results.len());
        Ok(results)
    }

    /// All messages in the window, newest first, optionally scoped to one
    /// channel.
    pub fn recent_messages(
        &self,
        channel_id: Option<&str>,
        window_hours: u32,
        limit: usize,
    ) -> EngineResult<Vec<MessageRecord>> {
        let mut sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages m WHERE m.timestamp > ?");
        let mut params: Vec<Box<dyn rusqlite::ToSql>> =
            vec![Box::new(window_floor(window_hours))];
        if let Some(channel) = channel_id {
            sql.push_str(" AND m.channel_id = ?");
            params.push(Box::new(channel.to_string()));
        }
        sql.push_str(" ORDER BY m.timestamp DESC LIMIT ?");
        params.push(Box::new(limit));

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let params_slice: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt.query_map(&params_slice[..], message_from_row)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    // --- Windowed aggregates ---

    /// Aggregate statistics over a channel (or all channels) in a window.
    ///
    /// Peak hour is derived from the hour histogram rather than folded into
    /// the main aggregate, so the other columns always describe the whole
    /// window instead of a single hour bucket.
    pub fn channel_summary(
        &self,
        channel_id: Option<&str>,
        window_hours: u32,
    ) -> EngineResult<ChannelSummary> {
        let floor = window_floor(window_hours);
        let scope = if channel_id.is_some() {
            " AND channel_id = ?2"
        } else {
            ""
        };

        let sql = format!(
            "SELECT COUNT(*), COUNT(DISTINCT user_id), MIN(timestamp), MAX(timestamp),
                    AVG(word_count), COALESCE(SUM(mentions_count), 0),
                    COALESCE(SUM(links_count), 0), COUNT(DISTINCT thread_id)
             FROM messages WHERE timestamp > ?1{scope}"
        );

        let conn = self.conn.lock().unwrap();
        let mut summary = {
            let map = |row: &rusqlite::Row<'_>| {
                Ok(ChannelSummary {
                    message_count: row.get(0)?,
                    unique_users: row.get(1)?,
                    first_message: row.get(2)?,
                    last_message: row.get(3)?,
                    avg_message_length: row.get(4)?,
                    total_mentions: row.get(5)?,
                    total_links: row.get(6)?,
                    thread_count: row.get(7)?,
                    most_active_user: None,
                    peak_hour: None,
                })
            };
            match channel_id {
                Some(channel) => conn.query_row(&sql, (floor, channel), map)?,
                None => conn.query_row(&sql, (floor,), map)?,
            }
        };

        let most_active_sql = format!(
            "SELECT COALESCE(u.display_name, u.name, m.user_id) || ' (' || COUNT(*) || ' messages)'
             FROM messages m
             LEFT JOIN users u ON m.user_id = u.id
             WHERE m.timestamp > ?1{}
             GROUP BY m.user_id
             ORDER BY COUNT(*) DESC
             LIMIT 1",
            if channel_id.is_some() { " AND m.channel_id = ?2" } else { "" }
        );
        summary.most_active_user = match channel_id {
            Some(channel) => conn
                .query_row(&most_active_sql, (floor, channel), |row| row.get(0))
                .optional()?,
            None => conn
                .query_row(&most_active_sql, (floor,), |row| row.get(0))
                .optional()?,
        };
        drop(conn);

        summary.peak_hour = self
            .peak_activity_hours(channel_id, window_hours)?
            .into_iter()
            .max_by_key(|bucket| bucket.message_count)
            .map(|bucket| format!("{}:00", bucket.hour));

        Ok(summary)
    }

    /// Per-user message counts in the window, busiest first, capped at 20.
    pub fn user_activity(&self, window_hours: u32) -> EngineResult<Vec<UserActivity>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT COALESCE(u.display_name, u.name, 'Unknown User') AS user_display,
                    m.user_id,
                    COUNT(*) AS message_count,
                    AVG(m.word_count) AS avg_message_length,
                    COALESCE(SUM(m.mentions_count), 0) AS total_mentions
             FROM messages m
             LEFT JOIN users u ON m.user_id = u.id
             WHERE m.timestamp > ?1
             GROUP BY m.user_id
             ORDER BY message_count DESC, m.user_id ASC
             LIMIT ?2",
        )?;

        let rows = stmt.query_map((window_floor(window_hours), GROUP_LIMIT), |row| {
            Ok(UserActivity {
                user_display: row.get(0)?,
                user_id: row.get(1)?,
                message_count: row.get(2)?,
                avg_message_length: row.get(3)?,
                total_mentions: row.get(4)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Keyword-list sentiment split over messages in the window.
    ///
    /// Each message is a 0/1 indicator per list, not a keyword occurrence
    /// count, and can count toward both lists at once.
    pub fn sentiment(
        &self,
        channel_id: Option<&str>,
        window_hours: u32,
    ) -> EngineResult<SentimentBreakdown> {
        let scope = if channel_id.is_some() {
            " AND channel_id = ?2"
        } else {
            ""
        };
        let sql = format!(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE
                      WHEN LOWER(text) LIKE '%happy%' OR LOWER(text) LIKE '%great%' OR
                           LOWER(text) LIKE '%awesome%' OR LOWER(text) LIKE '%excellent%' OR
                           LOWER(text) LIKE '%good%' OR LOWER(text) LIKE '%thanks%' OR
                           LOWER(text) LIKE '%love%' OR text LIKE '%😊%' OR text LIKE '%😄%'
                      THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE
                      WHEN LOWER(text) LIKE '%bad%' OR LOWER(text) LIKE '%terrible%' OR
                           LOWER(text) LIKE '%awful%' OR LOWER(text) LIKE '%hate%' OR
                           LOWER(text) LIKE '%angry%' OR LOWER(text) LIKE '%frustrated%' OR
                           text LIKE '%😞%' OR text LIKE '%😠%'
                      THEN 1 ELSE 0 END), 0)
             FROM messages WHERE timestamp > ?1{scope}"
        );

        let floor = window_floor(window_hours);
        let conn = self.conn.lock().unwrap();
        let map = |row: &rusqlite::Row<'_>| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get::<_, i64>(2)?))
        };
        let (total, positive, negative) = match channel_id {
            Some(channel) => conn.query_row(&sql, (floor, channel), map)?,
            None => conn.query_row(&sql, (floor,), map)?,
        };

        let total = total.max(1);
        let positive_pct = (positive as f64 / total as f64 * 100.0).round() as i64;
        let negative_pct = (negative as f64 / total as f64 * 100.0).round() as i64;
        Ok(SentimentBreakdown {
            positive: positive_pct,
            negative: negative_pct,
            // Can go negative when a message matches both lists; documented
            // behavior, not corrected.
            neutral: 100 - positive_pct - negative_pct,
        })
    }

    /// Thread-starting messages in the window, ranked by reply count then
    /// length.
    pub fn top_messages(
        &self,
        channel_id: Option<&str>,
        window_hours: u32,
        limit: usize,
    ) -> EngineResult<Vec<MessageRecord>> {
        let scope = if channel_id.is_some() {
            " AND m.channel_id = ?2"
        } else {
            ""
        };
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS},
                    (SELECT COUNT(*) FROM messages r WHERE r.thread_id = m.id) AS reply_count
             FROM messages m
             WHERE m.timestamp > ?1{scope} AND m.thread_id IS NULL
             ORDER BY reply_count DESC, m.word_count DESC
             LIMIT ?"
        );

        let floor = window_floor(window_hours);
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let rows = match channel_id {
            Some(channel) => stmt.query_map((floor, channel, limit), message_from_row)?,
            None => stmt.query_map((floor, limit), message_from_row)?,
        };

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Threads with a reply matching at least one query term, most
    /// recently active first, capped at 20.
    pub fn threads_matching(
        &self,
        query: &str,
        window_hours: u32,
    ) -> EngineResult<Vec<ThreadMatch>> {
        let lowered = query.to_lowercase();
        let terms: Vec<&str> = lowered.split_whitespace().collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let term_conditions = vec!["LOWER(m.text) LIKE ?"; terms.len()].join(" OR ");
        let sql = format!(
            "SELECT m.thread_id,
                    COUNT(*) AS reply_count,
                    GROUP_CONCAT(DISTINCT COALESCE(u.display_name, u.name, m.user_id)) AS participants,
                    MAX(m.timestamp) AS last_reply,
                    COALESCE((SELECT s.text FROM messages s WHERE s.id = m.thread_id), MIN(m.text)) AS thread_start
             FROM messages m
             LEFT JOIN users u ON m.user_id = u.id
             WHERE m.thread_id IS NOT NULL
               AND m.timestamp > ?
               AND ({term_conditions})
             GROUP BY m.thread_id
             ORDER BY last_reply DESC
             LIMIT ?"
        );

        let mut params: Vec<Box<dyn rusqlite::ToSql>> =
            vec![Box::new(window_floor(window_hours))];
        for term in &terms {
            params.push(Box::new(format!("%{term}%")));
        }
        params.push(Box::new(GROUP_LIMIT));

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let params_slice: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt.query_map(&params_slice[..], |row| {
            let reply_count: i64 = row.get(1)?;
            let thread_start: String = row.get(4)?;
            let preview: String = thread_start.chars().take(100).collect();
            Ok(ThreadMatch {
                thread_id: row.get(0)?,
                reply_count,
                participants: row.get(2)?,
                last_reply: row.get(3)?,
                summary: format!("Thread with {reply_count} replies: \"{preview}...\""),
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Message counts bucketed by UTC hour of day, ordered by hour.
    pub fn peak_activity_hours(
        &self,
        channel_id: Option<&str>,
        window_hours: u32,
    ) -> EngineResult<Vec<HourBucket>> {
        let scope = if channel_id.is_some() {
            " AND channel_id = ?2"
        } else {
            ""
        };
        let sql = format!(
            "SELECT strftime('%H', datetime(timestamp, 'unixepoch')) AS hour,
                    COUNT(*) AS message_count
             FROM messages
             WHERE timestamp > ?1{scope}
             GROUP BY hour
             ORDER BY hour"
        );

        let floor = window_floor(window_hours);
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let map = |row: &rusqlite::Row<'_>| {
            Ok(HourBucket {
                hour: row.get(0)?,
                message_count: row.get(1)?,
            })
        };
        let rows = match channel_id {
            Some(channel) => stmt.query_map((floor, channel), map)?,
            None => stmt.query_map((floor,), map)?,
        };

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Channels with at least one message in the window, by name.
    pub fn active_channels(&self, window_hours: u32) -> EngineResult<Vec<ChannelRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT c.id, c.name, c.is_private, c.topic, c.purpose, c.member_count
             FROM channels c
             INNER JOIN messages m ON c.id = m.channel_id
             WHERE m.timestamp > ?1
             ORDER BY c.name",
        )?;

        let rows = stmt.query_map((window_floor(window_hours),), |row| {
            Ok(ChannelRecord {
                id: row.get(0)?,
                name: row.get(1)?,
                is_private: row.get(2)?,
                topic: row.get(3)?,
                purpose: row.get(4)?,
                member_count: row.get(5)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    // --- Audit & stats ---

    /// Append a query-log row. Failures are logged and swallowed so audit
    /// writes can never fail the request that produced them.
    pub fn log_query(&self, entry: &QueryLogEntry) {
        let conn = self.conn.lock().unwrap();
        let result = conn.execute(
            "INSERT INTO query_logs
             (user_id, query, intents, response_length, response_time_ms, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            (
                &entry.user_id,
                &entry.query,
                &entry.intents,
                entry.response_length,
                entry.response_time_ms,
                entry.timestamp,
            ),
        );
        if let Err(e) = result {
            error!("Database: failed to log query: {}", e);
        }
    }

    pub fn system_stats(&self) -> EngineResult<SystemStats> {
        let conn = self.conn.lock().unwrap();
        let stats = conn.query_row(
            "SELECT
               (SELECT COUNT(*) FROM messages),
               (SELECT COUNT(*) FROM users),
               (SELECT COUNT(*) FROM channels),
               (SELECT COUNT(*) FROM query_logs),
               (SELECT COUNT(*) FROM messages WHERE timestamp > ?1)",
            (now_secs() - 24.0 * 3600.0,),
            |row| {
                Ok(SystemStats {
                    total_messages: row.get(0)?,
                    total_users: row.get(1)?,
                    total_channels: row.get(2)?,
                    total_queries: row.get(3)?,
                    messages_last_24h: row.get(4)?,
                })
            },
        )?;
        Ok(stats)
    }

    /// Rebuild the thread_summaries projection for threads active in the
    /// window. Returns the number of threads materialized.
    pub fn refresh_thread_summaries(&self, window_hours: u32) -> EngineResult<usize> {
        let conn = self.conn.lock().unwrap();
        let count = conn.execute(
            "INSERT OR REPLACE INTO thread_summaries
             (thread_id, channel_id, starter_user_id, participant_count,
              message_count, last_reply, summary)
             SELECT m.thread_id,
                    MIN(m.channel_id),
                    (SELECT s.user_id FROM messages s WHERE s.id = m.thread_id),
                    COUNT(DISTINCT m.user_id),
                    COUNT(*),
                    MAX(m.timestamp),
                    'Thread with ' || COUNT(*) || ' replies'
             FROM messages m
             WHERE m.thread_id IS NOT NULL AND m.timestamp > ?1
             GROUP BY m.thread_id",
            (window_floor(window_hours),),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        let db = Database::new(&Config::for_tests()).unwrap();
        db.execute_init().unwrap();
        db
    }

    fn event(id: &str, channel: &str, user: &str, text: &str, age_secs: f64) -> MessageEvent {
        MessageEvent {
            id: id.to_string(),
            channel_id: channel.to_string(),
            user_id: user.to_string(),
            text: text.to_string(),
            timestamp: now_secs() - age_secs,
            thread_id: None,
            message_type: None,
            mention_count: None,
            link_count: None,
            attachment_count: None,
        }
    }

    fn reply(id: &str, thread: &str, channel: &str, user: &str, text: &str, age_secs: f64) -> MessageEvent {
        let mut e = event(id, channel, user, text, age_secs);
        e.thread_id = Some(thread.to_string());
        e
    }

    #[test]
    fn test_upsert_is_idempotent_by_id() {
        let db = test_db();
        db.upsert_message(&event("m1", "c1", "u1", "first version", 10.0)).unwrap();
        db.upsert_message(&event("m1", "c1", "u1", "second version", 10.0)).unwrap();

        let messages = db.recent_messages(None, 24, 100).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "second version");
    }

    #[test]
    fn test_upsert_validation() {
        let db = test_db();
        let mut bad = event("", "c1", "u1", "hi", 0.0);
        assert!(matches!(
            db.upsert_message(&bad),
            Err(EngineError::Validation(_))
        ));
        bad.id = "m1".to_string();
        bad.text = String::new();
        assert!(matches!(
            db.upsert_message(&bad),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn test_derived_metadata_populated() {
        let db = test_db();
        db.upsert_message(&event(
            "m1",
            "c1",
            "u1",
            "hey <@U123> see https://example.com and https://other.dev",
            5.0,
        ))
        .unwrap();

        let messages = db.recent_messages(None, 24, 10).unwrap();
        assert_eq!(messages[0].mentions_count, 1);
        assert_eq!(messages[0].links_count, 2);
        assert_eq!(messages[0].word_count, 6);
    }

    #[test]
    fn test_window_is_strict() {
        let db = test_db();
        // Just inside a 1h window vs clearly outside it. The boundary row
        // sits at exactly now - 3600 at insert time; clock drift between
        // insert and query only pushes it further out.
        db.upsert_message(&event("in", "c1", "u1", "inside window", 3500.0)).unwrap();
        db.upsert_message(&event("edge", "c1", "u1", "boundary row", 3600.0)).unwrap();
        db.upsert_message(&event("out", "c1", "u1", "outside window", 7200.0)).unwrap();

        let messages = db.recent_messages(None, 1, 100).unwrap();
        let ids: Vec<&str> = messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["in"]);
    }

    #[test]
    fn test_relevance_ordering() {
        let db = test_db();
        // m2 is newer than m1, but m1 carries the whole phrase and must win.
        db.upsert_message(&event("m1", "c1", "u1", "the launch plan is ready", 300.0)).unwrap();
        db.upsert_message(&event("m2", "c1", "u2", "any plan for lunch?", 100.0)).unwrap();
        db.upsert_message(&event("m3", "c1", "u3", "unrelated chatter", 50.0)).unwrap();

        let hits = db.search_messages("launch plan", 24).unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.message.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2"]);
        assert_eq!(hits[0].relevance_score, 3);
        assert_eq!(hits[1].relevance_score, 2);
    }

    #[test]
    fn test_search_empty_query() {
        let db = test_db();
        db.upsert_message(&event("m1", "c1", "u1", "hello", 10.0)).unwrap();
        assert!(db.search_messages("   ", 24).unwrap().is_empty());
    }

    #[test]
    fn test_search_with_special_chars() {
        let db = test_db();
        db.upsert_message(&event("m1", "c1", "u1", "normal message", 10.0)).unwrap();

        let result = db.search_messages("'; DROP TABLE messages; --", 24);
        assert!(result.is_ok());
        // Table must survive
        assert_eq!(db.system_stats().unwrap().total_messages, 1);
    }

    #[test]
    fn test_sentiment_percentages() {
        let db = test_db();
        db.upsert_message(&event("p1", "c1", "u1", "this is great", 10.0)).unwrap();
        db.upsert_message(&event("p2", "c1", "u2", "thanks a lot", 20.0)).unwrap();
        db.upsert_message(&event("n1", "c1", "u3", "that was terrible", 30.0)).unwrap();
        db.upsert_message(&event("x1", "c1", "u4", "deploy finished", 40.0)).unwrap();

        let sentiment = db.sentiment(None, 24).unwrap();
        assert_eq!(sentiment.positive, 50);
        assert_eq!(sentiment.negative, 25);
        assert_eq!(sentiment.neutral, 25);
    }

    #[test]
    fn test_sentiment_empty_window() {
        let db = test_db();
        let sentiment = db.sentiment(None, 24).unwrap();
        assert_eq!(sentiment.positive, 0);
        assert_eq!(sentiment.negative, 0);
        assert_eq!(sentiment.neutral, 100);
    }

    #[test]
    fn test_channel_summary_scoping() {
        let db = test_db();
        db.upsert_message(&event("a1", "chanA", "u1", "one two three", 100.0)).unwrap();
        db.upsert_message(&event("a2", "chanA", "u2", "four five", 200.0)).unwrap();
        db.upsert_message(&event("a3", "chanA", "u1", "six", 30.0 * 3600.0)).unwrap();
        db.upsert_message(&event("b1", "chanB", "u3", "other channel", 100.0)).unwrap();
        db.upsert_message(&event("b2", "chanB", "u4", "still other", 100.0)).unwrap();

        let summary = db.channel_summary(Some("chanA"), 24).unwrap();
        assert_eq!(summary.message_count, 2);
        assert_eq!(summary.unique_users, 2);
        assert!(summary.peak_hour.is_some());
        assert!(summary.first_message.unwrap() <= summary.last_message.unwrap());
        // word counts 3 and 2
        assert!((summary.avg_message_length.unwrap() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_user_activity_ranking() {
        let db = test_db();
        for i in 0..3 {
            db.upsert_message(&event(&format!("a{i}"), "c1", "alice", "hi there", 60.0 + i as f64)).unwrap();
        }
        db.upsert_message(&event("b0", "c1", "bob", "hello", 60.0)).unwrap();
        db.upsert_user(&UserRecord {
            id: "alice".to_string(),
            name: "alice".to_string(),
            display_name: Some("Alice".to_string()),
            real_name: None,
            email: None,
            status: None,
            timezone: None,
            is_bot: false,
        })
        .unwrap();

        let activity = db.user_activity(24).unwrap();
        assert_eq!(activity.len(), 2);
        assert_eq!(activity[0].user_display, "Alice");
        assert_eq!(activity[0].message_count, 3);
        assert_eq!(activity[1].user_display, "Unknown User");
    }

    #[test]
    fn test_top_messages_are_thread_starters() {
        let db = test_db();
        db.upsert_message(&event("start1", "c1", "u1", "topic with lots of replies", 500.0)).unwrap();
        db.upsert_message(&event("start2", "c1", "u2", "quieter topic here today", 400.0)).unwrap();
        db.upsert_message(&reply("r1", "start2", "c1", "u3", "a reply", 300.0)).unwrap();
        db.upsert_message(&reply("r2", "start2", "c1", "u4", "another reply", 200.0)).unwrap();

        let top = db.top_messages(Some("c1"), 24, 10).unwrap();
        let ids: Vec<&str> = top.iter().map(|m| m.id.as_str()).collect();
        // Replies excluded; start2 ranks first on reply count.
        assert_eq!(ids, vec!["start2", "start1"]);
    }

    #[test]
    fn test_threads_matching() {
        let db = test_db();
        db.upsert_message(&event("t1", "c1", "u1", "kickoff for the release", 900.0)).unwrap();
        db.upsert_message(&reply("r1", "t1", "c1", "u2", "release notes drafted", 800.0)).unwrap();
        db.upsert_message(&reply("r2", "t1", "c1", "u3", "release date confirmed", 700.0)).unwrap();
        db.upsert_message(&reply("r3", "t2", "c1", "u2", "lunch plans", 600.0)).unwrap();

        let threads = db.threads_matching("release", 24).unwrap();
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].thread_id, "t1");
        assert_eq!(threads[0].reply_count, 2);
        assert!(threads[0].summary.contains("2 replies"));
        assert!(threads[0].summary.contains("kickoff for the release"));
    }

    #[test]
    fn test_refresh_thread_summaries() {
        let db = test_db();
        db.upsert_message(&event("t1", "c1", "starter", "thread start", 900.0)).unwrap();
        db.upsert_message(&reply("r1", "t1", "c1", "u2", "first reply", 800.0)).unwrap();
        db.upsert_message(&reply("r2", "t1", "c1", "u3", "second reply", 700.0)).unwrap();

        let materialized = db.refresh_thread_summaries(24).unwrap();
        assert_eq!(materialized, 1);
    }

    #[test]
    fn test_active_channels_and_stats() {
        let db = test_db();
        db.upsert_channel(&ChannelRecord {
            id: "c1".to_string(),
            name: "general".to_string(),
            is_private: false,
            topic: None,
            purpose: None,
            member_count: 10,
        })
        .unwrap();
        db.upsert_channel(&ChannelRecord {
            id: "c2".to_string(),
            name: "random".to_string(),
            is_private: false,
            topic: None,
            purpose: None,
            member_count: 4,
        })
        .unwrap();
        db.upsert_message(&event("m1", "c1", "u1", "hello", 60.0)).unwrap();

        let active = db.active_channels(24).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "general");

        db.log_query(&QueryLogEntry {
            user_id: Some("u1".to_string()),
            query: "what happened".to_string(),
            intents: "search".to_string(),
            response_length: 42,
            response_time_ms: 7,
            timestamp: now_secs(),
        });

        let stats = db.system_stats().unwrap();
        assert_eq!(stats.total_messages, 1);
        assert_eq!(stats.total_channels, 2);
        assert_eq!(stats.total_queries, 1);
        assert_eq!(stats.messages_last_24h, 1);
    }

    #[test]
    fn test_peak_activity_hours_ordered() {
        let db = test_db();
        db.upsert_message(&event("m1", "c1", "u1", "now", 10.0)).unwrap();
        db.upsert_message(&event("m2", "c1", "u1", "five hours ago", 5.0 * 3600.0)).unwrap();

        let buckets = db.peak_activity_hours(None, 24).unwrap();
        assert!(!buckets.is_empty());
        let hours: Vec<&str> = buckets.iter().map(|b| b.hour.as_str()).collect();
        let mut sorted = hours.clone();
        sorted.sort();
        assert_eq!(hours, sorted);
    }
}
