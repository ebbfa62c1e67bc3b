//! Periodic per-channel analytics reports.
//!
//! Mirrors the analytics entry points into a single payload per active
//! channel. Delivery to a chat surface or webhook is an adapter concern;
//! the scheduler emits each report as structured JSON on the log stream.

use serde::Serialize;
use tokio::time::Duration;
use tracing::{debug, error, info};

use crate::db::{ChannelSummary, Database, MessageRecord, SentimentBreakdown, UserActivity};
use crate::error::EngineResult;

const TOP_CONTRIBUTORS: usize = 5;
const TOP_MESSAGES: usize = 5;

#[derive(Debug, Serialize)]
pub struct ChannelReport {
    pub channel_id: String,
    pub channel_name: String,
    pub window_hours: u32,
    pub summary: ChannelSummary,
    pub top_contributors: Vec<UserActivity>,
    pub top_messages: Vec<MessageRecord>,
    pub sentiment: SentimentBreakdown,
}

/// Build the report payload for one channel over a trailing window.
pub fn generate_channel_report(
    db: &Database,
    channel_id: &str,
    channel_name: &str,
    window_hours: u32,
) -> EngineResult<ChannelReport> {
    let summary = db.channel_summary(Some(channel_id), window_hours)?;
    let mut top_contributors = db.user_activity(window_hours)?;
    top_contributors.truncate(TOP_CONTRIBUTORS);
    let top_messages = db.top_messages(Some(channel_id), window_hours, TOP_MESSAGES)?;
    let sentiment = db.sentiment(Some(channel_id), window_hours)?;

    Ok(ChannelReport {
        channel_id: channel_id.to_string(),
        channel_name: channel_name.to_string(),
        window_hours,
        summary,
        top_contributors,
        top_messages,
        sentiment,
    })
}

pub struct ReportScheduler {
    db: Database,
    interval: Duration,
    window_hours: u32,
}

impl ReportScheduler {
    pub fn new(db: Database, interval: Duration, window_hours: u32) -> Self {
        Self {
            db,
            interval,
            window_hours,
        }
    }

    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        // The first tick fires immediately; skip it so reports start one
        // full interval after boot.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match self.run_once().await {
                Ok(0) => debug!("Report scheduler: no active channels"),
                Ok(n) => info!("Report scheduler: emitted {} channel reports", n),
                Err(e) => error!("Report scheduler error: {}", e),
            }
        }
    }

    /// One pass: refresh the thread projection, then report on every
    /// channel that saw traffic in the window.
    pub async fn run_once(&self) -> anyhow::Result<usize> {
        let window_hours = self.window_hours;

        let db = self.db.clone();
        let refreshed =
            tokio::task::spawn_blocking(move || db.refresh_thread_summaries(window_hours))
                .await??;
        debug!("Report scheduler: refreshed {} thread summaries", refreshed);

        let db = self.db.clone();
        let channels =
            tokio::task::spawn_blocking(move || db.active_channels(window_hours)).await??;

        let mut emitted = 0usize;
        for channel in channels {
            let channel_id = channel.id.clone();
            let db = self.db.clone();
            let report = tokio::task::spawn_blocking(move || {
                generate_channel_report(&db, &channel.id, &channel.name, window_hours)
            })
            .await?;
            match report {
                Ok(report) => {
                    match serde_json::to_string(&report) {
                        Ok(payload) => info!(target: "chatscope::report", "{}", payload),
                        Err(e) => error!("Report scheduler: failed to serialize report: {}", e),
                    }
                    emitted += 1;
                }
                Err(e) => {
                    error!(
                        "Report scheduler: failed to build report for channel {}: {}",
                        channel_id, e
                    );
                }
            }
        }

        Ok(emitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::ChannelRecord;
    use crate::ingest::MessageEvent;

    fn test_db() -> Database {
        let db = Database::new(&Config::for_tests()).unwrap();
        db.execute_init().unwrap();
        db
    }

    fn now_secs() -> f64 {
        chrono::Utc::now().timestamp_millis() as f64 / 1000.0
    }

    fn insert(db: &Database, id: &str, channel: &str, user: &str, text: &str, age_secs: f64) {
        db.upsert_message(&MessageEvent {
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
        })
        .unwrap();
    }

    #[test]
    fn test_generate_channel_report() {
        let db = test_db();
        insert(&db, "m1", "c1", "u1", "great progress on the launch", 60.0);
        insert(&db, "m2", "c1", "u2", "thanks for the update", 30.0);

        let report = generate_channel_report(&db, "c1", "general", 24).unwrap();
        assert_eq!(report.summary.message_count, 2);
        assert_eq!(report.top_contributors.len(), 2);
        assert_eq!(report.sentiment.positive, 100);
        // Serializes cleanly for the log stream
        let payload = serde_json::to_string(&report).unwrap();
        assert!(payload.contains("\"channel_name\":\"general\""));
    }

    #[tokio::test]
    async fn test_run_once_reports_active_channels() {
        let db = test_db();
        db.upsert_channel(&ChannelRecord {
            id: "c1".to_string(),
            name: "general".to_string(),
            is_private: false,
            topic: None,
            purpose: None,
            member_count: 2,
        })
        .unwrap();
        insert(&db, "m1", "c1", "u1", "hello world", 60.0);

        let scheduler = ReportScheduler::new(db, Duration::from_secs(3600), 24);
        let emitted = scheduler.run_once().await.unwrap();
        assert_eq!(emitted, 1);
    }
}
