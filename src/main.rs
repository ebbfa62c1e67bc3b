use chatscope::cache::ContextCache;
use chatscope::config::Config;
use chatscope::context::ContextAssembler;
use chatscope::db::{Database, QueryLogEntry};
use chatscope::report::ReportScheduler;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;

    if let Some(parent) = std::path::Path::new(&config.database_url).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db = Database::new(&config).map_err(|e| anyhow::anyhow!("failed to open database: {e}"))?;
    db.execute_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize database: {e}"))?;

    let cache = Arc::new(ContextCache::new(
        config.context_cache_capacity,
        Duration::from_secs(config.context_cache_ttl_secs),
    ));
    let assembler = ContextAssembler::new(db.clone(), cache);

    let stats = db.system_stats()?;
    info!(
        "Engine ready: {} messages, {} channels, {} users",
        stats.total_messages, stats.total_channels, stats.total_users
    );

    if config.report_enabled {
        let scheduler = ReportScheduler::new(
            db.clone(),
            Duration::from_secs(config.report_interval_secs),
            config.report_window_hours,
        );
        tokio::spawn(scheduler.run());
        info!(
            "Report scheduler running every {}s over a {}h window",
            config.report_interval_secs, config.report_window_hours
        );
    }

    // Minimal command surface: one query per stdin line, context on stdout.
    // Platform event and HTTP adapters plug into the same entry points.
    info!("Reading queries from stdin (ctrl-c to exit)");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => {
                let Ok(Some(line)) = line else { break };
                let query = line.trim();
                if query.is_empty() {
                    continue;
                }

                let started = Instant::now();
                let result = assembler.assemble(query, None).await;
                println!(
                    "intents: [{}], window: {}h\n{}",
                    result.intents.join(", "),
                    result.window_hours,
                    if result.context_text.is_empty() {
                        "(no context available)"
                    } else {
                        result.context_text.as_str()
                    }
                );

                // Audit write is the caller's duty and never fails the request.
                db.log_query(&QueryLogEntry {
                    user_id: None,
                    query: query.to_string(),
                    intents: result.intents.join(","),
                    response_length: result.context_text.len() as i64,
                    response_time_ms: started.elapsed().as_millis() as i64,
                    timestamp: chrono::Utc::now().timestamp_millis() as f64 / 1000.0,
                });
            }
        }
    }

    info!("Shutting down");
    Ok(())
}
