use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    // Context cache settings
    pub context_cache_ttl_secs: u64,
    pub context_cache_capacity: usize,
    // Query defaults
    pub search_result_limit: usize,
    // Scheduled report settings
    pub report_enabled: bool,
    pub report_interval_secs: u64,
    pub report_window_hours: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        Self::build()
    }

    fn build() -> anyhow::Result<Self> {
        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "data/chatscope.db".to_string()),
            context_cache_ttl_secs: env::var("CONTEXT_CACHE_TTL_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .unwrap_or(300),
            context_cache_capacity: env::var("CONTEXT_CACHE_CAPACITY")
                .unwrap_or_else(|_| "256".to_string())
                .parse()
                .unwrap_or(256),
            search_result_limit: env::var("SEARCH_RESULT_LIMIT")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .unwrap_or(100),
            report_enabled: env::var("REPORT_ENABLED")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            report_interval_secs: env::var("REPORT_INTERVAL_SECS")
                .unwrap_or_else(|_| "86400".to_string())
                .parse()
                .unwrap_or(86400),
            report_window_hours: env::var("REPORT_WINDOW_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .unwrap_or(24),
        })
    }

    /// In-memory configuration used across the crate's unit tests.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Config {
            database_url: ":memory:".to_string(),
            context_cache_ttl_secs: 300,
            context_cache_capacity: 16,
            search_result_limit: 100,
            report_enabled: false,
            report_interval_secs: 86400,
            report_window_hours: 24,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        env::remove_var("DATABASE_URL");
        env::remove_var("CONTEXT_CACHE_TTL_SECS");
        let config = Config::build().unwrap();
        assert_eq!(config.database_url, "data/chatscope.db");
        assert_eq!(config.context_cache_ttl_secs, 300);
        assert_eq!(config.search_result_limit, 100);
    }

    #[test]
    fn test_overrides_and_bad_values() {
        env::set_var("CONTEXT_CACHE_CAPACITY", "512");
        env::set_var("REPORT_INTERVAL_SECS", "not-a-number");
        let config = Config::build().unwrap();
        assert_eq!(config.context_cache_capacity, 512);
        // Unparseable values fall back to the default
        assert_eq!(config.report_interval_secs, 86400);
        env::remove_var("CONTEXT_CACHE_CAPACITY");
        env::remove_var("REPORT_INTERVAL_SECS");
    }
}
