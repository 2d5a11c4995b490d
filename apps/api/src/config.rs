use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// API key for the structuring backend. Absent means the capability is
    /// not configured and extraction runs in heuristic-only mode.
    pub groq_api_key: Option<String>,
    /// Optional JSON file overriding the built-in taxonomy tables.
    pub taxonomy_path: Option<String>,
    /// Optional JSON file with the job/course catalog.
    pub catalog_path: Option<String>,
    pub port: u16,
    pub rust_log: String,
    /// Per-attempt timeout on structuring calls, seconds.
    pub structuring_timeout_secs: u64,
    /// Retries after the first structuring attempt.
    pub structuring_max_retries: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            groq_api_key: optional_env("GROQ_API_KEY"),
            taxonomy_path: optional_env("TAXONOMY_PATH"),
            catalog_path: optional_env("CATALOG_PATH"),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            structuring_timeout_secs: std::env::var("STRUCTURING_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse::<u64>()
                .context("STRUCTURING_TIMEOUT_SECS must be a number of seconds")?,
            structuring_max_retries: std::env::var("STRUCTURING_MAX_RETRIES")
                .unwrap_or_else(|_| "2".to_string())
                .parse::<u32>()
                .context("STRUCTURING_MAX_RETRIES must be an integer")?,
        })
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
