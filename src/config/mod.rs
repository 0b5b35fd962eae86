//! Configuration module for the price-comparison backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Directory containing the per-store CSV price/discount feeds
    pub data_dir: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Interval between price-alert checker runs, in seconds
    pub alert_check_interval_secs: u64,
    /// Maximum number of random products added per add-to-basket call
    pub basket_sample_size: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let db_path = env::var("PRICETRACK_DB_PATH")
            .unwrap_or_else(|_| "./data/app.sqlite".to_string())
            .into();

        let data_dir = env::var("PRICETRACK_DATA_DIR")
            .unwrap_or_else(|_| "./data/feeds".to_string())
            .into();

        let bind_addr = env::var("PRICETRACK_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid PRICETRACK_BIND_ADDR format");

        let log_level = env::var("PRICETRACK_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let alert_check_interval_secs = env::var("PRICETRACK_ALERT_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let basket_sample_size = env::var("PRICETRACK_BASKET_SAMPLE_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        Self {
            db_path,
            data_dir,
            bind_addr,
            log_level,
            alert_check_interval_secs,
            basket_sample_size,
        }
    }
}
