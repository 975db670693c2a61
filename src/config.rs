use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

pub const API_BASE_URL: &str = "https://openapi.opinion.trade/openapi";
pub const TOPIC_API_URL: &str = "https://proxy.opinion.trade:8443/api/bsc/api/v2/topic";
pub const APP_URL: &str = "https://app.opinion.trade";
pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// A market first seen more than this long after creation is backfilled silently.
pub const STALE_MARKET_SECS: i64 = 24 * 3600;

/// Spike lookback: current price is compared with the newest sample at or before now - 1h.
pub const PRICE_LOOKBACK_SECS: i64 = 3600;

/// A standing deviation is re-announced once the last alert is older than this.
pub const NOTIFY_COOLDOWN_SECS: i64 = 6 * 3600;

/// Market types queried on every snapshot: multi, binary, other, trending.
pub const FEED_MARKET_TYPES: &[u8] = &[1, 0, 2, 3];

/// The listing endpoint caps pages at 10 items.
pub const FEED_PAGE_SIZE: usize = 10;

/// Pages fetched per market type before giving up.
pub const FEED_MAX_PAGES: usize = 10;

/// Delay between listing pages (milliseconds).
pub const FEED_PAGE_DELAY_MS: u64 = 100;

pub const FEED_LIST_TIMEOUT_SECS: u64 = 20;
pub const FEED_PRICE_TIMEOUT_SECS: u64 = 15;

/// Telegram getUpdates long-poll timeout (seconds).
pub const COMMAND_POLL_TIMEOUT_SECS: u64 = 30;

/// Pause after a failed getUpdates call (seconds).
pub const COMMAND_RETRY_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    /// Broadcast channel, e.g. "@my_channel" or "-100..." (CHANNEL_ID). Empty means none.
    pub channel_id: Option<String>,
    pub api_key: String,
    pub api_base_url: String,
    pub topic_api_url: String,
    pub app_url: String,
    pub telegram_api_url: String,
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Seconds between coordinator ticks (POLLING_INTERVAL)
    pub poll_interval_secs: u64,
    /// Spike threshold in percent (PRICE_SPIKE_THRESHOLD)
    pub spike_threshold_pct: f64,
    /// Delay between instrument evaluations in a scan pass (SCAN_PACING_MS)
    pub scan_pacing_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let bot_token = std::env::var("BOT_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AppError::Config("BOT_TOKEN must be set".to_string()))?;

        Ok(Self {
            bot_token,
            channel_id: std::env::var("CHANNEL_ID")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            api_key: std::env::var("API_KEY").unwrap_or_default(),
            api_base_url: std::env::var("API_BASE_URL")
                .unwrap_or_else(|_| API_BASE_URL.to_string()),
            topic_api_url: std::env::var("TOPIC_API_URL")
                .unwrap_or_else(|_| TOPIC_API_URL.to_string()),
            app_url: std::env::var("APP_URL").unwrap_or_else(|_| APP_URL.to_string()),
            telegram_api_url: std::env::var("TELEGRAM_API_URL")
                .unwrap_or_else(|_| TELEGRAM_API_URL.to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "opinion.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| {
                    AppError::Config("API_PORT must be a valid port number".to_string())
                })?,
            poll_interval_secs: std::env::var("POLLING_INTERVAL")
                .unwrap_or_else(|_| "60".to_string())
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .unwrap_or(60),
            spike_threshold_pct: std::env::var("PRICE_SPIKE_THRESHOLD")
                .unwrap_or_else(|_| "5.0".to_string())
                .parse::<f64>()
                .ok()
                .filter(|t| t.is_finite() && *t > 0.0)
                .unwrap_or(5.0),
            scan_pacing_ms: std::env::var("SCAN_PACING_MS")
                .unwrap_or_else(|_| "300".to_string())
                .parse::<u64>()
                .unwrap_or(300),
        })
    }
}

/// Load `.env` from the working directory (or a parent) into the process
/// environment. Variables already set in the environment win. A missing file
/// is `Ok(None)`; a malformed one is an error.
pub fn load_env_file() -> std::result::Result<Option<PathBuf>, dotenvy::Error> {
    not_found_as_none(dotenvy::dotenv())
}

/// Same as [`load_env_file`] for an explicit path.
pub fn load_env_file_at(path: &Path) -> std::result::Result<Option<PathBuf>, dotenvy::Error> {
    not_found_as_none(dotenvy::from_path(path).map(|_| path.to_path_buf()))
}

fn not_found_as_none(
    res: std::result::Result<PathBuf, dotenvy::Error>,
) -> std::result::Result<Option<PathBuf>, dotenvy::Error> {
    match res {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e),
    }
}
