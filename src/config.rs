use crate::error::{AppError, Result};

pub const ITUNES_RSS_URL: &str = "https://itunes.apple.com";
pub const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Product page of the app whose reviews ship as the bundled demo dataset.
pub const DEMO_APP_URL: &str = "https://apps.apple.com/de/app/slack/id618783545";

/// Entries per page served by the customer-reviews RSS feed.
pub const FEED_PAGE_SIZE: usize = 50;

/// The RSS feed stops serving entries past page 10.
pub const FEED_MAX_PAGES: usize = 10;

/// Hard cap on reviews fetched per run, to prevent excessive scraping.
/// Callers can narrow further with a date range but never extend it.
pub const DEFAULT_MAX_REVIEWS: usize = 100;

/// Default wall-clock budget for one scraping run (seconds).
pub const DEFAULT_SCRAPE_TIMEOUT_SECS: u64 = 60;

/// Input-token padding added to run estimates for the recommendation-stage
/// prompt, which is built from summaries that don't exist yet at estimate
/// time. Heuristic value based on common summary outputs.
pub const RECOMMENDATION_PROMPT_PADDING_TOKENS: usize = 500;

/// Assumed completion output size for run estimates; actual output length
/// is unknown before the call is made.
pub const ESTIMATED_OUTPUT_TOKENS: usize = 1000;

/// Uploads larger than this are downsampled to a random subset.
pub const MAX_UPLOAD_ROWS: usize = 500;

#[derive(Debug, Clone)]
pub struct Config {
    pub rss_url: String,
    pub openai_api_url: String,
    /// Completion requests fail upstream without a key; everything up to
    /// and including the cost estimate works without one.
    pub openai_api_key: Option<String>,
    pub log_level: String,
    pub api_port: u16,
    /// Per-run review cap (MAX_REVIEWS)
    pub max_reviews: usize,
    /// Scrape deadline in seconds (SCRAPE_TIMEOUT_SECS)
    pub scrape_timeout_secs: u64,
    /// Bundled offline dataset (DEMO_DATA_PATH)
    pub demo_data_path: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            rss_url: std::env::var("ITUNES_RSS_URL").unwrap_or_else(|_| ITUNES_RSS_URL.to_string()),
            openai_api_url: std::env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| OPENAI_API_URL.to_string()),
            openai_api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            max_reviews: std::env::var("MAX_REVIEWS")
                .unwrap_or_else(|_| DEFAULT_MAX_REVIEWS.to_string())
                .parse::<usize>()
                .unwrap_or(DEFAULT_MAX_REVIEWS),
            scrape_timeout_secs: std::env::var("SCRAPE_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_SCRAPE_TIMEOUT_SECS.to_string())
                .parse::<u64>()
                .unwrap_or(DEFAULT_SCRAPE_TIMEOUT_SECS),
            demo_data_path: std::env::var("DEMO_DATA_PATH")
                .unwrap_or_else(|_| "data/demo_reviews.csv".to_string()),
        })
    }
}
