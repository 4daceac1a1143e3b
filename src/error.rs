use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not a recognizable App Store product URL: {0}")]
    InvalidUrl(String),

    #[error("review scraping did not finish within {0} seconds; retry with a larger timeout or a narrower date range")]
    ScrapeTimeout(u64),

    #[error("no reviews found — either no reviews match the request, or the App Store feed is currently rate-limiting us")]
    NoReviewsFound,

    #[error("no pricing known for model: {0}")]
    UnknownModel(String),

    #[error("completion API error: {0}")]
    Upstream(String),

    #[error("review file is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("review dataset contains no usable rows")]
    EmptyDataset,

    #[error("invalid date range: start must be before end, and both bounds must be given together")]
    InvalidRange,

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::InvalidUrl(_)
            | AppError::UnknownModel(_)
            | AppError::MissingColumns(_)
            | AppError::EmptyDataset
            | AppError::InvalidRange => StatusCode::BAD_REQUEST,
            AppError::NoReviewsFound => StatusCode::NOT_FOUND,
            AppError::ScrapeTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Upstream(_) | AppError::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
