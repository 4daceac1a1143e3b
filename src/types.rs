use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

// ---------------------------------------------------------------------------
// Review
// ---------------------------------------------------------------------------

/// One marketplace review.
///
/// `date` is the source-reported submission time, kept timezone-naive.
/// It is optional only because uploaded review files are not required to
/// carry a date column; everything the retriever surfaces has `Some(_)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub date: Option<NaiveDateTime>,
    /// May be empty; some reviews have no title.
    pub title: String,
    /// Never empty — rows with no body are dropped at ingestion.
    pub review: String,
    /// Star rating in 1..=5.
    pub rating: u8,
}

// ---------------------------------------------------------------------------
// App identity
// ---------------------------------------------------------------------------

/// Addressing key for the review feed, parsed once from a product URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppIdentity {
    /// Two-letter lowercase storefront country code.
    pub country: String,
    pub slug: String,
    pub app_id: u64,
}

impl AppIdentity {
    /// Human-readable app name derived from the URL slug.
    pub fn display_name(&self) -> String {
        self.slug.replace('-', " ")
    }
}

// ---------------------------------------------------------------------------
// Date range
// ---------------------------------------------------------------------------

/// Half-open filter interval `[start, end)` on review dates.
/// `start < end` is the caller's responsibility, checked at the API
/// boundary rather than here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateRange {
    /// Both bounds at midnight, so an end date of 2024-03-01 excludes
    /// everything from that day onward.
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: start.and_time(NaiveTime::MIN),
            end: end.and_time(NaiveTime::MIN),
        }
    }
}

// ---------------------------------------------------------------------------
// Sentiment
// ---------------------------------------------------------------------------

/// Rating-based sentiment split used to build the two summary prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    /// 4 or 5 stars.
    Positive,
    /// 1 to 3 stars.
    Critical,
}

impl Sentiment {
    pub fn from_rating(rating: u8) -> Self {
        if rating > 3 {
            Sentiment::Positive
        } else {
            Sentiment::Critical
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Sentiment::Positive => "positive",
            Sentiment::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Models & cost
// ---------------------------------------------------------------------------

/// Completion models this service knows pricing for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelId {
    #[serde(rename = "gpt-3.5-turbo")]
    Gpt35Turbo,
    #[serde(rename = "gpt-4-0125-preview")]
    Gpt4TurboPreview,
}

impl ModelId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::Gpt35Turbo => "gpt-3.5-turbo",
            ModelId::Gpt4TurboPreview => "gpt-4-0125-preview",
        }
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ModelId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gpt-3.5-turbo" => Ok(ModelId::Gpt35Turbo),
            "gpt-4-0125-preview" => Ok(ModelId::Gpt4TurboPreview),
            other => Err(AppError::UnknownModel(other.to_string())),
        }
    }
}

/// Pre-flight prediction of what an analysis run will cost.
/// A pure function of its inputs — recomputed whenever the prompts change,
/// never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostEstimate {
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub model: ModelId,
    pub cost_usd: f64,
}
