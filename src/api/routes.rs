use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::health::HealthState;
use crate::appstore::feed::ReviewFeed;
use crate::appstore::url::parse_app_url;
use crate::config::{Config, DEMO_APP_URL, MAX_UPLOAD_ROWS};
use crate::cost;
use crate::dataset;
use crate::error::{AppError, Result};
use crate::insights::{self, Insights};
use crate::llm::CompletionApi;
use crate::retriever;
use crate::types::{AppIdentity, DateRange, ModelId, ReviewRecord};

#[derive(Clone)]
pub struct ApiState {
    pub config: Config,
    pub feed: Arc<dyn ReviewFeed>,
    pub completions: Arc<dyn CompletionApi>,
    pub health: Arc<HealthState>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/reviews", post(post_reviews))
        .route("/estimate", post(post_estimate))
        .route("/insights", post(post_insights))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Where the reviews for a run come from.
#[derive(Debug, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ReviewSource {
    /// Scrape the App Store feed for the given product URL.
    AppStore {
        url: String,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        timeout_secs: Option<u64>,
        max_reviews: Option<usize>,
    },
    /// Bundled offline dataset; no network, no timeout.
    Demo,
    /// Caller-supplied CSV text with title, review, rating columns.
    Upload { csv: String },
}

#[derive(Debug, Deserialize)]
pub struct ReviewsRequest {
    #[serde(flatten)]
    source: ReviewSource,
}

#[derive(Debug, Deserialize)]
pub struct EstimateRequest {
    #[serde(flatten)]
    source: ReviewSource,
    model: ModelId,
}

#[derive(Debug, Deserialize)]
pub struct InsightsRequest {
    #[serde(flatten)]
    source: ReviewSource,
    model: ModelId,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub retrievals_run: u64,
    pub analyses_run: u64,
}

#[derive(Serialize)]
pub struct ReviewsResponse {
    pub app: Option<AppIdentity>,
    pub count: usize,
    pub reviews: Vec<ReviewRecord>,
}

#[derive(Serialize)]
pub struct EstimateResponse {
    pub review_count: usize,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub model: ModelId,
    /// An estimate, not a bound — see the run-cost docs.
    pub cost_usd: f64,
}

#[derive(Serialize)]
pub struct InsightsResponse {
    pub app_name: Option<String>,
    #[serde(flatten)]
    pub insights: Insights,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        retrievals_run: state.health.retrievals_run(),
        analyses_run: state.health.analyses_run(),
    })
}

async fn post_reviews(
    State(state): State<ApiState>,
    Json(req): Json<ReviewsRequest>,
) -> Result<Json<ReviewsResponse>> {
    let (reviews, identity) = resolve_source(&state, &req.source).await?;
    Ok(Json(ReviewsResponse {
        app: identity,
        count: reviews.len(),
        reviews,
    }))
}

async fn post_estimate(
    State(state): State<ApiState>,
    Json(req): Json<EstimateRequest>,
) -> Result<Json<EstimateResponse>> {
    let (reviews, _) = resolve_source(&state, &req.source).await?;

    let (positive, critical) = insights::partition_reviews(&reviews);
    let prompts = insights::build_run_prompts(&positive, &critical);
    let estimate = cost::estimate_run_cost(&prompts.texts(), req.model)?;

    Ok(Json(EstimateResponse {
        review_count: reviews.len(),
        input_tokens: estimate.input_tokens,
        output_tokens: estimate.output_tokens,
        model: estimate.model,
        cost_usd: estimate.cost_usd,
    }))
}

async fn post_insights(
    State(state): State<ApiState>,
    Json(req): Json<InsightsRequest>,
) -> Result<Json<InsightsResponse>> {
    let (reviews, identity) = resolve_source(&state, &req.source).await?;
    let app_name = identity.as_ref().map(|i| i.display_name());

    let insights = insights::run_analysis(
        state.completions.as_ref(),
        &reviews,
        app_name.as_deref(),
        req.model,
    )
    .await?;
    state.health.inc_analyses();

    Ok(Json(InsightsResponse { app_name, insights }))
}

// ---------------------------------------------------------------------------
// Source resolution
// ---------------------------------------------------------------------------

async fn resolve_source(
    state: &ApiState,
    source: &ReviewSource,
) -> Result<(Vec<ReviewRecord>, Option<AppIdentity>)> {
    match source {
        ReviewSource::AppStore {
            url,
            start_date,
            end_date,
            timeout_secs,
            max_reviews,
        } => {
            let identity = parse_app_url(url)?;
            let range = build_range(*start_date, *end_date)?;
            let timeout =
                Duration::from_secs(timeout_secs.unwrap_or(state.config.scrape_timeout_secs));
            // Callers can narrow the per-run cap but never extend it.
            let max = max_reviews
                .unwrap_or(state.config.max_reviews)
                .min(state.config.max_reviews);

            let reviews = retriever::fetch_reviews(
                Arc::clone(&state.feed),
                identity.clone(),
                max,
                range,
                timeout,
            )
            .await?;
            state.health.inc_retrievals();
            Ok((reviews, Some(identity)))
        }
        ReviewSource::Demo => {
            let reviews = dataset::load_csv_file(&state.config.demo_data_path)?;
            state.health.inc_retrievals();
            Ok((reviews, Some(parse_app_url(DEMO_APP_URL)?)))
        }
        ReviewSource::Upload { csv } => {
            let reviews = dataset::downsample(dataset::load_csv(csv)?, MAX_UPLOAD_ROWS);
            state.health.inc_retrievals();
            Ok((reviews, None))
        }
    }
}

/// Range validation lives here, not in the retriever: `start < end` is a
/// caller precondition of the core. One-sided ranges are rejected rather
/// than silently defaulted.
fn build_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Option<DateRange>> {
    match (start, end) {
        (None, None) => Ok(None),
        (Some(s), Some(e)) => {
            if s >= e {
                return Err(AppError::InvalidRange);
            }
            Ok(Some(DateRange::from_dates(s, e)))
        }
        _ => Err(AppError::InvalidRange),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn absent_range_means_retriever_defaults() {
        assert_eq!(build_range(None, None).unwrap(), None);
    }

    #[test]
    fn ordered_range_passes_through() {
        let range = build_range(Some(date("2024-01-01")), Some(date("2024-03-01")))
            .unwrap()
            .unwrap();
        assert!(range.start < range.end);
    }

    #[test]
    fn reversed_or_empty_range_is_rejected() {
        assert!(build_range(Some(date("2024-03-01")), Some(date("2024-01-01"))).is_err());
        assert!(build_range(Some(date("2024-01-01")), Some(date("2024-01-01"))).is_err());
    }

    #[test]
    fn one_sided_range_is_rejected() {
        assert!(build_range(Some(date("2024-01-01")), None).is_err());
        assert!(build_range(None, Some(date("2024-01-01"))).is_err());
    }

    #[test]
    fn review_source_deserializes_all_three_variants() {
        let app_store: ReviewSource = serde_json::from_str(
            r#"{"source": "app_store", "url": "https://apps.apple.com/de/app/slack/id618783545",
                "start_date": "2024-01-01", "end_date": "2024-03-01", "timeout_secs": 30}"#,
        )
        .unwrap();
        assert!(matches!(app_store, ReviewSource::AppStore { .. }));

        let demo: ReviewSource = serde_json::from_str(r#"{"source": "demo"}"#).unwrap();
        assert!(matches!(demo, ReviewSource::Demo));

        let upload: ReviewSource =
            serde_json::from_str(r#"{"source": "upload", "csv": "title,review,rating\n"}"#)
                .unwrap();
        assert!(matches!(upload, ReviewSource::Upload { .. }));
    }

    #[test]
    fn estimate_request_parses_model_wire_name() {
        let req: EstimateRequest = serde_json::from_str(
            r#"{"source": "demo", "model": "gpt-3.5-turbo"}"#,
        )
        .unwrap();
        assert_eq!(req.model, ModelId::Gpt35Turbo);
    }
}
