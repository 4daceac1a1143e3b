use futures_util::future;
use rand::prelude::SliceRandom;
use rand::rng;
use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::llm::{self, CompletionApi};
use crate::prompt::{build_prompt, CRITICAL_SUFFIX, POSITIVE_SUFFIX};
use crate::types::{ModelId, ReviewRecord, Sentiment};

/// Headline numbers for one review collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewStats {
    pub review_count: usize,
    /// Share of reviews rated 4 or 5 stars, in [0, 1].
    pub positive_share: f64,
    /// Reviews per star rating; index 0 holds the 1-star count.
    pub rating_histogram: [usize; 5],
}

pub fn review_stats(reviews: &[ReviewRecord]) -> ReviewStats {
    let mut histogram = [0usize; 5];
    let mut positive = 0usize;
    for r in reviews {
        if (1..=5).contains(&r.rating) {
            histogram[(r.rating - 1) as usize] += 1;
        }
        if Sentiment::from_rating(r.rating) == Sentiment::Positive {
            positive += 1;
        }
    }

    ReviewStats {
        review_count: reviews.len(),
        positive_share: if reviews.is_empty() {
            0.0
        } else {
            positive as f64 / reviews.len() as f64
        },
        rating_histogram: histogram,
    }
}

/// Split into (positive, critical) partitions and shuffle each, so prompt
/// order carries no recency bias into the summaries.
pub fn partition_reviews(reviews: &[ReviewRecord]) -> (Vec<ReviewRecord>, Vec<ReviewRecord>) {
    let mut positive = Vec::new();
    let mut critical = Vec::new();
    for r in reviews {
        match Sentiment::from_rating(r.rating) {
            Sentiment::Positive => positive.push(r.clone()),
            Sentiment::Critical => critical.push(r.clone()),
        }
    }

    let mut rng = rng();
    positive.shuffle(&mut rng);
    critical.shuffle(&mut rng);
    (positive, critical)
}

/// The two summary prompts for a run. `None` where that partition is
/// empty — no reviews, no prompt, no API call.
#[derive(Debug, Clone, Default)]
pub struct RunPrompts {
    pub positive: Option<String>,
    pub critical: Option<String>,
}

impl RunPrompts {
    /// Prompt texts that exist, for token counting.
    pub fn texts(&self) -> Vec<&str> {
        self.positive
            .as_deref()
            .into_iter()
            .chain(self.critical.as_deref())
            .collect()
    }
}

pub fn build_run_prompts(
    positive: &[ReviewRecord],
    critical: &[ReviewRecord],
) -> RunPrompts {
    RunPrompts {
        positive: (!positive.is_empty())
            .then(|| format!("{}{}", build_prompt(positive), POSITIVE_SUFFIX)),
        critical: (!critical.is_empty())
            .then(|| format!("{}{}", build_prompt(critical), CRITICAL_SUFFIX)),
    }
}

/// Output of one full analysis run.
#[derive(Debug, Serialize)]
pub struct Insights {
    pub stats: ReviewStats,
    /// Summary of positive reviews; absent when none were found.
    pub highlights: Option<String>,
    /// Summary of critical reviews; absent when none were found.
    pub problems: Option<String>,
    /// Absent when neither summary could be produced.
    pub recommendations: Option<String>,
}

/// Run the whole pipeline over an in-memory collection: partition,
/// summarize both sides (concurrently — they are independent calls), then
/// derive recommendations from whichever summaries exist. Any upstream
/// failure ends the run; nothing is retried.
pub async fn run_analysis(
    api: &dyn CompletionApi,
    reviews: &[ReviewRecord],
    app_name: Option<&str>,
    model: ModelId,
) -> Result<Insights> {
    let stats = review_stats(reviews);
    let (positive, critical) = partition_reviews(reviews);
    let prompts = build_run_prompts(&positive, &critical);

    let (highlights, problems) = future::join(
        summarize_if(api, prompts.positive.as_deref(), model),
        summarize_if(api, prompts.critical.as_deref(), model),
    )
    .await;
    let highlights = highlights?;
    let problems = problems?;

    let summaries: Vec<&str> = highlights
        .as_deref()
        .into_iter()
        .chain(problems.as_deref())
        .collect();
    let recommendations = if summaries.is_empty() {
        None
    } else {
        Some(llm::recommend(api, &summaries, app_name, model).await?)
    };

    info!(
        reviews = stats.review_count,
        positive = positive.len(),
        critical = critical.len(),
        "analysis run complete"
    );

    Ok(Insights {
        stats,
        highlights,
        problems,
        recommendations,
    })
}

async fn summarize_if(
    api: &dyn CompletionApi,
    prompt: Option<&str>,
    model: ModelId,
) -> Result<Option<String>> {
    match prompt {
        Some(p) => llm::summarize(api, p, model).await.map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    fn record(rating: u8) -> ReviewRecord {
        ReviewRecord {
            date: None,
            title: format!("{rating} stars"),
            review: "body".to_string(),
            rating,
        }
    }

    struct CannedApi;

    #[async_trait]
    impl CompletionApi for CannedApi {
        async fn complete(&self, system: &str, _user: &str, _model: ModelId) -> Result<String> {
            if system == crate::llm::SUMMARY_SYSTEM_PROMPT {
                Ok("a summary".to_string())
            } else {
                Ok("a recommendation".to_string())
            }
        }
    }

    #[test]
    fn stats_cover_histogram_and_positive_share() {
        let reviews: Vec<ReviewRecord> = [1, 3, 4, 5, 5].into_iter().map(record).collect();
        let stats = review_stats(&reviews);
        assert_eq!(stats.review_count, 5);
        assert_eq!(stats.rating_histogram, [1, 0, 1, 1, 2]);
        assert!((stats.positive_share - 0.6).abs() < 1e-12);
    }

    #[test]
    fn stats_on_empty_collection_are_all_zero() {
        let stats = review_stats(&[]);
        assert_eq!(stats.review_count, 0);
        assert_eq!(stats.positive_share, 0.0);
        assert_eq!(stats.rating_histogram, [0; 5]);
    }

    #[test]
    fn partition_is_disjoint_and_exhaustive() {
        let reviews: Vec<ReviewRecord> = (1..=5).map(record).collect();
        let (positive, critical) = partition_reviews(&reviews);
        assert_eq!(positive.len() + critical.len(), reviews.len());
        assert!(positive.iter().all(|r| r.rating > 3));
        assert!(critical.iter().all(|r| r.rating <= 3));
    }

    #[test]
    fn prompts_skip_empty_partitions() {
        let positive: Vec<ReviewRecord> = vec![record(5)];
        let prompts = build_run_prompts(&positive, &[]);
        assert!(prompts.positive.is_some());
        assert!(prompts.critical.is_none());
        assert_eq!(prompts.texts().len(), 1);

        let text = prompts.positive.unwrap();
        assert!(text.ends_with(POSITIVE_SUFFIX));
    }

    #[tokio::test]
    async fn mixed_reviews_produce_both_summaries_and_recommendations() {
        let reviews: Vec<ReviewRecord> = [5, 1].into_iter().map(record).collect();
        let insights = run_analysis(&CannedApi, &reviews, Some("slack"), ModelId::Gpt35Turbo)
            .await
            .unwrap();
        assert_eq!(insights.highlights.as_deref(), Some("a summary"));
        assert_eq!(insights.problems.as_deref(), Some("a summary"));
        assert_eq!(insights.recommendations.as_deref(), Some("a recommendation"));
    }

    #[tokio::test]
    async fn all_positive_reviews_skip_the_problems_summary() {
        let reviews: Vec<ReviewRecord> = [5, 4].into_iter().map(record).collect();
        let insights = run_analysis(&CannedApi, &reviews, None, ModelId::Gpt35Turbo)
            .await
            .unwrap();
        assert!(insights.highlights.is_some());
        assert!(insights.problems.is_none());
        assert!(insights.recommendations.is_some());
    }

    #[tokio::test]
    async fn empty_collection_skips_every_call() {
        let insights = run_analysis(&CannedApi, &[], None, ModelId::Gpt35Turbo)
            .await
            .unwrap();
        assert!(insights.highlights.is_none());
        assert!(insights.problems.is_none());
        assert!(insights.recommendations.is_none());
    }
}
