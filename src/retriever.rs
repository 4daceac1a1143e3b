use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tracing::{info, warn};

use crate::appstore::feed::ReviewFeed;
use crate::error::{AppError, Result};
use crate::types::{AppIdentity, DateRange, ReviewRecord};

/// Earliest review date considered when the caller gives no range.
fn default_start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2000, 1, 1)
        .unwrap_or(NaiveDate::MIN)
        .and_time(NaiveTime::MIN)
}

/// Fetch up to `max_count` reviews for `identity` under a wall-clock
/// deadline, returning them sorted most-recent-first.
///
/// The feed runs as a spawned task and the caller waits on it for at most
/// `timeout`. On expiry the task is aborted — best-effort: it stops at its
/// next await point, and in-flight upstream I/O may still complete, with
/// any late result discarded — and the call fails with `ScrapeTimeout`.
/// A fetch that completes with zero raw records fails with
/// `NoReviewsFound`.
///
/// The feed enforces the lower date bound while paging; only `date < end`
/// is re-applied here. Because the upper bound runs after fetching at most
/// `max_count` most-recent records, a narrow range can return fewer
/// matches than exist beyond the fetch window.
///
/// `date_range.start < date_range.end` is the caller's precondition.
pub async fn fetch_reviews(
    feed: Arc<dyn ReviewFeed>,
    identity: AppIdentity,
    max_count: usize,
    date_range: Option<DateRange>,
    timeout: Duration,
) -> Result<Vec<ReviewRecord>> {
    let start = date_range.map(|r| r.start).unwrap_or_else(default_start);
    let end = date_range
        .map(|r| r.end)
        .unwrap_or_else(|| Utc::now().naive_utc());

    let fetch_identity = identity.clone();
    let mut handle =
        tokio::spawn(async move { feed.fetch(&fetch_identity, max_count, start).await });

    let raw = match tokio::time::timeout(timeout, &mut handle).await {
        Ok(Ok(result)) => result?,
        Ok(Err(join_err)) => {
            return Err(AppError::Upstream(format!(
                "review fetch task failed: {join_err}"
            )))
        }
        Err(_) => {
            handle.abort();
            warn!(
                app_id = identity.app_id,
                timeout_secs = timeout.as_secs(),
                "review fetch exceeded its deadline; task aborted"
            );
            return Err(AppError::ScrapeTimeout(timeout.as_secs()));
        }
    };

    if raw.is_empty() {
        return Err(AppError::NoReviewsFound);
    }

    let fetched = raw.len();
    let mut reviews: Vec<ReviewRecord> = raw
        .into_iter()
        .filter(|r| r.date.map_or(false, |d| d < end))
        .collect();

    // Stable sort: equal dates keep feed order.
    reviews.sort_by(|a, b| b.date.cmp(&a.date));

    info!(
        app_id = identity.app_id,
        fetched,
        kept = reviews.len(),
        "review retrieval complete"
    );

    Ok(reviews)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Instant;

    struct StubFeed {
        reviews: Vec<ReviewRecord>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl ReviewFeed for StubFeed {
        async fn fetch(
            &self,
            _identity: &AppIdentity,
            _max_count: usize,
            _start: NaiveDateTime,
        ) -> Result<Vec<ReviewRecord>> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.reviews.clone())
        }
    }

    fn identity() -> AppIdentity {
        AppIdentity {
            country: "de".to_string(),
            slug: "slack".to_string(),
            app_id: 618783545,
        }
    }

    fn record(date: &str, title: &str, review: &str, rating: u8) -> ReviewRecord {
        ReviewRecord {
            date: Some(
                NaiveDate::parse_from_str(date, "%Y-%m-%d")
                    .unwrap()
                    .and_time(NaiveTime::MIN),
            ),
            title: title.to_string(),
            review: review.to_string(),
            rating,
        }
    }

    fn range(start: &str, end: &str) -> DateRange {
        DateRange::from_dates(
            NaiveDate::parse_from_str(start, "%Y-%m-%d").unwrap(),
            NaiveDate::parse_from_str(end, "%Y-%m-%d").unwrap(),
        )
    }

    #[tokio::test]
    async fn returns_records_sorted_most_recent_first() {
        let feed = Arc::new(StubFeed {
            reviews: vec![
                record("2024-01-01", "Great", "Love it", 5),
                record("2024-02-01", "Bad", "Crashes", 1),
            ],
            delay: None,
        });

        let reviews = fetch_reviews(
            feed,
            identity(),
            100,
            Some(range("2024-01-01", "2024-03-01")),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0].title, "Bad");
        assert_eq!(reviews[1].title, "Great");
    }

    #[tokio::test]
    async fn upper_date_bound_is_exclusive() {
        let feed = Arc::new(StubFeed {
            reviews: vec![
                record("2024-01-15", "kept", "body", 4),
                record("2024-03-01", "cut", "on the boundary", 2),
                record("2024-04-01", "cut", "past the boundary", 2),
            ],
            delay: None,
        });

        let reviews = fetch_reviews(
            feed,
            identity(),
            100,
            Some(range("2024-01-01", "2024-03-01")),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].title, "kept");
    }

    #[tokio::test]
    async fn records_without_dates_are_dropped_before_sorting() {
        let feed = Arc::new(StubFeed {
            reviews: vec![
                record("2024-01-15", "dated", "body", 4),
                ReviewRecord {
                    date: None,
                    title: "undated".to_string(),
                    review: "body".to_string(),
                    rating: 3,
                },
            ],
            delay: None,
        });

        let reviews = fetch_reviews(feed, identity(), 100, None, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].title, "dated");
    }

    #[tokio::test]
    async fn empty_fetch_is_an_error_not_an_empty_collection() {
        let feed = Arc::new(StubFeed {
            reviews: vec![],
            delay: None,
        });

        let err = fetch_reviews(feed, identity(), 100, None, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NoReviewsFound));
    }

    #[tokio::test]
    async fn blocked_fetch_times_out_close_to_the_deadline() {
        let feed = Arc::new(StubFeed {
            reviews: vec![record("2024-01-01", "late", "never arrives", 3)],
            delay: Some(Duration::from_secs(3600)),
        });

        let started = Instant::now();
        let err = fetch_reviews(feed, identity(), 100, None, Duration::from_millis(50))
            .await
            .unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, AppError::ScrapeTimeout(_)));
        assert!(
            elapsed < Duration::from_secs(2),
            "timeout fired after {elapsed:?}"
        );
    }

    #[tokio::test]
    async fn stable_sort_keeps_feed_order_for_equal_dates() {
        let feed = Arc::new(StubFeed {
            reviews: vec![
                record("2024-02-01", "first", "body", 5),
                record("2024-02-01", "second", "body", 1),
            ],
            delay: None,
        });

        let reviews = fetch_reviews(feed, identity(), 100, None, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(reviews[0].title, "first");
        assert_eq!(reviews[1].title, "second");
    }
}
