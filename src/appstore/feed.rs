use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::{FEED_MAX_PAGES, FEED_PAGE_SIZE};
use crate::error::Result;
use crate::types::{AppIdentity, ReviewRecord};

/// Per-reason drop counters for one feed walk, logged after every fetch.
#[derive(Debug, Default)]
pub struct FetchStats {
    pub feed_total: usize,
    pub pages_fetched: usize,
    pub rejected_missing_field: usize,
    pub rejected_bad_rating: usize,
    pub qualified: usize,
}

/// The external review-scraping capability. Implementations fetch up to
/// `max_count` most-recent reviews dated on or after `start`; the upper
/// date bound is the retriever's job.
#[async_trait]
pub trait ReviewFeed: Send + Sync {
    async fn fetch(
        &self,
        identity: &AppIdentity,
        max_count: usize,
        start: NaiveDateTime,
    ) -> Result<Vec<ReviewRecord>>;
}

/// Client for the iTunes customer-reviews RSS feed (JSON flavor).
/// The feed serves most-recent-first pages of 50 and goes silent past
/// page 10; rate limiting shows up as an empty page, not an error.
pub struct AppStoreFeed {
    client: reqwest::Client,
    base_url: String,
}

impl AppStoreFeed {
    pub fn new(base_url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl ReviewFeed for AppStoreFeed {
    async fn fetch(
        &self,
        identity: &AppIdentity,
        max_count: usize,
        start: NaiveDateTime,
    ) -> Result<Vec<ReviewRecord>> {
        let mut reviews = Vec::new();
        let mut stats = FetchStats::default();

        'outer: for page in 1..=FEED_MAX_PAGES {
            let url = format!(
                "{}/{}/rss/customerreviews/page={}/id={}/sortby=mostrecent/json",
                self.base_url, identity.country, page, identity.app_id
            );

            let resp: Value = self.client.get(&url).send().await?.json().await?;

            let entries = match resp
                .get("feed")
                .and_then(|f| f.get("entry"))
                .and_then(|e| e.as_array())
            {
                Some(a) => a.clone(),
                // End of feed, or throttled — the feed shape is identical.
                None => break,
            };

            stats.pages_fetched += 1;
            stats.feed_total += entries.len();

            for entry in &entries {
                match parse_feed_entry(entry) {
                    Ok(record) => {
                        // Most-recent-first order: the first entry older
                        // than `start` ends the walk.
                        if record.date.map_or(false, |d| d < start) {
                            break 'outer;
                        }
                        reviews.push(record);
                        if reviews.len() >= max_count {
                            break 'outer;
                        }
                    }
                    Err(Rejection::MissingField) => stats.rejected_missing_field += 1,
                    Err(Rejection::BadRating) => stats.rejected_bad_rating += 1,
                }
            }

            if entries.len() < FEED_PAGE_SIZE {
                break;
            }
        }

        stats.qualified = reviews.len();
        info!(
            app_id = identity.app_id,
            country = %identity.country,
            pages = stats.pages_fetched,
            feed_total = stats.feed_total,
            qualified = stats.qualified,
            "feed walk complete"
        );
        if stats.rejected_missing_field + stats.rejected_bad_rating > 0 {
            debug!(
                missing_field = stats.rejected_missing_field,
                bad_rating = stats.rejected_bad_rating,
                "dropped malformed feed entries"
            );
        }

        Ok(reviews)
    }
}

enum Rejection {
    MissingField,
    BadRating,
}

/// Project one feed entry onto `(date, title, review, rating)`.
/// Entries missing any of the required fields are rejected here so that
/// nothing malformed reaches the retriever. The feed's leading app-metadata
/// entry has no rating and falls out the same way.
fn parse_feed_entry(v: &Value) -> std::result::Result<ReviewRecord, Rejection> {
    let title = v
        .get("title")
        .and_then(|t| t.get("label"))
        .and_then(|l| l.as_str())
        .unwrap_or("")
        .to_string();

    let review = v
        .get("content")
        .and_then(|c| c.get("label"))
        .and_then(|l| l.as_str())
        .unwrap_or("")
        .to_string();
    if review.is_empty() {
        return Err(Rejection::MissingField);
    }

    let rating = v
        .get("im:rating")
        .and_then(|r| r.get("label"))
        .and_then(|l| l.as_str())
        .and_then(|s| s.parse::<u8>().ok())
        .ok_or(Rejection::MissingField)?;
    if !(1..=5).contains(&rating) {
        return Err(Rejection::BadRating);
    }

    let date = v
        .get("updated")
        .and_then(|u| u.get("label"))
        .and_then(|l| l.as_str())
        .and_then(parse_feed_date)
        .ok_or(Rejection::MissingField)?;

    Ok(ReviewRecord {
        date: Some(date),
        title,
        review,
        rating,
    })
}

/// Feed timestamps are RFC 3339 with a zone offset; review dates are kept
/// timezone-naive in UTC.
fn parse_feed_date(s: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc())
}
