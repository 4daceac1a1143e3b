use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use csv::StringRecord;
use rand::prelude::SliceRandom;
use rand::rng;
use tracing::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::types::ReviewRecord;

/// Columns an uploaded review file must carry. A `date` column is used
/// when present but never required.
pub const REQUIRED_COLUMNS: &[&str] = &["title", "review", "rating"];

/// Load the bundled demo dataset.
pub fn load_csv_file(path: impl AsRef<Path>) -> Result<Vec<ReviewRecord>> {
    let file = std::fs::File::open(path)?;
    read_reviews(file)
}

/// Parse caller-supplied CSV text (the upload path).
pub fn load_csv(text: &str) -> Result<Vec<ReviewRecord>> {
    read_reviews(text.as_bytes())
}

/// Uniform random downsample to at most `cap` rows. Inputs at or under
/// the cap come back untouched, in their original order.
pub fn downsample(mut reviews: Vec<ReviewRecord>, cap: usize) -> Vec<ReviewRecord> {
    if reviews.len() <= cap {
        return reviews;
    }
    warn!(
        uploaded = reviews.len(),
        cap, "dataset exceeds row cap; using a random sample"
    );
    reviews.shuffle(&mut rng());
    reviews.truncate(cap);
    reviews
}

fn read_reviews<R: std::io::Read>(source: R) -> Result<Vec<ReviewRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader.headers()?.clone();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !headers.iter().any(|h| h == **col))
        .map(|col| col.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(AppError::MissingColumns(missing));
    }

    // Unwraps can't fire past the check above; extra columns are ignored.
    let title_idx = column_index(&headers, "title").unwrap_or(0);
    let review_idx = column_index(&headers, "review").unwrap_or(0);
    let rating_idx = column_index(&headers, "rating").unwrap_or(0);
    let date_idx = column_index(&headers, "date");

    let mut reviews = Vec::new();
    let mut dropped = 0usize;

    for row in reader.records() {
        let row = row?;
        match parse_row(&row, title_idx, review_idx, rating_idx, date_idx) {
            Some(record) => reviews.push(record),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        debug!(dropped, "dropped malformed review rows");
    }
    if reviews.is_empty() {
        return Err(AppError::EmptyDataset);
    }

    info!(rows = reviews.len(), "review dataset loaded");
    Ok(reviews)
}

fn column_index(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

/// One CSV row onto a `ReviewRecord`; rows with an empty body or an
/// unusable rating are malformed and dropped.
fn parse_row(
    row: &StringRecord,
    title_idx: usize,
    review_idx: usize,
    rating_idx: usize,
    date_idx: Option<usize>,
) -> Option<ReviewRecord> {
    let review = row.get(review_idx)?.to_string();
    if review.is_empty() {
        return None;
    }

    let rating = parse_rating(row.get(rating_idx)?)?;

    Some(ReviewRecord {
        date: date_idx
            .and_then(|i| row.get(i))
            .and_then(parse_flexible_date),
        title: row.get(title_idx).unwrap_or("").to_string(),
        review,
        rating,
    })
}

/// Ratings arrive as "4" or, from spreadsheet exports, "4.0".
fn parse_rating(s: &str) -> Option<u8> {
    let rating = s
        .parse::<u8>()
        .ok()
        .or_else(|| s.parse::<f64>().ok().map(|f| f as u8))?;
    (1..=5).contains(&rating).then_some(rating)
}

/// Dates in review exports come in a handful of shapes; anything else is
/// treated as absent rather than failing the row.
fn parse_flexible_date(s: &str) -> Option<NaiveDateTime> {
    if s.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}
