use std::fmt::Write;

use crate::types::ReviewRecord;

/// Instructional preamble for every summarization prompt.
pub const SUMMARY_HEADER: &str = "Below is a collection of user reviews for a mobile app. \
Each review consists of a title, a star rating on a scale of 1 (worst) to 5 (best), \
and the review text. Synthesize the main points raised across these reviews into \
3 to 10 concise bullet points.\n\n";

pub const POSITIVE_SUFFIX: &str = "\n\nFor this analysis, only the positive reviews \
have been selected. Please summarize the positive highlights in the user feedback.";

pub const CRITICAL_SUFFIX: &str = "\n\nFor this analysis, only critical reviews \
have been selected. Please summarize the key critical issues raised in the user feedback.";

/// Serialize a review collection into a single prompt: the fixed header,
/// then one `title / rating / body` block per review in input order,
/// blocks separated by a blank line.
///
/// Byte-deterministic for a given input order — the token count taken on
/// this string pre-flight is exactly what the real call will be billed
/// for. Shuffling or filtering happens before this call, never inside it.
pub fn build_prompt(reviews: &[ReviewRecord]) -> String {
    let mut prompt = String::from(SUMMARY_HEADER);
    for r in reviews {
        // write! to a String cannot fail
        let _ = write!(prompt, "{}\n{}/5\n{}\n\n", r.title, r.rating, r.review);
    }
    prompt
}
