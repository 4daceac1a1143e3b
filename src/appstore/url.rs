use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AppError, Result};
use crate::types::AppIdentity;

/// Product page path shape: `/<country>/app/<slug>/id<digits>`.
/// The host prefix is allowed to vary (locale subdomains, link shorteners
/// that keep the path), so the match anchors on the path segments.
static APP_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/([a-z]{2})/app/([^/]+)/id(\d+)").expect("app URL pattern compiles")
});

/// Extract `(country, slug, app_id)` from an App Store product URL.
/// Pure and deterministic; fails with `InvalidUrl` carrying the original
/// string when the shape doesn't match.
pub fn parse_app_url(url: &str) -> Result<AppIdentity> {
    let caps = APP_URL_RE
        .captures(url)
        .ok_or_else(|| AppError::InvalidUrl(url.to_string()))?;

    let app_id = caps[3]
        .parse::<u64>()
        .map_err(|_| AppError::InvalidUrl(url.to_string()))?;

    Ok(AppIdentity {
        country: caps[1].to_string(),
        slug: caps[2].to_string(),
        app_id,
    })
}
