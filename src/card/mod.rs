//! Card Module
//!
//! SVG rendering of user statistics and the HTTP response wrapper around it.
//!
//! # Components
//! - `colors`: default scheme and per-request hex overrides
//! - `rank`: weighted percentile grade
//! - `format`: compact numbers and XML escaping
//! - `svg`: stats card and error card markup

mod colors;
mod format;
mod rank;
mod svg;

use axum::{
    http::{header, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};

pub use colors::{CardColors, ColorOverrides};
pub use format::{escape_xml, k_format};
pub use rank::{calculate_rank, Rank};
pub use svg::{render_error_card, render_stats_card, CardOptions, DEFAULT_LINE_HEIGHT};

/// Client cache lifetime for freshly served data, in seconds.
pub const FRESH_CACHE_SECS: u64 = 1800;
/// Client cache lifetime for stale data served after a failed refresh.
pub const STALE_CACHE_SECS: u64 = 300;
pub const NOT_FOUND_CACHE_SECS: u64 = 300;
pub const ERROR_CACHE_SECS: u64 = 60;

/// Header telling clients how the card's data was obtained.
pub const STATS_SOURCE_HEADER: HeaderName = HeaderName::from_static("x-stats-source");

/// Quoted hex SHA-256 of the body.
pub fn etag(body: &str) -> String {
    format!("\"{}\"", hex::encode(Sha256::digest(body.as_bytes())))
}

/// Wraps an SVG body with content type, caching and ETag headers.
///
/// # Arguments
/// * `svg` - Rendered card
/// * `cache_secs` - `max-age` for `Cache-Control`
/// * `source` - Value for the `X-Stats-Source` header, if any
pub fn svg_response(svg: String, cache_secs: u64, source: Option<&'static str>) -> Response {
    let headers = [
        (header::CONTENT_TYPE, "image/svg+xml".to_string()),
        (header::CACHE_CONTROL, format!("public, max-age={}", cache_secs)),
        (header::ETAG, etag(&svg)),
    ];

    let mut response = (headers, svg).into_response();
    if let Some(source) = source {
        response
            .headers_mut()
            .insert(STATS_SOURCE_HEADER, HeaderValue::from_static(source));
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_etag_is_stable_and_quoted() {
        let first = etag("<svg/>");
        assert_eq!(first, etag("<svg/>"));
        assert_ne!(first, etag("<svg></svg>"));
        assert!(first.starts_with('"') && first.ends_with('"'));
        assert_eq!(first.len(), 64 + 2);
    }

    #[test]
    fn test_svg_response_headers() {
        let response = svg_response("<svg/>".to_string(), FRESH_CACHE_SECS, Some("cached"));

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "image/svg+xml");
        assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=1800");
        assert_eq!(headers[header::ETAG], etag("<svg/>").as_str());
        assert_eq!(headers[STATS_SOURCE_HEADER], "cached");
    }

    #[test]
    fn test_svg_response_without_source() {
        let response = svg_response("<svg/>".to_string(), ERROR_CACHE_SECS, None);
        assert!(response.headers().get(STATS_SOURCE_HEADER).is_none());
        assert_eq!(response.headers()[header::CACHE_CONTROL], "public, max-age=60");
    }
}
