//! Request DTOs for the stats card API
//!
//! Defines the query string accepted by the card endpoint.

use serde::Deserialize;

use crate::card::{CardColors, CardOptions, ColorOverrides, DEFAULT_LINE_HEIGHT};

const MIN_LINE_HEIGHT: u32 = 10;
const MAX_LINE_HEIGHT: u32 = 100;

/// Query string for the card endpoint (GET /api)
///
/// Boolean switches accept `true`/`1`; anything else reads as false.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardQuery {
    /// GitHub login
    #[serde(default)]
    pub username: Option<String>,
    /// Comma-separated row keys to hide
    #[serde(default)]
    pub hide: Option<String>,
    /// Comma-separated optional row keys to add
    #[serde(default)]
    pub show: Option<String>,
    #[serde(default)]
    pub hide_rank: Option<String>,
    #[serde(default)]
    pub hide_title: Option<String>,
    #[serde(default)]
    pub hide_border: Option<String>,
    #[serde(default)]
    pub custom_title: Option<String>,
    #[serde(default)]
    pub line_height: Option<String>,
    #[serde(flatten)]
    pub colors: ColorOverrides,
}

impl CardQuery {
    /// Trimmed username, if one was given.
    pub fn username(&self) -> Option<&str> {
        self.username
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Default colors with this request's overrides applied.
    pub fn card_colors(&self) -> CardColors {
        CardColors::default().with_overrides(&self.colors)
    }

    /// Layout options for the card; `stale` is left false.
    pub fn card_options(&self) -> CardOptions {
        CardOptions {
            hide: parse_list(self.hide.as_deref()),
            show: parse_list(self.show.as_deref()),
            hide_rank: parse_flag(self.hide_rank.as_deref()),
            hide_title: parse_flag(self.hide_title.as_deref()),
            hide_border: parse_flag(self.hide_border.as_deref()),
            custom_title: self
                .custom_title
                .clone()
                .filter(|title| !title.trim().is_empty()),
            line_height: self
                .line_height
                .as_deref()
                .and_then(|value| value.trim().parse::<u32>().ok())
                .map_or(DEFAULT_LINE_HEIGHT, |value| {
                    value.clamp(MIN_LINE_HEIGHT, MAX_LINE_HEIGHT)
                }),
            stale: false,
        }
    }
}

fn parse_flag(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some("true") | Some("1"))
}

fn parse_list(value: Option<&str>) -> std::collections::HashSet<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(|item| item.trim().to_ascii_lowercase())
        .filter(|item| !item.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &str) -> CardQuery {
        serde_json::from_str(pairs).unwrap()
    }

    #[test]
    fn test_card_query_deserialize() {
        let q = query(r#"{"username": " alice ", "hide": "stars, PRS,,", "hide_rank": "true"}"#);

        assert_eq!(q.username(), Some("alice"));
        let options = q.card_options();
        assert!(options.hide.contains("stars"));
        assert!(options.hide.contains("prs"));
        assert_eq!(options.hide.len(), 2);
        assert!(options.hide_rank);
        assert!(!options.hide_title);
    }

    #[test]
    fn test_show_list_parsed() {
        let q = query(r#"{"show": "reviews,PRS_MERGED"}"#);
        let options = q.card_options();
        assert!(options.show.contains("reviews"));
        assert!(options.show.contains("prs_merged"));
        assert!(options.hide.is_empty());
    }

    #[test]
    fn test_blank_username_is_none() {
        assert_eq!(query(r#"{"username": "  "}"#).username(), None);
        assert_eq!(CardQuery::default().username(), None);
    }

    #[test]
    fn test_line_height_defaults_and_clamps() {
        assert_eq!(CardQuery::default().card_options().line_height, DEFAULT_LINE_HEIGHT);
        assert_eq!(query(r#"{"line_height": "500"}"#).card_options().line_height, 100);
        assert_eq!(query(r#"{"line_height": "2"}"#).card_options().line_height, 10);
        assert_eq!(
            query(r#"{"line_height": "abc"}"#).card_options().line_height,
            DEFAULT_LINE_HEIGHT
        );
    }

    #[test]
    fn test_color_overrides_flattened() {
        let q = query(r#"{"title_color": "ff0000", "bg_color": "nope"}"#);
        let colors = q.card_colors();
        assert_eq!(colors.title_color, "ff0000");
        assert_eq!(colors.bg_color, CardColors::default().bg_color);
    }
}
