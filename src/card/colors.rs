//! Card color scheme.

use serde::Deserialize;

// == Card Colors ==
/// Hex colors (without `#`) used by the card renderers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardColors {
    pub title_color: String,
    pub text_color: String,
    pub icon_color: String,
    pub bg_color: String,
    pub border_color: String,
}

impl Default for CardColors {
    fn default() -> Self {
        Self {
            title_color: "2f80ed".to_string(),
            text_color: "434d58".to_string(),
            icon_color: "4c71f2".to_string(),
            bg_color: "fffefe".to_string(),
            border_color: "e4e2e2".to_string(),
        }
    }
}

/// Per-request color overrides, as they arrive in the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColorOverrides {
    pub title_color: Option<String>,
    pub text_color: Option<String>,
    pub icon_color: Option<String>,
    pub bg_color: Option<String>,
    pub border_color: Option<String>,
}

impl CardColors {
    /// Applies every override that is a valid hex color; invalid ones are ignored.
    pub fn with_overrides(mut self, overrides: &ColorOverrides) -> Self {
        let slots = [
            (&mut self.title_color, &overrides.title_color),
            (&mut self.text_color, &overrides.text_color),
            (&mut self.icon_color, &overrides.icon_color),
            (&mut self.bg_color, &overrides.bg_color),
            (&mut self.border_color, &overrides.border_color),
        ];
        for (slot, value) in slots {
            if let Some(hex) = value.as_deref().and_then(normalize_hex) {
                *slot = hex;
            }
        }
        self
    }
}

/// Accepts 3, 4, 6 or 8 hex digits, with or without a leading `#`.
fn normalize_hex(value: &str) -> Option<String> {
    let hex = value.trim().trim_start_matches('#');
    let valid_len = matches!(hex.len(), 3 | 4 | 6 | 8);
    if valid_len && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(hex.to_ascii_lowercase())
    } else {
        None
    }
}
