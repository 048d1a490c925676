//! SVG rendering for the stats card and the error card.

use std::collections::HashSet;
use std::fmt::Write;

use super::colors::CardColors;
use super::format::{escape_xml, k_format};
use super::rank::{calculate_rank, Rank};
use crate::github::{Completeness, UserStats};

const CARD_WIDTH: u32 = 495;
const TITLE_Y: u32 = 35;
const FOOTNOTE_HEIGHT: u32 = 20;
const RANK_RADIUS: f64 = 40.0;
const FONT: &str = r#""Segoe UI", Ubuntu, Sans-Serif"#;

pub const DEFAULT_LINE_HEIGHT: u32 = 25;

// == Card Options ==
/// Layout switches for the stats card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardOptions {
    /// Row keys to leave out: `stars`, `commits`, `prs`, `issues`, `contribs`
    pub hide: HashSet<String>,
    /// Optional row keys to add: `reviews`, `prs_merged`, `prs_merged_percentage`
    pub show: HashSet<String>,
    pub hide_rank: bool,
    pub hide_title: bool,
    pub hide_border: bool,
    pub custom_title: Option<String>,
    pub line_height: u32,
    /// Add a footnote saying the data is a stale copy
    pub stale: bool,
}

impl Default for CardOptions {
    fn default() -> Self {
        Self {
            hide: HashSet::new(),
            show: HashSet::new(),
            hide_rank: false,
            hide_title: false,
            hide_border: false,
            custom_title: None,
            line_height: DEFAULT_LINE_HEIGHT,
            stale: false,
        }
    }
}

enum Item {
    Heading(&'static str),
    Row { label: &'static str, value: String },
}

/// A candidate row. Default rows are dropped by `hide`; optional rows
/// appear only when named in `show`.
struct RowSpec {
    key: &'static str,
    label: &'static str,
    value: String,
    optional: bool,
}

impl RowSpec {
    fn count(key: &'static str, label: &'static str, value: u64) -> Self {
        Self {
            key,
            label,
            value: k_format(value),
            optional: false,
        }
    }

    fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

fn visible_rows(specs: Vec<RowSpec>, options: &CardOptions) -> Vec<Item> {
    specs
        .into_iter()
        .filter(|spec| {
            if spec.optional {
                options.show.contains(spec.key)
            } else {
                !options.hide.contains(spec.key)
            }
        })
        .map(|spec| Item::Row {
            label: spec.label,
            value: spec.value,
        })
        .collect()
}

/// Share of PRs merged, one decimal.
fn merged_percentage(merged: u64, total: u64) -> String {
    if total == 0 {
        return "0%".to_string();
    }
    format!("{:.1}%", merged as f64 / total as f64 * 100.0)
}

/// Rows in display order. Complete data is split into all-time and
/// last-year sections; partial data is a flat list.
fn build_items(stats: &UserStats, options: &CardOptions) -> Vec<Item> {
    let stars = || RowSpec::count("stars", "Total Stars", stats.total_stars);
    let prs = || RowSpec::count("prs", "Total PRs", stats.total_prs);
    let commits = || RowSpec::count("commits", "Total Commits", stats.total_commits);
    let issues = || RowSpec::count("issues", "Total Issues", stats.total_issues);
    let contribs = || RowSpec::count("contribs", "Contributed to", stats.contributions);
    let reviews = || RowSpec::count("reviews", "Total Reviews", stats.total_reviews).optional();
    let merged = || RowSpec::count("prs_merged", "PRs Merged", stats.total_prs_merged).optional();
    let merged_pct = || RowSpec {
        key: "prs_merged_percentage",
        label: "PRs Merged %",
        value: merged_percentage(stats.total_prs_merged, stats.total_prs),
        optional: true,
    };

    match stats.completeness {
        Completeness::Complete => {
            let sections = [
                ("All Time", vec![stars(), prs(), merged(), merged_pct()]),
                ("Last 12 Months", vec![commits(), issues(), contribs(), reviews()]),
            ];
            let mut items = Vec::new();
            for (heading, specs) in sections {
                let rows = visible_rows(specs, options);
                if !rows.is_empty() {
                    items.push(Item::Heading(heading));
                    items.extend(rows);
                }
            }
            items
        }
        Completeness::Partial => visible_rows(
            vec![
                stars(),
                commits(),
                prs(),
                issues(),
                contribs(),
                reviews(),
                merged(),
                merged_pct(),
            ],
            options,
        ),
    }
}

fn footnote(stats: &UserStats, stale: bool) -> Option<&'static str> {
    match (stale, stats.is_partial()) {
        (true, true) => Some("Cached partial data. Some statistics are unavailable."),
        (true, false) => Some("Showing cached data. GitHub is unavailable right now."),
        (false, true) => Some("Partial data. Some statistics are unavailable."),
        (false, false) => None,
    }
}

// == Stats Card ==
/// Renders the stats card.
pub fn render_stats_card(stats: &UserStats, options: &CardOptions, colors: &CardColors) -> String {
    let items = build_items(stats, options);
    let note = footnote(stats, options.stale);
    let line_height = options.line_height;

    let stats_start_y = if options.hide_title { 25 } else { 55 };
    let min_height = if options.hide_rank { 150 } else { 195 };
    let mut height = (stats_start_y + items.len() as u32 * line_height + 30).max(min_height);
    if note.is_some() {
        height += FOOTNOTE_HEIGHT;
    }

    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" fill="none">"#,
        w = CARD_WIDTH,
        h = height
    );
    svg.push_str(&style(colors));

    let border = if options.hide_border {
        String::new()
    } else {
        format!(r##" stroke="#{}" stroke-opacity="1""##, colors.border_color)
    };
    let _ = write!(
        svg,
        r##"<rect x="0.5" y="0.5" rx="4.5" width="{}" height="{}" fill="#{}"{}/>"##,
        CARD_WIDTH - 1,
        height - 1,
        colors.bg_color,
        border
    );

    if !options.hide_title {
        let title = match &options.custom_title {
            Some(custom) => custom.clone(),
            None => format!("{}'s GitHub Stats", stats.name),
        };
        let _ = write!(
            svg,
            r#"<g transform="translate(25, {})"><text class="header" x="0" y="0">{}</text></g>"#,
            TITLE_Y,
            escape_xml(&title)
        );
    }

    for (i, item) in items.iter().enumerate() {
        let y = stats_start_y + i as u32 * line_height;
        match item {
            Item::Heading(label) => {
                let _ = write!(
                    svg,
                    r#"<g transform="translate(25, {})"><text class="section-heading" x="0" y="0">{}</text></g>"#,
                    y, label
                );
            }
            Item::Row { label, value } => {
                let _ = write!(
                    svg,
                    r#"<g transform="translate(25, {})"><text class="stat-label" x="0" y="0">{}:</text><text class="stat-value" x="220" y="0">{}</text></g>"#,
                    y, label, value
                );
            }
        }
    }

    if !options.hide_rank {
        let body_height = height - note.map_or(0, |_| FOOTNOTE_HEIGHT);
        svg.push_str(&rank_circle(&calculate_rank(stats), colors, body_height));
    }

    if let Some(note) = note {
        let _ = write!(
            svg,
            r#"<text class="footnote" x="25" y="{}">{}</text>"#,
            height - 12,
            note
        );
    }

    svg.push_str("</svg>");
    svg
}

fn style(colors: &CardColors) -> String {
    format!(
        "<style>\
         .header {{ font: 600 18px {f}; fill: #{title}; }}\
         .stat-label {{ font: 400 14px {f}; fill: #{text}; }}\
         .stat-value {{ font: 700 14px {f}; fill: #{text}; }}\
         .section-heading {{ font: 700 14px {f}; fill: #{text}; }}\
         .rank-letter {{ font: 800 24px {f}; fill: #{text}; }}\
         .rank-percentile {{ font: 400 12px {f}; fill: #{text}; }}\
         .footnote {{ font: italic 400 11px {f}; fill: #{text}; opacity: 0.7; }}\
         </style>",
        f = FONT,
        title = colors.title_color,
        text = colors.text_color
    )
}

fn rank_circle(rank: &Rank, colors: &CardColors, body_height: u32) -> String {
    let circumference = 2.0 * std::f64::consts::PI * RANK_RADIUS;
    let dashoffset = circumference - rank.percentile / 100.0 * circumference;

    format!(
        r##"<g transform="translate(425, {cy})"><circle r="{r}" cx="0" cy="0" fill="none" stroke="#{text}" stroke-width="6" stroke-opacity="0.2"/><circle r="{r}" cx="0" cy="0" fill="none" stroke="#{icon}" stroke-width="6" stroke-dasharray="{c:.2}" stroke-dashoffset="{o:.2}" stroke-linecap="round" transform="rotate(-90)"/><text class="rank-letter" text-anchor="middle" dominant-baseline="central" y="-5">{level}</text><text class="rank-percentile" text-anchor="middle" dominant-baseline="central" y="15">{p}%</text></g>"##,
        cy = body_height as f64 / 2.0,
        r = RANK_RADIUS,
        text = colors.text_color,
        icon = colors.icon_color,
        c = circumference,
        o = dashoffset,
        level = rank.level,
        p = rank.percentile
    )
}

// == Error Card ==
/// Renders a small card carrying an error message.
pub fn render_error_card(message: &str, colors: &CardColors) -> String {
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="495" height="120" viewBox="0 0 495 120" fill="none"><style>.header {{ font: 600 18px {f}; fill: #{title}; }} .message {{ font: 400 14px {f}; fill: #{text}; }}</style><rect x="0.5" y="0.5" rx="4.5" width="494" height="119" fill="#{bg}" stroke="#{border}"/><g transform="translate(25, 35)"><text class="header">Error</text><text class="message" y="30">{message}</text></g></svg>"##,
        f = FONT,
        title = colors.title_color,
        text = colors.text_color,
        bg = colors.bg_color,
        border = colors.border_color,
        message = escape_xml(message)
    )
}
