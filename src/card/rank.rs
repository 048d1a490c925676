//! Percentile rank from weighted CDF scores.

use serde::Serialize;

use crate::github::UserStats;

const COMMITS_MEDIAN: f64 = 250.0;
const COMMITS_WEIGHT: f64 = 2.0;
const PRS_MEDIAN: f64 = 50.0;
const PRS_WEIGHT: f64 = 3.0;
const ISSUES_MEDIAN: f64 = 25.0;
const ISSUES_WEIGHT: f64 = 1.0;
const REVIEWS_MEDIAN: f64 = 2.0;
const REVIEWS_WEIGHT: f64 = 1.0;
const STARS_MEDIAN: f64 = 50.0;
const STARS_WEIGHT: f64 = 4.0;
const FOLLOWERS_MEDIAN: f64 = 10.0;
const FOLLOWERS_WEIGHT: f64 = 0.5;

const TOTAL_WEIGHT: f64 =
    COMMITS_WEIGHT + PRS_WEIGHT + ISSUES_WEIGHT + REVIEWS_WEIGHT + STARS_WEIGHT + FOLLOWERS_WEIGHT;

/// Grade thresholds, best first.
const LEVELS: [(f64, &str); 8] = [
    (95.0, "S"),
    (85.0, "A+"),
    (75.0, "A"),
    (60.0, "A-"),
    (50.0, "B+"),
    (40.0, "B"),
    (30.0, "B-"),
    (20.0, "C+"),
];

// == Rank ==
/// Grade and score, 100 being best.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rank {
    pub level: &'static str,
    /// Score in 0..=100, rounded to one decimal
    pub percentile: f64,
}

fn exponential_cdf(x: f64) -> f64 {
    if x < 0.0 {
        0.0
    } else {
        1.0 - (-x).exp()
    }
}

fn log_normal_cdf(x: f64) -> f64 {
    if x <= 0.0 {
        0.0
    } else {
        0.5 * (1.0 + erf(x.ln() / std::f64::consts::SQRT_2))
    }
}

/// Error function (Abramowitz and Stegun 7.1.26, |error| < 1.5e-7).
fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + 0.327_591_1 * x);
    let poly = t
        * (0.254_829_592
            + t * (-0.284_496_736 + t * (1.421_413_741 + t * (-1.453_152_027 + t * 1.061_405_429))));
    sign * (1.0 - poly * (-x * x).exp())
}

/// Computes the rank for a set of statistics.
pub fn calculate_rank(stats: &UserStats) -> Rank {
    let score = (COMMITS_WEIGHT * exponential_cdf(stats.total_commits as f64 / COMMITS_MEDIAN)
        + PRS_WEIGHT * exponential_cdf(stats.total_prs as f64 / PRS_MEDIAN)
        + ISSUES_WEIGHT * exponential_cdf(stats.total_issues as f64 / ISSUES_MEDIAN)
        + REVIEWS_WEIGHT * exponential_cdf(stats.total_reviews as f64 / REVIEWS_MEDIAN)
        + STARS_WEIGHT * log_normal_cdf(stats.total_stars as f64 / STARS_MEDIAN)
        + FOLLOWERS_WEIGHT * log_normal_cdf(stats.followers as f64 / FOLLOWERS_MEDIAN))
        / TOTAL_WEIGHT;

    let percentile = score * 100.0;
    let level = LEVELS
        .iter()
        .find(|(threshold, _)| percentile >= *threshold)
        .map_or("C", |&(_, level)| level);

    Rank {
        level,
        percentile: (percentile * 10.0).round() / 10.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_erf_reference_points() {
        assert!(erf(0.0).abs() < 1e-6);
        assert!((erf(1.0) - 0.842_700_79).abs() < 1e-6);
        assert!((erf(-1.0) + 0.842_700_79).abs() < 1e-6);
    }

    #[test]
    fn test_empty_profile_is_c() {
        let rank = calculate_rank(&UserStats::default());
        assert_eq!(rank.level, "C");
        assert_eq!(rank.percentile, 0.0);
    }

    #[test]
    fn test_median_profile() {
        let stats = UserStats {
            total_commits: 250,
            total_prs: 50,
            total_issues: 25,
            total_reviews: 2,
            total_stars: 50,
            followers: 10,
            ..UserStats::default()
        };
        // Exponential CDF at 1 is ~0.632, log-normal CDF at 1 is 0.5
        let rank = calculate_rank(&stats);
        assert_eq!(rank.level, "B+");
        assert_eq!(rank.percentile, 58.0);
    }

    #[test]
    fn test_prolific_profile_is_s() {
        let stats = UserStats {
            total_commits: 50_000,
            total_prs: 5_000,
            total_issues: 2_000,
            total_reviews: 1_000,
            total_stars: 500_000,
            followers: 100_000,
            ..UserStats::default()
        };
        assert_eq!(calculate_rank(&stats).level, "S");
    }
}
