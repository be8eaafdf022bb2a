//! Liquidity quality scoring
//!
//! Composite 0-100 score built from four banded components:
//! - Volume (0-40)
//! - Spread (0-30)
//! - Balance (0-20)
//! - Stability (0-10)

use crate::config::QualityBands;
use crate::depth::types::{Metrics, QualityScore, TrendAnalysis};

const MAX_VOLUME_SCORE: u8 = 40;
const MAX_SPREAD_SCORE: u8 = 30;
const MAX_BALANCE_SCORE: u8 = 20;
const MAX_STABILITY_SCORE: u8 = 10;

/// Score liquidity quality for the current metrics and trend
///
/// The total is the exact sum of the components, clamped to 0-100.
pub fn score_quality(metrics: &Metrics, trend: &TrendAnalysis, bands: &QualityBands) -> QualityScore {
    let (volume_score, volume_reason) = volume_score(metrics.total_volume);
    let (spread_score, spread_reason) = spread_score(metrics.spread_percent);
    let (balance_score, balance_reason) = balance_score(metrics.volume_ratio);
    let (stability_score, stability_reason) =
        stability_score(trend.volume_change_percent, trend.spread_change_percent);

    let score = (volume_score + spread_score + balance_score + stability_score).min(100);

    QualityScore {
        score,
        level: bands.classify(score),
        volume_score,
        spread_score,
        balance_score,
        stability_score,
        component_reasons: vec![volume_reason, spread_reason, balance_reason, stability_reason],
    }
}

/// Volume score (0-40)
///
/// Bands: >1000 → 40, >500 → 30, >200 → 20, else 10
fn volume_score(total_volume: f64) -> (u8, String) {
    let score = match total_volume {
        v if v > 1000.0 => 40,
        v if v > 500.0 => 30,
        v if v > 200.0 => 20,
        _ => 10,
    };

    let label = match score {
        40 => "high",
        30 => "good",
        20 => "moderate",
        _ => "low",
    };

    (
        score,
        format!(
            "Volume {}: {:.2} ({}/{})",
            label, total_volume, score, MAX_VOLUME_SCORE
        ),
    )
}

/// Spread score (0-30)
///
/// Bands: <0.01% → 30, <0.03% → 25, <0.05% → 15, else 5
fn spread_score(spread_percent: f64) -> (u8, String) {
    let score = match spread_percent {
        s if s < 0.01 => 30,
        s if s < 0.03 => 25,
        s if s < 0.05 => 15,
        _ => 5,
    };

    let label = match score {
        30 => "very tight",
        25 => "tight",
        15 => "acceptable",
        _ => "wide",
    };

    (
        score,
        format!(
            "Spread {}: {:.4}% ({}/{})",
            label, spread_percent, score, MAX_SPREAD_SCORE
        ),
    )
}

/// Balance score (0-20)
///
/// Bands on |ratio - 1|: <0.2 → 20, <0.5 → 15, else 5
fn balance_score(volume_ratio: f64) -> (u8, String) {
    let deviation = (volume_ratio - 1.0).abs();
    let score = match deviation {
        d if d < 0.2 => 20,
        d if d < 0.5 => 15,
        _ => 5,
    };

    let label = match score {
        20 => "balanced",
        15 => "slightly imbalanced",
        _ => "imbalanced",
    };

    (
        score,
        format!(
            "Book {}: bid/ask ratio {:.2} ({}/{})",
            label, volume_ratio, score, MAX_BALANCE_SCORE
        ),
    )
}

/// Stability score (0-10)
///
/// Full score when |volume change| < 10% and |spread change| < 15%, else 5
fn stability_score(volume_change_percent: f64, spread_change_percent: f64) -> (u8, String) {
    let stable = volume_change_percent.abs() < 10.0 && spread_change_percent.abs() < 15.0;
    let score = if stable { MAX_STABILITY_SCORE } else { 5 };

    (
        score,
        format!(
            "{}: volume {:+.1}%, spread {:+.1}% ({}/{})",
            if stable { "Stable" } else { "Unstable" },
            volume_change_percent,
            spread_change_percent,
            score,
            MAX_STABILITY_SCORE
        ),
    )
}
