//! Trading signal engine
//!
//! Turns current metrics into a buy/sell/neutral signal using the threshold
//! rows selected by the caller's sensitivity levels.
//!
//! Decision order (first match wins):
//! 1. Buy: ratio above the buy threshold, liquidity gate passed, spread tight
//!    enough, imbalance strong enough
//! 2. Sell: the mirror image on the ask side
//! 3. Neutral, insufficient liquidity
//! 4. Neutral, spread too wide
//! 5. Neutral, balanced or unclear book

use tracing::debug;

use crate::config::{LiquidityThresholds, SensitivityConfig, SignalThresholds};
use crate::depth::types::{BalanceStrength, Metrics, SignalStrength, SignalType, TradingSignal};

/// Ceiling for directional confidence
const MAX_DIRECTIONAL_CONFIDENCE: f64 = 80.0;

/// Strong signal when the ratio clears its threshold by this factor
const STRONG_SIGNAL_FACTOR: f64 = 1.5;

/// Generate a trading signal for the current metrics
///
/// Never fails: degenerate books degrade to a neutral signal whose reason
/// says why.
pub fn generate_signal(metrics: &Metrics, sensitivity: &SensitivityConfig) -> TradingSignal {
    let row = sensitivity.signal_sensitivity.signal_thresholds();
    let liquidity = sensitivity.liquidity_sensitivity.liquidity_thresholds();

    if metrics.bid_volume <= 0.0 || metrics.ask_volume <= 0.0 {
        return neutral(
            20.0,
            BalanceStrength::Extreme,
            format!(
                "One-sided book (bid volume {:.2}, ask volume {:.2}): imbalance cannot be assessed",
                metrics.bid_volume, metrics.ask_volume
            ),
        );
    }

    let ratio = metrics.volume_ratio;
    let deviation = imbalance_deviation(ratio);
    let balance = BalanceStrength::from_deviation(deviation);

    let liquidity_ok = passes_liquidity_gate(metrics, liquidity);
    let spread_ok = metrics.spread_percent < row.max_spread_percent;
    let balance_ok = balance >= row.min_balance;
    let tradable = liquidity_ok && spread_ok && balance_ok;

    let signal = if tradable && ratio > row.min_buy_ratio {
        let strength = if ratio > row.min_buy_ratio * STRONG_SIGNAL_FACTOR {
            SignalStrength::Strong
        } else {
            SignalStrength::Medium
        };
        TradingSignal {
            signal_type: SignalType::Buy,
            strength,
            confidence: directional_confidence(deviation),
            reason: format!(
                "Bid pressure: bid/ask ratio {:.2} above {:.2} with {:.4}% spread",
                ratio, row.min_buy_ratio, metrics.spread_percent
            ),
            balance_strength: balance,
        }
    } else if tradable && ratio < row.max_sell_ratio {
        let strength = if ratio < row.max_sell_ratio / STRONG_SIGNAL_FACTOR {
            SignalStrength::Strong
        } else {
            SignalStrength::Medium
        };
        TradingSignal {
            signal_type: SignalType::Sell,
            strength,
            confidence: directional_confidence(deviation),
            reason: format!(
                "Ask pressure: bid/ask ratio {:.2} below {:.2} with {:.4}% spread",
                ratio, row.max_sell_ratio, metrics.spread_percent
            ),
            balance_strength: balance,
        }
    } else if !liquidity_ok {
        neutral(
            liquidity_confidence(metrics, liquidity),
            balance,
            format!(
                "Insufficient liquidity: total volume {:.2} (min {:.2}), weakest side {:.2} (min {:.2}), spread {:.4}% (max {:.2}%)",
                metrics.total_volume,
                liquidity.min_total_volume,
                metrics.bid_volume.min(metrics.ask_volume),
                liquidity.min_side_volume,
                metrics.spread_percent,
                liquidity.max_spread_percent
            ),
        )
    } else if !spread_ok {
        neutral(
            spread_confidence(metrics.spread_percent, row.max_spread_percent),
            balance,
            format!(
                "Spread too wide: {:.4}% (max {:.2}%)",
                metrics.spread_percent, row.max_spread_percent
            ),
        )
    } else {
        let reason = if balance == BalanceStrength::Balanced {
            format!("Balanced market: bid/ask ratio {:.2}", ratio)
        } else {
            format!(
                "Unclear direction: bid/ask ratio {:.2} inside {:.2}-{:.2}",
                ratio, row.max_sell_ratio, row.min_buy_ratio
            )
        };
        neutral(balanced_confidence(ratio, deviation, row), balance, reason)
    };

    debug!(
        signal = ?signal.signal_type,
        strength = ?signal.strength,
        confidence = signal.confidence,
        ratio,
        spread_percent = metrics.spread_percent,
        "Generated trading signal"
    );

    signal
}

/// Imbalance magnitude, symmetric for both sides
///
/// ratio - 1 when bids dominate, 1/ratio - 1 when asks dominate, so a 2:1
/// book scores 1.0 whichever side is heavier.
pub fn imbalance_deviation(volume_ratio: f64) -> f64 {
    if volume_ratio >= 1.0 {
        volume_ratio - 1.0
    } else if volume_ratio > 0.0 {
        1.0 / volume_ratio - 1.0
    } else {
        f64::INFINITY
    }
}

/// Whether the book clears every column of the liquidity row
pub fn passes_liquidity_gate(metrics: &Metrics, row: &LiquidityThresholds) -> bool {
    metrics.bid_volume.min(metrics.ask_volume) >= row.min_side_volume
        && metrics.total_volume >= row.min_total_volume
        && metrics.spread_percent < row.max_spread_percent
}

fn neutral(confidence: f64, balance: BalanceStrength, reason: String) -> TradingSignal {
    TradingSignal {
        signal_type: SignalType::Neutral,
        strength: SignalStrength::Weak,
        confidence: clamp_confidence(confidence),
        reason,
        balance_strength: balance,
    }
}

/// min(80, 40 + deviation * 20)
fn directional_confidence(deviation: f64) -> u8 {
    clamp_confidence((40.0 + deviation * 20.0).min(MAX_DIRECTIONAL_CONFIDENCE))
}

/// 20-30: how much of the required volume is present
fn liquidity_confidence(metrics: &Metrics, row: &LiquidityThresholds) -> f64 {
    let volume_fill = (metrics.total_volume / row.min_total_volume).clamp(0.0, 1.0);
    let side_fill = (metrics.bid_volume.min(metrics.ask_volume) / row.min_side_volume).clamp(0.0, 1.0);
    20.0 + 10.0 * volume_fill.min(side_fill)
}

/// 30-40: how close the spread is to the allowed maximum
fn spread_confidence(spread_percent: f64, max_spread_percent: f64) -> f64 {
    let closeness = if spread_percent > 0.0 {
        (max_spread_percent / spread_percent).clamp(0.0, 1.0)
    } else {
        1.0
    };
    30.0 + 10.0 * closeness
}

/// 35-50: how far the imbalance got towards the directional threshold
fn balanced_confidence(ratio: f64, deviation: f64, row: &SignalThresholds) -> f64 {
    let required = if ratio >= 1.0 {
        row.min_buy_ratio - 1.0
    } else {
        1.0 / row.max_sell_ratio - 1.0
    };
    let progress = if required > 0.0 {
        (deviation / required).clamp(0.0, 1.0)
    } else {
        0.0
    };
    35.0 + 15.0 * progress
}

fn clamp_confidence(confidence: f64) -> u8 {
    confidence.round().clamp(0.0, 100.0) as u8
}
