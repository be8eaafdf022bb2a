//! Snapshot metrics extraction
//!
//! Best bid/ask, spread (absolute and percent of mid), per-side volume over the
//! top N levels and the bid/ask volume ratio.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::warn;

use crate::depth::types::{BookSide, DepthLevel, DepthSnapshot, Metrics};
use crate::error::{AnalyzerError, Result};

/// Calculate current metrics for a snapshot
///
/// # Errors
/// * `InsufficientDepth` - either side has no level with resting size
/// * `InvalidLevel` - a level has a non-positive price or negative size, or a
///   side's volume exceeds the `Decimal` range
/// * `CrossedBook` - best bid above best ask
pub fn extract_metrics(snapshot: &DepthSnapshot, depth: usize) -> Result<Metrics> {
    for side in [BookSide::Bid, BookSide::Ask] {
        if snapshot.side(side).is_empty() {
            return Err(AnalyzerError::InsufficientDepth { side });
        }
    }

    snapshot.validate()?;

    let best_bid = snapshot
        .best_bid()
        .ok_or(AnalyzerError::InsufficientDepth { side: BookSide::Bid })?
        .price;
    let best_ask = snapshot
        .best_ask()
        .ok_or(AnalyzerError::InsufficientDepth { side: BookSide::Ask })?
        .price;

    if best_bid > best_ask {
        warn!(%best_bid, %best_ask, "Discarding crossed book snapshot");
        return Err(AnalyzerError::CrossedBook { best_bid, best_ask });
    }

    let spread = best_ask - best_bid;
    // bid + spread/2 stays within range where bid + ask may not
    let mid_price = best_bid + spread / Decimal::TWO;
    let spread_percent = calculate_spread_percent(spread, mid_price);

    let bid_volume = checked_side_volume(&snapshot.bids, depth, BookSide::Bid)?
        .to_f64()
        .unwrap_or(0.0);
    let ask_volume = checked_side_volume(&snapshot.asks, depth, BookSide::Ask)?
        .to_f64()
        .unwrap_or(0.0);

    let volume_ratio = if ask_volume > 0.0 {
        bid_volume / ask_volume
    } else {
        0.0
    };

    Ok(Metrics {
        best_bid,
        best_ask,
        spread,
        mid_price,
        spread_percent,
        bid_volume,
        ask_volume,
        total_volume: bid_volume + ask_volume,
        volume_ratio,
    })
}

/// Sum of sizes over the top `depth` levels
///
/// `None` when the sum exceeds the `Decimal` range.
pub fn side_volume(levels: &[DepthLevel], depth: usize) -> Option<Decimal> {
    levels
        .iter()
        .take(depth)
        .try_fold(Decimal::ZERO, |total, level| total.checked_add(level.size))
}

fn checked_side_volume(levels: &[DepthLevel], depth: usize, side: BookSide) -> Result<Decimal> {
    side_volume(levels, depth).ok_or_else(|| {
        AnalyzerError::InvalidLevel(format!("{} volume over top {} levels overflows", side, depth))
    })
}

/// Spread as a percentage of the mid price
///
/// Formula: spread / mid * 100
fn calculate_spread_percent(spread: Decimal, mid_price: Decimal) -> f64 {
    if mid_price.is_zero() {
        return 0.0;
    }

    (spread / mid_price * Decimal::ONE_HUNDRED)
        .to_f64()
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn level(price: Decimal, size: Decimal) -> DepthLevel {
        DepthLevel::new(price, size)
    }

    fn snapshot(bids: Vec<DepthLevel>, asks: Vec<DepthLevel>) -> DepthSnapshot {
        DepthSnapshot::new(bids, asks, Utc::now())
    }

    #[test]
    fn test_spread_percent_calculation() {
        let book = snapshot(
            vec![level(dec!(67650.00), dec!(1))],
            vec![level(dec!(67651.00), dec!(1))],
        );

        let metrics = extract_metrics(&book, 20).unwrap();
        assert_eq!(metrics.spread, dec!(1));
        assert_eq!(metrics.mid_price, dec!(67650.5));
        // Expected: 1 / 67650.5 * 100 = 0.001478 %
        assert!((metrics.spread_percent - 0.001478).abs() < 0.000001);
    }

    #[test]
    fn test_volumes_use_top_levels_only() {
        let bids = (0..5).map(|i| level(dec!(100) - Decimal::from(i), dec!(2))).collect();
        let asks = (0..5).map(|i| level(dec!(101) + Decimal::from(i), dec!(1))).collect();
        let book = snapshot(bids, asks);

        let metrics = extract_metrics(&book, 3).unwrap();
        assert_eq!(metrics.bid_volume, 6.0);
        assert_eq!(metrics.ask_volume, 3.0);
        assert_eq!(metrics.total_volume, 9.0);
        assert_eq!(metrics.volume_ratio, 2.0);
    }

    #[test]
    fn test_empty_side_is_insufficient_depth() {
        let book = snapshot(vec![level(dec!(100), dec!(1))], vec![]);
        assert_eq!(
            extract_metrics(&book, 20),
            Err(AnalyzerError::InsufficientDepth { side: BookSide::Ask })
        );

        let book = snapshot(vec![], vec![level(dec!(100), dec!(1))]);
        assert_eq!(
            extract_metrics(&book, 20),
            Err(AnalyzerError::InsufficientDepth { side: BookSide::Bid })
        );
    }

    #[test]
    fn test_crossed_book_is_rejected() {
        let book = snapshot(
            vec![level(dec!(101), dec!(1))],
            vec![level(dec!(100), dec!(1))],
        );
        assert_eq!(
            extract_metrics(&book, 20),
            Err(AnalyzerError::CrossedBook {
                best_bid: dec!(101),
                best_ask: dec!(100),
            })
        );
    }

    #[test]
    fn test_locked_book_has_zero_spread() {
        let book = snapshot(
            vec![level(dec!(100), dec!(1))],
            vec![level(dec!(100), dec!(1))],
        );
        let metrics = extract_metrics(&book, 20).unwrap();
        assert_eq!(metrics.spread, Decimal::ZERO);
        assert_eq!(metrics.spread_percent, 0.0);
    }

    #[test]
    fn test_invalid_level_is_rejected() {
        let book = snapshot(
            vec![level(dec!(100), dec!(1)), level(dec!(0), dec!(1))],
            vec![level(dec!(101), dec!(1))],
        );
        assert!(matches!(
            extract_metrics(&book, 20),
            Err(AnalyzerError::InvalidLevel(_))
        ));
    }

    #[test]
    fn test_empty_touch_level_is_skipped() {
        let book = snapshot(
            vec![level(dec!(100.5), dec!(0)), level(dec!(100), dec!(5))],
            vec![level(dec!(100.2), dec!(0)), level(dec!(101), dec!(2))],
        );
        let metrics = extract_metrics(&book, 20).unwrap();
        assert_eq!(metrics.best_bid, dec!(100));
        assert_eq!(metrics.best_ask, dec!(101));
        assert_eq!(metrics.spread, dec!(1));
    }

    #[test]
    fn test_side_without_resting_size_is_insufficient_depth() {
        let book = snapshot(
            vec![level(dec!(100), dec!(5))],
            vec![level(dec!(101), dec!(0))],
        );
        assert_eq!(
            extract_metrics(&book, 20),
            Err(AnalyzerError::InsufficientDepth { side: BookSide::Ask })
        );
    }

    #[test]
    fn test_volume_overflow_is_invalid_level() {
        let book = snapshot(
            vec![level(dec!(100), Decimal::MAX), level(dec!(99), Decimal::MAX)],
            vec![level(dec!(101), dec!(1))],
        );
        assert!(matches!(
            extract_metrics(&book, 20),
            Err(AnalyzerError::InvalidLevel(msg)) if msg.starts_with("bid volume")
        ));
        assert_eq!(side_volume(&book.bids, 20), None);
        assert_eq!(side_volume(&book.bids, 1), Some(Decimal::MAX));
    }

    #[test]
    fn test_extreme_prices_do_not_overflow_mid() {
        let book = snapshot(
            vec![level(Decimal::MAX - dec!(10), dec!(1))],
            vec![level(Decimal::MAX, dec!(1))],
        );
        let metrics = extract_metrics(&book, 20).unwrap();
        assert_eq!(metrics.spread, dec!(10));
        assert!(metrics.mid_price < Decimal::MAX);
    }
}
