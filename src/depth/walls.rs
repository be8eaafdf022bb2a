//! Wall detection
//!
//! A wall is a level whose size exceeds `wall_multiplier` times the average
//! level size of its own side (top N levels).

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::depth::metrics::side_volume;
use crate::depth::types::{BookSide, DepthLevel, DepthSnapshot, Wall, WallDetection};

/// Detect bid and ask walls
///
/// Each side keeps at most `max_walls` walls, largest first.
pub fn detect_walls(
    snapshot: &DepthSnapshot,
    depth: usize,
    wall_multiplier: f64,
    max_walls: usize,
) -> WallDetection {
    WallDetection {
        bid_walls: detect_side_walls(&snapshot.bids, BookSide::Bid, depth, wall_multiplier, max_walls),
        ask_walls: detect_side_walls(&snapshot.asks, BookSide::Ask, depth, wall_multiplier, max_walls),
    }
}

fn detect_side_walls(
    levels: &[DepthLevel],
    side: BookSide,
    depth: usize,
    wall_multiplier: f64,
    max_walls: usize,
) -> Vec<Wall> {
    let top = &levels[..levels.len().min(depth)];
    if top.is_empty() {
        return Vec::new();
    }

    // An overflowing side has no meaningful average
    let Some(total_size) = side_volume(top, depth) else {
        return Vec::new();
    };
    let avg_size = (total_size / Decimal::from(top.len()))
        .to_f64()
        .unwrap_or(0.0);
    if avg_size <= 0.0 {
        return Vec::new();
    }

    let threshold = avg_size * wall_multiplier;

    let mut walls: Vec<Wall> = top
        .iter()
        .filter_map(|level| {
            let size = level.size.to_f64()?;
            if size > threshold {
                Some(Wall {
                    price: level.price,
                    size: level.size,
                    side,
                    multiple_of_average: size / avg_size,
                })
            } else {
                None
            }
        })
        .collect();

    walls.sort_by(|a, b| b.size.cmp(&a.size));
    walls.truncate(max_walls);
    walls
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    /// Ten bid levels averaging `avg` in size, with `wall` placed at rank 5
    fn bids_with_wall(wall: Decimal, avg: Decimal) -> Vec<DepthLevel> {
        let filler = (avg * dec!(10) - wall) / dec!(9);
        (0..10)
            .map(|i| {
                let price = dec!(67650) - Decimal::from(i);
                let size = if i == 5 { wall } else { filler };
                DepthLevel::new(price, size)
            })
            .collect()
    }

    fn flat_asks() -> Vec<DepthLevel> {
        (0..10)
            .map(|i| DepthLevel::new(dec!(67651) + Decimal::from(i), dec!(1)))
            .collect()
    }

    #[test]
    fn test_wall_above_multiplier_is_detected() {
        let book = DepthSnapshot::new(bids_with_wall(dec!(45), dec!(10)), flat_asks(), Utc::now());

        let walls = detect_walls(&book, 20, 4.0, 3);
        assert_eq!(walls.bid_walls.len(), 1);
        assert_eq!(walls.bid_walls[0].size, dec!(45));
        assert_eq!(walls.bid_walls[0].side, BookSide::Bid);
        assert!((walls.bid_walls[0].multiple_of_average - 4.5).abs() < 1e-9);
        assert!(walls.ask_walls.is_empty());
    }

    #[test]
    fn test_level_below_multiplier_is_not_a_wall() {
        let book = DepthSnapshot::new(bids_with_wall(dec!(35), dec!(10)), flat_asks(), Utc::now());

        let walls = detect_walls(&book, 20, 4.0, 3);
        assert!(walls.is_empty());
    }

    #[test]
    fn test_walls_are_capped_and_sorted_by_size() {
        let mut asks: Vec<DepthLevel> = (0..20)
            .map(|i| DepthLevel::new(dec!(101) + Decimal::from(i), dec!(1)))
            .collect();
        asks[2].size = dec!(30);
        asks[7].size = dec!(50);
        asks[11].size = dec!(40);
        asks[15].size = dec!(35);

        let book = DepthSnapshot::new(vec![DepthLevel::new(dec!(100), dec!(1))], asks, Utc::now());

        let walls = detect_walls(&book, 20, 3.0, 3);
        let sizes: Vec<Decimal> = walls.ask_walls.iter().map(|w| w.size).collect();
        assert_eq!(sizes, vec![dec!(50), dec!(40), dec!(35)]);
    }

    #[test]
    fn test_overflowing_side_reports_no_walls() {
        let book = DepthSnapshot::new(
            vec![
                DepthLevel::new(dec!(100), Decimal::MAX),
                DepthLevel::new(dec!(99), Decimal::MAX),
            ],
            flat_asks(),
            Utc::now(),
        );
        let walls = detect_walls(&book, 20, 4.0, 3);
        assert!(walls.bid_walls.is_empty());
        assert!(walls.ask_walls.is_empty());
    }

    #[test]
    fn test_single_level_side_has_no_walls() {
        let book = DepthSnapshot::new(
            vec![DepthLevel::new(dec!(100), dec!(500))],
            vec![DepthLevel::new(dec!(101), dec!(1))],
            Utc::now(),
        );
        assert!(detect_walls(&book, 20, 4.0, 3).is_empty());
    }
}
