//! Depth analysis data structures and types
//!
//! Input snapshot types plus every entity produced by the analyzer.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AnalyzerError, Result};

// ============================================================================
// Input
// ============================================================================

/// Single price level of the book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DepthLevel {
    pub price: Decimal,
    pub size: Decimal,
}

impl DepthLevel {
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }

    /// Quote-currency value resting at this level (price × size)
    ///
    /// `None` when the product exceeds the `Decimal` range.
    pub fn notional(&self) -> Option<Decimal> {
        self.price.checked_mul(self.size)
    }
}

/// Ranked bid/ask depth snapshot supplied by a feed
///
/// Bids are sorted descending (best bid first), asks ascending (best ask first).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DepthSnapshot {
    pub bids: Vec<DepthLevel>,
    pub asks: Vec<DepthLevel>,
    pub timestamp: DateTime<Utc>,
}

impl DepthSnapshot {
    pub fn new(bids: Vec<DepthLevel>, asks: Vec<DepthLevel>, timestamp: DateTime<Utc>) -> Self {
        Self {
            bids,
            asks,
            timestamp,
        }
    }

    /// Best bid level: highest-ranked bid with resting size
    pub fn best_bid(&self) -> Option<&DepthLevel> {
        self.touch(BookSide::Bid)
    }

    /// Best ask level: highest-ranked ask with resting size
    pub fn best_ask(&self) -> Option<&DepthLevel> {
        self.touch(BookSide::Ask)
    }

    /// First level of `side` with a positive size
    pub fn touch(&self, side: BookSide) -> Option<&DepthLevel> {
        self.side(side).iter().find(|level| level.size > Decimal::ZERO)
    }

    /// Levels of one side in rank order
    pub fn side(&self, side: BookSide) -> &[DepthLevel] {
        match side {
            BookSide::Bid => &self.bids,
            BookSide::Ask => &self.asks,
        }
    }

    /// Reject levels with a non-positive price or a negative size
    pub fn validate(&self) -> Result<()> {
        for side in [BookSide::Bid, BookSide::Ask] {
            if let Some(level) = self
                .side(side)
                .iter()
                .find(|level| level.price <= Decimal::ZERO || level.size.is_sign_negative())
            {
                return Err(AnalyzerError::InvalidLevel(format!(
                    "{} level at price {} with size {}",
                    side, level.price, level.size
                )));
            }
        }
        Ok(())
    }

    /// Sort both sides into rank order and drop empty levels
    ///
    /// For suppliers that cannot guarantee ordering (e.g. a map-backed book).
    pub fn normalized(mut self) -> Self {
        self.bids.retain(|level| !level.size.is_zero());
        self.asks.retain(|level| !level.size.is_zero());
        self.bids.sort_by(|a, b| b.price.cmp(&a.price));
        self.asks.sort_by(|a, b| a.price.cmp(&b.price));
        self
    }
}

/// Side of the order book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum BookSide {
    /// Resting buy orders (support)
    Bid,

    /// Resting sell orders (resistance)
    Ask,
}

impl fmt::Display for BookSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookSide::Bid => write!(f, "bid"),
            BookSide::Ask => write!(f, "ask"),
        }
    }
}

/// Direction of a hypothetical market order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Book side a market order of this direction consumes
    pub fn consumes(self) -> BookSide {
        match self {
            OrderSide::Buy => BookSide::Ask,
            OrderSide::Sell => BookSide::Bid,
        }
    }
}

// ============================================================================
// Metrics, walls, slippage
// ============================================================================

/// Current-snapshot metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Metrics {
    pub best_bid: Decimal,
    pub best_ask: Decimal,

    /// best_ask - best_bid (never negative)
    pub spread: Decimal,

    /// (best_bid + best_ask) / 2
    pub mid_price: Decimal,

    /// spread / mid_price * 100
    pub spread_percent: f64,

    /// Sum of top-N bid level sizes
    pub bid_volume: f64,

    /// Sum of top-N ask level sizes
    pub ask_volume: f64,

    pub total_volume: f64,

    /// bid_volume / ask_volume. >1 = more resting buy interest. 0 when asks are empty of size.
    pub volume_ratio: f64,
}

/// Price level holding an outsized share of its side's depth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Wall {
    pub price: Decimal,
    pub size: Decimal,
    pub side: BookSide,

    /// size / average level size on this side
    pub multiple_of_average: f64,
}

/// Detected walls, largest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WallDetection {
    pub bid_walls: Vec<Wall>,
    pub ask_walls: Vec<Wall>,
}

impl WallDetection {
    pub fn is_empty(&self) -> bool {
        self.bid_walls.is_empty() && self.ask_walls.is_empty()
    }
}

/// Book-walk estimate of a market order's average fill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SlippageEstimate {
    pub side: OrderSide,

    /// Requested quote-currency amount
    pub notional: Decimal,

    /// Quote amount actually matched (less than `notional` on a partial fill)
    pub filled_notional: Decimal,

    /// Base quantity acquired
    pub filled_quantity: Decimal,

    /// filled_notional / filled_quantity
    pub avg_fill_price: Decimal,

    /// Best ask for buys, best bid for sells
    pub reference_price: Decimal,

    /// Adverse deviation of avg_fill_price from reference_price, in percent
    pub slippage_percent: f64,

    /// Levels touched, including a partially consumed one
    pub levels_consumed: usize,

    /// True when the side did not hold enough depth for the whole notional
    pub partial_fill: bool,
}

// ============================================================================
// History and trend
// ============================================================================

/// Compact per-snapshot record kept in the rolling window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub total_volume: f64,
    pub bid_volume: f64,
    pub ask_volume: f64,
    pub spread_percent: f64,
}

impl HistoryEntry {
    pub fn from_metrics(metrics: &Metrics, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            total_volume: metrics.total_volume,
            bid_volume: metrics.bid_volume,
            ask_volume: metrics.ask_volume,
            spread_percent: metrics.spread_percent,
        }
    }
}

/// Means over the rolling window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HistoryAverages {
    pub total_volume: f64,
    pub bid_volume: f64,
    pub ask_volume: f64,
    pub spread_percent: f64,

    /// Entries averaged; 0 means the values came from the current metrics
    pub sample_count: usize,
}

/// Direction of a metric between the older and recent history halves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum TrendDirection {
    #[serde(rename = "subiendo")]
    Rising,
    #[serde(rename = "bajando")]
    Falling,
    #[serde(rename = "estable")]
    Stable,
}

impl TrendDirection {
    /// Classify a percentage change against a symmetric threshold
    pub fn from_change(change_percent: f64, threshold_percent: f64) -> Self {
        if change_percent > threshold_percent {
            Self::Rising
        } else if change_percent < -threshold_percent {
            Self::Falling
        } else {
            Self::Stable
        }
    }
}

/// Volume and spread trend over the rolling window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrendAnalysis {
    pub volume_trend: TrendDirection,
    pub spread_trend: TrendDirection,
    pub volume_change_percent: f64,
    pub spread_change_percent: f64,

    /// False when history was too short to compare (trend forced to stable)
    pub sufficient_data: bool,

    pub sample_count: usize,
}

impl TrendAnalysis {
    /// Flat trend reported when there is not enough history
    pub fn insufficient(sample_count: usize) -> Self {
        Self {
            volume_trend: TrendDirection::Stable,
            spread_trend: TrendDirection::Stable,
            volume_change_percent: 0.0,
            spread_change_percent: 0.0,
            sufficient_data: false,
            sample_count,
        }
    }
}

// ============================================================================
// Quality
// ============================================================================

/// Liquidity quality band
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub enum QualityLevel {
    #[serde(rename = "muy_pobre")]
    VeryPoor,
    #[serde(rename = "pobre")]
    Poor,
    #[serde(rename = "regular")]
    Fair,
    #[serde(rename = "buena")]
    Good,
    #[serde(rename = "excelente")]
    Excellent,
}

/// 0-100 liquidity quality score with its components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QualityScore {
    pub score: u8,
    pub level: QualityLevel,

    /// 0-40
    pub volume_score: u8,

    /// 0-30
    pub spread_score: u8,

    /// 0-20
    pub balance_score: u8,

    /// 0-10
    pub stability_score: u8,

    pub component_reasons: Vec<String>,
}

// ============================================================================
// Signal
// ============================================================================

/// Ordinal magnitude of bid/ask imbalance
///
/// Thresholds on the imbalance deviation:
/// - Balanced: < 0.1
/// - Slight: 0.1-0.3
/// - Moderate: 0.3-0.6
/// - Strong: 0.6-1.0
/// - Extreme: >= 1.0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub enum BalanceStrength {
    #[serde(rename = "equilibrado")]
    Balanced,
    #[serde(rename = "leve")]
    Slight,
    #[serde(rename = "moderado")]
    Moderate,
    #[serde(rename = "fuerte")]
    Strong,
    #[serde(rename = "extremo")]
    Extreme,
}

impl BalanceStrength {
    pub fn from_deviation(deviation: f64) -> Self {
        if deviation < 0.1 {
            Self::Balanced
        } else if deviation < 0.3 {
            Self::Slight
        } else if deviation < 0.6 {
            Self::Moderate
        } else if deviation < 1.0 {
            Self::Strong
        } else {
            Self::Extreme
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SignalType {
    Buy,
    Sell,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SignalStrength {
    Weak,
    Medium,
    Strong,
}

/// Trading signal derived from one snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TradingSignal {
    #[serde(rename = "type")]
    pub signal_type: SignalType,
    pub strength: SignalStrength,

    /// 0-100
    pub confidence: u8,

    pub reason: String,
    pub balance_strength: BalanceStrength,
}

// ============================================================================
// Result
// ============================================================================

/// Full analysis for one snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub metrics: Metrics,
    pub signal: TradingSignal,
    pub walls: WallDetection,
    pub quality: QualityScore,
    pub trend: TrendAnalysis,
    pub averages: HistoryAverages,
    pub slippage: Vec<SlippageEstimate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_normalized_sorts_and_drops_empty_levels() {
        let snapshot = DepthSnapshot::new(
            vec![
                DepthLevel::new(dec!(99), dec!(1)),
                DepthLevel::new(dec!(100), dec!(2)),
                DepthLevel::new(dec!(98), dec!(0)),
            ],
            vec![
                DepthLevel::new(dec!(102), dec!(1)),
                DepthLevel::new(dec!(101), dec!(3)),
            ],
            Utc::now(),
        )
        .normalized();

        assert_eq!(snapshot.bids.len(), 2);
        assert_eq!(snapshot.best_bid().unwrap().price, dec!(100));
        assert_eq!(snapshot.best_ask().unwrap().price, dec!(101));
        assert_eq!(snapshot.side(BookSide::Ask)[1].price, dec!(102));
    }

    #[test]
    fn test_validate_rejects_bad_levels() {
        let ok = DepthSnapshot::new(
            vec![DepthLevel::new(dec!(100), dec!(0))],
            vec![DepthLevel::new(dec!(101), dec!(1))],
            Utc::now(),
        );
        assert!(ok.validate().is_ok());

        let negative_size = DepthSnapshot::new(
            vec![DepthLevel::new(dec!(100), dec!(1))],
            vec![DepthLevel::new(dec!(101), dec!(-1))],
            Utc::now(),
        );
        assert!(matches!(
            negative_size.validate(),
            Err(AnalyzerError::InvalidLevel(msg)) if msg.starts_with("ask")
        ));
    }

    #[test]
    fn test_touch_skips_empty_levels() {
        let snapshot = DepthSnapshot::new(
            vec![
                DepthLevel::new(dec!(100), dec!(0)),
                DepthLevel::new(dec!(99), dec!(4)),
            ],
            vec![DepthLevel::new(dec!(101), dec!(0))],
            Utc::now(),
        );

        assert_eq!(snapshot.best_bid().unwrap().price, dec!(99));
        assert!(snapshot.best_ask().is_none());
    }

    #[test]
    fn test_notional_overflow_is_none() {
        assert_eq!(DepthLevel::new(dec!(100), dec!(2.5)).notional(), Some(dec!(250)));
        assert_eq!(DepthLevel::new(Decimal::MAX, dec!(2)).notional(), None);
    }

    #[test]
    fn test_balance_strength_bands() {
        assert_eq!(BalanceStrength::from_deviation(0.05), BalanceStrength::Balanced);
        assert_eq!(BalanceStrength::from_deviation(0.1), BalanceStrength::Slight);
        assert_eq!(BalanceStrength::from_deviation(0.45), BalanceStrength::Moderate);
        assert_eq!(BalanceStrength::from_deviation(0.6), BalanceStrength::Strong);
        assert_eq!(BalanceStrength::from_deviation(1.5), BalanceStrength::Extreme);
        assert!(BalanceStrength::Extreme > BalanceStrength::Strong);
    }

    #[test]
    fn test_trend_direction_thresholds() {
        assert_eq!(TrendDirection::from_change(6.0, 5.0), TrendDirection::Rising);
        assert_eq!(TrendDirection::from_change(-6.0, 5.0), TrendDirection::Falling);
        assert_eq!(TrendDirection::from_change(5.0, 5.0), TrendDirection::Stable);
    }

    #[test]
    fn test_labels_serialize_in_dashboard_vocabulary() {
        assert_eq!(
            serde_json::to_string(&TrendDirection::Rising).unwrap(),
            "\"subiendo\""
        );
        assert_eq!(
            serde_json::to_string(&QualityLevel::VeryPoor).unwrap(),
            "\"muy_pobre\""
        );
        assert_eq!(
            serde_json::to_string(&BalanceStrength::Strong).unwrap(),
            "\"fuerte\""
        );
        assert_eq!(serde_json::to_string(&SignalType::Buy).unwrap(), "\"buy\"");
    }

    #[test]
    fn test_analysis_result_schema_lists_sections() {
        let schema = schemars::schema_for!(AnalysisResult);
        let value = serde_json::to_value(&schema).unwrap();
        let properties = value["properties"].as_object().unwrap();

        for key in ["metrics", "signal", "walls", "quality", "trend", "averages", "slippage"] {
            assert!(properties.contains_key(key), "missing {}", key);
        }
    }
}
