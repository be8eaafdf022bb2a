//! Sensitivity levels and their threshold tables
//!
//! Both tables are indexed by [`SensitivityLevel`]; a higher level is stricter
//! on every column. The numbers are hand-tuned operating points.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::depth::types::BalanceStrength;
use crate::error::AnalyzerError;

/// Ordinal 1-5 strictness setting
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum SensitivityLevel {
    VeryLow = 1,
    Low = 2,
    #[default]
    Normal = 3,
    High = 4,
    VeryHigh = 5,
}

impl SensitivityLevel {
    pub const ALL: [SensitivityLevel; 5] = [
        SensitivityLevel::VeryLow,
        SensitivityLevel::Low,
        SensitivityLevel::Normal,
        SensitivityLevel::High,
        SensitivityLevel::VeryHigh,
    ];

    /// Zero-based row in the threshold tables
    pub fn index(self) -> usize {
        self as usize - 1
    }

    pub fn signal_thresholds(self) -> &'static SignalThresholds {
        &SIGNAL_THRESHOLDS[self.index()]
    }

    pub fn liquidity_thresholds(self) -> &'static LiquidityThresholds {
        &LIQUIDITY_THRESHOLDS[self.index()]
    }
}

impl TryFrom<u8> for SensitivityLevel {
    type Error = AnalyzerError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(SensitivityLevel::VeryLow),
            2 => Ok(SensitivityLevel::Low),
            3 => Ok(SensitivityLevel::Normal),
            4 => Ok(SensitivityLevel::High),
            5 => Ok(SensitivityLevel::VeryHigh),
            other => Err(AnalyzerError::InvalidSensitivity(other)),
        }
    }
}

impl From<SensitivityLevel> for u8 {
    fn from(level: SensitivityLevel) -> Self {
        level as u8
    }
}

impl fmt::Display for SensitivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u8)
    }
}

/// Caller-owned sensitivity pair, fixed for one analysis call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensitivityConfig {
    /// How strict the buy/sell decision is
    pub signal_sensitivity: SensitivityLevel,

    /// How much liquidity is required before a signal is trusted
    pub liquidity_sensitivity: SensitivityLevel,
}

impl SensitivityConfig {
    pub fn new(signal_sensitivity: SensitivityLevel, liquidity_sensitivity: SensitivityLevel) -> Self {
        Self {
            signal_sensitivity,
            liquidity_sensitivity,
        }
    }

    /// Build from raw 1-5 values
    pub fn from_levels(signal: u8, liquidity: u8) -> Result<Self, AnalyzerError> {
        Ok(Self::new(signal.try_into()?, liquidity.try_into()?))
    }
}

/// One row of the signal table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalThresholds {
    /// Volume ratio must exceed this for a buy
    pub min_buy_ratio: f64,

    /// Volume ratio must fall below this for a sell
    pub max_sell_ratio: f64,

    /// Spread percent must be below this for any directional signal
    pub max_spread_percent: f64,

    /// Minimum imbalance magnitude for a directional signal
    pub min_balance: BalanceStrength,
}

/// One row of the liquidity table; a snapshot must clear every column
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiquidityThresholds {
    /// Both bid and ask volume must reach this
    pub min_side_volume: f64,

    pub max_spread_percent: f64,

    pub min_total_volume: f64,
}

pub const SIGNAL_THRESHOLDS: [SignalThresholds; 5] = [
    SignalThresholds {
        min_buy_ratio: 1.2,
        max_sell_ratio: 0.83,
        max_spread_percent: 0.10,
        min_balance: BalanceStrength::Slight,
    },
    SignalThresholds {
        min_buy_ratio: 1.5,
        max_sell_ratio: 0.67,
        max_spread_percent: 0.08,
        min_balance: BalanceStrength::Moderate,
    },
    SignalThresholds {
        min_buy_ratio: 2.0,
        max_sell_ratio: 0.5,
        max_spread_percent: 0.05,
        min_balance: BalanceStrength::Strong,
    },
    SignalThresholds {
        min_buy_ratio: 2.5,
        max_sell_ratio: 0.4,
        max_spread_percent: 0.03,
        min_balance: BalanceStrength::Extreme,
    },
    SignalThresholds {
        min_buy_ratio: 3.0,
        max_sell_ratio: 0.33,
        max_spread_percent: 0.02,
        min_balance: BalanceStrength::Extreme,
    },
];

pub const LIQUIDITY_THRESHOLDS: [LiquidityThresholds; 5] = [
    LiquidityThresholds {
        min_side_volume: 25.0,
        max_spread_percent: 0.20,
        min_total_volume: 60.0,
    },
    LiquidityThresholds {
        min_side_volume: 50.0,
        max_spread_percent: 0.15,
        min_total_volume: 120.0,
    },
    LiquidityThresholds {
        min_side_volume: 100.0,
        max_spread_percent: 0.10,
        min_total_volume: 250.0,
    },
    LiquidityThresholds {
        min_side_volume: 200.0,
        max_spread_percent: 0.07,
        min_total_volume: 500.0,
    },
    LiquidityThresholds {
        min_side_volume: 400.0,
        max_spread_percent: 0.05,
        min_total_volume: 1000.0,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_from_rejects_out_of_range() {
        assert_eq!(SensitivityLevel::try_from(3).unwrap(), SensitivityLevel::Normal);
        assert_eq!(
            SensitivityLevel::try_from(0),
            Err(AnalyzerError::InvalidSensitivity(0))
        );
        assert_eq!(
            SensitivityLevel::try_from(6),
            Err(AnalyzerError::InvalidSensitivity(6))
        );
    }

    #[test]
    fn test_signal_table_is_monotonically_stricter() {
        for pair in SensitivityLevel::ALL.windows(2) {
            let looser = pair[0].signal_thresholds();
            let stricter = pair[1].signal_thresholds();
            assert!(stricter.min_buy_ratio > looser.min_buy_ratio);
            assert!(stricter.max_sell_ratio < looser.max_sell_ratio);
            assert!(stricter.max_spread_percent < looser.max_spread_percent);
            assert!(stricter.min_balance >= looser.min_balance);
        }
    }

    #[test]
    fn test_liquidity_table_is_monotonically_stricter() {
        for pair in SensitivityLevel::ALL.windows(2) {
            let looser = pair[0].liquidity_thresholds();
            let stricter = pair[1].liquidity_thresholds();
            assert!(stricter.min_side_volume > looser.min_side_volume);
            assert!(stricter.max_spread_percent < looser.max_spread_percent);
            assert!(stricter.min_total_volume > looser.min_total_volume);
        }
    }

    #[test]
    fn test_sell_threshold_mirrors_buy_threshold() {
        // Sell ratio is roughly the reciprocal of the buy ratio on every row
        for level in SensitivityLevel::ALL {
            let row = level.signal_thresholds();
            assert!((row.min_buy_ratio * row.max_sell_ratio - 1.0).abs() < 0.02);
        }
    }

    #[test]
    fn test_serde_uses_numeric_levels() {
        let config: SensitivityConfig =
            serde_json::from_str(r#"{"signal_sensitivity":5,"liquidity_sensitivity":1}"#).unwrap();
        assert_eq!(config.signal_sensitivity, SensitivityLevel::VeryHigh);
        assert_eq!(config.liquidity_sensitivity, SensitivityLevel::VeryLow);

        assert!(serde_json::from_str::<SensitivityConfig>(
            r#"{"signal_sensitivity":9,"liquidity_sensitivity":1}"#
        )
        .is_err());
    }
}
