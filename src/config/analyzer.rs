//! Analyzer Configuration
//!
//! Tunables for depth analysis: wall detection, history window, slippage
//! ladder, quality bands and default sensitivity.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::config::sensitivity::{SensitivityConfig, SensitivityLevel};
use crate::depth::types::QualityLevel;
use crate::error::{AnalyzerError, Result};

/// Upper bound for the history window and spacing (one day)
pub const MAX_HISTORY_SECS: i64 = 86_400;

/// Analyzer configuration
///
/// ## Environment Variables
///
/// - `ANALYZER_DEPTH_LEVELS`: Levels per side used for volumes and walls (default: 20)
/// - `ANALYZER_WALL_MULTIPLIER`: Wall threshold as a multiple of average level size (default: 4.0)
/// - `ANALYZER_MAX_WALLS`: Walls reported per side (default: 3)
/// - `ANALYZER_HISTORY_WINDOW_SECS`: Rolling history window (default: 300)
/// - `ANALYZER_HISTORY_MIN_SPACING_SECS`: Minimum spacing between history entries (default: 2)
/// - `ANALYZER_SLIPPAGE_NOTIONALS`: Comma-separated quote amounts (default: 10000,25000,50000)
/// - `ANALYZER_SIGNAL_SENSITIVITY`: 1-5 (default: 3)
/// - `ANALYZER_LIQUIDITY_SENSITIVITY`: 1-5 (default: 3)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub analysis_depth: usize,
    pub wall_multiplier: f64,
    pub max_walls_per_side: usize,
    pub history_window_secs: i64,
    pub history_min_spacing_secs: i64,
    pub slippage_notionals: Vec<Decimal>,
    pub sensitivity: SensitivityConfig,
    pub quality_bands: QualityBands,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            analysis_depth: 20,
            wall_multiplier: 4.0,
            max_walls_per_side: 3,
            history_window_secs: 300,
            history_min_spacing_secs: 2,
            slippage_notionals: vec![dec!(10000), dec!(25000), dec!(50000)],
            sensitivity: SensitivityConfig::default(),
            quality_bands: QualityBands::default(),
        }
    }
}

impl AnalyzerConfig {
    /// Load configuration from environment variables, falling back to defaults
    ///
    /// # Errors
    ///
    /// Returns `AnalyzerError::Config` for unparsable values or when the
    /// resulting configuration fails [`AnalyzerConfig::validate`].
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let slippage_notionals = match std::env::var("ANALYZER_SLIPPAGE_NOTIONALS") {
            Ok(raw) => parse_notionals(&raw)?,
            Err(_) => defaults.slippage_notionals,
        };

        let signal: u8 = env_or("ANALYZER_SIGNAL_SENSITIVITY", 3)?;
        let liquidity: u8 = env_or("ANALYZER_LIQUIDITY_SENSITIVITY", 3)?;

        let config = Self {
            analysis_depth: env_or("ANALYZER_DEPTH_LEVELS", defaults.analysis_depth)?,
            wall_multiplier: env_or("ANALYZER_WALL_MULTIPLIER", defaults.wall_multiplier)?,
            max_walls_per_side: env_or("ANALYZER_MAX_WALLS", defaults.max_walls_per_side)?,
            history_window_secs: env_or(
                "ANALYZER_HISTORY_WINDOW_SECS",
                defaults.history_window_secs,
            )?,
            history_min_spacing_secs: env_or(
                "ANALYZER_HISTORY_MIN_SPACING_SECS",
                defaults.history_min_spacing_secs,
            )?,
            slippage_notionals,
            sensitivity: SensitivityConfig::from_levels(signal, liquidity)?,
            quality_bands: defaults.quality_bands,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges and cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.analysis_depth == 0 {
            return Err(AnalyzerError::Config(
                "analysis_depth must be at least 1".to_string(),
            ));
        }

        if !(self.wall_multiplier > 1.0) {
            return Err(AnalyzerError::Config(format!(
                "wall_multiplier must be greater than 1.0, got {}",
                self.wall_multiplier
            )));
        }

        if self.history_min_spacing_secs < 0 {
            return Err(AnalyzerError::Config(format!(
                "history_min_spacing_secs must not be negative, got {}",
                self.history_min_spacing_secs
            )));
        }

        if self.history_window_secs > MAX_HISTORY_SECS {
            return Err(AnalyzerError::Config(format!(
                "history_window_secs must be at most {}, got {}",
                MAX_HISTORY_SECS, self.history_window_secs
            )));
        }

        if self.history_window_secs <= self.history_min_spacing_secs {
            return Err(AnalyzerError::Config(format!(
                "history_window_secs ({}) must exceed history_min_spacing_secs ({})",
                self.history_window_secs, self.history_min_spacing_secs
            )));
        }

        if let Some(bad) = self.slippage_notionals.iter().find(|n| !n.is_sign_positive() || n.is_zero()) {
            return Err(AnalyzerError::InvalidNotional(*bad));
        }

        self.quality_bands.validate()
    }
}

/// Lower score bounds of each quality level
///
/// Band edges are a tuning choice. They must stay strictly descending so the
/// five levels cover 0-100 without overlap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityBands {
    pub excellent: u8,
    pub good: u8,
    pub fair: u8,
    pub poor: u8,
}

impl Default for QualityBands {
    fn default() -> Self {
        Self {
            excellent: 85,
            good: 70,
            fair: 50,
            poor: 30,
        }
    }
}

impl QualityBands {
    pub fn validate(&self) -> Result<()> {
        let ordered = self.excellent <= 100
            && self.excellent > self.good
            && self.good > self.fair
            && self.fair > self.poor
            && self.poor > 0;

        if ordered {
            Ok(())
        } else {
            Err(AnalyzerError::Config(format!(
                "quality bands must satisfy 100 >= excellent > good > fair > poor > 0, got {:?}",
                self
            )))
        }
    }

    /// Map a 0-100 score onto its level
    pub fn classify(&self, score: u8) -> QualityLevel {
        match score {
            s if s >= self.excellent => QualityLevel::Excellent,
            s if s >= self.good => QualityLevel::Good,
            s if s >= self.fair => QualityLevel::Fair,
            s if s >= self.poor => QualityLevel::Poor,
            _ => QualityLevel::VeryPoor,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AnalyzerError::Config(format!("{} has an invalid value: {:?}", key, raw))),
        Err(_) => Ok(default),
    }
}

fn parse_notionals(raw: &str) -> Result<Vec<Decimal>> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            Decimal::from_str(part).map_err(|_| {
                AnalyzerError::Config(format!("invalid slippage notional: {:?}", part))
            })
        })
        .collect()
}
