//! Configuration Management
//!
//! Analyzer tunables and the sensitivity threshold tables.

pub mod analyzer;
pub mod sensitivity;

// Re-export
pub use analyzer::{AnalyzerConfig, QualityBands, MAX_HISTORY_SECS};
pub use sensitivity::{
    LiquidityThresholds, SensitivityConfig, SensitivityLevel, SignalThresholds,
};
