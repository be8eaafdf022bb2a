//! Order book depth analysis
//!
//! Derives from each ranked depth snapshot:
//! - Metrics (best bid/ask, spread, per-side volume, bid/ask ratio)
//! - Walls (levels far larger than their side's average)
//! - Book-walk slippage estimates for a ladder of notionals
//! - Rolling history averages and volume/spread trend
//! - Liquidity quality score (0-100)
//! - Buy/sell/neutral signal gated by configurable sensitivity
//!
//! Architecture: pure per-snapshot pipeline plus one rolling history per symbol
//! - `analyze_snapshot` is the pure entry point over a caller-owned history
//! - `DepthAnalyzer` owns a history and remembers the last good result
//! - `AnalyzerRegistry` tracks up to 20 symbols behind a lock

pub mod types;

pub mod metrics;

pub mod walls;

pub mod slippage;

pub mod history;

pub mod quality;

pub mod signal;

pub mod analyzer;

pub mod manager;

pub use types::{
    AnalysisResult, BalanceStrength, BookSide, DepthLevel, DepthSnapshot, HistoryAverages,
    HistoryEntry, Metrics, OrderSide, QualityLevel, QualityScore, SignalStrength, SignalType,
    SlippageEstimate, TradingSignal, TrendAnalysis, TrendDirection, Wall, WallDetection,
};

pub use analyzer::{analyze_snapshot, DepthAnalyzer};

pub use history::{HistoryStore, SharedHistoryStore};

pub use manager::{AnalyzerRegistry, LatestAnalysis};

pub use metrics::extract_metrics;

pub use quality::score_quality;

pub use signal::generate_signal;

pub use slippage::{estimate_slippage, estimate_slippage_ladder};

pub use walls::detect_walls;
