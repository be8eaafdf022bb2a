use rust_decimal::Decimal;
use thiserror::Error;

use crate::depth::types::BookSide;

/// Errors raised while analyzing a depth snapshot
///
/// `InsufficientDepth` and `CrossedBook` mean "no result this cycle": callers
/// must not substitute a default neutral signal for them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyzerError {
    #[error("Insufficient depth: {side} side of the book is empty")]
    InsufficientDepth { side: BookSide },

    #[error("Crossed book: best bid {best_bid} is above best ask {best_ask}")]
    CrossedBook { best_bid: Decimal, best_ask: Decimal },

    #[error("Invalid level: {0}")]
    InvalidLevel(String),

    #[error("Invalid notional amount: {0} (must be positive)")]
    InvalidNotional(Decimal),

    #[error("Invalid sensitivity level: {0} (must be between 1 and 5)")]
    InvalidSensitivity(u8),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Symbol limit reached: cannot track more than {0} symbols")]
    SymbolLimitReached(usize),

    #[error("History lock poisoned")]
    LockPoisoned,
}

impl AnalyzerError {
    /// Whether the snapshot was rejected outright (no analysis for this cycle)
    pub fn is_discarded_snapshot(&self) -> bool {
        matches!(
            self,
            AnalyzerError::InsufficientDepth { .. }
                | AnalyzerError::CrossedBook { .. }
                | AnalyzerError::InvalidLevel(_)
        )
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            AnalyzerError::InsufficientDepth { .. } => "insufficient_depth",
            AnalyzerError::CrossedBook { .. } => "crossed_book",
            AnalyzerError::InvalidLevel(_) => "invalid_level",
            AnalyzerError::InvalidNotional(_) => "invalid_notional",
            AnalyzerError::InvalidSensitivity(_) => "invalid_sensitivity",
            AnalyzerError::Config(_) => "config",
            AnalyzerError::SymbolLimitReached(_) => "symbol_limit",
            AnalyzerError::LockPoisoned => "lock_poisoned",
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
