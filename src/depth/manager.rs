//! Analyzer registry for tracking multiple symbols
//!
//! One [`DepthAnalyzer`] (and therefore one rolling history) per symbol,
//! created lazily on the first snapshot and bounded by `max_symbols`.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{AnalyzerConfig, SensitivityConfig};
use crate::depth::analyzer::DepthAnalyzer;
use crate::depth::types::{AnalysisResult, DepthSnapshot};
use crate::error::{AnalyzerError, Result};

/// Default maximum number of concurrently tracked symbols
pub const DEFAULT_MAX_SYMBOLS: usize = 20;

/// Outcome of the most recent cycle for a symbol
#[derive(Debug, Clone, PartialEq)]
pub enum LatestAnalysis {
    /// Result from the most recent snapshot
    Fresh(AnalysisResult),

    /// The most recent snapshot was discarded; this is the previous good result
    Stale {
        result: AnalysisResult,
        error: AnalyzerError,
    },

    /// No snapshot has been analyzed successfully yet
    Unavailable,
}

struct SymbolState {
    analyzer: DepthAnalyzer,
    last_error: Option<AnalyzerError>,
}

/// Registry of per-symbol analyzers
///
/// Each symbol's analyzer is mutated under the registry lock, so snapshots for
/// the same symbol arriving from several threads are serialized.
pub struct AnalyzerRegistry {
    states: Mutex<HashMap<String, SymbolState>>,
    config: AnalyzerConfig,
    max_symbols: usize,
}

impl AnalyzerRegistry {
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        Self::with_max_symbols(config, DEFAULT_MAX_SYMBOLS)
    }

    pub fn with_max_symbols(config: AnalyzerConfig, max_symbols: usize) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            states: Mutex::new(HashMap::new()),
            config,
            max_symbols,
        })
    }

    /// Analyze a snapshot for `symbol` (case-insensitive)
    ///
    /// On a discarded snapshot the error is returned and remembered so
    /// [`AnalyzerRegistry::latest`] can report the previous result as stale.
    pub fn analyze(
        &self,
        symbol: &str,
        snapshot: &DepthSnapshot,
        sensitivity: &SensitivityConfig,
    ) -> Result<AnalysisResult> {
        let symbol_upper = symbol.to_uppercase();
        let mut states = self.states.lock().map_err(|_| AnalyzerError::LockPoisoned)?;

        let tracked = states.len();
        let state = match states.entry(symbol_upper.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                if tracked >= self.max_symbols {
                    return Err(AnalyzerError::SymbolLimitReached(self.max_symbols));
                }

                info!(symbol = %symbol_upper, "Tracking new symbol");
                let analyzer =
                    DepthAnalyzer::new(self.config.clone())?.with_symbol(symbol_upper.clone());
                entry.insert(SymbolState {
                    analyzer,
                    last_error: None,
                })
            }
        };

        match state.analyzer.analyze(snapshot, sensitivity) {
            Ok(result) => {
                state.last_error = None;
                Ok(result)
            }
            Err(e) => {
                warn!(symbol = %symbol_upper, error = %e, "Snapshot discarded");
                state.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Latest analysis for a symbol, flagged stale when the last snapshot was discarded
    pub fn latest(&self, symbol: &str) -> Result<LatestAnalysis> {
        let symbol_upper = symbol.to_uppercase();
        let states = self.states.lock().map_err(|_| AnalyzerError::LockPoisoned)?;

        let Some(state) = states.get(&symbol_upper) else {
            return Ok(LatestAnalysis::Unavailable);
        };

        Ok(match (state.analyzer.last_result(), &state.last_error) {
            (Some(result), None) => LatestAnalysis::Fresh(result.clone()),
            (Some(result), Some(error)) => LatestAnalysis::Stale {
                result: result.clone(),
                error: error.clone(),
            },
            (None, _) => LatestAnalysis::Unavailable,
        })
    }

    /// Stop tracking a symbol, dropping its history
    pub fn remove(&self, symbol: &str) -> Result<bool> {
        let symbol_upper = symbol.to_uppercase();
        let mut states = self.states.lock().map_err(|_| AnalyzerError::LockPoisoned)?;
        let removed = states.remove(&symbol_upper).is_some();
        if removed {
            debug!(symbol = %symbol_upper, "Stopped tracking symbol");
        }
        Ok(removed)
    }

    /// Tracked symbols, sorted
    pub fn symbols(&self) -> Result<Vec<String>> {
        let states = self.states.lock().map_err(|_| AnalyzerError::LockPoisoned)?;
        let mut symbols: Vec<String> = states.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    /// Number of history entries currently held for a symbol
    pub fn history_len(&self, symbol: &str) -> Result<usize> {
        let states = self.states.lock().map_err(|_| AnalyzerError::LockPoisoned)?;
        Ok(states
            .get(&symbol.to_uppercase())
            .map(|state| state.analyzer.history().len())
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depth::types::DepthLevel;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn snapshot(offset_secs: i64) -> DepthSnapshot {
        DepthSnapshot::new(
            vec![DepthLevel::new(dec!(100), dec!(300))],
            vec![DepthLevel::new(dec!(100.01), dec!(300))],
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(offset_secs),
        )
    }

    fn crossed(offset_secs: i64) -> DepthSnapshot {
        let mut book = snapshot(offset_secs);
        book.bids[0].price = dec!(101);
        book
    }

    #[test]
    fn test_symbols_are_case_insensitive() {
        let registry = AnalyzerRegistry::new(AnalyzerConfig::default()).unwrap();
        let sensitivity = SensitivityConfig::default();

        registry.analyze("btcusdt", &snapshot(0), &sensitivity).unwrap();
        let result = registry.analyze("BTCUSDT", &snapshot(5), &sensitivity).unwrap();

        assert_eq!(result.symbol.as_deref(), Some("BTCUSDT"));
        assert_eq!(registry.symbols().unwrap(), vec!["BTCUSDT".to_string()]);
        assert_eq!(registry.history_len("BtcUsdt").unwrap(), 2);
    }

    #[test]
    fn test_symbol_limit() {
        let registry = AnalyzerRegistry::with_max_symbols(AnalyzerConfig::default(), 2).unwrap();
        let sensitivity = SensitivityConfig::default();

        registry.analyze("BTCUSDT", &snapshot(0), &sensitivity).unwrap();
        registry.analyze("ETHUSDT", &snapshot(0), &sensitivity).unwrap();
        assert_eq!(
            registry.analyze("SOLUSDT", &snapshot(0), &sensitivity),
            Err(AnalyzerError::SymbolLimitReached(2))
        );

        // Existing symbols keep working
        assert!(registry.analyze("ETHUSDT", &snapshot(5), &sensitivity).is_ok());

        assert!(registry.remove("BTCUSDT").unwrap());
        assert!(registry.analyze("SOLUSDT", &snapshot(0), &sensitivity).is_ok());
    }

    #[test]
    fn test_discarded_snapshot_surfaces_stale_result() {
        let registry = AnalyzerRegistry::new(AnalyzerConfig::default()).unwrap();
        let sensitivity = SensitivityConfig::default();

        assert_eq!(registry.latest("BTCUSDT").unwrap(), LatestAnalysis::Unavailable);

        let good = registry.analyze("BTCUSDT", &snapshot(0), &sensitivity).unwrap();
        assert_eq!(registry.latest("BTCUSDT").unwrap(), LatestAnalysis::Fresh(good.clone()));

        assert!(registry.analyze("BTCUSDT", &crossed(5), &sensitivity).is_err());
        match registry.latest("BTCUSDT").unwrap() {
            LatestAnalysis::Stale { result, error } => {
                assert_eq!(result, good);
                assert_eq!(error.error_type(), "crossed_book");
            }
            other => panic!("expected stale result, got {:?}", other),
        }

        // Next good snapshot clears the stale flag
        registry.analyze("BTCUSDT", &snapshot(10), &sensitivity).unwrap();
        assert!(matches!(
            registry.latest("BTCUSDT").unwrap(),
            LatestAnalysis::Fresh(_)
        ));
    }

    #[test]
    fn test_first_snapshot_discarded_is_unavailable() {
        let registry = AnalyzerRegistry::new(AnalyzerConfig::default()).unwrap();
        assert!(registry
            .analyze("BTCUSDT", &crossed(0), &SensitivityConfig::default())
            .is_err());
        assert_eq!(registry.latest("BTCUSDT").unwrap(), LatestAnalysis::Unavailable);
    }

    #[test]
    fn test_concurrent_feeds_share_one_history() {
        let registry = Arc::new(AnalyzerRegistry::new(AnalyzerConfig::default()).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    registry
                        .analyze("BTCUSDT", &snapshot(i * 10), &SensitivityConfig::default())
                        .map(|_| ())
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        let len = registry.history_len("BTCUSDT").unwrap();
        assert!((1..=8).contains(&len));
    }
}
