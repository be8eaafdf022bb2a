//! Per-snapshot analysis pipeline
//!
//! metrics → walls + slippage + history append → trend → quality → signal

use tracing::{debug, warn};

use crate::config::{AnalyzerConfig, SensitivityConfig};
use crate::depth::history::HistoryStore;
use crate::depth::metrics::extract_metrics;
use crate::depth::quality::score_quality;
use crate::depth::signal::generate_signal;
use crate::depth::slippage::estimate_slippage_ladder;
use crate::depth::types::{AnalysisResult, DepthSnapshot, HistoryEntry};
use crate::depth::walls::detect_walls;
use crate::error::Result;

/// Analyze one snapshot against a caller-owned history
///
/// The only side effect is the history append. On error the history is left
/// untouched and no result exists for this cycle.
///
/// # Errors
/// * `InsufficientDepth` - either side empty
/// * `InvalidLevel` - non-positive price or negative size
/// * `CrossedBook` - best bid above best ask
pub fn analyze_snapshot(
    snapshot: &DepthSnapshot,
    history: &mut HistoryStore,
    sensitivity: &SensitivityConfig,
    config: &AnalyzerConfig,
) -> Result<AnalysisResult> {
    let metrics = extract_metrics(snapshot, config.analysis_depth)?;

    let walls = detect_walls(
        snapshot,
        config.analysis_depth,
        config.wall_multiplier,
        config.max_walls_per_side,
    );

    let slippage = match estimate_slippage_ladder(snapshot, &config.slippage_notionals) {
        Ok(estimates) => estimates,
        Err(e) => {
            warn!(error = %e, "Skipping slippage estimates for this snapshot");
            Vec::new()
        }
    };

    history.append(HistoryEntry::from_metrics(&metrics, snapshot.timestamp));
    let averages = history.average(None, &metrics);
    let trend = history.trend();

    let quality = score_quality(&metrics, &trend, &config.quality_bands);
    let signal = generate_signal(&metrics, sensitivity);

    debug!(
        spread_percent = metrics.spread_percent,
        volume_ratio = metrics.volume_ratio,
        quality = quality.score,
        history_len = history.len(),
        "Analyzed depth snapshot"
    );

    Ok(AnalysisResult {
        symbol: None,
        timestamp: snapshot.timestamp,
        metrics,
        signal,
        walls,
        quality,
        trend,
        averages,
        slippage,
    })
}

/// Analyzer for a single symbol, owning its rolling history
///
/// Keeps the last successful result so a discarded snapshot can be surfaced
/// as stale data instead of a fabricated neutral signal.
#[derive(Debug, Clone)]
pub struct DepthAnalyzer {
    config: AnalyzerConfig,
    history: HistoryStore,
    symbol: Option<String>,
    last_result: Option<AnalysisResult>,
}

impl DepthAnalyzer {
    /// Create an analyzer after validating the configuration
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            history: HistoryStore::from_config(&config),
            config,
            symbol: None,
            last_result: None,
        })
    }

    pub fn with_defaults() -> Self {
        let config = AnalyzerConfig::default();
        Self {
            history: HistoryStore::from_config(&config),
            config,
            symbol: None,
            last_result: None,
        }
    }

    /// Tag results with a symbol
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    /// Analyze a snapshot with explicit sensitivity
    pub fn analyze(
        &mut self,
        snapshot: &DepthSnapshot,
        sensitivity: &SensitivityConfig,
    ) -> Result<AnalysisResult> {
        let mut result = analyze_snapshot(snapshot, &mut self.history, sensitivity, &self.config)?;
        result.symbol = self.symbol.clone();
        self.last_result = Some(result.clone());
        Ok(result)
    }

    /// Analyze a snapshot with the configured default sensitivity
    pub fn analyze_default(&mut self, snapshot: &DepthSnapshot) -> Result<AnalysisResult> {
        let sensitivity = self.config.sensitivity;
        self.analyze(snapshot, &sensitivity)
    }

    /// Last successful analysis, if any
    pub fn last_result(&self) -> Option<&AnalysisResult> {
        self.last_result.as_ref()
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    /// Drop history and the cached result (e.g. after a feed reconnect)
    pub fn reset(&mut self) {
        self.history.clear();
        self.last_result = None;
    }
}
