//! Rolling metrics history
//!
//! Time-bounded window of compact metric records used for averages and
//! volume/spread trend classification.
//!
//! - **Window**: entries older than `window` relative to the newest append are pruned
//! - **Spacing**: an entry arriving less than `min_spacing` after the newest
//!   stored entry is dropped, so a fast feed cannot flood the window
//! - **Trend**: most recent 10 entries vs the 10 before them; needs 20 entries

use chrono::Duration;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::config::analyzer::MAX_HISTORY_SECS;
use crate::config::AnalyzerConfig;
use crate::depth::types::{HistoryAverages, HistoryEntry, Metrics, TrendAnalysis, TrendDirection};
use crate::error::{AnalyzerError, Result};

/// Entries per trend segment
const TREND_SEGMENT_LEN: usize = 10;

/// Entries required before a trend is reported
const MIN_TREND_ENTRIES: usize = TREND_SEGMENT_LEN * 2;

/// Volume change (percent) beyond which the volume trend is rising/falling
const VOLUME_TREND_THRESHOLD_PCT: f64 = 5.0;

/// Spread change (percent) beyond which the spread trend is rising/falling
const SPREAD_TREND_THRESHOLD_PCT: f64 = 10.0;

/// Single-writer rolling window of metric records for one symbol
#[derive(Debug, Clone)]
pub struct HistoryStore {
    entries: VecDeque<HistoryEntry>,
    window: Duration,
    min_spacing: Duration,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(Duration::seconds(300), Duration::seconds(2))
    }
}

impl HistoryStore {
    pub fn new(window: Duration, min_spacing: Duration) -> Self {
        Self {
            entries: VecDeque::new(),
            window,
            min_spacing,
        }
    }

    /// Build from config, clamping both durations to `0..=MAX_HISTORY_SECS`
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self::new(
            Duration::seconds(config.history_window_secs.clamp(0, MAX_HISTORY_SECS)),
            Duration::seconds(config.history_min_spacing_secs.clamp(0, MAX_HISTORY_SECS)),
        )
    }

    /// Append an entry, then prune everything outside the window
    ///
    /// Returns `false` (and stores nothing) when the newest stored entry is
    /// less than `min_spacing` older than `entry`, including out-of-order
    /// timestamps.
    pub fn append(&mut self, entry: HistoryEntry) -> bool {
        if let Some(latest) = self.entries.back() {
            let gap = entry.timestamp - latest.timestamp;
            if gap < self.min_spacing {
                debug!(
                    gap_ms = gap.num_milliseconds(),
                    "Skipping history entry inside minimum spacing"
                );
                return false;
            }
        }

        let now = entry.timestamp;
        self.entries.push_back(entry);

        let pruned = self.prune(now);
        if pruned > 0 {
            debug!(pruned, retained = self.entries.len(), "Pruned expired history entries");
        }

        true
    }

    /// Drop entries with `now - timestamp > window`
    fn prune(&mut self, now: chrono::DateTime<chrono::Utc>) -> usize {
        // Nothing can be older than a cutoff before the earliest representable time
        let Some(cutoff) = now.checked_sub_signed(self.window) else {
            return 0;
        };
        let mut pruned = 0;

        while let Some(front) = self.entries.front() {
            if front.timestamp >= cutoff {
                break;
            }
            self.entries.pop_front();
            pruned += 1;
        }

        pruned
    }

    /// Mean of each field over the last `last_n` entries (all when `None`)
    ///
    /// With an empty history the current metrics are returned as-is with
    /// `sample_count = 0`.
    pub fn average(&self, last_n: Option<usize>, current: &Metrics) -> HistoryAverages {
        let take = last_n.unwrap_or(self.entries.len()).min(self.entries.len());

        if take == 0 {
            return HistoryAverages {
                total_volume: current.total_volume,
                bid_volume: current.bid_volume,
                ask_volume: current.ask_volume,
                spread_percent: current.spread_percent,
                sample_count: 0,
            };
        }

        let recent = self.entries.iter().skip(self.entries.len() - take);
        let (total, bid, ask, spread) = recent.fold((0.0, 0.0, 0.0, 0.0), |acc, e| {
            (
                acc.0 + e.total_volume,
                acc.1 + e.bid_volume,
                acc.2 + e.ask_volume,
                acc.3 + e.spread_percent,
            )
        });
        let n = take as f64;

        HistoryAverages {
            total_volume: total / n,
            bid_volume: bid / n,
            ask_volume: ask / n,
            spread_percent: spread / n,
            sample_count: take,
        }
    }

    /// Compare the most recent 10 entries against the preceding 10
    ///
    /// Fewer than 20 entries yields a stable, zero-change trend flagged as
    /// insufficient rather than a guess.
    pub fn trend(&self) -> TrendAnalysis {
        let len = self.entries.len();
        if len < MIN_TREND_ENTRIES {
            return TrendAnalysis::insufficient(len);
        }

        let older = self.segment_means(len - MIN_TREND_ENTRIES);
        let recent = self.segment_means(len - TREND_SEGMENT_LEN);

        let volume_change_percent = percent_change(older.0, recent.0);
        let spread_change_percent = percent_change(older.1, recent.1);

        TrendAnalysis {
            volume_trend: TrendDirection::from_change(volume_change_percent, VOLUME_TREND_THRESHOLD_PCT),
            spread_trend: TrendDirection::from_change(spread_change_percent, SPREAD_TREND_THRESHOLD_PCT),
            volume_change_percent,
            spread_change_percent,
            sufficient_data: true,
            sample_count: len,
        }
    }

    /// (mean total volume, mean spread percent) of one trend segment
    fn segment_means(&self, start: usize) -> (f64, f64) {
        let (volume, spread) = self
            .entries
            .range(start..start + TREND_SEGMENT_LEN)
            .fold((0.0, 0.0), |acc, e| (acc.0 + e.total_volume, acc.1 + e.spread_percent));
        let n = TREND_SEGMENT_LEN as f64;
        (volume / n, spread / n)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    /// Entries oldest first
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

fn percent_change(older: f64, recent: f64) -> f64 {
    if older.abs() < f64::EPSILON {
        return 0.0;
    }
    (recent - older) / older * 100.0
}

/// History store shared across threads
///
/// Append and the reads that follow it run under one lock, so a reader never
/// observes a half-pruned window.
#[derive(Debug, Clone, Default)]
pub struct SharedHistoryStore {
    inner: Arc<Mutex<HistoryStore>>,
}

impl SharedHistoryStore {
    pub fn new(store: HistoryStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    /// Run `f` with exclusive access to the store
    pub fn with<R>(&self, f: impl FnOnce(&mut HistoryStore) -> R) -> Result<R> {
        let mut guard = self.inner.lock().map_err(|_| AnalyzerError::LockPoisoned)?;
        Ok(f(&mut guard))
    }

    pub fn append(&self, entry: HistoryEntry) -> Result<bool> {
        self.with(|store| store.append(entry))
    }

    pub fn trend(&self) -> Result<TrendAnalysis> {
        self.with(|store| store.trend())
    }

    pub fn len(&self) -> Result<usize> {
        self.with(|store| store.len())
    }
}
