//! Engine configuration.
//!
//! Consolidates the engine's tunables into a single typed struct that is
//! handed to the engine by value. The browser binding and the replay tool
//! both load it from camelCase JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{ResultExt, TimelineError, TimelineResult};
use crate::timeline::chapters::{FALLBACK_DURATION, MIN_CHAPTER_GAP};
use crate::timeline::layout::RenderMode;

/// Default poll fallback interval.
pub const DEFAULT_POLL_INTERVAL_MS: u32 = 250;
/// Default narrowest chapter band, in percent of the strip.
pub const DEFAULT_MIN_BAND_WIDTH_PCT: f64 = 0.5;

/// Centralized engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "../frontend/src/types/generated/")]
pub struct EngineConfig {
    /// Poll fallback interval in milliseconds (16-5000).
    pub poll_interval_ms: u32,

    /// Minimum chapter width in seconds.
    pub min_chapter_gap_secs: f64,

    /// Effective duration used for chapters while the real one is unknown.
    pub fallback_duration_secs: f64,

    /// Narrowest rendered chapter band, in percent (0-100).
    pub min_band_width_pct: f64,

    /// Coordinate space for the timeline strip.
    pub render_mode: RenderMode,

    /// Seek back to the segment start when playback reaches the segment end.
    pub loop_segment: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            min_chapter_gap_secs: MIN_CHAPTER_GAP,
            fallback_duration_secs: FALLBACK_DURATION,
            min_band_width_pct: DEFAULT_MIN_BAND_WIDTH_PCT,
            render_mode: RenderMode::default(),
            loop_segment: true,
        }
    }
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

impl EngineConfig {
    /// Validate and clamp settings to acceptable ranges.
    pub fn validate(&mut self) {
        self.poll_interval_ms = self.poll_interval_ms.clamp(16, 5000);
        self.min_chapter_gap_secs =
            finite_or(self.min_chapter_gap_secs, MIN_CHAPTER_GAP).clamp(0.01, 60.0);
        self.fallback_duration_secs =
            finite_or(self.fallback_duration_secs, FALLBACK_DURATION).clamp(1.0, 86_400.0);
        self.min_band_width_pct =
            finite_or(self.min_band_width_pct, DEFAULT_MIN_BAND_WIDTH_PCT).clamp(0.0, 100.0);
    }

    /// Reset all settings to defaults.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> TimelineResult<Self> {
        let mut config: EngineConfig = serde_json::from_str(json)
            .map_err(|e| TimelineError::Config(format!("invalid engine config: {}", e)))?;
        config.validate();
        log::debug!("[CONFIG] Engine config loaded: {:?}", config);
        Ok(config)
    }

    /// Load from a JSON file.
    pub fn load(path: &Path) -> TimelineResult<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_json_str(&json)
    }

    /// Poll interval as a std duration.
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(u64::from(self.poll_interval_ms))
    }
}
