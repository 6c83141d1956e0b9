//! Compression strategy selection.

use lectern_models::CompressionStrategy;
use serde::{Deserialize, Serialize};

/// Videos at or above this duration are compressed before analysis.
///
/// Short videos cost little to analyze directly; long ones must be
/// compressed to stay inside the model's input-size budget without losing
/// spoken content.
pub const SHORT_VIDEO_MAX_SECS: f64 = 600.0;

/// Which compression variant a deployment uses for long videos.
///
/// Synced slideshow is the canonical variant; decoupled (separate audio +
/// silent hyperlapse) remains selectable per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LongVideoMode {
    #[default]
    SyncedSlideshow,
    Decoupled,
}

/// Choose a compression strategy from the source duration.
pub fn select_strategy(duration_secs: f64, mode: LongVideoMode) -> CompressionStrategy {
    if duration_secs < SHORT_VIDEO_MAX_SECS {
        CompressionStrategy::Original
    } else {
        match mode {
            LongVideoMode::SyncedSlideshow => CompressionStrategy::SyncedSlideshow,
            LongVideoMode::Decoupled => CompressionStrategy::Decoupled,
        }
    }
}
