//! Compression strategy selection for AI-bound media.

use serde::{Deserialize, Serialize};

/// How a source video is compressed before being shown to the model.
///
/// Chosen once per processing run. The strategy decides which derivatives
/// the transcoder produces and whether chapter timestamps need rescaling
/// afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CompressionStrategy {
    /// The raw file is analyzed directly (short videos).
    #[default]
    Original,
    /// Only the audio track is analyzed (degraded fallback).
    AudioOnly,
    /// Separate full-length audio plus a silent 10x visual hyperlapse.
    Decoupled,
    /// One file with audio and video resampled onto a 10x shorter timeline.
    SyncedSlideshow,
}

impl CompressionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionStrategy::Original => "original",
            CompressionStrategy::AudioOnly => "audio_only",
            CompressionStrategy::Decoupled => "decoupled",
            CompressionStrategy::SyncedSlideshow => "synced_slideshow",
        }
    }

    /// Real-time-to-compressed-time ratio for the visual timeline.
    ///
    /// A chapter timestamp read off the compressed timeline must be
    /// multiplied by this to recover wall-clock time.
    pub fn time_ratio(&self) -> f64 {
        match self {
            CompressionStrategy::Original | CompressionStrategy::AudioOnly => 1.0,
            CompressionStrategy::Decoupled | CompressionStrategy::SyncedSlideshow => 10.0,
        }
    }

    /// Whether chapter timestamps need rescaling back to real time.
    pub fn is_compressed(&self) -> bool {
        self.time_ratio() != 1.0
    }
}

impl std::fmt::Display for CompressionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
