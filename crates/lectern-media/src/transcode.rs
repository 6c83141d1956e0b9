//! Derivative production for AI analysis.
//!
//! Each compression strategy maps to a small set of FFmpeg invocations:
//!
//! - `AudioOnly`: speech-grade MP3 extraction of the full audio track.
//! - `Decoupled`: full audio plus a silent visual hyperlapse (1 frame per
//!   10 source seconds, played back at 1 fps, so a 2-hour lecture collapses
//!   to 720 frames over 12 minutes).
//! - `SyncedSlideshow`: one file with video and audio resampled onto a 10x
//!   shorter shared timeline.
//! - `Original`: the source file is used as-is.
//!
//! A failed compression degrades to raw audio extraction rather than
//! aborting the run; the degradation is recorded on the output so callers
//! and tests can observe it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use lectern_models::CompressionStrategy;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Fixed real-time-to-compressed-time ratio for both compressed strategies.
pub const COMPRESSED_TIME_RATIO: f64 = 10.0;

/// Target total frame count for a synced slideshow.
pub const SLIDESHOW_FRAME_BUDGET: f64 = 700.0;

/// Floor on the slideshow sampling rate: one frame per 20 source seconds.
pub const MIN_SAMPLE_FPS: f64 = 0.05;

/// Hyperlapse filter: 1 frame per 10 source seconds, 360p, renumbered PTS
/// so playback runs at the output frame rate.
pub const HYPERLAPSE_FILTER: &str = "fps=1/10,scale=-2:360,setpts=N/((1)*TB)";

/// Role of a produced derivative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivativeRole {
    Audio,
    Video,
}

/// A transcoded file produced from the source for AI consumption.
///
/// Derivatives are transient: created here, consumed by the model upload,
/// deleted by run cleanup regardless of outcome.
#[derive(Debug, Clone)]
pub struct MediaDerivative {
    pub path: PathBuf,
    pub role: DerivativeRole,
    /// Real seconds per compressed second on this derivative's timeline.
    pub time_ratio: f64,
}

/// Result of derivative production.
#[derive(Debug, Clone)]
pub struct TranscodeOutput {
    pub derivatives: Vec<MediaDerivative>,
    /// Strategy actually applied.
    pub strategy: CompressionStrategy,
    /// Set when compression failed and the run degraded to audio-only.
    pub degraded_from: Option<CompressionStrategy>,
}

impl TranscodeOutput {
    /// Ratio chapter timestamps must be multiplied by after analysis.
    pub fn time_ratio(&self) -> f64 {
        self.strategy.time_ratio()
    }
}

/// Sampling rate (frames per source second) for the synced slideshow.
///
/// Caps total frames near the frame budget for cost control, floored at one
/// frame every 20 seconds for continuity.
pub fn slideshow_sample_fps(duration_secs: f64) -> f64 {
    (SLIDESHOW_FRAME_BUDGET / duration_secs).max(MIN_SAMPLE_FPS)
}

/// Compose an FFmpeg `atempo` chain for a speed-up ratio.
///
/// `atempo` accepts at most 2.0 per stage, so larger ratios are chained
/// from doublings plus one fractional stage (10x = 2.0 * 2.0 * 2.0 * 1.25).
pub fn atempo_chain(ratio: f64) -> String {
    let mut stages = Vec::new();
    let mut remaining = ratio;
    while remaining > 2.0 {
        stages.push("atempo=2.0".to_string());
        remaining /= 2.0;
    }
    if (remaining - 1.0).abs() > 1e-9 {
        stages.push(format!("atempo={}", remaining));
    }
    stages.join(",")
}

/// Filter graph for the synced slideshow: sampled, 360p video compressed
/// onto a 10x shorter timeline, with the audio sped up by the same factor.
fn slideshow_filter(duration_secs: f64) -> String {
    let sample_fps = slideshow_sample_fps(duration_secs);
    format!(
        "[0:v]fps={:.4},scale=-2:360,setpts=PTS/{}[v];[0:a]{}[a]",
        sample_fps,
        COMPRESSED_TIME_RATIO,
        atempo_chain(COMPRESSED_TIME_RATIO)
    )
}

/// Derive a sibling output path: `lecture.mp4` -> `lecture_audio.mp3`.
fn sibling_path(source: &Path, suffix: &str, ext: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "derivative".to_string());
    source.with_file_name(format!("{}_{}.{}", stem, suffix, ext))
}

/// Speech-grade full audio extraction.
fn audio_extract_command(source: &Path) -> FfmpegCommand {
    FfmpegCommand::new(source, sibling_path(source, "audio", "mp3"))
        .no_video()
        .audio_codec("libmp3lame")
        .audio_quality(4)
}

/// Silent visual hyperlapse for the decoupled strategy.
fn hyperlapse_command(source: &Path) -> FfmpegCommand {
    FfmpegCommand::new(source, sibling_path(source, "visuals", "mp4"))
        .video_filter(HYPERLAPSE_FILTER)
        .no_audio()
        .video_codec("libx264")
        .preset("ultrafast")
        .frame_rate(1.0)
}

/// Single-file synced slideshow.
fn slideshow_command(source: &Path, duration_secs: f64) -> FfmpegCommand {
    FfmpegCommand::new(source, sibling_path(source, "slideshow", "mp4"))
        .filter_complex(slideshow_filter(duration_secs))
        .map("[v]")
        .map("[a]")
        .video_codec("libx264")
        .preset("ultrafast")
        .frame_rate(slideshow_sample_fps(duration_secs) * COMPRESSED_TIME_RATIO)
}

/// Least-lossy strategy to fall back to when compression fails.
///
/// This is an explicit transition, not an exception side effect: only the
/// compressed strategies degrade, and always to full raw audio.
pub fn fallback_strategy(strategy: CompressionStrategy) -> Option<CompressionStrategy> {
    match strategy {
        CompressionStrategy::Decoupled | CompressionStrategy::SyncedSlideshow => {
            Some(CompressionStrategy::AudioOnly)
        }
        CompressionStrategy::Original | CompressionStrategy::AudioOnly => None,
    }
}

/// Every output path a strategy writes, used to discard half-written files
/// after a failed run.
fn strategy_output_paths(source: &Path, strategy: CompressionStrategy) -> Vec<PathBuf> {
    match strategy {
        CompressionStrategy::Original => Vec::new(),
        CompressionStrategy::AudioOnly => vec![sibling_path(source, "audio", "mp3")],
        CompressionStrategy::Decoupled => vec![
            sibling_path(source, "audio", "mp3"),
            sibling_path(source, "visuals", "mp4"),
        ],
        CompressionStrategy::SyncedSlideshow => vec![sibling_path(source, "slideshow", "mp4")],
    }
}

/// Best-effort removal of a failed strategy's partial outputs. The source
/// file is never touched.
async fn discard_partial_outputs(source: &Path, strategy: CompressionStrategy) {
    for path in strategy_output_paths(source, strategy) {
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!("Removed partial output {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove partial output {}: {}", path.display(), e),
        }
    }
}

/// Produce the derivative set for a strategy, degrading to audio-only when
/// compression fails.
///
/// The run aborts only if even audio extraction fails. A failed strategy's
/// partial output files are removed before degrading or returning.
pub async fn produce_derivatives(
    source: &Path,
    strategy: CompressionStrategy,
    duration_secs: f64,
) -> MediaResult<TranscodeOutput> {
    if !source.exists() {
        return Err(MediaError::FileNotFound(source.to_path_buf()));
    }

    match run_strategy(source, strategy, duration_secs).await {
        Ok(derivatives) => Ok(TranscodeOutput {
            derivatives,
            strategy,
            degraded_from: None,
        }),
        Err(e) => {
            discard_partial_outputs(source, strategy).await;
            match fallback_strategy(strategy) {
                Some(fallback) => {
                    warn!(
                        "{} transcode failed ({}), degrading to {}",
                        strategy, e, fallback
                    );
                    match run_strategy(source, fallback, duration_secs).await {
                        Ok(derivatives) => Ok(TranscodeOutput {
                            derivatives,
                            strategy: fallback,
                            degraded_from: Some(strategy),
                        }),
                        Err(fallback_err) => {
                            discard_partial_outputs(source, fallback).await;
                            Err(fallback_err)
                        }
                    }
                }
                None => Err(e),
            }
        }
    }
}

async fn run_strategy(
    source: &Path,
    strategy: CompressionStrategy,
    duration_secs: f64,
) -> MediaResult<Vec<MediaDerivative>> {
    let runner = FfmpegRunner::new();

    match strategy {
        CompressionStrategy::Original => Ok(vec![MediaDerivative {
            path: source.to_path_buf(),
            role: DerivativeRole::Video,
            time_ratio: 1.0,
        }]),

        CompressionStrategy::AudioOnly => {
            let cmd = audio_extract_command(source);
            runner.run(&cmd).await?;
            Ok(vec![MediaDerivative {
                path: cmd.output_path().to_path_buf(),
                role: DerivativeRole::Audio,
                time_ratio: 1.0,
            }])
        }

        CompressionStrategy::Decoupled => {
            info!(
                "Generating decoupled assets for {:.0}s video",
                duration_secs
            );
            let audio = audio_extract_command(source);
            runner.run(&audio).await?;
            let visuals = hyperlapse_command(source);
            runner.run(&visuals).await?;
            Ok(vec![
                MediaDerivative {
                    path: audio.output_path().to_path_buf(),
                    role: DerivativeRole::Audio,
                    time_ratio: 1.0,
                },
                MediaDerivative {
                    path: visuals.output_path().to_path_buf(),
                    role: DerivativeRole::Video,
                    time_ratio: COMPRESSED_TIME_RATIO,
                },
            ])
        }

        CompressionStrategy::SyncedSlideshow => {
            info!(
                "Generating synced slideshow for {:.0}s video at {:.4} fps",
                duration_secs,
                slideshow_sample_fps(duration_secs)
            );
            let cmd = slideshow_command(source, duration_secs);
            runner.run(&cmd).await?;
            Ok(vec![MediaDerivative {
                path: cmd.output_path().to_path_buf(),
                role: DerivativeRole::Video,
                time_ratio: COMPRESSED_TIME_RATIO,
            }])
        }
    }
}
