//! FFmpeg CLI wrapper for lecture video compression.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Duration probing from FFmpeg diagnostic output
//! - Compression strategy selection by duration
//! - Derivative production (audio extraction, hyperlapse, synced slideshow)
//!   with an explicit audio-only degradation path

pub mod command;
pub mod error;
pub mod probe;
pub mod strategy;
pub mod transcode;

pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use probe::{probe_duration, DEFAULT_DURATION_SECS};
pub use strategy::{select_strategy, LongVideoMode, SHORT_VIDEO_MAX_SECS};
pub use transcode::{
    produce_derivatives, slideshow_sample_fps, DerivativeRole, MediaDerivative, TranscodeOutput,
};
