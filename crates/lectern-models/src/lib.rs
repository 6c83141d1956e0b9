//! Shared data models for the Lectern analysis pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Structured analysis results (summaries, chapters, tags)
//! - Compression strategies and their time ratios
//! - Chapter timestamp parsing and rescaling
//! - Processing run outcomes and stages

pub mod analysis;
pub mod outcome;
pub mod strategy;
pub mod timestamp;
pub mod video;

// Re-export common types
pub use analysis::{AnalysisResult, Chapter, RawAnalysis, VisualMoment, VisualSummary};
pub use outcome::{ProcessingOutcome, ProcessingStage};
pub use strategy::CompressionStrategy;
pub use timestamp::{format_compact, parse_timestamp, rescale_chapters, TimestampError};
pub use video::VideoId;

/// Expected dimensionality of analysis embeddings (text-embedding-004).
pub const EMBEDDING_DIMENSIONS: usize = 768;
