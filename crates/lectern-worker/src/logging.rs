//! Structured run logging utilities.

use lectern_models::{ProcessingStage, VideoId};
use tracing::{error, info, warn, Span};

/// Per-run logger with consistent structured fields.
#[derive(Debug, Clone)]
pub struct RunLogger {
    video_id: String,
}

impl RunLogger {
    /// Create a new logger for one processing run.
    pub fn new(video_id: &VideoId) -> Self {
        Self {
            video_id: video_id.to_string(),
        }
    }

    /// Log entry into a pipeline stage.
    pub fn log_stage(&self, stage: ProcessingStage, message: &str) {
        info!(
            video_id = %self.video_id,
            stage = %stage,
            "{}", message
        );
    }

    /// Log a warning during the run.
    pub fn log_warning(&self, stage: ProcessingStage, message: &str) {
        warn!(
            video_id = %self.video_id,
            stage = %stage,
            "{}", message
        );
    }

    /// Log a run-fatal error.
    pub fn log_error(&self, stage: ProcessingStage, message: &str) {
        error!(
            video_id = %self.video_id,
            stage = %stage,
            "{}", message
        );
    }

    /// Create a tracing span covering the whole run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("run", video_id = %self.video_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_logger_creation() {
        let video_id = VideoId::from_string("vid-123");
        let logger = RunLogger::new(&video_id);
        assert_eq!(logger.video_id, "vid-123");
    }
}
