//! Processing run outcomes and stages.

use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisResult;

/// Stage of a processing run.
///
/// Stages are strictly sequential within a run; the only loops are the
/// retry sub-loops inside analysis, which do not change the run's stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStage {
    #[default]
    Downloading,
    Transcoding,
    Uploading,
    Analyzing,
    Rescaling,
    Embedding,
    Persisting,
    CleaningUp,
    Done,
    Failed,
}

impl ProcessingStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStage::Downloading => "downloading",
            ProcessingStage::Transcoding => "transcoding",
            ProcessingStage::Uploading => "uploading",
            ProcessingStage::Analyzing => "analyzing",
            ProcessingStage::Rescaling => "rescaling",
            ProcessingStage::Embedding => "embedding",
            ProcessingStage::Persisting => "persisting",
            ProcessingStage::CleaningUp => "cleaning_up",
            ProcessingStage::Done => "done",
            ProcessingStage::Failed => "failed",
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessingStage::Done | ProcessingStage::Failed)
    }
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal state of one processing run.
///
/// Finalized exactly once, handed to the persistence collaborator, and
/// never retried across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProcessingOutcome {
    Succeeded {
        analysis: AnalysisResult,
        embedding: Vec<f32>,
    },
    Failed {
        /// Stage the run was in when it failed.
        stage: ProcessingStage,
        /// Human-readable failure reason.
        reason: String,
    },
}

impl ProcessingOutcome {
    pub fn failed(stage: ProcessingStage, reason: impl Into<String>) -> Self {
        Self::Failed {
            stage,
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ProcessingOutcome::Succeeded { .. })
    }
}
