//! Structured lecture analysis models.
//!
//! The model replies with a JSON object carrying a spoken-content summary,
//! a visual description, chapter markers, and tags. The wire form is
//! tolerant (`RawAnalysis`); the stored form (`AnalysisResult`) is fully
//! normalized.

use serde::{Deserialize, Serialize};

/// A chapter marker on the analyzed timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    /// `"MM:SS"` or `"HH:MM:SS"` timestamp string.
    pub timestamp: String,
    /// Short chapter title.
    #[serde(default)]
    pub label: String,
}

/// One entry of a timestamped visual description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualMoment {
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub content: String,
}

/// The model's visual description, which arrives either as free text or as
/// a sequence of `{time, content}` pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VisualSummary {
    Text(String),
    Timeline(Vec<VisualMoment>),
}

impl VisualSummary {
    /// Flatten to a single string for storage and embedding.
    pub fn normalize(&self) -> String {
        match self {
            VisualSummary::Text(text) => text.trim().to_string(),
            VisualSummary::Timeline(moments) => moments
                .iter()
                .map(|m| {
                    if m.time.is_empty() {
                        m.content.clone()
                    } else {
                        format!("[{}] {}", m.time, m.content)
                    }
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Analysis payload exactly as parsed from the model's reply.
///
/// Every field defaults so that any valid JSON object parses; structural
/// validation happens at the JSON level (the self-healing loop re-prompts
/// when the reply is not valid JSON at all).
#[derive(Debug, Clone, Deserialize)]
pub struct RawAnalysis {
    #[serde(default)]
    pub transcript_summary: String,
    #[serde(default)]
    pub visual_summary: Option<VisualSummary>,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl RawAnalysis {
    /// Normalize into the stored form.
    pub fn into_result(self) -> AnalysisResult {
        AnalysisResult {
            transcript_summary: self.transcript_summary,
            visual_summary: self
                .visual_summary
                .map(|v| v.normalize())
                .unwrap_or_default(),
            chapters: self.chapters,
            tags: self.tags,
        }
    }
}

/// Normalized analysis result handed to persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Detailed notes on what was spoken.
    pub transcript_summary: String,
    /// Description of what was shown (slides, diagrams, code), flattened
    /// to one string.
    pub visual_summary: String,
    /// Ordered chapter markers.
    pub chapters: Vec<Chapter>,
    /// Ordered technical keywords.
    pub tags: Vec<String>,
}
