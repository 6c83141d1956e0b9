//! Embedding composition for similarity search.

use tracing::info;

use lectern_models::{AnalysisResult, EMBEDDING_DIMENSIONS};

use crate::error::{WorkerError, WorkerResult};

/// Maximum characters of composed text sent to the embedding service.
pub const EMBEDDING_TEXT_MAX_CHARS: usize = 8000;

/// A backend capable of embedding text into a fixed-length vector.
#[async_trait::async_trait]
pub trait EmbeddingBackend: Send + Sync {
    async fn embed(&self, text: &str) -> WorkerResult<Vec<f32>>;
}

#[async_trait::async_trait]
impl EmbeddingBackend for crate::gemini::GeminiClient {
    async fn embed(&self, text: &str) -> WorkerResult<Vec<f32>> {
        self.embed_text(text).await
    }
}

/// Build the single text blob representing an analysis result.
pub fn compose_embedding_text(result: &AnalysisResult) -> String {
    let combined = format!(
        "Visuals: {}\nAudio: {}\nTags: {}",
        result.visual_summary,
        result.transcript_summary,
        result.tags.join(", ")
    );
    combined.chars().take(EMBEDDING_TEXT_MAX_CHARS).collect()
}

/// Embed an analysis result, validating the vector dimensionality.
///
/// Failure here is fatal to the run; the search index cannot accept a
/// malformed vector.
pub async fn embed_analysis(
    backend: &dyn EmbeddingBackend,
    result: &AnalysisResult,
) -> WorkerResult<Vec<f32>> {
    let text = compose_embedding_text(result);
    info!("Embedding {} characters of analysis text", text.len());

    let vector = backend.embed(&text).await?;
    if vector.len() != EMBEDDING_DIMENSIONS {
        return Err(WorkerError::embedding_failed(format!(
            "Expected {} dimensions, got {}",
            EMBEDDING_DIMENSIONS,
            vector.len()
        )));
    }
    Ok(vector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_models::Chapter;

    fn analysis() -> AnalysisResult {
        AnalysisResult {
            transcript_summary: "spoken notes".to_string(),
            visual_summary: "slide deck".to_string(),
            chapters: vec![Chapter {
                timestamp: "01:00".to_string(),
                label: "Intro".to_string(),
            }],
            tags: vec!["os".to_string(), "scheduling".to_string()],
        }
    }

    struct FixedBackend(Vec<f32>);

    #[async_trait::async_trait]
    impl EmbeddingBackend for FixedBackend {
        async fn embed(&self, _text: &str) -> WorkerResult<Vec<f32>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_compose_embedding_text() {
        let text = compose_embedding_text(&analysis());
        assert_eq!(
            text,
            "Visuals: slide deck\nAudio: spoken notes\nTags: os, scheduling"
        );
    }

    #[test]
    fn test_compose_truncates_to_limit() {
        let mut result = analysis();
        result.transcript_summary = "x".repeat(20_000);
        let text = compose_embedding_text(&result);
        assert_eq!(text.chars().count(), EMBEDDING_TEXT_MAX_CHARS);
        assert!(text.starts_with("Visuals: slide deck"));
    }

    #[tokio::test]
    async fn test_embed_analysis_accepts_correct_dimensions() {
        let backend = FixedBackend(vec![0.1; EMBEDDING_DIMENSIONS]);
        let vector = embed_analysis(&backend, &analysis()).await.unwrap();
        assert_eq!(vector.len(), EMBEDDING_DIMENSIONS);
    }

    #[tokio::test]
    async fn test_embed_analysis_rejects_wrong_dimensions() {
        let backend = FixedBackend(vec![0.1; 512]);
        let result = embed_analysis(&backend, &analysis()).await;
        assert!(matches!(result, Err(WorkerError::EmbeddingFailed(_))));
    }
}
