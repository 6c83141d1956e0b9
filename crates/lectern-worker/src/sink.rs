//! Persistence handoff.
//!
//! The pipeline hands every finalized outcome to a collaborator that owns
//! schema and storage format. Writes for distinct video ids are
//! independent, so concurrent runs need no coordination here.

use lectern_models::{ProcessingOutcome, VideoId};
use tracing::info;

use crate::error::{WorkerError, WorkerResult};

/// Receiver of finalized processing outcomes.
#[async_trait::async_trait]
pub trait OutcomeSink: Send + Sync {
    async fn record(&self, video_id: &VideoId, outcome: &ProcessingOutcome) -> WorkerResult<()>;
}

/// Sink that posts outcomes to the catalog API.
pub struct CatalogApiSink {
    client: reqwest::Client,
    base_url: String,
}

impl CatalogApiSink {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait::async_trait]
impl OutcomeSink for CatalogApiSink {
    async fn record(&self, video_id: &VideoId, outcome: &ProcessingOutcome) -> WorkerResult<()> {
        let url = format!(
            "{}/internal/videos/{}/outcome",
            self.base_url.trim_end_matches('/'),
            video_id
        );

        let response = self
            .client
            .post(&url)
            .json(outcome)
            .send()
            .await
            .map_err(|e| WorkerError::persist_failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(WorkerError::persist_failed(format!(
                "Catalog API returned {}",
                response.status()
            )));
        }

        info!(video_id = %video_id, "Recorded processing outcome");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_url_shape() {
        let sink = CatalogApiSink::new("http://localhost:8000/");
        let url = format!(
            "{}/internal/videos/{}/outcome",
            sink.base_url.trim_end_matches('/'),
            VideoId::from_string("vid-1")
        );
        assert_eq!(url, "http://localhost:8000/internal/videos/vid-1/outcome");
    }
}
