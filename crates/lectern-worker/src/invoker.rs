//! Model invocation with ordered fallback and rate-limit backoff.
//!
//! Rate limits are transient and worth waiting out on the preferred model;
//! every other error class (bad input, auth, content policy) is not
//! improved by retrying the same model and fails fast toward the next,
//! cheaper candidate.

use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::error::{WorkerError, WorkerResult};
use crate::gemini::RemoteFile;

/// Error from a single generation call, classified for retry purposes.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// HTTP 429 / quota-exhausted class. Retrying the same model after a
    /// cooldown is worthwhile.
    #[error("rate limited: {0}")]
    RateLimited(String),
    /// Everything else. Not improved by retrying the same model.
    #[error("{0}")]
    Other(String),
}

/// A backend capable of one multimodal generation call.
#[async_trait::async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        attachments: &[RemoteFile],
        prompt: &str,
    ) -> Result<String, InvokeError>;
}

/// Invokes an ordered list of candidate models until one succeeds.
pub struct ModelInvoker<'a> {
    backend: &'a dyn GenerativeBackend,
    models: &'a [String],
    /// Fixed sleep after a rate-limit error before retrying the same model.
    cooldown: Duration,
    /// Attempts per model; each rate-limit retry consumes one.
    attempts_per_model: u32,
}

impl<'a> ModelInvoker<'a> {
    pub fn new(
        backend: &'a dyn GenerativeBackend,
        models: &'a [String],
        cooldown: Duration,
        attempts_per_model: u32,
    ) -> Self {
        Self {
            backend,
            models,
            cooldown,
            attempts_per_model,
        }
    }

    /// Submit the derivatives and prompt, returning the first successful
    /// raw model response.
    ///
    /// Fails with [`WorkerError::AllModelsExhausted`] when every candidate
    /// either exhausted its attempts on rate limits or failed outright.
    pub async fn invoke(&self, attachments: &[RemoteFile], prompt: &str) -> WorkerResult<String> {
        for model in self.models {
            for attempt in 1..=self.attempts_per_model {
                info!(
                    "Attempting analysis with {} (attempt {}/{})",
                    model, attempt, self.attempts_per_model
                );

                match self.backend.generate(model, attachments, prompt).await {
                    Ok(text) => return Ok(text),
                    Err(InvokeError::RateLimited(msg)) => {
                        warn!(
                            "Rate limit hit on {}, sleeping {:?} to reset quota: {}",
                            model, self.cooldown, msg
                        );
                        tokio::time::sleep(self.cooldown).await;
                    }
                    Err(InvokeError::Other(msg)) => {
                        warn!("Non-retriable error with {}: {}", model, msg);
                        break;
                    }
                }
            }
        }

        Err(WorkerError::AllModelsExhausted)
    }
}
