//! Self-healing structured-output validation.
//!
//! The model is asked for bare JSON but sometimes wraps it in Markdown
//! fences or returns something that does not parse at all. Fences are
//! stripped; a parse failure re-issues the whole model invocation with a
//! corrective instruction appended to the prompt. Downstream storage
//! assumes well-formed fields, so exhausting the attempts is fatal.

use tracing::{info, warn};

use lectern_models::{AnalysisResult, RawAnalysis};

use crate::error::{WorkerError, WorkerResult};
use crate::gemini::RemoteFile;
use crate::invoker::ModelInvoker;
use crate::prompts::CORRECTIVE_SUFFIX;

/// Total structured-parse attempts before the run fails.
pub const MAX_PARSE_ATTEMPTS: u32 = 3;

/// Strip Markdown code-fence markers the model may wrap its reply in.
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

/// Run the full analysis loop: invoke, parse, and re-prompt on failure.
///
/// The corrective suffix accumulates across attempts, matching how an
/// escalating instruction reads to the model.
pub async fn analyze_with_healing(
    invoker: &ModelInvoker<'_>,
    attachments: &[RemoteFile],
    base_prompt: &str,
) -> WorkerResult<AnalysisResult> {
    let mut prompt = base_prompt.to_string();

    for attempt in 1..=MAX_PARSE_ATTEMPTS {
        info!("AI analysis attempt {}/{}", attempt, MAX_PARSE_ATTEMPTS);

        let raw_text = invoker.invoke(attachments, &prompt).await?;
        let cleaned = strip_code_fences(&raw_text);

        match serde_json::from_str::<RawAnalysis>(&cleaned) {
            Ok(raw) => {
                info!("AI returned valid structured output");
                return Ok(raw.into_result());
            }
            Err(e) => {
                warn!(
                    "AI returned invalid JSON on attempt {}: {} (raw: {:.200})",
                    attempt, e, cleaned
                );
                prompt.push_str(CORRECTIVE_SUFFIX);
            }
        }
    }

    Err(WorkerError::InvalidStructuredOutput {
        attempts: MAX_PARSE_ATTEMPTS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoker::{GenerativeBackend, InvokeError};
    use std::sync::Mutex;
    use std::time::Duration;

    const VALID: &str = r#"{"transcript_summary":"notes","visual_summary":"slides","chapters":[{"timestamp":"01:00","label":"Intro"}],"tags":["os"]}"#;

    /// Backend that pops scripted replies and records every prompt seen.
    struct ScriptedBackend {
        replies: Mutex<Vec<String>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn new(replies: Vec<&str>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().map(String::from).collect()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl GenerativeBackend for ScriptedBackend {
        async fn generate(
            &self,
            _model: &str,
            _attachments: &[RemoteFile],
            prompt: &str,
        ) -> Result<String, InvokeError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                Err(InvokeError::Other("script exhausted".to_string()))
            } else {
                Ok(replies.remove(0))
            }
        }
    }

    fn models() -> Vec<String> {
        vec!["primary".to_string()]
    }

    fn invoker<'a>(backend: &'a ScriptedBackend, models: &'a [String]) -> ModelInvoker<'a> {
        ModelInvoker::new(backend, models, Duration::from_secs(60), 3)
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  ```\n{}\n```  "), "{}");
    }

    #[tokio::test]
    async fn test_valid_on_first_attempt() {
        let backend = ScriptedBackend::new(vec![VALID]);
        let models = models();
        let result = analyze_with_healing(&invoker(&backend, &models), &[], "analyze")
            .await
            .unwrap();
        assert_eq!(result.transcript_summary, "notes");
        assert_eq!(result.chapters.len(), 1);
        assert_eq!(backend.prompts(), vec!["analyze"]);
    }

    #[tokio::test]
    async fn test_fenced_reply_is_accepted() {
        let fenced = format!("```json\n{}\n```", VALID);
        let backend = ScriptedBackend::new(vec![fenced.as_str()]);
        let models = models();
        let result = analyze_with_healing(&invoker(&backend, &models), &[], "analyze")
            .await
            .unwrap();
        assert_eq!(result.visual_summary, "slides");
    }

    #[tokio::test]
    async fn test_heals_on_third_attempt() {
        let backend = ScriptedBackend::new(vec!["not json", "{broken", VALID]);
        let models = models();
        let result = analyze_with_healing(&invoker(&backend, &models), &[], "analyze")
            .await
            .unwrap();
        assert_eq!(result.transcript_summary, "notes");

        // The corrective suffix accumulated once per failed attempt
        let prompts = backend.prompts();
        assert_eq!(prompts.len(), 3);
        assert_eq!(prompts[0].matches(CORRECTIVE_SUFFIX.trim()).count(), 0);
        assert_eq!(prompts[1].matches("was not valid JSON").count(), 1);
        assert_eq!(prompts[2].matches("was not valid JSON").count(), 2);
    }

    #[tokio::test]
    async fn test_exhaustion_is_fatal() {
        let backend = ScriptedBackend::new(vec!["bad", "worse", "still bad"]);
        let models = models();
        let result = analyze_with_healing(&invoker(&backend, &models), &[], "analyze").await;
        assert!(matches!(
            result,
            Err(WorkerError::InvalidStructuredOutput { attempts: 3 })
        ));
    }

    #[tokio::test]
    async fn test_invoker_failure_propagates() {
        // Backend with no replies left -> Other error -> model abandoned ->
        // candidate list exhausted
        let backend = ScriptedBackend::new(vec![]);
        let models = models();
        let result = analyze_with_healing(&invoker(&backend, &models), &[], "analyze").await;
        assert!(matches!(result, Err(WorkerError::AllModelsExhausted)));
    }
}
