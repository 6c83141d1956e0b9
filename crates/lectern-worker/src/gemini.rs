//! Gemini API client for lecture analysis.
//!
//! This module covers the three REST surfaces the pipeline needs:
//! media file upload (Files API), multimodal content generation, and text
//! embedding. Rate-limit responses are classified so the invoker can wait
//! them out instead of abandoning the model.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{WorkerError, WorkerResult};
use crate::invoker::{GenerativeBackend, InvokeError};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Poll interval while an uploaded file is still processing server-side.
const FILE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Embedding model identifier.
pub const EMBEDDING_MODEL: &str = "text-embedding-004";

/// Handle to a media file uploaded to the Files API.
///
/// Remote files are transient like local derivatives: uploaded for one
/// analysis, deleted best-effort during run cleanup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteFile {
    /// Resource name, e.g. `files/abc123`
    pub name: String,
    /// Download URI passed to `generateContent`
    pub uri: String,
    /// MIME type reported at upload
    pub mime_type: String,
}

/// Gemini API client.
#[derive(Clone)]
pub struct GeminiClient {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum Part {
    Text(String),
    FileData(FileData),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    file_uri: String,
    mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct FileEnvelope {
    file: FileMetadata,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileMetadata {
    name: String,
    uri: String,
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    state: String,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

impl GeminiClient {
    /// Create a new client reading the API key from the environment.
    pub fn new() -> WorkerResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| WorkerError::config_error("GEMINI_API_KEY not set"))?;
        Ok(Self::with_key(api_key))
    }

    /// Create a client with an explicit key.
    pub fn with_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the API base URL (used by tests against a local server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Upload a local media file and wait until it is ready for analysis.
    pub async fn upload_file(&self, path: &Path) -> WorkerResult<RemoteFile> {
        let mime_type = mime_type_for(path);
        let bytes = tokio::fs::read(path).await?;
        info!(
            "Uploading {} ({} bytes, {}) to Gemini",
            path.display(),
            bytes.len(),
            mime_type
        );

        let url = format!("{}/upload/v1beta/files?key={}", self.base_url, self.api_key);
        let response = self
            .client
            .post(&url)
            .header("X-Goog-Upload-Protocol", "raw")
            .header("Content-Type", mime_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| WorkerError::ai_failed(format!("File upload failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(WorkerError::ai_failed(format!(
                "File upload returned {}: {}",
                status, body
            )));
        }

        let envelope: FileEnvelope = response
            .json()
            .await
            .map_err(|e| WorkerError::ai_failed(format!("Bad upload response: {}", e)))?;

        self.wait_until_active(envelope.file).await
    }

    /// Poll file metadata until the server finishes processing it.
    async fn wait_until_active(&self, mut file: FileMetadata) -> WorkerResult<RemoteFile> {
        while file.state == "PROCESSING" {
            debug!("File {} still processing", file.name);
            tokio::time::sleep(FILE_POLL_INTERVAL).await;
            file = self.get_file(&file.name).await?;
        }

        if file.state == "FAILED" {
            return Err(WorkerError::ai_failed(format!(
                "Uploaded file {} failed server-side processing",
                file.name
            )));
        }

        Ok(RemoteFile {
            name: file.name,
            uri: file.uri,
            mime_type: if file.mime_type.is_empty() {
                "application/octet-stream".to_string()
            } else {
                file.mime_type
            },
        })
    }

    async fn get_file(&self, name: &str) -> WorkerResult<FileMetadata> {
        let url = format!("{}/v1beta/{}?key={}", self.base_url, name, self.api_key);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| WorkerError::ai_failed(format!("File status check failed: {}", e)))?;

        response
            .json()
            .await
            .map_err(|e| WorkerError::ai_failed(format!("Bad file metadata: {}", e)))
    }

    /// Delete an uploaded file. Best-effort; callers swallow the error.
    pub async fn delete_file(&self, name: &str) -> WorkerResult<()> {
        let url = format!("{}/v1beta/{}?key={}", self.base_url, name, self.api_key);
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|e| WorkerError::ai_failed(format!("File delete failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(WorkerError::ai_failed(format!(
                "File delete returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    /// Embed text with the embedding model, returning the raw vector.
    pub async fn embed_text(&self, text: &str) -> WorkerResult<Vec<f32>> {
        let url = format!(
            "{}/v1beta/models/{}:embedContent?key={}",
            self.base_url, EMBEDDING_MODEL, self.api_key
        );

        let request = EmbedRequest {
            content: Content {
                parts: vec![Part::Text(text.to_string())],
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| WorkerError::embedding_failed(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(WorkerError::embedding_failed(format!(
                "Embedding API returned {}: {}",
                status, body
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| WorkerError::embedding_failed(format!("Bad response: {}", e)))?;

        Ok(parsed.embedding.values)
    }
}

/// Remote store for analysis attachments: upload a local derivative, delete
/// it after the run.
#[async_trait::async_trait]
pub trait RemoteFileStore: Send + Sync {
    async fn upload(&self, path: &Path) -> WorkerResult<RemoteFile>;
    async fn delete(&self, name: &str) -> WorkerResult<()>;
}

#[async_trait::async_trait]
impl RemoteFileStore for GeminiClient {
    async fn upload(&self, path: &Path) -> WorkerResult<RemoteFile> {
        self.upload_file(path).await
    }

    async fn delete(&self, name: &str) -> WorkerResult<()> {
        self.delete_file(name).await
    }
}

#[async_trait::async_trait]
impl GenerativeBackend for GeminiClient {
    async fn generate(
        &self,
        model: &str,
        attachments: &[RemoteFile],
        prompt: &str,
    ) -> Result<String, InvokeError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        );

        let mut parts: Vec<Part> = attachments
            .iter()
            .map(|f| {
                Part::FileData(FileData {
                    file_uri: f.uri.clone(),
                    mime_type: f.mime_type.clone(),
                })
            })
            .collect();
        parts.push(Part::Text(prompt.to_string()));

        let request = GenerateRequest {
            contents: vec![Content { parts }],
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| InvokeError::Other(format!("Gemini API request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_api_error(status.as_u16(), &body));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| InvokeError::Other(format!("Bad Gemini response: {}", e)))?;

        parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .ok_or_else(|| InvokeError::Other("No content in Gemini response".to_string()))
    }
}

/// Classify a non-success API response into rate-limit vs everything else.
fn classify_api_error(status: u16, body: &str) -> InvokeError {
    if status == 429 || body.contains("RESOURCE_EXHAUSTED") {
        InvokeError::RateLimited(format!("Gemini API returned {}: {}", status, body))
    } else {
        InvokeError::Other(format!("Gemini API returned {}: {}", status, body))
    }
}

/// MIME type for a derivative by file extension.
fn mime_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("mp3") => "audio/mpeg",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("wav") => "audio/wav",
        _ => {
            warn!("Unknown media extension for {}", path.display());
            "application/octet-stream"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_rate_limit_by_status() {
        assert!(matches!(
            classify_api_error(429, "slow down"),
            InvokeError::RateLimited(_)
        ));
    }

    #[test]
    fn test_classify_rate_limit_by_body() {
        assert!(matches!(
            classify_api_error(503, r#"{"error":{"status":"RESOURCE_EXHAUSTED"}}"#),
            InvokeError::RateLimited(_)
        ));
    }

    #[test]
    fn test_classify_other_errors() {
        assert!(matches!(
            classify_api_error(400, "invalid argument"),
            InvokeError::Other(_)
        ));
        assert!(matches!(
            classify_api_error(403, "API key invalid"),
            InvokeError::Other(_)
        ));
    }

    #[test]
    fn test_mime_type_for() {
        assert_eq!(mime_type_for(Path::new("a_audio.mp3")), "audio/mpeg");
        assert_eq!(mime_type_for(Path::new("a_visuals.mp4")), "video/mp4");
        assert_eq!(
            mime_type_for(Path::new("mystery.bin")),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_part_serialization_shape() {
        let part = Part::FileData(FileData {
            file_uri: "https://files/abc".to_string(),
            mime_type: "video/mp4".to_string(),
        });
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["fileData"]["fileUri"], "https://files/abc");
        assert_eq!(json["fileData"]["mimeType"], "video/mp4");

        let text = serde_json::to_value(Part::Text("hi".to_string())).unwrap();
        assert_eq!(text["text"], "hi");
    }
}
