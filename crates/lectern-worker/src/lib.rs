//! Lecture analysis worker.
//!
//! Compresses long-form lecture video into an AI-analyzable form, submits
//! it to a generative model with rate-limit-aware fallback, validates the
//! structured reply with a self-healing retry loop, rescales chapter
//! timestamps back to real time, and hands the outcome to the catalog.

pub mod config;
pub mod embeddings;
pub mod error;
pub mod gemini;
pub mod invoker;
pub mod logging;
pub mod pipeline;
pub mod prompts;
pub mod scratch;
pub mod sink;
pub mod validator;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use gemini::{GeminiClient, RemoteFile, RemoteFileStore};
pub use invoker::{GenerativeBackend, InvokeError, ModelInvoker};
pub use pipeline::{FfmpegTranscoder, SourceStore, Transcoder, VideoPipeline};
pub use sink::{CatalogApiSink, OutcomeSink};
