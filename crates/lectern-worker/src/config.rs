//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use lectern_media::LongVideoMode;

/// Candidate models, in preference order: the high-capacity general model
/// first, the specialized fallback second.
pub const DEFAULT_MODELS: [&str; 2] = ["gemini-flash-latest", "gemini-robotics-er-1.5-preview"];

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Directory for per-run transient files
    pub work_dir: PathBuf,
    /// Compression variant used for long videos
    pub long_video_mode: LongVideoMode,
    /// Ordered candidate models for analysis
    pub candidate_models: Vec<String>,
    /// Cooldown after a rate-limit error before retrying the same model
    pub rate_limit_cooldown: Duration,
    /// Attempts per model before moving to the next candidate
    pub attempts_per_model: u32,
    /// Base URL of the catalog API receiving processing outcomes
    pub catalog_api_url: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join("lectern"),
            long_video_mode: LongVideoMode::SyncedSlideshow,
            candidate_models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            rate_limit_cooldown: Duration::from_secs(60),
            attempts_per_model: 3,
            catalog_api_url: "http://localhost:8000".to_string(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            work_dir: std::env::var("WORKER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            long_video_mode: match std::env::var("WORKER_LONG_VIDEO_MODE").as_deref() {
                Ok("decoupled") => LongVideoMode::Decoupled,
                _ => LongVideoMode::SyncedSlideshow,
            },
            candidate_models: std::env::var("WORKER_MODELS")
                .map(|s| {
                    s.split(',')
                        .map(|m| m.trim().to_string())
                        .filter(|m| !m.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.candidate_models),
            rate_limit_cooldown: Duration::from_secs(
                std::env::var("WORKER_RATE_LIMIT_COOLDOWN_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
            attempts_per_model: std::env::var("WORKER_ATTEMPTS_PER_MODEL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            catalog_api_url: std::env::var("CATALOG_API_URL").unwrap_or(defaults.catalog_api_url),
        }
    }
}
