//! Video duration probing from FFmpeg diagnostic output.
//!
//! FFmpeg invoked with only an input writes file information to stderr and
//! exits non-zero. The `Duration:` line in that output is the most reliable
//! duration source for the container formats we ingest.

use regex::Regex;
use std::path::Path;
use std::process::Stdio;
use std::sync::OnceLock;
use tokio::process::Command;
use tracing::warn;

/// Conservative default duration when probing fails (2 hours).
///
/// Strategy selection must stay safe when the real duration is unknown, so
/// the default assumes a long lecture.
pub const DEFAULT_DURATION_SECS: f64 = 7200.0;

fn duration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Duration: (\d{2}):(\d{2}):(\d{2}\.\d{2})").unwrap())
}

/// Probe a video's duration in seconds.
///
/// Returns `None` when FFmpeg is missing, cannot be invoked, or its output
/// carries no duration line. This never fails the run; callers substitute
/// [`DEFAULT_DURATION_SECS`].
pub async fn probe_duration(path: impl AsRef<Path>) -> Option<f64> {
    let path = path.as_ref();

    if which::which("ffmpeg").is_err() {
        warn!("FFmpeg not found in PATH, duration unknown");
        return None;
    }

    // FFmpeg writes file info to stderr, not stdout. It also exits non-zero
    // without an output file; only the stderr text matters here.
    let output = Command::new("ffmpeg")
        .arg("-i")
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await;

    let output = match output {
        Ok(o) => o,
        Err(e) => {
            warn!("Could not invoke FFmpeg to probe {}: {}", path.display(), e);
            return None;
        }
    };

    let stderr = String::from_utf8_lossy(&output.stderr);
    let duration = parse_duration_line(&stderr);
    if duration.is_none() {
        warn!("No duration line in FFmpeg output for {}", path.display());
    }
    duration
}

/// Parse the `Duration: HH:MM:SS.ss` line from FFmpeg stderr output.
fn parse_duration_line(stderr: &str) -> Option<f64> {
    let caps = duration_regex().captures(stderr)?;
    let hours: f64 = caps[1].parse().ok()?;
    let mins: f64 = caps[2].parse().ok()?;
    let secs: f64 = caps[3].parse().ok()?;
    Some(hours * 3600.0 + mins * 60.0 + secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_line() {
        let stderr = "Input #0, mov,mp4, from 'lecture.mp4':\n  Duration: 01:02:03.45, start: 0.0, bitrate: 1000 kb/s";
        let duration = parse_duration_line(stderr).unwrap();
        assert!((duration - 3723.45).abs() < 0.001);
    }

    #[test]
    fn test_parse_duration_two_hours() {
        let duration = parse_duration_line("Duration: 02:00:00.00, start").unwrap();
        assert_eq!(duration, 7200.0);
    }

    #[test]
    fn test_parse_missing_duration() {
        assert!(parse_duration_line("No such file or directory").is_none());
        assert!(parse_duration_line("").is_none());
    }

    #[test]
    fn test_parse_requires_exact_shape() {
        // Single-digit fields do not match the diagnostic format
        assert!(parse_duration_line("Duration: 1:2:3.4").is_none());
    }
}
