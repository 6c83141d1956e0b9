//! Chapter timestamp parsing and rescaling.
//!
//! Chapter timestamps arrive from the model as `"MM:SS"` or `"HH:MM:SS"`
//! strings measured on the compressed timeline. Rescaling multiplies them
//! back onto the real timeline.

use crate::analysis::Chapter;

/// Timestamp parsing error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimestampError {
    #[error("Timestamp cannot be empty")]
    Empty,
    #[error("Timestamp cannot be negative")]
    Negative,
    #[error("Invalid {0} value: {1}")]
    InvalidValue(&'static str, String),
    #[error("Invalid timestamp format '{0}'. Use MM:SS or HH:MM:SS")]
    InvalidFormat(String),
}

/// Parse a `"MM:SS"` or `"HH:MM:SS"` timestamp to total seconds.
pub fn parse_timestamp(ts: &str) -> Result<f64, TimestampError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(TimestampError::Empty);
    }

    let parts: Vec<&str> = ts.split(':').collect();
    match parts.len() {
        2 => {
            let minutes: f64 = parts[0]
                .parse()
                .map_err(|_| TimestampError::InvalidValue("minutes", parts[0].to_string()))?;
            let seconds: f64 = parts[1]
                .parse()
                .map_err(|_| TimestampError::InvalidValue("seconds", parts[1].to_string()))?;
            if minutes < 0.0 || seconds < 0.0 {
                return Err(TimestampError::Negative);
            }
            Ok(minutes * 60.0 + seconds)
        }
        3 => {
            let hours: f64 = parts[0]
                .parse()
                .map_err(|_| TimestampError::InvalidValue("hours", parts[0].to_string()))?;
            let minutes: f64 = parts[1]
                .parse()
                .map_err(|_| TimestampError::InvalidValue("minutes", parts[1].to_string()))?;
            let seconds: f64 = parts[2]
                .parse()
                .map_err(|_| TimestampError::InvalidValue("seconds", parts[2].to_string()))?;
            if hours < 0.0 || minutes < 0.0 || seconds < 0.0 {
                return Err(TimestampError::Negative);
            }
            Ok(hours * 3600.0 + minutes * 60.0 + seconds)
        }
        _ => Err(TimestampError::InvalidFormat(ts.to_string())),
    }
}

/// Format seconds compactly: `HH:MM:SS` when hours are present, `MM:SS`
/// otherwise, zero-padded. Fractional seconds are truncated.
pub fn format_compact(total_secs: f64) -> String {
    let total = total_secs.max(0.0) as u64;
    let hours = total / 3600;
    let mins = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}", mins, secs)
    }
}

/// Rescale chapter timestamps from the compressed timeline to real time.
///
/// Each timestamp is parsed, multiplied by `ratio`, and reformatted. A
/// chapter whose timestamp fails to parse is passed through unchanged, so
/// list length and order are always preserved.
pub fn rescale_chapters(chapters: &[Chapter], ratio: f64) -> Vec<Chapter> {
    chapters
        .iter()
        .map(|chapter| match parse_timestamp(&chapter.timestamp) {
            Ok(seconds) => Chapter {
                timestamp: format_compact(seconds * ratio),
                label: chapter.label.clone(),
            },
            Err(_) => chapter.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapter(ts: &str) -> Chapter {
        Chapter {
            timestamp: ts.to_string(),
            label: "Intro".to_string(),
        }
    }

    #[test]
    fn test_parse_timestamp_mm_ss() {
        assert_eq!(parse_timestamp("05:30").unwrap(), 330.0);
        assert_eq!(parse_timestamp("01:00").unwrap(), 60.0);
        assert_eq!(parse_timestamp("00:00").unwrap(), 0.0);
    }

    #[test]
    fn test_parse_timestamp_hh_mm_ss() {
        assert_eq!(parse_timestamp("01:00:00").unwrap(), 3600.0);
        assert_eq!(parse_timestamp("01:01:01").unwrap(), 3661.0);
    }

    #[test]
    fn test_parse_timestamp_errors() {
        assert!(matches!(parse_timestamp(""), Err(TimestampError::Empty)));
        assert!(matches!(
            parse_timestamp("abc"),
            Err(TimestampError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_timestamp("aa:bb"),
            Err(TimestampError::InvalidValue(_, _))
        ));
        assert!(matches!(
            parse_timestamp("1:2:3:4"),
            Err(TimestampError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_format_compact() {
        assert_eq!(format_compact(0.0), "00:00");
        assert_eq!(format_compact(90.0), "01:30");
        assert_eq!(format_compact(600.0), "10:00");
        assert_eq!(format_compact(3661.0), "01:01:01");
        assert_eq!(format_compact(36610.0), "10:10:10");
    }

    #[test]
    fn test_rescale_chapters_by_ten() {
        let rescaled = rescale_chapters(&[chapter("01:00")], 10.0);
        assert_eq!(rescaled[0].timestamp, "10:00");
        assert_eq!(rescaled[0].label, "Intro");
    }

    #[test]
    fn test_rescale_chapters_identity() {
        let rescaled = rescale_chapters(&[chapter("01:00")], 1.0);
        assert_eq!(rescaled[0].timestamp, "01:00");
    }

    #[test]
    fn test_rescale_crosses_hour_boundary() {
        // 01:01:01 compressed * 10 = 36610s real
        let rescaled = rescale_chapters(&[chapter("01:01:01")], 10.0);
        assert_eq!(rescaled[0].timestamp, "10:10:10");
    }

    #[test]
    fn test_rescale_malformed_passes_through() {
        let chapters = vec![chapter("01:00"), chapter("abc"), chapter("02:30")];
        let rescaled = rescale_chapters(&chapters, 10.0);
        assert_eq!(rescaled.len(), 3);
        assert_eq!(rescaled[0].timestamp, "10:00");
        assert_eq!(rescaled[1].timestamp, "abc");
        assert_eq!(rescaled[2].timestamp, "25:00");
    }
}
