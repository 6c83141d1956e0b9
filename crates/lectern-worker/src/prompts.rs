//! Analysis prompts.
//!
//! Each compression strategy gets its own framing so the model reads
//! timestamps off the right timeline; the structured-output rules are
//! shared.

use lectern_models::CompressionStrategy;

/// Shared structured-output rules appended to every analysis prompt.
pub const BASE_RULES: &str = r#"I need a structured JSON output.
RULES:
1. Output ONLY valid JSON.
2. Do NOT use markdown code blocks (no ```json).
3. Escape any quotes inside strings.
4. "transcript_summary": Comprehensive detailed notes of the lecture concepts of what was SPOKEN.
5. "visual_summary": Detailed description of what was SHOWN (slides, diagrams, code blocks, physical objects). Be specific (e.g., "A diagram showing the Event Loop").
6. "chapters": List of objects with "timestamp" (MM:SS) and "label".
7. "tags": List of 5-10 technical keywords."#;

/// Corrective instruction appended after a structured-parse failure.
pub const CORRECTIVE_SUFFIX: &str = "\n\nCRITICAL: Your previous response was not valid JSON. Please try again and strictly follow all JSON formatting rules. Escape all quotes.";

/// Build the analysis prompt for the strategy that was actually applied.
pub fn analysis_prompt(strategy: CompressionStrategy) -> String {
    match strategy {
        CompressionStrategy::Original => {
            format!("Analyze this lecture VIDEO.\n{}", BASE_RULES)
        }
        CompressionStrategy::AudioOnly => {
            format!("Analyze this AUDIO.\n{}", BASE_RULES)
        }
        CompressionStrategy::Decoupled => format!(
            r#"I have provided two files:
1. The FULL AUDIO of a lecture.
2. A SILENT VIDEO of the slides, accelerated (Hyper-Lapse).
   - In the video, 1 second of playback equals 10 seconds of real time.

Please correlate the Audio transcript with the Visual slides.
Use the Audio for the timestamps and summary.
Use the Video to describe the visual context (slides/diagrams).
{}"#,
            BASE_RULES
        ),
        CompressionStrategy::SyncedSlideshow => format!(
            r#"This lecture VIDEO has been time-compressed: 1 second of playback equals 10 seconds of real time, and the audio is sped up by the same factor.
Describe the spoken content and the visuals, and report chapter timestamps as they appear on the compressed timeline.
{}"#,
            BASE_RULES
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_prompt_carries_base_rules() {
        for strategy in [
            CompressionStrategy::Original,
            CompressionStrategy::AudioOnly,
            CompressionStrategy::Decoupled,
            CompressionStrategy::SyncedSlideshow,
        ] {
            let prompt = analysis_prompt(strategy);
            assert!(prompt.contains("transcript_summary"), "{}", strategy);
            assert!(prompt.contains("ONLY valid JSON"), "{}", strategy);
        }
    }

    #[test]
    fn test_decoupled_prompt_explains_hyperlapse() {
        let prompt = analysis_prompt(CompressionStrategy::Decoupled);
        assert!(prompt.contains("FULL AUDIO"));
        assert!(prompt.contains("1 second of playback equals 10 seconds"));
    }
}
