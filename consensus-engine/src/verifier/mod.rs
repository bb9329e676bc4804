//! Verification Loop: post-consensus correction pass
//!
//! Runs a fixed, ordered list of checks over the winning candidate text.
//! Each failed check applies a correction to the evolving text and raises
//! confidence. The engine treats the candidate as verified only when
//! confidence ends above the starting value, i.e. when at least one
//! correction was needed and applied.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::emotion::{EmotionalContext, ResponseStyle, Urgency};

/// Confidence before any check runs
pub const BASE_CONFIDENCE: f64 = 0.8;

/// Confidence added per applied correction
pub const CORRECTION_BONUS: f64 = 0.05;

/// Upper bound on verification confidence
pub const MAX_CONFIDENCE: f64 = 0.95;

/// Texts shorter than this (in characters) get a completeness prompt
pub const MIN_COMPLETE_LEN: usize = 100;

/// Longest input excerpt quoted in the completeness prompt
const EXCERPT_LEN: usize = 40;

const EMPATHY_MARKERS: &[&str] = &[
    "i understand",
    "i hear you",
    "that sounds",
    "it makes sense that you",
];

const URGENCY_MARKERS: &[&str] = &[
    "right away",
    "immediately",
    "as soon as possible",
    "urgent",
    "first priority",
];

const EMPATHY_LINE: &str = "I understand how important this is to you.";
const URGENCY_LINE: &str = "Because this is time-sensitive, act on the first step right away.";

/// Result of verifying one candidate text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub original_text: String,
    pub corrected_text: String,
    /// Corrections in the order they were applied
    pub applied_corrections: Vec<String>,
    pub confidence: f64,
}

impl VerificationOutcome {
    /// Verified iff confidence rose above the base value
    pub fn passed(&self) -> bool {
        self.confidence > BASE_CONFIDENCE
    }

    /// Findings handed back to the consensus loop on a failed verification
    pub fn findings(&self) -> Vec<String> {
        if self.applied_corrections.is_empty() {
            return vec![format!(
                "Verification left the answer unchanged at confidence {:.2}.",
                self.confidence
            )];
        }
        self.applied_corrections
            .iter()
            .map(|c| format!("Verification {}.", c))
            .collect()
    }
}

/// Stateless verifier
#[derive(Debug, Clone, Copy, Default)]
pub struct VerificationLoop;

impl VerificationLoop {
    pub fn verify(
        candidate_text: &str,
        original_input: &str,
        emotional_context: &EmotionalContext,
    ) -> VerificationOutcome {
        let mut text = candidate_text.to_string();
        let mut applied = Vec::new();

        if emotional_context.response_style == ResponseStyle::Supportive
            && !has_marker(&text, EMPATHY_MARKERS)
        {
            text = format!("{} {}", EMPATHY_LINE, text);
            applied.push("added an empathy acknowledgment".to_string());
        }

        if emotional_context.urgency == Urgency::High && !has_marker(&text, URGENCY_MARKERS) {
            text = inject_after_first_sentence(&text, URGENCY_LINE);
            applied.push("added an urgency cue".to_string());
        }

        if text.chars().count() < MIN_COMPLETE_LEN {
            text.push(' ');
            text.push_str(&completeness_prompt(original_input));
            applied.push("appended a completeness prompt".to_string());
        }

        let confidence =
            (BASE_CONFIDENCE + applied.len() as f64 * CORRECTION_BONUS).min(MAX_CONFIDENCE);
        debug!(
            corrections = applied.len(),
            confidence,
            "Verification checks finished"
        );

        VerificationOutcome {
            original_text: candidate_text.to_string(),
            corrected_text: text,
            applied_corrections: applied,
            confidence,
        }
    }
}

fn has_marker(text: &str, markers: &[&str]) -> bool {
    let lower = text.to_lowercase();
    markers.iter().any(|m| lower.contains(m))
}

/// Insert `line` after the first sentence, or append it when there is only one
fn inject_after_first_sentence(text: &str, line: &str) -> String {
    let boundary = [". ", "! ", "? "]
        .iter()
        .filter_map(|sep| text.find(sep).map(|i| i + 1))
        .min();
    match boundary {
        Some(i) => format!("{} {}{}", &text[..i], line, &text[i..]),
        None => format!("{} {}", text, line),
    }
}

fn completeness_prompt(original_input: &str) -> String {
    let trimmed = original_input.trim();
    if trimmed.is_empty() {
        return "Tell me if you want more detail on any step.".to_string();
    }
    let mut excerpt: String = trimmed.chars().take(EXCERPT_LEN).collect();
    if trimmed.chars().count() > EXCERPT_LEN {
        excerpt.push_str("...");
    }
    format!(
        "If anything about \"{}\" is still unclear, ask and I will go into more detail.",
        excerpt
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::EmotionalContextAnalyzer;

    const LONG_ANSWER: &str = "Start with a written plan for the migration. Move one service at a \
                               time and keep the old path available until the new one is proven.";

    #[test]
    fn test_short_text_gets_completeness_prompt() {
        let text = "Split the work into two smaller changes.";
        assert_eq!(text.chars().count(), 40);

        let outcome = VerificationLoop::verify(text, "How do I ship this?", &EmotionalContext::neutral());
        assert_eq!(outcome.applied_corrections, vec!["appended a completeness prompt"]);
        assert!(outcome.corrected_text.starts_with(text));
        assert!(outcome.corrected_text.contains("How do I ship this?"));
        assert!(outcome.confidence >= 0.83);
        assert!(outcome.passed());
    }

    #[test]
    fn test_clean_text_does_not_pass() {
        let outcome = VerificationLoop::verify(LONG_ANSWER, "plan", &EmotionalContext::neutral());
        assert!(outcome.applied_corrections.is_empty());
        assert_eq!(outcome.corrected_text, LONG_ANSWER);
        assert_eq!(outcome.confidence, BASE_CONFIDENCE);
        assert!(!outcome.passed());
        assert_eq!(outcome.findings().len(), 1);
    }

    #[test]
    fn test_distressed_input_gets_empathy_and_urgency() {
        let input = "I am furious and this is an emergency!!!";
        let ctx = EmotionalContextAnalyzer::analyze(input);
        let outcome = VerificationLoop::verify("Call the vendor. Then file a report.", input, &ctx);

        // the two added lines already make the text long enough
        assert_eq!(
            outcome.applied_corrections,
            vec!["added an empathy acknowledgment", "added an urgency cue"]
        );
        assert!(outcome.corrected_text.starts_with(EMPATHY_LINE));
        // urgency cue lands after the first sentence (the empathy line)
        let after_empathy = &outcome.corrected_text[EMPATHY_LINE.len()..];
        assert!(after_empathy.trim_start().starts_with(URGENCY_LINE));
        assert!((outcome.confidence - 0.9).abs() < 1e-9);
        assert_eq!(outcome.findings().len(), 2);
    }

    #[test]
    fn test_existing_markers_are_respected() {
        let input = "This is urgent!!! I am so upset";
        let ctx = EmotionalContextAnalyzer::analyze(input);
        let text = format!("I hear you. Fix the config immediately. {}", LONG_ANSWER);
        let outcome = VerificationLoop::verify(&text, input, &ctx);
        assert!(outcome.applied_corrections.is_empty());
        assert_eq!(outcome.corrected_text, text);
    }

    #[test]
    fn test_inject_single_sentence() {
        assert_eq!(inject_after_first_sentence("Do it", "Now."), "Do it Now.");
        assert_eq!(
            inject_after_first_sentence("One. Two.", "Mid."),
            "One. Mid. Two."
        );
    }
}
