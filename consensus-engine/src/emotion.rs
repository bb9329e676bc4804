//! Emotional Context Analysis: keyword and punctuation signals
//!
//! Derives trigger tags, intensity, sentiment, urgency and a response-style
//! hint from the input text. The analysis is a pure function of the text:
//! identical input always yields an identical [`EmotionalContext`].

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

const POSITIVE_KEYWORDS: &[&str] = &[
    "happy", "great", "excellent", "love", "wonderful", "good", "thanks", "amazing", "glad",
    "excited",
];

const NEGATIVE_KEYWORDS: &[&str] = &[
    "angry", "furious", "sad", "terrible", "hate", "awful", "frustrated", "upset", "bad",
    "disappointed", "annoyed",
];

const URGENT_KEYWORDS: &[&str] = &[
    "urgent", "emergency", "asap", "immediately", "critical", "deadline", "now",
];

const SUPPORTIVE_KEYWORDS: &[&str] = &[
    "help", "support", "worried", "anxious", "scared", "lonely", "struggling", "overwhelmed",
];

/// Intensity added per keyword hit
const KEYWORD_INTENSITY: f64 = 0.15;
const EXCLAMATION_WEIGHT: f64 = 0.1;
const QUESTION_WEIGHT: f64 = 0.05;
const CAPS_WEIGHT: f64 = 0.5;

/// Exclamation marks above this count force high urgency
const URGENT_EXCLAMATIONS: usize = 2;
/// Uppercase-letter ratio above this forces high urgency
const URGENT_CAPS_RATIO: f64 = 0.3;

/// Keyword category a trigger belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerCategory {
    Positive,
    Negative,
    Urgent,
    Supportive,
}

impl TriggerCategory {
    fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Positive => POSITIVE_KEYWORDS,
            Self::Negative => NEGATIVE_KEYWORDS,
            Self::Urgent => URGENT_KEYWORDS,
            Self::Supportive => SUPPORTIVE_KEYWORDS,
        }
    }

    fn all() -> [TriggerCategory; 4] {
        [
            Self::Positive,
            Self::Negative,
            Self::Urgent,
            Self::Supportive,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

/// How the final answer should be phrased
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStyle {
    Supportive,
    Analytical,
    Cautious,
    Empathetic,
}

impl std::fmt::Display for ResponseStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Supportive => write!(f, "supportive"),
            Self::Analytical => write!(f, "analytical"),
            Self::Cautious => write!(f, "cautious"),
            Self::Empathetic => write!(f, "empathetic"),
        }
    }
}

/// Result of analyzing one input text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalContext {
    /// Matched keywords
    pub triggers: BTreeSet<String>,
    /// Categories with at least one matched keyword
    pub categories: BTreeSet<TriggerCategory>,
    /// Emotional intensity (0.0 - 1.0)
    pub intensity: f64,
    pub sentiment: Sentiment,
    pub urgency: Urgency,
    pub response_style: ResponseStyle,
}

impl EmotionalContext {
    /// Context for text with no emotional signal at all
    pub fn neutral() -> Self {
        Self {
            triggers: BTreeSet::new(),
            categories: BTreeSet::new(),
            intensity: 0.0,
            sentiment: Sentiment::Neutral,
            urgency: Urgency::Low,
            response_style: ResponseStyle::Analytical,
        }
    }

    pub fn has_category(&self, category: TriggerCategory) -> bool {
        self.categories.contains(&category)
    }
}

/// Keyword-table analyzer for emotional context
#[derive(Debug, Clone, Default)]
pub struct EmotionalContextAnalyzer;

impl EmotionalContextAnalyzer {
    pub fn analyze(text: &str) -> EmotionalContext {
        let tokens: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
            .collect();

        let mut triggers = BTreeSet::new();
        let mut categories = BTreeSet::new();
        let mut positive_hits = 0usize;
        let mut negative_hits = 0usize;
        let mut total_hits = 0usize;

        for category in TriggerCategory::all() {
            for token in &tokens {
                if category.keywords().contains(&token.as_str()) {
                    triggers.insert(token.clone());
                    categories.insert(category);
                    total_hits += 1;
                    match category {
                        TriggerCategory::Positive => positive_hits += 1,
                        TriggerCategory::Negative => negative_hits += 1,
                        _ => {}
                    }
                }
            }
        }

        let exclamations = text.matches('!').count();
        let questions = text.matches('?').count();
        let caps_ratio = caps_ratio(text);

        let intensity = (total_hits as f64 * KEYWORD_INTENSITY
            + exclamations as f64 * EXCLAMATION_WEIGHT
            + questions as f64 * QUESTION_WEIGHT
            + caps_ratio * CAPS_WEIGHT)
            .min(1.0);

        let sentiment = match positive_hits.cmp(&negative_hits) {
            std::cmp::Ordering::Greater => Sentiment::Positive,
            std::cmp::Ordering::Less => Sentiment::Negative,
            std::cmp::Ordering::Equal => Sentiment::Neutral,
        };

        let urgency = if categories.contains(&TriggerCategory::Urgent)
            || exclamations > URGENT_EXCLAMATIONS
            || caps_ratio > URGENT_CAPS_RATIO
        {
            Urgency::High
        } else if exclamations > 0 || intensity > 0.4 {
            Urgency::Medium
        } else {
            Urgency::Low
        };

        let response_style = if sentiment == Sentiment::Negative || urgency == Urgency::High {
            ResponseStyle::Supportive
        } else if categories.contains(&TriggerCategory::Supportive) {
            ResponseStyle::Empathetic
        } else if intensity > 0.5 {
            ResponseStyle::Cautious
        } else {
            ResponseStyle::Analytical
        };

        EmotionalContext {
            triggers,
            categories,
            intensity,
            sentiment,
            urgency,
            response_style,
        }
    }
}

/// Fraction of alphabetic characters that are uppercase
fn caps_ratio(text: &str) -> f64 {
    let letters = text.chars().filter(|c| c.is_alphabetic()).count();
    if letters == 0 {
        return 0.0;
    }
    let upper = text.chars().filter(|c| c.is_uppercase()).count();
    upper as f64 / letters as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_furious_emergency() {
        let ctx = EmotionalContextAnalyzer::analyze("I am furious and this is an emergency!!!");
        assert_eq!(ctx.sentiment, Sentiment::Negative);
        assert_eq!(ctx.urgency, Urgency::High);
        assert_eq!(ctx.response_style, ResponseStyle::Supportive);
        assert!(ctx.triggers.contains("furious"));
        assert!(ctx.triggers.contains("emergency"));
        assert!(ctx.has_category(TriggerCategory::Urgent));
    }

    #[test]
    fn test_plain_question_is_analytical() {
        let ctx = EmotionalContextAnalyzer::analyze("Which storage layout should we use");
        assert_eq!(ctx.sentiment, Sentiment::Neutral);
        assert_eq!(ctx.urgency, Urgency::Low);
        assert_eq!(ctx.response_style, ResponseStyle::Analytical);
        assert!(ctx.triggers.is_empty());
    }

    #[test]
    fn test_supportive_keyword_is_empathetic() {
        let ctx = EmotionalContextAnalyzer::analyze("I feel a little worried about the move");
        assert_eq!(ctx.sentiment, Sentiment::Neutral);
        assert_eq!(ctx.response_style, ResponseStyle::Empathetic);
    }

    #[test]
    fn test_caps_escalate_urgency() {
        let ctx = EmotionalContextAnalyzer::analyze("WHY IS THIS STILL BROKEN");
        assert_eq!(ctx.urgency, Urgency::High);
        assert_eq!(ctx.response_style, ResponseStyle::Supportive);
    }

    #[test]
    fn test_positive_sentiment() {
        let ctx = EmotionalContextAnalyzer::analyze("This is a great and amazing plan, thanks!");
        assert_eq!(ctx.sentiment, Sentiment::Positive);
        assert_eq!(ctx.urgency, Urgency::Medium);
        assert_eq!(ctx.response_style, ResponseStyle::Cautious);
    }

    #[test]
    fn test_keywords_match_whole_words_only() {
        // "know" must not match "now"
        let ctx = EmotionalContextAnalyzer::analyze("I know the answer");
        assert!(ctx.triggers.is_empty());
        assert_eq!(ctx.urgency, Urgency::Low);
    }

    #[test]
    fn test_intensity_is_capped() {
        let ctx = EmotionalContextAnalyzer::analyze(
            "URGENT!!! EMERGENCY!!! FURIOUS ANGRY TERRIBLE AWFUL HELP NOW!!!???",
        );
        assert!(ctx.intensity <= 1.0);
        assert_eq!(ctx.intensity, 1.0);
    }

    #[test]
    fn test_analysis_is_replayable() {
        let text = "Please help, this is urgent?";
        assert_eq!(
            EmotionalContextAnalyzer::analyze(text),
            EmotionalContextAnalyzer::analyze(text)
        );
    }

    #[test]
    fn test_empty_text() {
        let ctx = EmotionalContextAnalyzer::analyze("");
        assert_eq!(ctx, EmotionalContext::neutral());
    }
}
