//! Solution synthesis seam

use async_trait::async_trait;

use crate::emotion::{EmotionalContext, ResponseStyle};
use crate::registry::Agent;

/// Turns debate winners into one handler's candidate solution
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(
        &self,
        handler: &Agent,
        winning_arguments: &[String],
        emotional_context: &EmotionalContext,
    ) -> String;
}

/// Lens each handler team applies when combining arguments
const LENSES: [&str; 3] = [
    "It rests on the evidence gathered in debate, because every winning argument survived a vote.",
    "It weighs the risk of each option before committing to one.",
    "It favours the simplest next step the debate supports.",
];

/// Built-in synthesizer: frames the winning arguments through a team lens
#[derive(Debug, Clone, Default)]
pub struct TemplateSynthesizer;

impl TemplateSynthesizer {
    fn opening(style: ResponseStyle) -> &'static str {
        match style {
            ResponseStyle::Supportive => "Here is a steady way forward.",
            ResponseStyle::Empathetic => "Taking your situation into account, here is a way forward.",
            ResponseStyle::Cautious => "Proceeding carefully, here is a way forward.",
            ResponseStyle::Analytical => "Here is the recommended approach.",
        }
    }
}

/// Head of an argument, up to its first colon or period
fn headline(argument: &str) -> &str {
    let end = argument
        .find(|c: char| c == ':' || c == '.')
        .unwrap_or(argument.len());
    argument[..end].trim()
}

#[async_trait]
impl Synthesizer for TemplateSynthesizer {
    async fn synthesize(
        &self,
        handler: &Agent,
        winning_arguments: &[String],
        emotional_context: &EmotionalContext,
    ) -> String {
        let lens = LENSES[handler.team.saturating_sub(1) as usize % LENSES.len()];
        let mut text = format!(
            "{} The debate settled {} question(s).",
            Self::opening(emotional_context.response_style),
            winning_arguments.len()
        );
        if let Some(first) = winning_arguments.first() {
            text.push_str(&format!(" Leading position: {}.", headline(first)));
        }
        text.push(' ');
        text.push_str(lens);
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::AgentRole;
    use crate::voting::VoteAggregator;

    fn arguments() -> Vec<String> {
        vec![
            "A clear proposal for \"cut costs\", argued on the merits: this holds.".to_string(),
            "The concrete path through \"cut costs\": start small.".to_string(),
        ]
    }

    #[tokio::test]
    async fn test_synthesis_uses_headline_and_count() {
        let handler = Agent::new(4, AgentRole::Handler, 1);
        let text = TemplateSynthesizer
            .synthesize(&handler, &arguments(), &EmotionalContext::neutral())
            .await;
        assert!(text.starts_with("Here is the recommended approach."));
        assert!(text.contains("settled 2 question(s)"));
        assert!(text.contains("A clear proposal for \"cut costs\", argued on the merits"));
        assert!(!text.contains("this holds"));
    }

    #[tokio::test]
    async fn test_team_lenses_separate_candidates() {
        let h1 = Agent::new(4, AgentRole::Handler, 1);
        let h2 = Agent::new(8, AgentRole::Handler, 2);
        let voter = Agent::new(20, AgentRole::Counsellor, 0);
        let ctx = EmotionalContext::neutral();

        let t1 = TemplateSynthesizer.synthesize(&h1, &arguments(), &ctx).await;
        let t2 = TemplateSynthesizer.synthesize(&h2, &arguments(), &ctx).await;
        assert_ne!(t1, t2);
        assert!(VoteAggregator::score(&voter, &h1, &t1) > VoteAggregator::score(&voter, &h2, &t2));
    }

    #[test]
    fn test_headline() {
        assert_eq!(headline("Short: rest"), "Short");
        assert_eq!(headline("No separator"), "No separator");
    }
}
