//! Argument generation seam
//!
//! The engine does not define argument content. It calls an injectable
//! [`ArgumentGenerator`] whose contract is: non-empty output, deterministic
//! for identical inputs and seed. [`TemplateArgumentGenerator`] is the
//! built-in role-templated implementation.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::emotion::{EmotionalContext, ResponseStyle};
use crate::registry::{Agent, AgentRole};

/// Everything a debater argues about
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArgumentRequest {
    pub topic: String,
    /// Prior conversation or caller-supplied notes
    pub context: Vec<String>,
    /// Problem complexity (0.0 - 1.0)
    pub complexity: f64,
    pub emotional_context: EmotionalContext,
}

/// Produces one debater's argument
#[async_trait]
pub trait ArgumentGenerator: Send + Sync {
    async fn generate(&self, agent: &Agent, request: &ArgumentRequest, seed: u64) -> String;
}

/// Role-templated argument generator
#[derive(Debug, Clone, Default)]
pub struct TemplateArgumentGenerator;

impl TemplateArgumentGenerator {
    fn opening(role: AgentRole) -> &'static [&'static str] {
        match role {
            AgentRole::Proposer => &[
                "The strongest position on",
                "A clear proposal for",
                "The case worth making about",
            ],
            AgentRole::Solver => &[
                "A workable solution to",
                "The concrete path through",
                "A step-by-step answer to",
            ],
            AgentRole::Adversary => &[
                "The hidden risk in",
                "What could go wrong with",
                "The weakest assumption behind",
            ],
            _ => &[
                "A balanced view of",
                "The common ground on",
                "An integrated answer to",
            ],
        }
    }

    fn support(role: AgentRole) -> &'static [&'static str] {
        match role {
            AgentRole::Proposer => &[
                "it frames the goal before the means",
                "it keeps the decision reversible",
                "it states what success looks like",
            ],
            AgentRole::Solver => &[
                "each step can be checked on its own",
                "it reuses what already works",
                "the first step can start today",
            ],
            AgentRole::Adversary => &[
                "the evidence so far is thin",
                "failure would be costly to undo",
                "the risk grows with scale",
            ],
            _ => &[
                "both sides share the same constraint",
                "the disagreement is about order, not direction",
                "the analysis converges on one next step",
            ],
        }
    }

    fn tone(style: ResponseStyle) -> &'static str {
        match style {
            ResponseStyle::Supportive => "with care for the person asking",
            ResponseStyle::Empathetic => "acknowledging how this feels",
            ResponseStyle::Cautious => "carefully, given the stakes",
            ResponseStyle::Analytical => "on the merits",
        }
    }
}

#[async_trait]
impl ArgumentGenerator for TemplateArgumentGenerator {
    async fn generate(&self, agent: &Agent, request: &ArgumentRequest, seed: u64) -> String {
        let mut rng = StdRng::seed_from_u64(seed);

        let opening = Self::opening(agent.role)
            .choose(&mut rng)
            .copied()
            .unwrap_or("A view on");

        let points = 1 + (request.complexity.clamp(0.0, 1.0) * 2.0).round() as usize;
        let mut support: Vec<&str> = Self::support(agent.role).to_vec();
        support.shuffle(&mut rng);
        support.truncate(points);

        let mut argument = format!(
            "{} \"{}\", argued {}: this holds because {}.",
            opening,
            request.topic,
            Self::tone(request.emotional_context.response_style),
            support.join(", and ")
        );
        if let Some(note) = request.context.last() {
            argument.push_str(&format!(" It also accounts for: {}.", note));
        }
        argument
    }
}
