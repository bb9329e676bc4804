//! Human-readable and JSON rendering of a consensus result

use std::fmt::Write as _;

use anyhow::{Context, Result};
use consensus_engine::ConsensusResult;

/// Dissenter lines shown before the rest are summarized
const MAX_DISSENT_LINES: usize = 5;

/// Pretty-printed JSON
pub fn render_json(result: &ConsensusResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("Failed to serialize consensus result")
}

/// Plain-text report
pub fn render_text(result: &ConsensusResult) -> String {
    let mut out = String::new();
    let status = if result.achieved {
        "CONSENSUS"
    } else {
        "NO CONSENSUS"
    };

    let _ = writeln!(out, "== {} ({}) ==", status, result.termination);
    let _ = writeln!(
        out,
        "agreement: {:.1}%  rounds: {}  refinements: {}",
        result.agreement_percentage * 100.0,
        result.rounds_used,
        result.refinement_passes
    );

    let _ = writeln!(out, "\nDebates:");
    if result.debate_rounds.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for round in &result.debate_rounds {
        let (a, b) = round.vote_counts();
        let tie = if round.tie_break.is_some() {
            " [tie broken]"
        } else {
            ""
        };
        let _ = writeln!(
            out,
            "  #{} agent {} vs agent {} -> agent {} ({}-{}, {:.0}%){}",
            round.round,
            round.debater_a,
            round.debater_b,
            round.winner,
            a,
            b,
            round.confidence * 100.0,
            tie
        );
    }

    let _ = writeln!(out, "\nSolution:");
    match &result.final_solution {
        Some(solution) => {
            let _ = writeln!(
                out,
                "  by agent {} (confidence {:.2})",
                solution.producer, solution.confidence
            );
            let _ = writeln!(out, "  {}", solution.text);
        }
        None => {
            let _ = writeln!(out, "  (none)");
        }
    }

    if let Some(verification) = &result.verification {
        let _ = writeln!(
            out,
            "\nVerification: {} (confidence {:.2})",
            if result.verification_passed {
                "passed"
            } else {
                "not passed"
            },
            verification.confidence
        );
        for correction in &verification.applied_corrections {
            let _ = writeln!(out, "  - {}", correction);
        }
    }

    if !result.dissenter_feedback.is_empty() {
        let _ = writeln!(out, "\nDissent ({}):", result.dissenter_feedback.len());
        for line in result.dissenter_feedback.iter().take(MAX_DISSENT_LINES) {
            let _ = writeln!(out, "  - {}", line);
        }
        let hidden = result
            .dissenter_feedback
            .len()
            .saturating_sub(MAX_DISSENT_LINES);
        if hidden > 0 {
            let _ = writeln!(out, "  ... and {} more", hidden);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use consensus_engine::{CandidateSolution, Termination};

    /// Result parsed from JSON so the test needs no uuid dependency
    fn nil_result() -> ConsensusResult {
        serde_json::from_value(serde_json::json!({
            "invocation_id": "00000000-0000-0000-0000-000000000000",
            "achieved": false,
            "agreement_percentage": 0.4,
            "rounds_used": 5,
            "final_solution": null,
            "dissenter_feedback": [],
            "verification_passed": false,
            "verification": null,
            "debate_rounds": [],
            "termination": "rounds_exhausted",
            "refinement_passes": 4
        }))
        .unwrap()
    }

    #[test]
    fn test_text_report_without_solution() {
        let text = render_text(&nil_result());
        assert!(text.starts_with("== NO CONSENSUS (rounds_exhausted) =="));
        assert!(text.contains("agreement: 40.0%  rounds: 5"));
        assert!(text.contains("(none)"));
    }

    #[test]
    fn test_text_report_truncates_dissent() {
        let mut result = nil_result();
        result.achieved = true;
        result.termination = Termination::ConsensusReached;
        result.final_solution = Some(CandidateSolution {
            producer: 4,
            text: "Do the thing.".to_string(),
            confidence: 0.7,
        });
        result.dissenter_feedback = (0..8).map(|i| format!("concern {}", i)).collect();

        let text = render_text(&result);
        assert!(text.contains("by agent 4 (confidence 0.70)"));
        assert!(text.contains("concern 4"));
        assert!(!text.contains("concern 5"));
        assert!(text.contains("... and 3 more"));
    }

    #[test]
    fn test_json_report_round_trips_fields() {
        let json = render_json(&nil_result()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["termination"], "rounds_exhausted");
        assert_eq!(value["rounds_used"], 5);
    }
}
