//! Decision pipeline: scorer reply (or heuristic) -> safety override -> reasons & tags.

use crate::heuristic::heuristic_decision;
use crate::normalizer::{normalize, ModelReply};
use crate::reasons::annotate;
use crate::safety::apply_safety_override;
use crate::types::{Decision, RouteSignals};
use serde::Serialize;

/// Which engine produced the pre-override decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    Model,
    Heuristic,
}

/// Run the full decision pipeline.
///
/// `model_content` is the scorer's raw reply, or `None` when the call failed. An
/// unstructured reply is treated the same as a failed call.
pub fn decide(
    signals: &RouteSignals,
    model_content: Option<&str>,
    candidate_name: &str,
) -> (Decision, DecisionSource) {
    let reply = model_content.map(ModelReply::parse);
    let (decision, source) = match reply {
        Some(reply @ ModelReply::Structured(_)) => (
            normalize(&reply, signals.detour_minutes, candidate_name),
            DecisionSource::Model,
        ),
        Some(ModelReply::Unstructured { raw }) => {
            tracing::warn!(
                "scorer reply is not a JSON object, using local heuristic: {:.120}",
                raw
            );
            (heuristic_decision(signals, candidate_name), DecisionSource::Heuristic)
        }
        None => (heuristic_decision(signals, candidate_name), DecisionSource::Heuristic),
    };

    let decision = apply_safety_override(
        decision,
        signals.current_incidents,
        signals.candidate_incidents,
    );
    (annotate(decision, signals), source)
}
