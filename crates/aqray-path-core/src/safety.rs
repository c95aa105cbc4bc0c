//! Final safety override. Runs after either decision source and cannot be argued with:
//! a candidate with materially more incidents is never recommended.

use crate::types::{Decision, DecisionValue, CONTINUE_SUFFIX};

/// Incident increase at which the candidate is rejected outright.
pub const OVERRIDE_MARGIN: u64 = 10;
pub const HIGHER_ROUTE_CRIME: &str = "higher route crime";

/// True when the candidate saw at least `OVERRIDE_MARGIN` more incidents.
pub fn override_applies(current_incidents: u64, candidate_incidents: u64) -> bool {
    candidate_incidents >= current_incidents.saturating_add(OVERRIDE_MARGIN)
}

/// Force `continue` when the candidate is materially more dangerous. Idempotent.
pub fn apply_safety_override(
    mut decision: Decision,
    current_incidents: u64,
    candidate_incidents: u64,
) -> Decision {
    if !override_applies(current_incidents, candidate_incidents) {
        return decision;
    }
    let diff = candidate_incidents - current_incidents;
    tracing::info!(
        current = current_incidents,
        candidate = candidate_incidents,
        "safety override: candidate rejected"
    );
    decision.decision = DecisionValue::Continue;
    decision.message = format!(
        "Candidate has higher recent incident density (+{}). {}",
        diff, CONTINUE_SUFFIX
    );
    decision.reasons.insert(HIGHER_ROUTE_CRIME.to_string());
    decision
}
