//! Local heuristic decision engine: the fallback whenever the remote scorer is
//! unreachable or answers with something unusable.
//!
//! Rules run in a fixed order and later rules may overwrite earlier ones. A
//! candidate rejected for higher crime short-circuits everything else; otherwise the
//! large-detour rule runs last so a long walk with little gain never produces a
//! reroute prompt.

use crate::types::{with_suffix, Decision, DecisionValue, RouteSignals, RouteStep};
use std::collections::BTreeSet;

/// Candidate must exceed current by more than this to be called out as worse.
pub const CRIME_MARGIN: i64 = 10;
/// Incident reduction needed before the candidate counts as meaningfully safer.
pub const CRIME_GAIN_THRESHOLD: i64 = 15;
/// Incident increase at which the candidate is reported as riskier.
pub const CRIME_INCREASE_THRESHOLD: i64 = 10;
/// Safety deltas at or below this are "no clear gain".
pub const SMALL_GAIN_THRESHOLD: i64 = 1;

pub const FALLBACK_NOTICE: &str = "Using local heuristic due to AI service error.";
pub const DEFAULT_ROUTE_NAME: &str = "Candidate Route";

/// Street-type keywords that tend to mean wider, better lit streets.
const LIGHTING_KEYWORDS: &[&str] = &["blvd", "ave", "main", "park", "downtown", "plaza", "square"];

/// Number of lighting keywords present anywhere in the leg's instructions.
/// Each keyword counts once no matter how often it appears.
pub fn lighting_score(steps: &[RouteStep]) -> u32 {
    let text = steps
        .iter()
        .map(|s| s.instruction.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    LIGHTING_KEYWORDS
        .iter()
        .filter(|kw| text.contains(*kw))
        .count() as u32
}

/// Decide from raw signals alone.
pub fn heuristic_decision(signals: &RouteSignals, proposed_route_name: &str) -> Decision {
    let cap = signals.detour_cap;
    let detour = signals.detour_minutes;
    let current = signals.current_incidents as i64;
    let candidate = signals.candidate_incidents as i64;

    let mut decision = DecisionValue::Continue;
    let mut delta_safety: i64 = 0;
    let mut reasons = BTreeSet::new();
    let mut message = FALLBACK_NOTICE.to_string();

    let candidate_worse = candidate > current + CRIME_MARGIN;
    if candidate_worse {
        reasons.insert("higher route crime".to_string());
        message = format!(
            "Candidate has higher recent incident density (+{}).",
            candidate - current
        );
    } else {
        let crime_gain = current - candidate;
        if crime_gain >= CRIME_GAIN_THRESHOLD && detour <= cap {
            decision = DecisionValue::AskUser;
            delta_safety = 2;
            reasons.insert("lower route crime".to_string());
            message = format!(
                "Candidate shows a lower recent incident density (−{}).",
                crime_gain
            );
        }
    }

    if signals.is_night
        && signals.candidate_lighting > signals.current_lighting
        && detour <= cap
        && !candidate_worse
    {
        if decision != DecisionValue::AskUser {
            message = "Candidate appears better lit at night.".to_string();
        }
        decision = DecisionValue::AskUser;
        delta_safety = delta_safety.max(1);
        reasons.insert("better lighting at night".to_string());
    }

    if !candidate_worse && detour >= cap && delta_safety <= SMALL_GAIN_THRESHOLD {
        decision = DecisionValue::Continue;
        reasons.insert("large ETA penalty".to_string());
        message = format!(
            "Detour adds ~{} min without a clear safety gain.",
            detour
        );
    }

    let name = proposed_route_name.trim();
    Decision {
        delta_safety,
        decision,
        message: with_suffix(decision, &message, FALLBACK_NOTICE),
        eta_change_minutes: detour,
        proposed_route_name: if name.is_empty() {
            DEFAULT_ROUTE_NAME.to_string()
        } else {
            name.to_string()
        },
        reasons,
        rules_applied: None,
    }
}
