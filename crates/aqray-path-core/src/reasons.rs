//! Reason & tag synthesis.
//!
//! Reasons are re-derived from the raw signals on every request, whatever the scorer
//! claimed, and unioned into the decision's own set. Rule tags only describe which
//! guard rails were in play; they never change the decision.

use crate::heuristic::{CRIME_GAIN_THRESHOLD, CRIME_INCREASE_THRESHOLD, SMALL_GAIN_THRESHOLD};
use crate::safety::override_applies;
use crate::types::{Decision, RouteSignals};
use std::collections::BTreeSet;

pub const TAG_HIGHER_ROUTE_CRIME: &str = "override:higher_route_crime";
pub const TAG_LARGE_ETA_SMALL_GAIN: &str = "override:large_eta_small_gain";

/// Open-Meteo WMO codes: fog, drizzle, rain, snow, showers, thunderstorms.
const ADVERSE_WEATHER_CODES: &[i64] = &[
    45, 48, 51, 53, 55, 61, 63, 65, 71, 73, 75, 80, 81, 82, 95, 96, 99,
];

pub fn is_bad_weather(code: i64) -> bool {
    ADVERSE_WEATHER_CODES.contains(&code)
}

/// Human-readable reasons implied by the signals alone.
pub fn derive_reasons(signals: &RouteSignals) -> BTreeSet<String> {
    let mut reasons = BTreeSet::new();

    let crime_delta = signals.crime_delta();
    if crime_delta >= CRIME_GAIN_THRESHOLD {
        reasons.insert(format!(
            "Meaningfully lower recent incidents on candidate (−{})",
            crime_delta
        ));
    } else if -crime_delta >= CRIME_INCREASE_THRESHOLD {
        reasons.insert(format!(
            "Higher recent incidents on candidate (+{})",
            -crime_delta
        ));
    }

    if signals.detour_minutes > 0 {
        reasons.insert(format!("Adds about {} min", signals.detour_minutes));
    }

    if signals.is_night && signals.candidate_lighting != signals.current_lighting {
        if signals.candidate_lighting > signals.current_lighting {
            reasons.insert("Better lighting cues on candidate at night".to_string());
        } else {
            reasons.insert("Current route appears better lit at night".to_string());
        }
    }

    if is_bad_weather(signals.weather_code) {
        reasons.insert("Weather caution (rain/fog/snow/storms)".to_string());
    }

    reasons
}

/// Guard-rail tags for the final decision. `delta_safety` is the post-override value.
pub fn rule_tags(signals: &RouteSignals, decision: &Decision) -> Vec<String> {
    let mut tags = Vec::new();
    if override_applies(signals.current_incidents, signals.candidate_incidents) {
        tags.push(TAG_HIGHER_ROUTE_CRIME.to_string());
    }
    if signals.detour_minutes >= signals.detour_cap && decision.delta_safety <= SMALL_GAIN_THRESHOLD
    {
        tags.push(TAG_LARGE_ETA_SMALL_GAIN.to_string());
    }
    tags
}

/// Union derived reasons into the decision and attach rule tags (omitted when none fired).
pub fn annotate(mut decision: Decision, signals: &RouteSignals) -> Decision {
    decision.reasons.extend(derive_reasons(signals));
    let tags = rule_tags(signals, &decision);
    decision.rules_applied = if tags.is_empty() { None } else { Some(tags) };
    decision
}
