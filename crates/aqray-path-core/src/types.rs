//! Shared types: routes, weather, incident summaries and the canonical Decision.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const ASK_USER_SUFFIX: &str = "Reroute now or continue?";
pub const CONTINUE_SUFFIX: &str = "Keeping your current route.";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// One maneuver of a leg. `instruction` is the provider's (possibly HTML) text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    pub instruction: String,
    #[serde(default)]
    pub maneuver: Option<String>,
    #[serde(default)]
    pub end_location: Option<LatLng>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteLeg {
    pub steps: Vec<RouteStep>,
    pub duration_secs: u64,
    #[serde(default)]
    pub start_location: Option<LatLng>,
    #[serde(default)]
    pub end_location: Option<LatLng>,
}

/// A whole route as returned by the directions provider (we only use the first leg).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteOption {
    pub summary: String,
    pub polyline: String,
    pub leg: RouteLeg,
}

/// Fastest route and the alternative it is compared against.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutePair {
    pub current: RouteOption,
    pub candidate: RouteOption,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    pub description: String,
    pub code: i64,
    pub temperature_c: f64,
    pub precipitation_mm: f64,
}

impl WeatherReading {
    /// Reading used when the weather service cannot be reached. Code 0 is not adverse.
    pub fn unavailable() -> Self {
        Self {
            description: "Weather unavailable".to_string(),
            code: 0,
            temperature_c: 0.0,
            precipitation_mm: 0.0,
        }
    }
}

/// One probed waypoint and the incidents reported around it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IncidentSample {
    pub lat: f64,
    pub lon: f64,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncidentSummary {
    pub total: u64,
    pub samples: Vec<IncidentSample>,
    pub radius_m: u32,
    pub days: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionValue {
    AskUser,
    Continue,
}

impl DecisionValue {
    /// Anything other than the literal `ask_user` collapses to `Continue`.
    pub fn parse(raw: &str) -> Self {
        if raw.trim() == "ask_user" {
            Self::AskUser
        } else {
            Self::Continue
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AskUser => "ask_user",
            Self::Continue => "continue",
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            Self::AskUser => ASK_USER_SUFFIX,
            Self::Continue => CONTINUE_SUFFIX,
        }
    }
}

/// Canonical decision returned to the client as `agent_response`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub delta_safety: i64,
    pub decision: DecisionValue,
    pub message: String,
    pub eta_change_minutes: i64,
    pub proposed_route_name: String,
    pub reasons: BTreeSet<String>,
    #[serde(
        rename = "rules_applied",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub rules_applied: Option<Vec<String>>,
}

/// Appends the mandatory suffix for `decision` unless the message already carries it.
/// Trailing periods are stripped before joining; an empty message becomes the bare suffix
/// preceded by `fallback`.
pub fn with_suffix(decision: DecisionValue, message: &str, fallback: &str) -> String {
    let suffix = decision.suffix();
    let trimmed = message.trim();
    if trimmed.ends_with(suffix) {
        return trimmed.to_string();
    }
    let base = trimmed.trim_end_matches('.').trim_end();
    let base = if base.is_empty() {
        fallback.trim_end_matches('.')
    } else {
        base
    };
    format!("{}. {}", base, suffix)
}

/// Raw signals every reason and rule tag is derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteSignals {
    pub current_incidents: u64,
    pub candidate_incidents: u64,
    pub detour_minutes: i64,
    pub detour_cap: i64,
    pub is_night: bool,
    pub current_lighting: u32,
    pub candidate_lighting: u32,
    pub weather_code: i64,
}

impl RouteSignals {
    /// Positive when the candidate saw fewer incidents.
    pub fn crime_delta(&self) -> i64 {
        self.current_incidents as i64 - self.candidate_incidents as i64
    }
}
