//! Scorer prompt: the fixed system instruction plus the per-request comparison text.

use crate::types::{RouteStep, WeatherReading};
use once_cell::sync::Lazy;
use regex::Regex;

pub const SCORER_SYSTEM_PROMPT: &str = "You are AqrayPath SafetyScorer. Respond ONLY with a single JSON object, no prose. \
Schema: {\"deltaSafety\": integer, \"decision\": \"ask_user\"|\"continue\", \
\"message\": string, \"etaChangeMinutes\": integer, \"proposedRouteName\": string, \
\"reasons\": [string, ...]}. \
Hard rules: If route_crime_candidate > route_crime_current by ≥10, you MUST set decision='continue' \
and the message MUST end with 'Keeping your current route.'. \
If etaChangeMinutes ≥ 6 and deltaSafety ≤ 1, you MUST set decision='continue'. \
Otherwise: If candidate is meaningfully safer (deltaSafety ≥ 1) and detour is reasonable, decision='ask_user' \
with a short two-sentence message ending with 'Reroute now or continue?'. \
If candidate is worse or detour too long, decision='continue' with one short sentence ending with \
'Keeping your current route.'.";

/// Street names fed to the scorer per route.
const MAX_STREETS: usize = 8;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

/// Short street/maneuver names for a leg: the maneuver when present, otherwise the
/// instruction with markup removed. Falls back to "step N" labels when nothing is usable.
pub fn street_names(steps: &[RouteStep]) -> Vec<String> {
    let mut names: Vec<String> = steps
        .iter()
        .filter_map(|s| {
            let raw = match s.maneuver.as_deref().map(str::trim) {
                Some(m) if !m.is_empty() => m.to_string(),
                _ => HTML_TAG.replace_all(&s.instruction, " ").into_owned(),
            };
            let name = raw.split_whitespace().collect::<Vec<_>>().join(" ");
            (!name.is_empty()).then_some(name)
        })
        .collect();
    if names.is_empty() {
        names = (1..=steps.len()).map(|i| format!("step {}", i)).collect();
    }
    names.truncate(MAX_STREETS);
    names
}

/// Everything the comparison prompt mentions.
#[derive(Debug, Clone)]
pub struct PromptContext<'a> {
    pub time_hhmm: String,
    pub weather: &'a WeatherReading,
    pub area_incidents: u64,
    pub current_incidents: u64,
    pub candidate_incidents: u64,
    pub current_streets: &'a [String],
    pub candidate_streets: &'a [String],
    pub eta_change_min: i64,
    pub proposed_route_name: &'a str,
}

pub fn build_prompt(ctx: &PromptContext<'_>) -> String {
    let context = format!(
        "{}, {} degC, precipitation {} mm, street lighting rating 2, \
         crime_count_30d_500m {}, route_crime_current {}, route_crime_candidate {}.",
        ctx.weather.description,
        ctx.weather.temperature_c,
        ctx.weather.precipitation_mm,
        ctx.area_incidents,
        ctx.current_incidents,
        ctx.candidate_incidents,
    );
    format!(
        "TIME: {}\nCONTEXT: {}\nCOMPARE\nCURRENT = {}\nCANDIDATE = {}\netaChangeMinutes = {}\nproposedRouteName = {}",
        ctx.time_hhmm,
        context,
        ctx.current_streets.join(" -> "),
        ctx.candidate_streets.join(" -> "),
        ctx.eta_change_min,
        ctx.proposed_route_name,
    )
}
