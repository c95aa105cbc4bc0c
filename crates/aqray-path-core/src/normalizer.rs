//! Model Response Normalizer: turns the scorer's free-form reply into a Decision.
//!
//! The scorer is asked for exactly one JSON object. What actually comes back is
//! classified first ([`ModelReply`]) and only a structured reply is coerced field by
//! field; anything else sends the caller to the heuristic engine.

use crate::types::{with_suffix, Decision, DecisionValue};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

pub const NO_GAIN_MESSAGE: &str = "Candidate offers no clear safety gain.";
pub const SAFER_MESSAGE: &str = "Candidate route looks safer.";

/// Fields the scorer supplied, already type-coerced. Absent fields stay `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelFields {
    pub delta_safety: Option<i64>,
    pub decision: Option<String>,
    pub message: Option<String>,
    pub eta_change_minutes: Option<i64>,
    pub proposed_route_name: Option<String>,
    pub reasons: Vec<String>,
}

/// Classified scorer reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    /// Content parsed as a JSON object.
    Structured(ModelFields),
    /// Anything else; carries the raw text for logging.
    Unstructured { raw: String },
}

impl ModelReply {
    /// Strict parse: the whole (trimmed) content must be one JSON object.
    pub fn parse(content: &str) -> Self {
        match serde_json::from_str::<Value>(content.trim()) {
            Ok(Value::Object(map)) => ModelReply::Structured(ModelFields::from_map(&map)),
            _ => ModelReply::Unstructured {
                raw: content.to_string(),
            },
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, ModelReply::Structured(_))
    }
}

impl ModelFields {
    fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            delta_safety: map.get("deltaSafety").and_then(coerce_int),
            decision: map.get("decision").and_then(coerce_string),
            message: map.get("message").and_then(coerce_string),
            eta_change_minutes: map.get("etaChangeMinutes").and_then(coerce_int),
            proposed_route_name: map.get("proposedRouteName").and_then(coerce_string),
            reasons: map
                .get("reasons")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

/// Integers, floats (truncated) and numeric strings; everything else is absent.
fn coerce_int(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        Value::Bool(b) => Some(*b as i64),
        _ => None,
    }
}

fn coerce_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Coerce a reply into a suffix-compliant Decision. Never fails: an unstructured reply
/// yields the generic "no clear gain" continue decision.
pub fn normalize(reply: &ModelReply, eta_change_min: i64, candidate_name: &str) -> Decision {
    let empty = ModelFields::default();
    let fields = match reply {
        ModelReply::Structured(f) => f,
        ModelReply::Unstructured { .. } => &empty,
    };

    let decision = DecisionValue::parse(fields.decision.as_deref().unwrap_or("continue"));
    let raw_message = fields.message.as_deref().unwrap_or("").trim();
    let message = match decision {
        DecisionValue::AskUser => with_suffix(decision, raw_message, SAFER_MESSAGE),
        DecisionValue::Continue => {
            // Continue messages are one sentence: keep the first line only.
            let first_line = raw_message.lines().next().unwrap_or("").trim();
            let base = if raw_message.ends_with(decision.suffix()) {
                raw_message
            } else {
                first_line
            };
            with_suffix(decision, base, NO_GAIN_MESSAGE)
        }
    };

    let proposed = fields
        .proposed_route_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(candidate_name)
        .to_string();

    Decision {
        delta_safety: fields.delta_safety.unwrap_or(0),
        decision,
        message,
        eta_change_minutes: fields.eta_change_minutes.unwrap_or(eta_change_min),
        proposed_route_name: proposed,
        reasons: fields.reasons.iter().cloned().collect::<BTreeSet<_>>(),
        rules_applied: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ASK_USER_SUFFIX, CONTINUE_SUFFIX};

    fn assert_suffix_ok(d: &Decision) {
        match d.decision {
            DecisionValue::AskUser => assert!(d.message.ends_with(ASK_USER_SUFFIX), "{}", d.message),
            DecisionValue::Continue => assert!(d.message.ends_with(CONTINUE_SUFFIX), "{}", d.message),
        }
    }

    #[test]
    fn well_formed_reply_passes_through() {
        let reply = ModelReply::parse(
            r#"{"deltaSafety": 2, "decision": "ask_user",
                "message": "Ross Ave is busier and better lit. Reroute now or continue?",
                "etaChangeMinutes": 3, "proposedRouteName": "Ross Ave",
                "reasons": ["lower route crime", "better lighting"]}"#,
        );
        assert!(reply.is_structured());
        let d = normalize(&reply, 5, "fallback");
        assert_eq!(d.decision, DecisionValue::AskUser);
        assert_eq!(d.delta_safety, 2);
        assert_eq!(d.eta_change_minutes, 3);
        assert_eq!(d.proposed_route_name, "Ross Ave");
        assert_eq!(
            d.message,
            "Ross Ave is busier and better lit. Reroute now or continue?"
        );
        assert_eq!(d.reasons.len(), 2);
    }

    #[test]
    fn ask_user_without_suffix_gets_one() {
        let reply = ModelReply::parse(r#"{"decision": "ask_user", "message": "Safer route found."}"#);
        let d = normalize(&reply, 2, "c");
        assert_eq!(d.message, "Safer route found. Reroute now or continue?");
    }

    #[test]
    fn continue_keeps_first_line_only() {
        let reply = ModelReply::parse(
            r#"{"decision": "continue", "message": "Too long a detour.\nSecond line."}"#,
        );
        let d = normalize(&reply, 9, "c");
        assert_eq!(d.message, "Too long a detour. Keeping your current route.");
    }

    #[test]
    fn unknown_decision_collapses_to_continue() {
        let reply = ModelReply::parse(r#"{"decision": "reroute", "message": "Go left."}"#);
        let d = normalize(&reply, 1, "c");
        assert_eq!(d.decision, DecisionValue::Continue);
        assert_eq!(d.message, "Go left. Keeping your current route.");
    }

    #[test]
    fn empty_object_yields_defaults() {
        let d = normalize(&ModelReply::parse("{}"), 4, "Elm St");
        assert_eq!(d.decision, DecisionValue::Continue);
        assert_eq!(d.delta_safety, 0);
        assert_eq!(d.eta_change_minutes, 4);
        assert_eq!(d.proposed_route_name, "Elm St");
        assert_eq!(
            d.message,
            "Candidate offers no clear safety gain. Keeping your current route."
        );
        assert!(d.reasons.is_empty());
    }

    #[test]
    fn non_objects_are_unstructured() {
        for content in ["", "not json", "[1, 2]", "\"ask_user\"", "42", "```json\n{}\n```"] {
            let reply = ModelReply::parse(content);
            assert!(!reply.is_structured(), "{content:?}");
            let d = normalize(&reply, 0, "c");
            assert_eq!(d.decision, DecisionValue::Continue);
            assert_suffix_ok(&d);
        }
    }

    #[test]
    fn malformed_fields_are_coerced() {
        let reply = ModelReply::parse(
            r#"{"deltaSafety": "3", "decision": ["ask_user"], "message": 17,
                "etaChangeMinutes": 2.7, "proposedRouteName": null,
                "reasons": ["ok", 5, null, "  "]}"#,
        );
        let d = normalize(&reply, 8, "Main St");
        assert_eq!(d.delta_safety, 3);
        assert_eq!(d.decision, DecisionValue::Continue);
        assert_eq!(d.eta_change_minutes, 2);
        assert_eq!(d.proposed_route_name, "Main St");
        assert_eq!(d.message, "17. Keeping your current route.");
        assert_eq!(d.reasons.iter().collect::<Vec<_>>(), vec!["ok"]);
    }

    #[test]
    fn object_shaped_garbage_still_schema_valid() {
        let reply = ModelReply::parse(r#"{"deltaSafety": {"x": 1}, "reasons": "many", "message": {}}"#);
        let d = normalize(&reply, 1, "c");
        assert_eq!(d.delta_safety, 0);
        assert!(d.reasons.is_empty());
        assert_suffix_ok(&d);
    }

    #[test]
    fn ask_user_empty_message_uses_safer_text() {
        let d = normalize(&ModelReply::parse(r#"{"decision": "ask_user"}"#), 1, "c");
        assert_eq!(d.message, "Candidate route looks safer. Reroute now or continue?");
    }

    #[test]
    fn trailing_periods_are_collapsed() {
        let reply = ModelReply::parse(r#"{"decision": " ask_user ", "message": "Take Elm..."}"#);
        let d = normalize(&reply, 1, "c");
        assert_eq!(d.decision, DecisionValue::AskUser);
        assert_eq!(d.message, "Take Elm. Reroute now or continue?");
    }
}
