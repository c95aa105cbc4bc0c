//! Integration test: RecommendService end to end with in-memory collaborators.
//!
//! ## Scenarios
//! 1. Scorer down: heuristic engine decides, probe samples reach the debug payload.
//! 2. Scorer recommends a more dangerous route: the safety override wins.
//! 3. Directions return nothing usable: NoRoutes surfaces to the caller.
//! 4. Night flag + better-lit candidate: lighting reason and reroute prompt.
//! 5. Adverse weather is flagged in scores and reasons.
//! 6. A tight detour cap turns a crime gain into "large ETA penalty".
//! 7. Response JSON keeps the wire field names.

use aqray_path_core::{
    AqrayConfig, AqrayError, AqrayResult, DecisionSource, DecisionValue, DirectionsSource,
    IncidentSource, LatLng, ReasoningModel, RecommendRequest, RecommendService, RouteLeg,
    RouteOption, RouteStep, WeatherReading, WeatherSource,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::{Arc, Mutex};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

struct FixedRoutes(Vec<RouteOption>);

#[async_trait]
impl DirectionsSource for FixedRoutes {
    async fn walking_routes(&self, _origin: &str, _destination: &str) -> AqrayResult<Vec<RouteOption>> {
        if self.0.is_empty() {
            return Err(AqrayError::NoRoutes);
        }
        Ok(self.0.clone())
    }
}

struct FixedWeather(i64);

#[async_trait]
impl WeatherSource for FixedWeather {
    async fn locate(&self, _place: &str) -> LatLng {
        LatLng { lat: 3.0, lng: 3.0 }
    }

    async fn current(&self, _point: LatLng) -> WeatherReading {
        WeatherReading {
            description: "Rain".into(),
            code: self.0,
            temperature_c: 19.0,
            precipitation_mm: 0.8,
        }
    }
}

/// Counts by latitude band: current route ~1.x, candidate ~2.x, destination area 3.0.
struct BandedIncidents {
    current: u64,
    candidate: u64,
    area: u64,
}

#[async_trait]
impl IncidentSource for BandedIncidents {
    async fn incident_count(&self, point: LatLng, _radius_m: u32, _days: u32) -> u64 {
        if point.lat < 1.5 {
            self.current
        } else if point.lat < 2.5 {
            self.candidate
        } else {
            self.area
        }
    }
}

enum ScorerBehavior {
    Fail,
    Reply(&'static str),
}

struct FakeScorer {
    behavior: ScorerBehavior,
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl ReasoningModel for FakeScorer {
    async fn score(&self, prompt: &str) -> AqrayResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.behavior {
            ScorerBehavior::Fail => Err(AqrayError::Upstream {
                service: "watsonx",
                status: 503,
                body: "unavailable".into(),
            }),
            ScorerBehavior::Reply(s) => Ok(s.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn step(text: &str, lat: f64) -> RouteStep {
    RouteStep {
        instruction: text.to_string(),
        maneuver: None,
        end_location: Some(LatLng { lat, lng: -96.8 }),
    }
}

fn route(summary: &str, secs: u64, base_lat: f64, street: &str) -> RouteOption {
    RouteOption {
        summary: summary.to_string(),
        polyline: format!("{}-poly", summary),
        leg: RouteLeg {
            steps: vec![
                step("Head <b>north</b>", base_lat),
                step(&format!("Turn right onto <b>{}</b>", street), base_lat + 0.1),
                step("Destination on the left", base_lat + 0.2),
            ],
            duration_secs: secs,
            start_location: Some(LatLng { lat: 32.78, lng: -96.80 }),
            end_location: Some(LatLng { lat: 32.79, lng: -96.79 }),
        },
    }
}

/// Elm St (10 min, current) vs Ross Ave (14 min, candidate).
fn two_routes() -> Vec<RouteOption> {
    vec![
        route("Ross Ave", 840, 2.0, "Ross Ave"),
        route("Elm St", 600, 1.0, "Elm St"),
    ]
}

fn service(
    routes: Vec<RouteOption>,
    weather_code: i64,
    incidents: BandedIncidents,
    scorer: Option<Arc<FakeScorer>>,
) -> RecommendService {
    RecommendService::new(
        Arc::new(AqrayConfig::default()),
        Arc::new(FixedRoutes(routes)),
        Arc::new(FixedWeather(weather_code)),
        Arc::new(incidents),
        scorer.map(|s| s as Arc<dyn ReasoningModel>),
    )
}

fn scorer(behavior: ScorerBehavior) -> Arc<FakeScorer> {
    Arc::new(FakeScorer {
        behavior,
        prompts: Mutex::new(Vec::new()),
    })
}

fn request() -> RecommendRequest {
    RecommendRequest {
        start: "Union Station, Dallas".into(),
        destination: "Klyde Warren Park, Dallas".into(),
        night_test: None,
        max_detour_min: None,
    }
}

fn noon() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

// ===========================================================================
// 1. Scorer down -> heuristic
// ===========================================================================

#[tokio::test]
async fn scorer_failure_falls_back_to_heuristic() {
    let scorer = scorer(ScorerBehavior::Fail);
    let svc = service(
        two_routes(),
        0,
        BandedIncidents { current: 100, candidate: 70, area: 250 },
        Some(Arc::clone(&scorer)),
    );
    let res = svc.recommend_at(&request(), noon()).await.unwrap();

    assert_eq!(res.debug.decision_source, DecisionSource::Heuristic);
    let d = &res.agent_response;
    assert_eq!(d.decision, DecisionValue::AskUser);
    assert_eq!(d.delta_safety, 2);
    assert_eq!(d.proposed_route_name, "Ross Ave");
    assert!(d.message.ends_with("Reroute now or continue?"));
    assert!(d.reasons.contains("lower route crime"));
    assert!(d.reasons.contains("Meaningfully lower recent incidents on candidate (−30)"));
    assert!(d.reasons.contains("Adds about 4 min"));
    assert!(d.rules_applied.is_none());

    assert_eq!(res.routes.current_summary, "Elm St");
    assert_eq!(res.routes.candidate_summary, "Ross Ave");
    assert_eq!(res.routes.eta_change_min, 4);
    assert_eq!(res.routes.current_eta_min, 10.0);
    assert_eq!(res.scores.crime_delta, 30);
    assert!(!res.scores.is_night);

    // Three steps probe only the middle one.
    assert_eq!(res.debug.route_crime.current.samples.len(), 1);
    assert_eq!(res.debug.route_crime.current.samples[0].lat, 1.1);
    assert_eq!(res.debug.route_crime.candidate.total, 70);

    let prompts = scorer.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].starts_with("TIME: 12:00\n"));
    assert!(prompts[0].contains("crime_count_30d_500m 250, route_crime_current 100, route_crime_candidate 70."));
    assert_eq!(prompts[0], res.debug.prompt);
}

// ===========================================================================
// 2. Override beats the model
// ===========================================================================

#[tokio::test]
async fn override_rejects_dangerous_candidate_even_if_model_asks() {
    let svc = service(
        two_routes(),
        0,
        BandedIncidents { current: 10, candidate: 40, area: 0 },
        Some(scorer(ScorerBehavior::Reply(
            r#"{"deltaSafety": 3, "decision": "ask_user", "message": "Ross Ave is nicer.",
                "etaChangeMinutes": 4, "proposedRouteName": "Ross Ave", "reasons": ["scenic"]}"#,
        ))),
    );
    let res = svc.recommend_at(&request(), noon()).await.unwrap();
    let d = &res.agent_response;

    assert_eq!(res.debug.decision_source, DecisionSource::Model);
    assert_eq!(d.decision, DecisionValue::Continue);
    assert_eq!(
        d.message,
        "Candidate has higher recent incident density (+30). Keeping your current route."
    );
    assert!(d.reasons.contains("higher route crime"));
    assert!(d.reasons.contains("scenic"));
    assert_eq!(
        d.rules_applied.as_deref(),
        Some(&["override:higher_route_crime".to_string()][..])
    );
}

#[tokio::test]
async fn prose_reply_is_treated_as_failure() {
    let svc = service(
        two_routes(),
        0,
        BandedIncidents { current: 20, candidate: 20, area: 0 },
        Some(scorer(ScorerBehavior::Reply("I think you should reroute!"))),
    );
    let res = svc.recommend_at(&request(), noon()).await.unwrap();
    assert_eq!(res.debug.decision_source, DecisionSource::Heuristic);
    assert_eq!(res.agent_response.decision, DecisionValue::Continue);
    assert_eq!(
        res.agent_response.message,
        "Using local heuristic due to AI service error. Keeping your current route."
    );
}

// ===========================================================================
// 3. No routes
// ===========================================================================

#[tokio::test]
async fn no_routes_is_an_error() {
    let svc = service(
        vec![],
        0,
        BandedIncidents { current: 0, candidate: 0, area: 0 },
        None,
    );
    let err = svc.recommend_at(&request(), noon()).await.unwrap_err();
    assert!(matches!(err, AqrayError::NoRoutes));
}

// ===========================================================================
// 4. Night lighting
// ===========================================================================

#[tokio::test]
async fn night_flag_prefers_better_lit_candidate() {
    let svc = service(
        two_routes(),
        0,
        BandedIncidents { current: 20, candidate: 18, area: 0 },
        None,
    );
    let mut req = request();
    req.night_test = Some(true);
    let res = svc.recommend_at(&req, noon()).await.unwrap();
    let d = &res.agent_response;

    assert!(res.scores.is_night);
    assert_eq!(d.decision, DecisionValue::AskUser);
    assert_eq!(d.delta_safety, 1);
    assert!(d.reasons.contains("better lighting at night"));
    assert!(d.reasons.contains("Better lighting cues on candidate at night"));
}

#[tokio::test]
async fn clock_alone_sets_night() {
    let svc = service(
        two_routes(),
        0,
        BandedIncidents { current: 20, candidate: 20, area: 0 },
        None,
    );
    let late = NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(22, 30, 0)
        .unwrap();
    let res = svc.recommend_at(&request(), late).await.unwrap();
    assert!(res.scores.is_night);
    assert!(res.debug.prompt.starts_with("TIME: 22:30"));
}

// ===========================================================================
// 5. Weather
// ===========================================================================

#[tokio::test]
async fn adverse_weather_is_flagged() {
    let svc = service(
        two_routes(),
        63,
        BandedIncidents { current: 20, candidate: 20, area: 0 },
        None,
    );
    let res = svc.recommend_at(&request(), noon()).await.unwrap();
    assert!(res.scores.bad_weather);
    assert_eq!(res.weather.description, "Rain");
    assert!(res
        .agent_response
        .reasons
        .contains("Weather caution (rain/fog/snow/storms)"));
}

// ===========================================================================
// 6. Detour cap
// ===========================================================================

#[tokio::test]
async fn tight_detour_cap_blocks_reroute() {
    let svc = service(
        two_routes(),
        0,
        BandedIncidents { current: 100, candidate: 70, area: 0 },
        None,
    );
    let mut req = request();
    req.max_detour_min = Some(3);
    let res = svc.recommend_at(&req, noon()).await.unwrap();
    let d = &res.agent_response;

    assert_eq!(d.decision, DecisionValue::Continue);
    assert!(d.reasons.contains("large ETA penalty"));
    assert_eq!(
        d.message,
        "Detour adds ~4 min without a clear safety gain. Keeping your current route."
    );
    assert_eq!(
        d.rules_applied.as_deref(),
        Some(&["override:large_eta_small_gain".to_string()][..])
    );
}

// ===========================================================================
// 7. Wire shape
// ===========================================================================

#[tokio::test]
async fn response_json_shape() {
    let svc = service(
        two_routes(),
        0,
        BandedIncidents { current: 5, candidate: 5, area: 1 },
        None,
    );
    let res = svc.recommend_at(&request(), noon()).await.unwrap();
    let json = serde_json::to_value(&res).unwrap();

    assert_eq!(json["request"]["start"], "Union Station, Dallas");
    assert_eq!(json["routes"]["current_polyline"], "Elm St-poly");
    assert_eq!(json["routes"]["start"]["lat"], 32.78);
    assert_eq!(json["weather"]["temp_c"], 19.0);
    assert_eq!(json["agent_response"]["decision"], "continue");
    assert!(json["agent_response"]["deltaSafety"].is_i64());
    assert!(json["agent_response"].get("rules_applied").is_none());
    assert_eq!(json["scores"]["crime_current"], 5);
    assert_eq!(json["debug"]["decision_source"], "heuristic");
    assert_eq!(json["debug"]["route_crime"]["current"]["radius_m"], 250);
    assert_eq!(json["debug"]["route_crime"]["current"]["samples"][0]["count"], 5);
}
