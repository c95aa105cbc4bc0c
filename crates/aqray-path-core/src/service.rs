//! RecommendService: one `/recommend` request end to end.
//!
//! Directions -> (weather + area incidents || route incident sampling) -> prompt ->
//! scorer or heuristic -> safety override -> reasons. Only routing errors and missing
//! Google credentials escape; every other dependency has a fallback.

use crate::config::AqrayConfig;
use crate::directions::{pick_routes, DirectionsSource, GoogleDirections};
use crate::error::{AqrayError, AqrayResult};
use crate::heuristic::{lighting_score, DEFAULT_ROUTE_NAME};
use crate::incidents::{summarize_leg, IncidentSource, SocrataIncidents};
use crate::pipeline::{decide, DecisionSource};
use crate::prompt::{build_prompt, street_names, PromptContext};
use crate::reasons::is_bad_weather;
use crate::scorer::{ReasoningModel, WatsonxScorer};
use crate::types::{Decision, IncidentSummary, LatLng, RouteSignals, WeatherReading};
use crate::weather::{OpenMeteo, WeatherSource};
use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendRequest {
    pub start: String,
    pub destination: String,
    /// Force night behavior regardless of the clock.
    #[serde(default)]
    pub night_test: Option<bool>,
    /// Detour cap in minutes; unset or 0 => configured default.
    #[serde(default)]
    pub max_detour_min: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestEcho {
    pub start: String,
    pub destination: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Endpoint {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl From<Option<LatLng>> for Endpoint {
    fn from(p: Option<LatLng>) -> Self {
        Self {
            lat: p.map(|p| p.lat),
            lng: p.map(|p| p.lng),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteSummary {
    pub current_eta_min: f64,
    pub candidate_eta_min: f64,
    pub eta_change_min: i64,
    pub current_summary: String,
    pub candidate_summary: String,
    pub current_polyline: String,
    pub candidate_polyline: String,
    pub start: Endpoint,
    pub destination: Endpoint,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeatherSummary {
    pub description: String,
    pub temp_c: f64,
    pub precip_mm: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Scores {
    pub crime_current: u64,
    pub crime_candidate: u64,
    pub crime_delta: i64,
    pub eta_change_min: i64,
    pub is_night: bool,
    pub bad_weather: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteCrime {
    pub current: IncidentSummary,
    pub candidate: IncidentSummary,
}

/// Prompt and probe samples (lat, lon, count) for heatmap rendering.
#[derive(Debug, Clone, Serialize)]
pub struct DebugInfo {
    pub prompt: String,
    pub route_crime: RouteCrime,
    pub decision_source: DecisionSource,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendResponse {
    pub request: RequestEcho,
    pub routes: RouteSummary,
    pub weather: WeatherSummary,
    pub agent_response: Decision,
    pub scores: Scores,
    pub debug: DebugInfo,
}

/// Night: 20:00 through 05:59 local time.
pub fn is_night_hour(hour: u32) -> bool {
    hour >= 20 || hour <= 5
}

/// Candidate minus current, in whole minutes (ties to even).
pub fn eta_change_minutes(current_secs: u64, candidate_secs: u64) -> i64 {
    ((candidate_secs as f64 - current_secs as f64) / 60.0).round_ties_even() as i64
}

fn minutes_1dp(secs: u64) -> f64 {
    (secs as f64 / 60.0 * 10.0).round() / 10.0
}

pub struct RecommendService {
    config: Arc<AqrayConfig>,
    directions: Arc<dyn DirectionsSource>,
    weather: Arc<dyn WeatherSource>,
    incidents: Arc<dyn IncidentSource>,
    scorer: Option<Arc<dyn ReasoningModel>>,
}

impl RecommendService {
    pub fn new(
        config: Arc<AqrayConfig>,
        directions: Arc<dyn DirectionsSource>,
        weather: Arc<dyn WeatherSource>,
        incidents: Arc<dyn IncidentSource>,
        scorer: Option<Arc<dyn ReasoningModel>>,
    ) -> Self {
        Self {
            config,
            directions,
            weather,
            incidents,
            scorer,
        }
    }

    /// Production wiring: Google Directions, Open-Meteo, Dallas Open Data, watsonx.
    /// Fails only when an outbound client with the configured timeouts cannot be built.
    pub fn from_config(config: Arc<AqrayConfig>) -> AqrayResult<Self> {
        let scorer = WatsonxScorer::from_config(&config)?
            .map(|s| Arc::new(s) as Arc<dyn ReasoningModel>);
        if scorer.is_none() {
            tracing::warn!("IBM_CLOUD_API_KEY not set: decisions will use the local heuristic");
        }
        Ok(Self::new(
            Arc::clone(&config),
            Arc::new(GoogleDirections::new(&config)?),
            Arc::new(OpenMeteo::new(&config)?),
            Arc::new(SocrataIncidents::new(&config)?),
            scorer,
        ))
    }

    pub async fn recommend(&self, req: &RecommendRequest) -> AqrayResult<RecommendResponse> {
        self.recommend_at(req, Local::now().naive_local()).await
    }

    /// Same as [`recommend`](Self::recommend) with an explicit local clock.
    pub async fn recommend_at(
        &self,
        req: &RecommendRequest,
        now: NaiveDateTime,
    ) -> AqrayResult<RecommendResponse> {
        tracing::info!(start = %req.start, destination = %req.destination, "recommend");

        let routes = self
            .directions
            .walking_routes(&req.start, &req.destination)
            .await?;
        let pair = pick_routes(&routes).ok_or(AqrayError::NoRoutes)?;
        let (cur, can) = (&pair.current, &pair.candidate);

        let eta_change_min = eta_change_minutes(cur.leg.duration_secs, can.leg.duration_secs);
        let current_streets = street_names(&cur.leg.steps);
        let candidate_streets = street_names(&can.leg.steps);

        let cfg = &self.config;
        let incidents = self.incidents.as_ref();
        let destination_context = async {
            let point = self.weather.locate(&req.destination).await;
            tokio::join!(
                self.weather.current(point),
                incidents.incident_count(point, cfg.area_radius_m, cfg.lookback_days)
            )
        };
        let ((weather, area_incidents), current_crime, candidate_crime) = tokio::join!(
            destination_context,
            summarize_leg(incidents, &cur.leg, cfg.route_probe_radius_m, cfg.lookback_days),
            summarize_leg(incidents, &can.leg, cfg.route_probe_radius_m, cfg.lookback_days),
        );

        let is_night = is_night_hour(now.hour()) || req.night_test.unwrap_or(false);
        let signals = RouteSignals {
            current_incidents: current_crime.total,
            candidate_incidents: candidate_crime.total,
            detour_minutes: eta_change_min,
            detour_cap: cfg.detour_cap(req.max_detour_min),
            is_night,
            current_lighting: lighting_score(&cur.leg.steps),
            candidate_lighting: lighting_score(&can.leg.steps),
            weather_code: weather.code,
        };

        let proposed = if can.summary.trim().is_empty() {
            DEFAULT_ROUTE_NAME
        } else {
            can.summary.as_str()
        };
        let prompt = build_prompt(&PromptContext {
            time_hhmm: now.format("%H:%M").to_string(),
            weather: &weather,
            area_incidents,
            current_incidents: current_crime.total,
            candidate_incidents: candidate_crime.total,
            current_streets: &current_streets,
            candidate_streets: &candidate_streets,
            eta_change_min,
            proposed_route_name: proposed,
        });

        let content = self.ask_scorer(&prompt).await;
        let (decision, source) = decide(&signals, content.as_deref(), proposed);
        tracing::info!(
            decision = decision.decision.as_str(),
            source = ?source,
            crime_current = signals.current_incidents,
            crime_candidate = signals.candidate_incidents,
            eta_change_min,
            "decision ready"
        );

        Ok(RecommendResponse {
            request: RequestEcho {
                start: req.start.clone(),
                destination: req.destination.clone(),
            },
            routes: RouteSummary {
                current_eta_min: minutes_1dp(cur.leg.duration_secs),
                candidate_eta_min: minutes_1dp(can.leg.duration_secs),
                eta_change_min,
                current_summary: cur.summary.clone(),
                candidate_summary: can.summary.clone(),
                current_polyline: cur.polyline.clone(),
                candidate_polyline: can.polyline.clone(),
                start: cur.leg.start_location.into(),
                destination: cur.leg.end_location.into(),
            },
            weather: weather_summary(&weather),
            agent_response: decision,
            scores: Scores {
                crime_current: signals.current_incidents,
                crime_candidate: signals.candidate_incidents,
                crime_delta: signals.crime_delta(),
                eta_change_min,
                is_night,
                bad_weather: is_bad_weather(weather.code),
            },
            debug: DebugInfo {
                prompt,
                route_crime: RouteCrime {
                    current: current_crime,
                    candidate: candidate_crime,
                },
                decision_source: source,
            },
        })
    }

    /// Raw scorer reply, or `None` when there is no scorer or the call failed.
    async fn ask_scorer(&self, prompt: &str) -> Option<String> {
        let scorer = self.scorer.as_ref()?;
        match scorer.score(prompt).await {
            Ok(content) => Some(content),
            Err(e) => {
                tracing::warn!("scorer unavailable, using local heuristic: {}", e);
                None
            }
        }
    }
}

fn weather_summary(w: &WeatherReading) -> WeatherSummary {
    WeatherSummary {
        description: w.description.clone(),
        temp_c: w.temperature_c,
        precip_mm: w.precipitation_mm,
    }
}
