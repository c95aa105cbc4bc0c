//! Walking directions (Google Directions API) and fastest/alternative route selection.

use crate::config::AqrayConfig;
use crate::error::{AqrayError, AqrayResult};
use crate::heuristic::lighting_score;
use crate::types::{LatLng, RouteLeg, RouteOption, RoutePair, RouteStep};
use async_trait::async_trait;
use serde::Deserialize;

const DIRECTIONS_URL: &str = "https://maps.googleapis.com/maps/api/directions/json";

/// Walking routes between two free-text addresses, alternatives included.
#[async_trait]
pub trait DirectionsSource: Send + Sync {
    async fn walking_routes(&self, origin: &str, destination: &str) -> AqrayResult<Vec<RouteOption>>;
}

/// Current = fastest route. Candidate = the best-lit of the remaining routes, ties going
/// to the shorter one (first listed on a full tie). With a single route, it is compared
/// against itself.
pub fn pick_routes(routes: &[RouteOption]) -> Option<RoutePair> {
    let (fastest_idx, fastest) = routes
        .iter()
        .enumerate()
        .min_by_key(|(_, r)| r.leg.duration_secs)?;

    let mut best: Option<(&RouteOption, (u32, i64))> = None;
    for (idx, route) in routes.iter().enumerate() {
        if idx == fastest_idx {
            continue;
        }
        let key = (lighting_score(&route.leg.steps), -(route.leg.duration_secs as i64));
        match best {
            Some((_, best_key)) if key <= best_key => {}
            _ => best = Some((route, key)),
        }
    }
    let candidate = best.map(|(r, _)| r).unwrap_or(fastest);

    Some(RoutePair {
        current: fastest.clone(),
        candidate: candidate.clone(),
    })
}

// Google Directions wire format (only the fields we read).

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    routes: Vec<GRoute>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GRoute {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    overview_polyline: Option<GPolyline>,
    #[serde(default)]
    legs: Vec<GLeg>,
}

#[derive(Debug, Deserialize)]
struct GPolyline {
    #[serde(default)]
    points: String,
}

#[derive(Debug, Deserialize)]
struct GLeg {
    #[serde(default)]
    duration: Option<GValue>,
    #[serde(default)]
    start_location: Option<GLatLng>,
    #[serde(default)]
    end_location: Option<GLatLng>,
    #[serde(default)]
    steps: Vec<GStep>,
}

#[derive(Debug, Deserialize)]
struct GStep {
    #[serde(default)]
    html_instructions: String,
    #[serde(default)]
    maneuver: Option<String>,
    #[serde(default)]
    end_location: Option<GLatLng>,
}

#[derive(Debug, Deserialize)]
struct GValue {
    #[serde(default)]
    value: f64,
}

/// Coordinates may be partially missing; such points are dropped, not errors.
#[derive(Debug, Deserialize)]
struct GLatLng {
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lng: Option<f64>,
}

impl GLatLng {
    fn to_point(&self) -> Option<LatLng> {
        Some(LatLng {
            lat: self.lat?,
            lng: self.lng?,
        })
    }
}

fn seconds(v: &Option<GValue>) -> u64 {
    v.as_ref().map(|d| d.value.max(0.0) as u64).unwrap_or(0)
}

impl GRoute {
    fn into_option(self) -> Option<RouteOption> {
        let leg = self.legs.into_iter().next()?;
        Some(RouteOption {
            summary: self.summary,
            polyline: self.overview_polyline.map(|p| p.points).unwrap_or_default(),
            leg: RouteLeg {
                duration_secs: seconds(&leg.duration),
                start_location: leg.start_location.as_ref().and_then(GLatLng::to_point),
                end_location: leg.end_location.as_ref().and_then(GLatLng::to_point),
                steps: leg
                    .steps
                    .into_iter()
                    .map(|s| RouteStep {
                        end_location: s.end_location.as_ref().and_then(GLatLng::to_point),
                        maneuver: s.maneuver.filter(|m| !m.trim().is_empty()),
                        instruction: s.html_instructions,
                    })
                    .collect(),
            },
        })
    }
}

fn parse_directions(body: &str) -> AqrayResult<Vec<RouteOption>> {
    let parsed: DirectionsResponse = serde_json::from_str(body)?;
    match parsed.status.as_str() {
        "OK" => {}
        "ZERO_RESULTS" | "NOT_FOUND" => return Err(AqrayError::NoRoutes),
        other => {
            let detail = match parsed.error_message {
                Some(m) => format!("{} ({})", other, m),
                None => other.to_string(),
            };
            return Err(AqrayError::Directions(detail));
        }
    }
    let routes: Vec<RouteOption> = parsed
        .routes
        .into_iter()
        .filter_map(GRoute::into_option)
        .collect();
    if routes.is_empty() {
        return Err(AqrayError::NoRoutes);
    }
    Ok(routes)
}

/// Google Directions client (walking mode, alternatives on).
pub struct GoogleDirections {
    client: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
}

impl GoogleDirections {
    pub fn new(config: &AqrayConfig) -> AqrayResult<Self> {
        Ok(Self {
            client: config.http_client()?,
            api_key: config.google_maps_api_key.clone(),
            endpoint: DIRECTIONS_URL.to_string(),
        })
    }
}

#[async_trait]
impl DirectionsSource for GoogleDirections {
    async fn walking_routes(&self, origin: &str, destination: &str) -> AqrayResult<Vec<RouteOption>> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(AqrayError::MissingCredential("GOOGLE_MAPS_API_KEY"))?;
        let res = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("origin", origin),
                ("destination", destination),
                ("mode", "walking"),
                ("alternatives", "true"),
                ("key", key),
            ])
            .send()
            .await?;
        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            return Err(AqrayError::Upstream {
                service: "directions",
                status: status.as_u16(),
                body,
            });
        }
        parse_directions(&body)
    }
}
