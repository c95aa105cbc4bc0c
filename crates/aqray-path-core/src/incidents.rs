//! Incident Aggregator: samples a few waypoints of a leg and sums the crime reports
//! around each one into a single comparable total.
//!
//! Counts come from the Dallas Open Data police incident feed (Socrata). A failed
//! lookup counts as zero so one bad probe never sinks the comparison.

use crate::config::AqrayConfig;
use crate::error::AqrayResult;
use crate::types::{IncidentSample, IncidentSummary, LatLng, RouteLeg};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Local};
use std::collections::HashSet;

const DALLAS_INCIDENTS_URL: &str = "https://www.dallasopendata.com/resource/yn72-daik.json";

/// Anything that can answer "how many incidents within `radius_m` of this point in the
/// last `days` days". Implementations must never fail: unknown => 0.
#[async_trait]
pub trait IncidentSource: Send + Sync {
    async fn incident_count(&self, point: LatLng, radius_m: u32, days: u32) -> u64;
}

/// Probe points for a leg: step nearest one third in, the middle step and the
/// second-to-last step, deduplicated by coordinate rounded to 6 decimals.
pub fn probe_points(leg: &RouteLeg) -> Vec<LatLng> {
    let n = leg.steps.len();
    if n == 0 {
        return Vec::new();
    }
    let first = if n == 1 { 0 } else { (n / 3).max(1) };
    let mut idxs = vec![first, n / 2, n.saturating_sub(2)];
    idxs.sort_unstable();
    idxs.dedup();

    let mut seen: HashSet<(i64, i64)> = HashSet::new();
    let mut points = Vec::with_capacity(idxs.len());
    for idx in idxs {
        let Some(loc) = leg.steps.get(idx).and_then(|s| s.end_location) else {
            continue;
        };
        if !loc.lat.is_finite() || !loc.lng.is_finite() {
            continue;
        }
        let key = (micro(loc.lat), micro(loc.lng));
        if !seen.insert(key) {
            continue;
        }
        points.push(LatLng {
            lat: key.0 as f64 / 1e6,
            lng: key.1 as f64 / 1e6,
        });
    }
    points
}

fn micro(v: f64) -> i64 {
    (v * 1e6).round() as i64
}

/// Sum incidents over the probe points of `leg`. Probes are queried one after another
/// in step order so the sample list (and the total) is reproducible.
pub async fn summarize_leg(
    source: &dyn IncidentSource,
    leg: &RouteLeg,
    radius_m: u32,
    days: u32,
) -> IncidentSummary {
    let mut summary = IncidentSummary {
        total: 0,
        samples: Vec::new(),
        radius_m,
        days,
    };
    for point in probe_points(leg) {
        let count = source.incident_count(point, radius_m, days).await;
        tracing::debug!(lat = point.lat, lng = point.lng, count, "route probe");
        summary.samples.push(IncidentSample {
            lat: point.lat,
            lon: point.lng,
            count,
        });
        summary.total += count;
    }
    summary
}

/// Socrata-backed incident counts (Dallas Police incidents, `count(1)` within a circle).
pub struct SocrataIncidents {
    client: reqwest::Client,
    endpoint: String,
    app_token: Option<String>,
}

impl SocrataIncidents {
    pub fn new(config: &AqrayConfig) -> AqrayResult<Self> {
        Ok(Self {
            client: config.http_client()?,
            endpoint: DALLAS_INCIDENTS_URL.to_string(),
            app_token: config.socrata_app_token.clone(),
        })
    }

    fn where_clause(point: LatLng, radius_m: u32, days: u32) -> String {
        let since = (Local::now() - ChronoDuration::days(days as i64))
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string();
        format!(
            "upzdate > '{}' AND within_circle(geocoded_column,{},{},{})",
            since, point.lat, point.lng, radius_m
        )
    }

    async fn fetch_count(&self, point: LatLng, radius_m: u32, days: u32) -> Option<u64> {
        let where_clause = Self::where_clause(point, radius_m, days);
        let mut req = self
            .client
            .get(&self.endpoint)
            .query(&[("$select", "count(1)"), ("$where", where_clause.as_str())]);
        if let Some(token) = &self.app_token {
            req = req.header("X-App-Token", token);
        }
        let res = match req.send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("incident lookup failed: {}", e);
                return None;
            }
        };
        if !res.status().is_success() {
            tracing::warn!("incident lookup returned {}", res.status());
            return None;
        }
        let body: serde_json::Value = res.json().await.ok()?;
        parse_count(&body)
    }
}

/// `[{"count_1": "12"}]` => 12. Socrata sends the aggregate as a string.
fn parse_count(body: &serde_json::Value) -> Option<u64> {
    let value = body.as_array()?.first()?.get("count_1")?;
    match value {
        serde_json::Value::String(s) => s.trim().parse::<u64>().ok(),
        serde_json::Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

#[async_trait]
impl IncidentSource for SocrataIncidents {
    async fn incident_count(&self, point: LatLng, radius_m: u32, days: u32) -> u64 {
        self.fetch_count(point, radius_m, days).await.unwrap_or(0)
    }
}
