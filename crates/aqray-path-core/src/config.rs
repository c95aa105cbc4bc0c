//! AqrayPath configuration loaded from `.env` / the process environment.
//!
//! Read once at startup and shared as an immutable value; nothing below the gateway
//! looks at environment variables directly.

use crate::error::AqrayResult;
use crate::types::LatLng;
use std::time::Duration;

const DEFAULT_WATSONX_DEPLOYMENT_URL: &str = "https://us-south.ml.cloud.ibm.com/ml/v4/deployments/19eda375-12c0-4e61-a0f2-5fd30f11a20c/ai_service?version=2021-05-01";
const DEFAULT_IAM_URL: &str = "https://iam.cloud.ibm.com/identity/token";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";

/// Dallas city center: used whenever the destination cannot be geocoded.
pub const DEFAULT_LOCATION: LatLng = LatLng {
    lat: 32.7767,
    lng: -96.7970,
};

/// Detour cap applied when a request leaves `max_detour_min` unset or zero.
pub const DEFAULT_DETOUR_CAP_MIN: i64 = 6;

/// AqrayPath configuration.
///
/// | Env | Default | Description |
/// |-----|---------|-------------|
/// | IBM_CLOUD_API_KEY | unset | watsonx credential; unset => heuristic engine only |
/// | WATSONX_DEPLOYMENT_URL | us-south deployment | Chat endpoint of the deployed scorer |
/// | WATSONX_IAM_URL | iam.cloud.ibm.com | IAM token exchange endpoint |
/// | GOOGLE_MAPS_API_KEY | unset | Required for /recommend |
/// | SOCRATA_APP_TOKEN | unset | Optional Dallas Open Data app token |
/// | AQRAY_BIND_ADDR | 127.0.0.1:8000 | Gateway listen address |
/// | AQRAY_CONNECT_TIMEOUT_SECS | 10 | Outbound connect timeout |
/// | AQRAY_REQUEST_TIMEOUT_SECS | 30 | Outbound total request timeout |
/// | AQRAY_DEFAULT_DETOUR_MIN | 6 | Detour cap when the request sets none |
/// | AQRAY_ROUTE_PROBE_RADIUS_M | 250 | Incident radius around each route probe |
/// | AQRAY_AREA_RADIUS_M | 500 | Incident radius around the destination |
/// | AQRAY_LOOKBACK_DAYS | 30 | Incident lookback window |
#[derive(Debug, Clone)]
pub struct AqrayConfig {
    pub ibm_api_key: Option<String>,
    pub watsonx_deployment_url: String,
    pub watsonx_iam_url: String,
    pub google_maps_api_key: Option<String>,
    pub socrata_app_token: Option<String>,
    pub bind_addr: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub default_detour_cap_min: i64,
    pub route_probe_radius_m: u32,
    pub area_radius_m: u32,
    pub lookback_days: u32,
}

impl Default for AqrayConfig {
    fn default() -> Self {
        Self {
            ibm_api_key: None,
            watsonx_deployment_url: DEFAULT_WATSONX_DEPLOYMENT_URL.to_string(),
            watsonx_iam_url: DEFAULT_IAM_URL.to_string(),
            google_maps_api_key: None,
            socrata_app_token: None,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            default_detour_cap_min: DEFAULT_DETOUR_CAP_MIN,
            route_probe_radius_m: 250,
            area_radius_m: 500,
            lookback_days: 30,
        }
    }
}

impl AqrayConfig {
    /// Load from the process environment. Unset, blank or invalid => defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an arbitrary lookup (the environment in production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let opt = |name: &str| -> Option<String> {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let num = |name: &str, default: u64| -> u64 {
            opt(name)
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(default)
        };

        let detour_cap = opt("AQRAY_DEFAULT_DETOUR_MIN")
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(defaults.default_detour_cap_min);

        Self {
            ibm_api_key: opt("IBM_CLOUD_API_KEY"),
            watsonx_deployment_url: opt("WATSONX_DEPLOYMENT_URL")
                .unwrap_or(defaults.watsonx_deployment_url),
            watsonx_iam_url: opt("WATSONX_IAM_URL").unwrap_or(defaults.watsonx_iam_url),
            google_maps_api_key: opt("GOOGLE_MAPS_API_KEY"),
            socrata_app_token: opt("SOCRATA_APP_TOKEN"),
            bind_addr: opt("AQRAY_BIND_ADDR").unwrap_or(defaults.bind_addr),
            connect_timeout: Duration::from_secs(num("AQRAY_CONNECT_TIMEOUT_SECS", 10)),
            request_timeout: Duration::from_secs(num("AQRAY_REQUEST_TIMEOUT_SECS", 30)),
            default_detour_cap_min: detour_cap,
            route_probe_radius_m: num("AQRAY_ROUTE_PROBE_RADIUS_M", 250) as u32,
            area_radius_m: num("AQRAY_AREA_RADIUS_M", 500) as u32,
            lookback_days: num("AQRAY_LOOKBACK_DAYS", 30) as u32,
        }
    }

    /// Effective detour cap: the request's value unless unset or zero.
    pub fn detour_cap(&self, requested: Option<i64>) -> i64 {
        match requested {
            Some(v) if v != 0 => v,
            _ => self.default_detour_cap_min,
        }
    }

    /// Shared outbound client with the bounded connect/request timeouts. A client that
    /// cannot carry them is a startup error, never an unbounded fallback.
    pub fn http_client(&self) -> AqrayResult<reqwest::Client> {
        let client = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .build()?;
        Ok(client)
    }
}
