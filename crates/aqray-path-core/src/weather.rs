//! Destination weather via Open-Meteo: geocode the destination, then read current
//! conditions. Both steps degrade to fixed fallbacks instead of failing the request.

use crate::config::{AqrayConfig, DEFAULT_LOCATION};
use crate::error::{AqrayError, AqrayResult};
use crate::types::{LatLng, WeatherReading};
use async_trait::async_trait;
use serde::Deserialize;

const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// WMO weather code -> short description. Unmapped codes render as "Code N".
pub fn describe_weather_code(code: i64) -> String {
    let text = match code {
        0 => "Clear",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Fog",
        48 => "Depositing rime fog",
        51 => "Light drizzle",
        53 => "Drizzle",
        55 => "Dense drizzle",
        61 => "Light rain",
        63 => "Rain",
        65 => "Heavy rain",
        71 => "Light snow",
        73 => "Snow",
        75 => "Heavy snow",
        80 => "Rain showers",
        81 => "Moderate rain showers",
        82 => "Violent rain showers",
        95 => "Thunderstorm",
        96 => "Thunderstorm with slight hail",
        99 => "Thunderstorm with heavy hail",
        other => return format!("Code {}", other),
    };
    text.to_string()
}

/// Geocoding + current conditions. Implementations never fail outward.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Coordinates for a free-text place; the default location when unknown.
    async fn locate(&self, place: &str) -> LatLng;
    /// Current conditions; [`WeatherReading::unavailable`] when the lookup fails.
    async fn current(&self, point: LatLng) -> WeatherReading;
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Option<Vec<GeocodeResult>>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    current: Option<CurrentConditions>,
}

#[derive(Debug, Default, Deserialize)]
struct CurrentConditions {
    #[serde(default)]
    temperature_2m: Option<f64>,
    #[serde(default)]
    precipitation: Option<f64>,
    #[serde(default)]
    weather_code: Option<f64>,
}

impl From<CurrentConditions> for WeatherReading {
    fn from(c: CurrentConditions) -> Self {
        let code = c.weather_code.unwrap_or(0.0) as i64;
        Self {
            description: describe_weather_code(code),
            code,
            temperature_c: c.temperature_2m.unwrap_or(0.0),
            precipitation_mm: c.precipitation.unwrap_or(0.0),
        }
    }
}

/// Open-Meteo client (no API key).
pub struct OpenMeteo {
    client: reqwest::Client,
    geocoding_url: String,
    forecast_url: String,
}

impl OpenMeteo {
    pub fn new(config: &AqrayConfig) -> AqrayResult<Self> {
        Ok(Self {
            client: config.http_client()?,
            geocoding_url: GEOCODING_URL.to_string(),
            forecast_url: FORECAST_URL.to_string(),
        })
    }

    async fn geocode(&self, place: &str) -> AqrayResult<Option<LatLng>> {
        let res = self
            .client
            .get(&self.geocoding_url)
            .query(&[("name", place), ("count", "1"), ("language", "en"), ("format", "json")])
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            return Err(AqrayError::Upstream {
                service: "geocoding",
                status: status.as_u16(),
                body: res.text().await.unwrap_or_default(),
            });
        }
        let parsed: GeocodeResponse = res.json().await?;
        Ok(parsed
            .results
            .and_then(|r| r.into_iter().next())
            .map(|r| LatLng {
                lat: r.latitude,
                lng: r.longitude,
            }))
    }

    async fn forecast(&self, point: LatLng) -> AqrayResult<WeatherReading> {
        let lat = point.lat.to_string();
        let lng = point.lng.to_string();
        let res = self
            .client
            .get(&self.forecast_url)
            .query(&[
                ("latitude", lat.as_str()),
                ("longitude", lng.as_str()),
                ("current", "temperature_2m,precipitation,weather_code,wind_speed_10m"),
            ])
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            return Err(AqrayError::Upstream {
                service: "forecast",
                status: status.as_u16(),
                body: res.text().await.unwrap_or_default(),
            });
        }
        let parsed: ForecastResponse = res.json().await?;
        Ok(parsed.current.unwrap_or_default().into())
    }
}

#[async_trait]
impl WeatherSource for OpenMeteo {
    async fn locate(&self, place: &str) -> LatLng {
        match self.geocode(place).await {
            Ok(Some(p)) => p,
            Ok(None) => {
                tracing::info!("no geocoding match for destination, using default location");
                DEFAULT_LOCATION
            }
            Err(e) => {
                tracing::warn!("geocoding failed, using default location: {}", e);
                DEFAULT_LOCATION
            }
        }
    }

    async fn current(&self, point: LatLng) -> WeatherReading {
        match self.forecast(point).await {
            Ok(w) => w,
            Err(e) => {
                tracing::warn!("weather lookup failed: {}", e);
                WeatherReading::unavailable()
            }
        }
    }
}
