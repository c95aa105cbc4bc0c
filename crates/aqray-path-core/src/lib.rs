//! AqrayPath core library.
//! Safer-walk recommendation: incident sampling, heuristic and model decisions,
//! the final safety override and reason synthesis.

pub mod config;
pub mod directions;
pub mod error;
pub mod heuristic;
pub mod incidents;
pub mod normalizer;
pub mod pipeline;
pub mod prompt;
pub mod reasons;
pub mod safety;
pub mod scorer;
pub mod service;
pub mod types;
pub mod weather;

pub use config::AqrayConfig;
pub use directions::{pick_routes, DirectionsSource, GoogleDirections};
pub use error::{AqrayError, AqrayResult};
pub use heuristic::{heuristic_decision, lighting_score};
pub use incidents::{probe_points, summarize_leg, IncidentSource, SocrataIncidents};
pub use normalizer::{normalize, ModelFields, ModelReply};
pub use pipeline::{decide, DecisionSource};
pub use reasons::{derive_reasons, rule_tags};
pub use safety::apply_safety_override;
pub use scorer::{ReasoningModel, WatsonxScorer};
pub use service::{RecommendRequest, RecommendResponse, RecommendService};
pub use types::{
    Decision, DecisionValue, IncidentSample, IncidentSummary, LatLng, RouteLeg, RouteOption,
    RoutePair, RouteSignals, RouteStep, WeatherReading,
};
pub use weather::{OpenMeteo, WeatherSource};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
