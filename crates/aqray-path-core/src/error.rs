//! Error types for the AqrayPath core.
//!
//! Only routing and missing configuration ever reach the client. Everything else
//! (weather, incidents, geocoding, model) is recovered inside the service with a
//! fallback value, so those variants show up in logs rather than responses.

use thiserror::Error;

/// Result type alias for core operations
pub type AqrayResult<T> = Result<T, AqrayError>;

#[derive(Error, Debug)]
pub enum AqrayError {
    #[error("{0} not set.")]
    MissingCredential(&'static str),

    #[error("No routes found")]
    NoRoutes,

    #[error("Google Directions error: {0}")]
    Directions(String),

    #[error("upstream request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned {status}: {body}")]
    Upstream {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("response parse: {0}")]
    Json(#[from] serde_json::Error),
}

impl AqrayError {
    /// True for errors the client caused or must see (bad addresses, no route).
    pub fn is_client_visible(&self) -> bool {
        matches!(self, AqrayError::NoRoutes | AqrayError::Directions(_))
    }
}
