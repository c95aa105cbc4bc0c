//! AqrayPath gateway: safer-walk recommendations over HTTP.
//! GET /health, POST /recommend {start, destination, night_test?, max_detour_min?}.

use aqray_path_core::{AqrayConfig, AqrayError, RecommendRequest, RecommendService};
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone)]
struct AppState {
    service: Arc<RecommendService>,
}

/// Core error -> HTTP status with a `{"detail": ...}` body.
struct ApiError(AqrayError);

impl From<AqrayError> for ApiError {
    fn from(e: AqrayError) -> Self {
        Self(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            AqrayError::NoRoutes => StatusCode::NOT_FOUND,
            AqrayError::Directions(_) => StatusCode::BAD_REQUEST,
            AqrayError::MissingCredential(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AqrayError::Http(_) | AqrayError::Upstream { .. } | AqrayError::Json(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if self.0.is_client_visible() {
            tracing::info!("[AQRAY] recommend rejected: {}", self.0);
        } else {
            tracing::error!("[AQRAY] recommend failed: {}", self.0);
        }
        (status, Json(serde_json::json!({ "detail": self.0.to_string() }))).into_response()
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[aqray-gateway] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(AqrayConfig::from_env());
    if config.google_maps_api_key.is_none() {
        tracing::warn!("GOOGLE_MAPS_API_KEY not set: /recommend will answer 500");
    }
    let bind_addr = config.bind_addr.clone();
    let service = match RecommendService::from_config(config) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("cannot build outbound clients: {}", e);
            std::process::exit(1);
        }
    };
    let state = AppState {
        service: Arc::new(service),
    };

    let app = build_app(state).layer(axum::middleware::from_fn(log_traffic));

    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("cannot bind {}: {}", bind_addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!("[AQRAY] gateway listening on {}", bind_addr);

    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        tracing::error!("server error: {}", e);
    }
}

fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/recommend", post(recommend_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

async fn log_traffic(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
    next: Next,
) -> Response {
    tracing::info!("[AQRAY] {} {} from {}", request.method(), request.uri().path(), addr);
    next.run(request).await
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

async fn recommend_handler(
    State(state): State<AppState>,
    Json(body): Json<RecommendRequest>,
) -> Result<Response, ApiError> {
    let res = state.service.recommend(&body).await?;
    Ok(Json(res).into_response())
}
