//! Home Monitoring API Server
//!
//! HTTP control surface for the monitoring session: status, source
//! selection, dismissals, health and Prometheus metrics.

use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use frame_capture::SourceError;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use monitor::{Monitor, MonitorError, Phase, SourceSelection};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tower::ServiceBuilder;
use tower_governor::GovernorLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use vision_classifier::{Classifier, GeminiClient};

pub mod rate_limit;
pub mod routes;
pub mod settings;

use rate_limit::{create_governor_config, RateLimitConfig};
use settings::{LogFormat, LoggingSettings, ServerSettings, Settings};

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Monitor(#[from] MonitorError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::Settings(err.to_string())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Monitor(MonitorError::Source(err)) => match err {
                SourceError::PermissionDenied(_) => StatusCode::FORBIDDEN,
                SourceError::NotFound(_) => StatusCode::NOT_FOUND,
                SourceError::Busy(_) => StatusCode::CONFLICT,
                SourceError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
                SourceError::Io(_) => StatusCode::BAD_GATEWAY,
                SourceError::NotAcquired => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Application state shared across handlers
pub struct AppState {
    pub monitor: Monitor,
    /// Prometheus exporter handle; absent when another recorder is installed
    pub metrics: Option<PrometheusHandle>,
    /// Base directory for clip files
    pub media_dir: PathBuf,
    pub version: String,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(monitor: Monitor, metrics: Option<PrometheusHandle>, media_dir: PathBuf) -> Self {
        Self {
            monitor,
            metrics,
            media_dir,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
        }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: String,
    pub uptime_seconds: u64,
    pub phase: Phase,
    pub source: SourceSelection,
    pub analyzing: bool,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>, rate_limit: &RateLimitConfig) -> Result<Router, ApiError> {
    let control = Router::new()
        .route("/api/v1/source", post(routes::source::select_source))
        .route("/api/v1/alert/dismiss", post(routes::alerts::dismiss_alert))
        .route("/api/v1/error/dismiss", post(routes::alerts::dismiss_error))
        .layer(GovernorLayer {
            config: create_governor_config(rate_limit)?,
        });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Ok(Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/status", get(routes::status::get_status))
        .route("/metrics", get(metrics_handler))
        .merge(control)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state))
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let snapshot = state.monitor.snapshot().await;
    let status = match snapshot.state.phase {
        Phase::ConfigError => "degraded",
        _ if snapshot.state.error.is_some() => "degraded",
        _ => "healthy",
    };

    Json(HealthResponse {
        status,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        phase: snapshot.state.phase,
        source: snapshot.state.source,
        analyzing: snapshot.state.is_analyzing,
    })
}

/// Prometheus text exposition
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics exporter not installed").into_response(),
    }
}

/// Initialize logging
pub fn init_logging(settings: &LoggingSettings) -> Result<(), ApiError> {
    let level = settings.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let installed = match settings.format {
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    };
    installed.map_err(|e| ApiError::Logging(e.to_string()))
}

/// Build the monitor from settings. A missing credential is not an error
/// here: the session starts in its configuration-error phase.
pub fn build_monitor(settings: &Settings) -> Result<Monitor, ApiError> {
    let classifier = GeminiClient::from_env(settings.classifier.clone()).map(|client| {
        info!("Using classifier model {}", client.model());
        Arc::new(client) as Arc<dyn Classifier>
    });
    Ok(Monitor::with_devices(&settings.monitor, classifier)?)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Run the server until Ctrl-C, then release the video source
pub async fn run_server(settings: Settings) -> Result<(), ApiError> {
    let monitor = build_monitor(&settings)?;
    if let Err(e) = monitor.select_source(SourceSelection::Live).await {
        warn!("Live camera unavailable at startup: {}", e);
    }

    let metrics = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Prometheus exporter not installed: {}", e);
            None
        }
    };

    let ServerSettings {
        bind,
        media_dir,
        rate_limit,
    } = settings.server;
    let state = Arc::new(AppState::new(monitor.clone(), metrics, media_dir));
    let app = create_router(state, &rate_limit)?;

    info!("Starting API server on {}", bind);
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    monitor.shutdown().await;
    info!("Server stopped");
    Ok(())
}
