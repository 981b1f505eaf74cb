//! HTTP surface for the reconciliation platform, mounted under `/api/v1`.

pub mod exception_routes;
pub mod prediction_routes;
pub mod recon_routes;
pub mod report_routes;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use recon_core::{ReconConfig, ReconError};
use recon_store::ReconDb;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(Clone)]
pub struct AppState {
    pub db: ReconDb,
    pub config: Arc<ReconConfig>,
}

/// Request-level error, mapped onto the HTTP status taxonomy.
#[derive(Debug)]
pub enum AppError {
    Recon(ReconError),
    Internal(anyhow::Error),
}

impl From<ReconError> for AppError {
    fn from(err: ReconError) -> Self {
        AppError::Recon(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Recon(ReconError::NotFound(m)) => (StatusCode::NOT_FOUND, m.clone()),
            AppError::Recon(ReconError::ModelUnavailable(m)) => (StatusCode::NOT_FOUND, m.clone()),
            AppError::Recon(ReconError::Validation(m)) => (StatusCode::BAD_REQUEST, m.clone()),
            AppError::Recon(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            AppError::Internal(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {message}");
        }

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        recon_routes::health,
        recon_routes::run_ingestion,
        recon_routes::run_reconciliation,
        recon_routes::trade_count,
        exception_routes::route_exception,
        exception_routes::auto_remediate,
        exception_routes::overdue_exceptions,
        exception_routes::list_open_breaks,
        report_routes::report_summary,
        report_routes::report_aging,
        report_routes::report_runs,
        report_routes::report_root_cause,
        prediction_routes::predict_break,
    ),
    info(
        title = "Trade Reconciliation and Exception Management API",
        description = "Trade matching, break prediction, exception routing, and analytics."
    )
)]
struct ApiDoc;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(recon_routes::routes())
        .merge(exception_routes::routes())
        .merge(report_routes::routes())
        .merge(prediction_routes::routes())
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes())
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let env_filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(env_filter()).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter()).init();
    }

    let config = ReconConfig::from_env()?;
    let db = ReconDb::connect(&config).await?;
    tracing::info!("Connected to {}", config.database_url);

    let bind = config.api_bind.clone();
    let state = AppState {
        db,
        config: Arc::new(config),
    };

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!("API server listening on {bind}");
    axum::serve(listener, app(state)).await?;

    Ok(())
}
