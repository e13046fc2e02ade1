pub mod config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use service_core::axum::{middleware::from_fn, routing::get, Router};
use service_core::middleware::{
    metrics::metrics_middleware,
    tracing::{request_id_middleware, RequestId},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::ScopeConfig;
use crate::services::{AccessEnforcer, Directory, PermissionTable, RecordStore};
use service_core::error::AppError;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: ScopeConfig,
    pub permissions: PermissionTable,
    pub directory: Arc<dyn Directory>,
    pub records: Arc<dyn RecordStore>,
    pub enforcer: AccessEnforcer,
}

impl AppState {
    pub fn new(
        config: ScopeConfig,
        directory: Arc<dyn Directory>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        let permissions = PermissionTable::new();
        Self {
            config,
            permissions,
            enforcer: AccessEnforcer::new(permissions, directory.clone()),
            directory,
            records,
        }
    }

    /// State backed by one value serving both the directory and record reads.
    pub fn with_backend<B>(config: ScopeConfig, backend: Arc<B>) -> Self
    where
        B: Directory + RecordStore + 'static,
    {
        Self::new(config, backend.clone(), backend)
    }
}

pub async fn build_router(state: AppState) -> Result<Router, AppError> {
    let allowed_origins = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<service_core::axum::http::HeaderValue>() {
            Ok(origin) => Some(origin),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e);
                None
            }
        })
        .collect::<Vec<service_core::axum::http::HeaderValue>>();

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .route("/scope", get(handlers::scope::get_scope))
        .route("/students", get(handlers::students::list_students))
        .route("/students/me", get(handlers::students::get_me))
        .route("/students/:id", get(handlers::students::get_student))
        .route("/units", get(handlers::units::list_units))
        .route("/units/:id/courses", get(handlers::units::list_unit_courses))
        .route("/courses", get(handlers::courses::list_courses))
        .route(
            "/courses/:id/disciplines",
            get(handlers::courses::list_course_disciplines),
        )
        .route("/disciplines", get(handlers::disciplines::list_disciplines))
        .with_state(state)
        // Add metrics middleware
        .layer(from_fn(metrics_middleware))
        // Add tracing layer
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &service_core::axum::http::Request<_>| {
                let request_id = request
                    .extensions()
                    .get::<RequestId>()
                    .map(|id| id.0.as_str())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                    user_id = tracing::field::Empty,
                )
            },
        ))
        // Outside the trace layer, so the span sees the RequestId extension
        .layer(from_fn(request_id_middleware))
        // Add CORS layer
        .layer(
            CorsLayer::new()
                .allow_origin(allowed_origins)
                .allow_methods([
                    service_core::axum::http::Method::GET,
                    service_core::axum::http::Method::OPTIONS,
                ])
                .allow_headers([
                    service_core::axum::http::header::CONTENT_TYPE,
                    service_core::axum::http::header::HeaderName::from_static(
                        middleware::USER_ID_HEADER,
                    ),
                    service_core::axum::http::header::HeaderName::from_static(
                        middleware::USER_ROLE_HEADER,
                    ),
                    service_core::axum::http::header::HeaderName::from_static(
                        service_core::middleware::tracing::REQUEST_ID_HEADER,
                    ),
                ]),
        );

    Ok(app)
}

/// Service health check
pub async fn health_check(
    service_core::axum::extract::State(state): service_core::axum::extract::State<AppState>,
) -> Result<service_core::axum::Json<serde_json::Value>, AppError> {
    state.directory.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Directory health check failed");
        AppError::from(e)
    })?;

    Ok(service_core::axum::Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "directory": "up"
        }
    })))
}
