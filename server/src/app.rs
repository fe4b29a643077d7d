use crate::api;
use crate::auth;
use crate::db::DbPool;
use axum::extract::{FromRef, MatchedPath};
use axum::http::Request;
use axum::middleware;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::Span;
use utoipa_swagger_ui::SwaggerUi;

/// Routes whose requests are not worth a log line
const QUIET_PATHS: &[&str] = &["/api/health"];

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<DbPool>,
    pub session_ttl: chrono::Duration,
}

impl FromRef<AppState> for Arc<DbPool> {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

pub fn build_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_router = api::public::router().nest("/api/meta", api::meta::router());

    // Protected routes (auth required)
    let protected_router = Router::new()
        .nest("/api/recipes", api::recipes::router())
        .nest("/api/steps", api::steps::router())
        .nest("/api/bakes", api::bakes::router())
        .nest("/api/profile", api::profile::router())
        .nest("/api/entity-requests", api::entity_requests::router())
        .layer(middleware::from_fn_with_state(
            state.pool.clone(),
            auth::require_auth,
        ));

    let swagger_ui = SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api::openapi());

    Router::new()
        .merge(public_router)
        .merge(protected_router)
        .merge(swagger_ui)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let matched_path = request
                        .extensions()
                        .get::<MatchedPath>()
                        .map(MatchedPath::as_str)
                        .unwrap_or(request.uri().path());

                    if QUIET_PATHS.contains(&matched_path) {
                        tracing::trace_span!("http_request")
                    } else {
                        tracing::info_span!(
                            "http_request",
                            method = %request.method(),
                            path = %matched_path,
                        )
                    }
                })
                .on_request(|_request: &Request<_>, _span: &Span| {})
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        // Skip logging for noisy endpoints (trace-level spans)
                        if span.metadata().map(|m| m.level()) == Some(&tracing::Level::TRACE) {
                            return;
                        }
                        let status = response.status().as_u16();
                        if status >= 500 {
                            tracing::error!(
                                status = %status,
                                latency_ms = %latency.as_millis(),
                                "request failed with server error"
                            );
                        } else {
                            tracing::info!(
                                status = %status,
                                latency_ms = %latency.as_millis(),
                                "request completed"
                            );
                        }
                    },
                )
                .on_failure(
                    |error: tower_http::classify::ServerErrorsFailureClass,
                     latency: std::time::Duration,
                     _span: &Span| {
                        tracing::error!(
                            error = %error,
                            latency_ms = %latency.as_millis(),
                            "request failed"
                        );
                    },
                ),
        )
}
