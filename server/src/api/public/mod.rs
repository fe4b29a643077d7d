pub mod auth;
pub mod health;

use crate::AppState;
use axum::routing::{get, post};
use axum::Router;
use utoipa::OpenApi;

/// Returns the router for public endpoints (no auth required)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/auth/signup", post(auth::signup::signup))
        .route("/api/auth/login", post(auth::login::login))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login::login,
        auth::signup::signup,
        health::health,
    ),
    components(schemas(
        auth::login::LoginRequest,
        auth::login::LoginResponse,
        auth::signup::SignupRequest,
        auth::signup::SignupResponse,
        health::HealthResponse,
    ))
)]
pub struct ApiDoc;
