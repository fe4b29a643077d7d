use crate::api::{error_response, ErrorResponse};
use crate::auth::{create_session, verify_password};
use crate::get_conn;
use crate::models::User;
use crate::schema::users;
use crate::types::UserRole;
use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::normalize_email;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body(content = LoginRequest, example = json!({"email": "baker@example.com", "password": "levain123"})),
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    )
)]
pub async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> impl IntoResponse {
    let email = normalize_email(&req.email);
    let mut conn = get_conn!(state.pool);

    let user: User = match users::table
        .filter(users::email.eq(&email))
        .filter(users::deleted_at.is_null())
        .select(User::as_select())
        .first(&mut conn)
        .optional()
    {
        Ok(Some(u)) => u,
        Ok(None) => return error_response(StatusCode::UNAUTHORIZED, "Invalid credentials"),
        Err(e) => {
            tracing::error!("Failed to look up user: {}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to log in");
        }
    };

    if user.role() == UserRole::System || !verify_password(&req.password, &user.password_hash) {
        tracing::warn!(user_id = %user.id, "rejected login");
        return error_response(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }

    match create_session(&mut conn, user.id, state.session_ttl) {
        Ok(token) => (StatusCode::OK, Json(LoginResponse { token })).into_response(),
        Err(e) => {
            tracing::error!("Failed to create session: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create session")
        }
    }
}
