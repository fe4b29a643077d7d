use crate::api::{error_response, validation_error, ErrorResponse};
use crate::auth::{create_session, hash_password};
use crate::get_conn;
use crate::models::{NewUser, User};
use crate::schema::users;
use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{normalize_email, validate_credentials};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SignupResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[utoipa::path(
    post,
    path = "/api/auth/signup",
    tag = "auth",
    request_body(content = SignupRequest, example = json!({"email": "baker@example.com", "password": "levain123"})),
    responses(
        (status = 201, description = "User created successfully", body = SignupResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    )
)]
pub async fn signup(State(state): State<AppState>, Json(req): Json<SignupRequest>) -> impl IntoResponse {
    let email = normalize_email(&req.email);
    let errors = validate_credentials(&email, &req.password);
    if !errors.is_empty() {
        return validation_error(errors);
    }

    let password_hash = match hash_password(&req.password) {
        Ok(h) => h,
        Err(e) => {
            tracing::error!("Failed to hash password: {}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to hash password");
        }
    };

    let mut conn = get_conn!(state.pool);

    let new_user = NewUser {
        email: &email,
        password_hash: &password_hash,
    };

    let result = conn.transaction(|conn| {
        let user: User = diesel::insert_into(users::table)
            .values(&new_user)
            .returning(User::as_returning())
            .get_result(conn)?;
        let token = create_session(conn, user.id, state.session_ttl)?;
        Ok::<_, diesel::result::Error>((user, token))
    });

    match result {
        Ok((user, token)) => {
            tracing::info!(user_id = %user.id, "user signed up");
            (
                StatusCode::CREATED,
                Json(SignupResponse {
                    user_id: user.id,
                    token,
                }),
            )
                .into_response()
        }
        Err(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        )) => error_response(StatusCode::CONFLICT, "Email already registered"),
        Err(e) => {
            tracing::error!("Failed to create user: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create user")
        }
    }
}
