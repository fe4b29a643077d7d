use crate::api::{db_error_response, error_response, nullable, validation_error, ErrorResponse};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::Bake;
use crate::schema::bakes;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use loafly_core::validation::validate_notes;
use loafly_core::ValidationErrors;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::detail::{load_bake_detail, BakeResponse};
use super::find_bake;

const RATING_ERROR: &str = "Rating must be a number between 1 and 5, or null";

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BakeNotesRequest {
    /// Required; null clears the notes
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BakeRatingRequest {
    /// Whole number from 1 to 5, or null to clear
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<i32>)]
    pub rating: Option<Option<Value>>,
}

impl BakeRatingRequest {
    /// The rating to store. Taken as raw JSON so strings and fractions get
    /// the same message as out-of-range numbers.
    fn rating(&self) -> Result<Option<i32>, &'static str> {
        match &self.rating {
            None => Err(RATING_ERROR),
            Some(None) => Ok(None),
            Some(Some(value)) => value
                .as_i64()
                .filter(|r| (1..=5).contains(r))
                .map(|r| Some(r as i32))
                .ok_or(RATING_ERROR),
        }
    }
}

fn respond_with_bake(conn: &mut PgConnection, bake: Bake) -> axum::response::Response {
    match load_bake_detail(conn, bake) {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(e) => db_error_response(&e, "Failed to fetch bake"),
    }
}

#[utoipa::path(
    put,
    path = "/api/bakes/{id}/notes",
    tag = "bakes",
    params(
        ("id" = Uuid, Path, description = "Bake ID")
    ),
    request_body = BakeNotesRequest,
    responses(
        (status = 200, description = "Updated bake", body = BakeResponse),
        (status = 400, description = "Notes field missing or too long", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Bake not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_bake_notes(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
    Json(request): Json<BakeNotesRequest>,
) -> impl IntoResponse {
    let Some(notes) = request.notes else {
        return error_response(StatusCode::BAD_REQUEST, "Notes field is required");
    };
    let mut errors = ValidationErrors::new();
    validate_notes(&mut errors, "notes", notes.as_deref());
    if !errors.is_empty() {
        return validation_error(errors);
    }

    let mut conn = get_conn!(pool);

    if let Err(response) = find_bake(&mut conn, user.id, id) {
        return response;
    }

    match diesel::update(bakes::table.find(id))
        .set((bakes::notes.eq(notes), bakes::updated_at.eq(Utc::now())))
        .returning(Bake::as_returning())
        .get_result(&mut conn)
    {
        Ok(bake) => respond_with_bake(&mut conn, bake),
        Err(e) => db_error_response(&e, "Failed to update bake notes"),
    }
}

#[utoipa::path(
    put,
    path = "/api/bakes/{id}/rating",
    tag = "bakes",
    params(
        ("id" = Uuid, Path, description = "Bake ID")
    ),
    request_body = BakeRatingRequest,
    responses(
        (status = 200, description = "Updated bake", body = BakeResponse),
        (status = 400, description = "Rating missing or out of range", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Bake not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_bake_rating(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
    Json(request): Json<BakeRatingRequest>,
) -> impl IntoResponse {
    let rating = match request.rating() {
        Ok(r) => r,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message),
    };

    let mut conn = get_conn!(pool);

    if let Err(response) = find_bake(&mut conn, user.id, id) {
        return response;
    }

    match diesel::update(bakes::table.find(id))
        .set((bakes::rating.eq(rating), bakes::updated_at.eq(Utc::now())))
        .returning(Bake::as_returning())
        .get_result(&mut conn)
    {
        Ok(bake) => respond_with_bake(&mut conn, bake),
        Err(e) => db_error_response(&e, "Failed to update bake rating"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rating(body: &str) -> Result<Option<i32>, &'static str> {
        serde_json::from_str::<BakeRatingRequest>(body)
            .unwrap()
            .rating()
    }

    #[test]
    fn test_rating_accepts_one_to_five_or_null() {
        assert_eq!(rating(r#"{"rating": 1}"#), Ok(Some(1)));
        assert_eq!(rating(r#"{"rating": 5}"#), Ok(Some(5)));
        assert_eq!(rating(r#"{"rating": null}"#), Ok(None));
    }

    #[test]
    fn test_rating_rejects_everything_else() {
        for body in [
            r#"{}"#,
            r#"{"rating": 0}"#,
            r#"{"rating": 6}"#,
            r#"{"rating": 3.5}"#,
            r#"{"rating": "4"}"#,
        ] {
            assert_eq!(rating(body), Err(RATING_ERROR), "{body}");
        }
    }

    #[test]
    fn test_notes_key_is_required() {
        let missing: BakeNotesRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.notes, None);
        let cleared: BakeNotesRequest = serde_json::from_str(r#"{"notes": null}"#).unwrap();
        assert_eq!(cleared.notes, Some(None));
    }
}
