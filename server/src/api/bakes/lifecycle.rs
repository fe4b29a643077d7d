use crate::api::profile::store::record_action;
use crate::api::{db_error_response, error_response, ApiError, ErrorResponse};
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
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use super::detail::{load_bake_detail, BakeResponse};
use super::find_bake;

fn duration_minutes(start: DateTime<Utc>, finish: DateTime<Utc>) -> i64 {
    (finish - start).num_minutes().max(0)
}

const ALREADY_INACTIVE: &str = "This bake is already inactive";

/// Deactivate the bake only if it is still active; `None` when another
/// request finished it first.
fn complete_active_bake(
    conn: &mut PgConnection,
    bake_id: Uuid,
    at: DateTime<Utc>,
) -> QueryResult<Option<Bake>> {
    diesel::update(
        bakes::table
            .filter(bakes::id.eq(bake_id))
            .filter(bakes::active.eq(true)),
    )
    .set((
        bakes::active.eq(false),
        bakes::finish_timestamp.eq(Some(at)),
        bakes::updated_at.eq(at),
    ))
    .returning(Bake::as_returning())
    .get_result(conn)
    .optional()
}

fn finish_bake(conn: &mut PgConnection, bake_id: Uuid, at: DateTime<Utc>) -> QueryResult<Bake> {
    diesel::update(bakes::table.find(bake_id))
        .set((
            bakes::active.eq(false),
            bakes::finish_timestamp.eq(Some(at)),
            bakes::updated_at.eq(at),
        ))
        .returning(Bake::as_returning())
        .get_result(conn)
}

#[utoipa::path(
    put,
    path = "/api/bakes/{id}/complete",
    tag = "bakes",
    params(
        ("id" = Uuid, Path, description = "Bake ID")
    ),
    responses(
        (status = 200, description = "Bake finished", body = BakeResponse),
        (status = 400, description = "Bake is already inactive", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Bake not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn complete_bake(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    let bake = match find_bake(&mut conn, user.id, id) {
        Ok(b) => b,
        Err(response) => return response,
    };
    if !bake.active {
        return error_response(StatusCode::BAD_REQUEST, ALREADY_INACTIVE);
    }

    let now = Utc::now();
    let minutes = duration_minutes(bake.start_timestamp, now);
    let result = conn.transaction::<_, ApiError, _>(|conn| {
        let Some(bake) = complete_active_bake(conn, id, now)? else {
            return Err(ApiError::BadRequest(ALREADY_INACTIVE.to_string()));
        };
        record_action(
            conn,
            user.id,
            "bake_completed",
            Some(json!({ "duration_minutes": minutes })),
            None,
        )?;
        Ok(load_bake_detail(conn, bake)?)
    });

    match result {
        Ok(detail) => {
            tracing::info!(bake_id = %id, duration_minutes = minutes, "bake completed");
            (StatusCode::OK, Json(detail)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

#[utoipa::path(
    put,
    path = "/api/bakes/{id}/cancel",
    tag = "bakes",
    params(
        ("id" = Uuid, Path, description = "Bake ID")
    ),
    responses(
        (status = 200, description = "Bake cancelled", body = BakeResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Bake not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn cancel_bake(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    if let Err(response) = find_bake(&mut conn, user.id, id) {
        return response;
    }

    let bake = match finish_bake(&mut conn, id, Utc::now()) {
        Ok(b) => b,
        Err(e) => return db_error_response(&e, "Failed to cancel bake"),
    };
    tracing::info!(bake_id = %id, "bake cancelled");

    match load_bake_detail(&mut conn, bake) {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(e) => db_error_response(&e, "Failed to fetch bake"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_duration_minutes() {
        let start = Utc::now();
        assert_eq!(duration_minutes(start, start + Duration::minutes(185)), 185);
        assert_eq!(duration_minutes(start, start + Duration::seconds(59)), 0);
        // Clock skew never produces a negative bake time
        assert_eq!(duration_minutes(start, start - Duration::minutes(3)), 0);
    }
}
