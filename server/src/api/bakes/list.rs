use crate::api::{db_error_response, ErrorResponse};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::Bake;
use crate::schema::{bake_steps, bakes};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use diesel::dsl::count_star;
use diesel::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::detail::{bake_response, load_bake_steps, recipe_names, BakeResponse};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BakeSummary {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub recipe_name: String,
    pub notes: Option<String>,
    pub rating: Option<i32>,
    pub active: bool,
    pub start_timestamp: DateTime<Utc>,
    pub finish_timestamp: Option<DateTime<Utc>>,
    pub step_count: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BakeListResponse {
    pub bakes: Vec<BakeSummary>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ActiveBakesResponse {
    pub bakes: Vec<BakeResponse>,
}

#[utoipa::path(
    get,
    path = "/api/bakes",
    tag = "bakes",
    responses(
        (status = 200, description = "All of the user's bakes, newest first", body = BakeListResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_bakes(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    let bakes: Vec<Bake> = match bakes::table
        .filter(bakes::owner_id.eq(user.id))
        .order(bakes::start_timestamp.desc())
        .select(Bake::as_select())
        .load(&mut conn)
    {
        Ok(b) => b,
        Err(e) => return db_error_response(&e, "Failed to fetch bakes"),
    };

    let bake_ids: Vec<Uuid> = bakes.iter().map(|b| b.id).collect();
    let step_counts: HashMap<Uuid, i64> = match bake_steps::table
        .filter(bake_steps::bake_id.eq_any(&bake_ids))
        .group_by(bake_steps::bake_id)
        .select((bake_steps::bake_id, count_star()))
        .load::<(Uuid, i64)>(&mut conn)
    {
        Ok(rows) => rows.into_iter().collect(),
        Err(e) => return db_error_response(&e, "Failed to count bake steps"),
    };

    let recipe_ids: Vec<Uuid> = bakes.iter().map(|b| b.recipe_id).collect();
    let names = match recipe_names(&mut conn, &recipe_ids) {
        Ok(n) => n,
        Err(e) => return db_error_response(&e, "Failed to fetch recipe names"),
    };

    let bakes = bakes
        .into_iter()
        .map(|bake| BakeSummary {
            step_count: step_counts.get(&bake.id).copied().unwrap_or(0),
            recipe_name: names.get(&bake.recipe_id).cloned().unwrap_or_default(),
            id: bake.id,
            recipe_id: bake.recipe_id,
            notes: bake.notes,
            rating: bake.rating,
            active: bake.active,
            start_timestamp: bake.start_timestamp,
            finish_timestamp: bake.finish_timestamp,
        })
        .collect();

    (StatusCode::OK, Json(BakeListResponse { bakes })).into_response()
}

#[utoipa::path(
    get,
    path = "/api/bakes/active",
    tag = "bakes",
    responses(
        (status = 200, description = "Running bakes with their steps, newest first", body = ActiveBakesResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_active_bakes(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    let bakes: Vec<Bake> = match bakes::table
        .filter(bakes::owner_id.eq(user.id))
        .filter(bakes::active.eq(true))
        .order(bakes::start_timestamp.desc())
        .select(Bake::as_select())
        .load(&mut conn)
    {
        Ok(b) => b,
        Err(e) => return db_error_response(&e, "Failed to fetch active bakes"),
    };

    let bake_ids: Vec<Uuid> = bakes.iter().map(|b| b.id).collect();
    let mut steps = match load_bake_steps(&mut conn, &bake_ids) {
        Ok(s) => s,
        Err(e) => return db_error_response(&e, "Failed to fetch bake steps"),
    };
    let recipe_ids: Vec<Uuid> = bakes.iter().map(|b| b.recipe_id).collect();
    let names = match recipe_names(&mut conn, &recipe_ids) {
        Ok(n) => n,
        Err(e) => return db_error_response(&e, "Failed to fetch recipe names"),
    };

    let bakes = bakes
        .into_iter()
        .map(|bake| {
            let recipe_name = names.get(&bake.recipe_id).cloned().unwrap_or_default();
            let bake_steps = steps.remove(&bake.id).unwrap_or_default();
            bake_response(bake, recipe_name, bake_steps)
        })
        .collect();

    (StatusCode::OK, Json(ActiveBakesResponse { bakes })).into_response()
}
