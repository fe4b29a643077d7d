use crate::api::{db_error_response, ErrorResponse};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::{UserAction, UserProfile};
use crate::schema::user_actions;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::store::ensure_profile;

const RECENT_ACTION_COUNT: i64 = 10;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserActionResponse {
    pub id: Uuid,
    pub action: String,
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
    pub session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<UserAction> for UserActionResponse {
    fn from(action: UserAction) -> Self {
        Self {
            id: action.id,
            action: action.action,
            details: action.details,
            session_id: action.session_id,
            created_at: action.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub user_id: Uuid,
    pub display_name: String,
    /// beginner, intermediate or advanced
    pub experience_level: String,
    pub recipes_created: i32,
    pub bakes_completed: i32,
    pub total_bake_time_minutes: i32,
    pub advanced_features_used: Vec<String>,
    pub show_advanced_fields: bool,
    pub auto_save_enabled: bool,
    pub default_hydration: f64,
    pub preferred_salt_pct: f64,
    pub expand_steps_on_load: bool,
    pub show_ingredient_help: bool,
    pub last_active_at: DateTime<Utc>,
    pub recent_actions: Vec<UserActionResponse>,
}

impl ProfileResponse {
    pub fn new(profile: UserProfile, recent_actions: Vec<UserAction>) -> Self {
        Self {
            user_id: profile.user_id,
            display_name: profile.display_name,
            experience_level: profile.experience_level,
            recipes_created: profile.recipes_created,
            bakes_completed: profile.bakes_completed,
            total_bake_time_minutes: profile.total_bake_time_minutes,
            advanced_features_used: profile.advanced_features_used.into_iter().flatten().collect(),
            show_advanced_fields: profile.show_advanced_fields,
            auto_save_enabled: profile.auto_save_enabled,
            default_hydration: profile.default_hydration,
            preferred_salt_pct: profile.preferred_salt_pct,
            expand_steps_on_load: profile.expand_steps_on_load,
            show_ingredient_help: profile.show_ingredient_help,
            last_active_at: profile.last_active_at,
            recent_actions: recent_actions.into_iter().map(Into::into).collect(),
        }
    }
}

pub fn recent_actions(conn: &mut PgConnection, user_id: Uuid) -> QueryResult<Vec<UserAction>> {
    user_actions::table
        .filter(user_actions::user_id.eq(user_id))
        .order(user_actions::created_at.desc())
        .limit(RECENT_ACTION_COUNT)
        .select(UserAction::as_select())
        .load(conn)
}

#[utoipa::path(
    get,
    path = "/api/profile",
    tag = "profile",
    responses(
        (status = 200, description = "Profile with the most recent actions", body = ProfileResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_profile(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    let profile = match ensure_profile(&mut conn, user.id) {
        Ok(p) => p,
        Err(e) => return db_error_response(&e, "Failed to fetch profile"),
    };

    match recent_actions(&mut conn, user.id) {
        Ok(actions) => (StatusCode::OK, Json(ProfileResponse::new(profile, actions))).into_response(),
        Err(e) => db_error_response(&e, "Failed to fetch recent actions"),
    }
}
