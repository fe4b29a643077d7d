pub mod actions;
pub mod get;
pub mod preferences;
pub mod store;
pub mod update;

use crate::AppState;
use axum::routing::{get, post};
use axum::Router;
use utoipa::OpenApi;

/// Returns the router for /api/profile endpoints (mounted at /api/profile)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get::get_profile).put(update::update_profile))
        .route("/actions", post(actions::track_action))
        .route(
            "/preferences",
            get(preferences::get_preferences).put(preferences::update_preferences),
        )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        get::get_profile,
        update::update_profile,
        actions::track_action,
        preferences::get_preferences,
        preferences::update_preferences,
    ),
    components(schemas(
        get::ProfileResponse,
        get::UserActionResponse,
        update::UpdateProfileRequest,
        actions::TrackActionRequest,
        preferences::PreferencesUpdateResponse,
    ))
)]
pub struct ApiDoc;
