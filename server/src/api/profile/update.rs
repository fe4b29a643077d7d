use crate::api::{db_error_response, validation_error, ErrorResponse};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::{UserProfile, UserProfileChanges};
use crate::schema::user_profiles;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use diesel::prelude::*;
use loafly_core::validation::{
    validate_required_text, MAX_HYDRATION_PCT, MAX_NAME_LENGTH, MAX_SALT_PCT,
};
use loafly_core::ValidationErrors;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use super::get::{recent_actions, ProfileResponse};
use super::store::ensure_profile;

/// Editable profile settings. Counters and experience level are derived
/// from tracked actions and cannot be set directly.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub show_advanced_fields: Option<bool>,
    pub auto_save_enabled: Option<bool>,
    pub default_hydration: Option<f64>,
    pub preferred_salt_pct: Option<f64>,
    pub expand_steps_on_load: Option<bool>,
    pub show_ingredient_help: Option<bool>,
}

impl UpdateProfileRequest {
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &self.display_name {
            validate_required_text(
                &mut errors,
                "display_name",
                "Display name",
                name,
                MAX_NAME_LENGTH,
            );
        }
        if let Some(h) = self.default_hydration {
            if !(0.0..=MAX_HYDRATION_PCT).contains(&h) {
                errors.add("default_hydration", "Hydration must be between 0 and 500");
            }
        }
        if let Some(s) = self.preferred_salt_pct {
            if !(0.0..=MAX_SALT_PCT).contains(&s) {
                errors.add("preferred_salt_pct", "Salt percentage must be between 0 and 10");
            }
        }
        errors
    }

    pub fn changes(&self) -> UserProfileChanges<'_> {
        UserProfileChanges {
            display_name: self.display_name.as_deref().map(str::trim),
            show_advanced_fields: self.show_advanced_fields,
            auto_save_enabled: self.auto_save_enabled,
            default_hydration: self.default_hydration,
            preferred_salt_pct: self.preferred_salt_pct,
            expand_steps_on_load: self.expand_steps_on_load,
            show_ingredient_help: self.show_ingredient_help,
        }
    }
}

#[utoipa::path(
    put,
    path = "/api/profile",
    tag = "profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = ProfileResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_profile(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Json(request): Json<UpdateProfileRequest>,
) -> impl IntoResponse {
    let errors = request.validate();
    if !errors.is_empty() {
        return validation_error(errors);
    }

    let mut conn = get_conn!(pool);

    let profile = match ensure_profile(&mut conn, user.id) {
        Ok(p) => p,
        Err(e) => return db_error_response(&e, "Failed to fetch profile"),
    };

    let changes = request.changes();
    let profile = if changes.is_empty() {
        profile
    } else {
        match diesel::update(user_profiles::table.find(profile.id))
            .set((&changes, user_profiles::last_active_at.eq(diesel::dsl::now)))
            .returning(UserProfile::as_returning())
            .get_result(&mut conn)
        {
            Ok(p) => p,
            Err(e) => return db_error_response(&e, "Failed to update profile"),
        }
    };

    match recent_actions(&mut conn, user.id) {
        Ok(actions) => (StatusCode::OK, Json(ProfileResponse::new(profile, actions))).into_response(),
        Err(e) => db_error_response(&e, "Failed to fetch recent actions"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_bounds() {
        let request = UpdateProfileRequest {
            display_name: Some("   ".to_string()),
            default_hydration: Some(501.0),
            preferred_salt_pct: Some(-1.0),
            ..Default::default()
        };
        let fields: Vec<String> = request
            .validate()
            .into_errors()
            .into_iter()
            .map(|e| e.field)
            .collect();
        assert_eq!(
            fields,
            vec!["display_name", "default_hydration", "preferred_salt_pct"]
        );
    }

    #[test]
    fn test_display_name_is_trimmed_and_empty_request_has_no_changes() {
        let request = UpdateProfileRequest {
            display_name: Some("  Crumb Shot  ".to_string()),
            ..Default::default()
        };
        assert!(request.validate().is_empty());
        assert_eq!(request.changes().display_name, Some("Crumb Shot"));
        assert!(UpdateProfileRequest::default().changes().is_empty());
    }
}
