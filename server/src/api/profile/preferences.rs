//! Preferences are partly profile columns and partly free-form key/value
//! rows. Clients see and write them as one flat object.

use crate::api::{db_error_response, validation_error, ApiError, ErrorResponse};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::{NewUserPreference, UserPreference, UserProfile};
use crate::schema::{user_preferences, user_profiles};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use diesel::pg::upsert::excluded;
use diesel::prelude::*;
use loafly_core::validation::MAX_NAME_LENGTH;
use loafly_core::ValidationErrors;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::ToSchema;

use super::store::ensure_profile;
use super::update::UpdateProfileRequest;

const BOOLEAN_KEYS: [&str; 4] = [
    "show_advanced_fields",
    "auto_save_enabled",
    "expand_steps_on_load",
    "show_ingredient_help",
];
const NUMBER_KEYS: [&str; 2] = ["default_hydration", "preferred_salt_pct"];

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PreferencesUpdateResponse {
    pub success: bool,
    /// Number of keys written
    pub updated: usize,
}

fn structured_preferences(profile: &UserProfile) -> Map<String, Value> {
    let mut prefs = Map::new();
    prefs.insert("show_advanced_fields".into(), profile.show_advanced_fields.into());
    prefs.insert("auto_save_enabled".into(), profile.auto_save_enabled.into());
    prefs.insert("default_hydration".into(), profile.default_hydration.into());
    prefs.insert("preferred_salt_pct".into(), profile.preferred_salt_pct.into());
    prefs.insert("expand_steps_on_load".into(), profile.expand_steps_on_load.into());
    prefs.insert("show_ingredient_help".into(), profile.show_ingredient_help.into());
    prefs
}

fn merge_preferences(profile: &UserProfile, rows: Vec<UserPreference>) -> Map<String, Value> {
    let mut prefs = structured_preferences(profile);
    for row in rows {
        prefs.insert(row.key, row.value);
    }
    prefs
}

/// Split submitted preferences into profile settings and free-form pairs.
fn split_preferences(
    submitted: Map<String, Value>,
) -> Result<(UpdateProfileRequest, Vec<(String, Value)>), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let mut settings = UpdateProfileRequest::default();
    let mut free_form = Vec::new();

    for (key, value) in submitted {
        if BOOLEAN_KEYS.contains(&key.as_str()) {
            let Some(flag) = value.as_bool() else {
                errors.add(key, "Must be true or false");
                continue;
            };
            match key.as_str() {
                "show_advanced_fields" => settings.show_advanced_fields = Some(flag),
                "auto_save_enabled" => settings.auto_save_enabled = Some(flag),
                "expand_steps_on_load" => settings.expand_steps_on_load = Some(flag),
                _ => settings.show_ingredient_help = Some(flag),
            }
        } else if NUMBER_KEYS.contains(&key.as_str()) {
            let Some(number) = value.as_f64() else {
                errors.add(key, "Must be a number");
                continue;
            };
            if key == "default_hydration" {
                settings.default_hydration = Some(number);
            } else {
                settings.preferred_salt_pct = Some(number);
            }
        } else if key.trim().is_empty() || key.chars().count() > MAX_NAME_LENGTH {
            errors.add(key, "Preference keys must be between 1 and 255 characters");
        } else {
            free_form.push((key, value));
        }
    }

    errors.extend(settings.validate());
    if errors.is_empty() {
        Ok((settings, free_form))
    } else {
        Err(errors)
    }
}

#[utoipa::path(
    get,
    path = "/api/profile/preferences",
    tag = "profile",
    responses(
        (status = 200, description = "Profile settings merged with free-form preferences", body = HashMap<String, serde_json::Value>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_preferences(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    let profile = match ensure_profile(&mut conn, user.id) {
        Ok(p) => p,
        Err(e) => return db_error_response(&e, "Failed to fetch profile"),
    };

    match user_preferences::table
        .filter(user_preferences::user_id.eq(user.id))
        .order(user_preferences::key.asc())
        .select(UserPreference::as_select())
        .load(&mut conn)
    {
        Ok(rows) => (StatusCode::OK, Json(merge_preferences(&profile, rows))).into_response(),
        Err(e) => db_error_response(&e, "Failed to fetch preferences"),
    }
}

#[utoipa::path(
    put,
    path = "/api/profile/preferences",
    tag = "profile",
    request_body(content = HashMap<String, serde_json::Value>, description = "Flat object of preference keys to values"),
    responses(
        (status = 200, description = "Preferences stored", body = PreferencesUpdateResponse),
        (status = 400, description = "Invalid preference values", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_preferences(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Json(submitted): Json<Map<String, Value>>,
) -> impl IntoResponse {
    let updated = submitted.len();
    let (settings, free_form) = match split_preferences(submitted) {
        Ok(split) => split,
        Err(errors) => return validation_error(errors),
    };

    let mut conn = get_conn!(pool);

    let result = conn.transaction::<_, ApiError, _>(|conn| {
        let profile = ensure_profile(conn, user.id)?;

        let changes = settings.changes();
        if !changes.is_empty() {
            diesel::update(user_profiles::table.find(profile.id))
                .set(&changes)
                .execute(conn)?;
        }

        for (key, value) in free_form {
            diesel::insert_into(user_preferences::table)
                .values(&NewUserPreference {
                    user_id: user.id,
                    key: &key,
                    value,
                })
                .on_conflict((user_preferences::user_id, user_preferences::key))
                .do_update()
                .set((
                    user_preferences::value.eq(excluded(user_preferences::value)),
                    user_preferences::updated_at.eq(diesel::dsl::now),
                ))
                .execute(conn)?;
        }
        Ok(())
    });

    match result {
        Ok(()) => (
            StatusCode::OK,
            Json(PreferencesUpdateResponse {
                success: true,
                updated,
            }),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn submitted(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_known_keys_go_to_the_profile() {
        let (settings, free_form) = split_preferences(submitted(json!({
            "show_advanced_fields": true,
            "default_hydration": 80,
            "theme": "dark",
            "favorite_flours": ["rye", "spelt"],
        })))
        .unwrap();

        assert_eq!(settings.show_advanced_fields, Some(true));
        assert_eq!(settings.default_hydration, Some(80.0));
        assert_eq!(settings.auto_save_enabled, None);

        let mut keys: Vec<&str> = free_form.iter().map(|(k, _)| k.as_str()).collect();
        keys.sort();
        assert_eq!(keys, vec!["favorite_flours", "theme"]);
    }

    #[test]
    fn test_known_keys_are_type_checked() {
        let errors = split_preferences(submitted(json!({
            "auto_save_enabled": "yes",
            "preferred_salt_pct": 12,
        })))
        .unwrap_err();

        let mut fields: Vec<String> = errors.into_errors().into_iter().map(|e| e.field).collect();
        fields.sort();
        assert_eq!(fields, vec!["auto_save_enabled", "preferred_salt_pct"]);
    }
}
