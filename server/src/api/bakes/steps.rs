//! Progress of individual bake steps.

use crate::api::{
    db_error_response, error_response, nullable, validation_error, ApiError, ErrorResponse,
};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::BakeStep;
use crate::schema::{bake_step_parameter_values, bake_steps};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use loafly_core::validation::validate_notes;
use loafly_core::{StepExecutionStatus, ValidationErrors};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::detail::{load_bake_step, BakeStepResponse};
use super::{find_active_bake, find_bake_step};

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CompleteStepRequest {
    /// Measured values keyed by parameter id
    #[serde(default)]
    #[schema(value_type = Object)]
    pub actual_parameter_values: HashMap<String, Value>,
    pub notes: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub deviations: Option<Value>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StepNoteRequest {
    /// Required; null clears the note
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StepDeviationsRequest {
    /// Required; null clears the deviations
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<Object>)]
    pub deviations: Option<Option<Value>>,
}

fn check_transition(current: &str, next: StepExecutionStatus) -> Result<(), String> {
    match StepExecutionStatus::from_str(current) {
        Some(status) if status.can_transition_to(next) => Ok(()),
        _ => Err(format!(
            "Cannot change step status from {} to {}",
            current,
            next.as_str()
        )),
    }
}

/// Statuses a step may still be in when the update for `next` lands.
fn source_statuses(next: StepExecutionStatus) -> Vec<&'static str> {
    StepExecutionStatus::sources_for(next)
        .iter()
        .map(|status| status.as_str())
        .collect()
}

fn changed_concurrently(step_id: Uuid, next: StepExecutionStatus) -> String {
    tracing::warn!(%step_id, next = next.as_str(), "bake step changed by a concurrent request");
    format!("Step status changed before it could move to {}", next.as_str())
}

/// Deviations are stored as JSON and share the notes limit once serialized.
fn check_step_text(notes: Option<&str>, deviations: Option<&Value>) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    validate_notes(&mut errors, "notes", notes);
    let serialized = deviations.map(Value::to_string);
    validate_notes(&mut errors, "deviations", serialized.as_deref());
    errors
}

/// Parameter ids from a completion request. Keys that are not ids are
/// skipped with a warning.
fn actual_values(values: &HashMap<String, Value>) -> Vec<(Uuid, &Value)> {
    let mut parsed: Vec<(Uuid, &Value)> = values
        .iter()
        .filter_map(|(key, value)| match Uuid::parse_str(key) {
            Ok(id) => Some((id, value)),
            Err(_) => {
                tracing::warn!(key = %key, "ignoring actual value with malformed parameter id");
                None
            }
        })
        .collect();
    parsed.sort_by_key(|(id, _)| *id);
    parsed
}

/// Active bake and one of its steps, or the response explaining why not.
fn find_step(
    conn: &mut PgConnection,
    user_id: Uuid,
    bake_id: Uuid,
    step_id: Uuid,
) -> Result<BakeStep, Response> {
    find_active_bake(conn, user_id, bake_id)?;
    find_bake_step(conn, bake_id, step_id)
}

fn respond_with_step(conn: &mut PgConnection, step: BakeStep) -> Response {
    match load_bake_step(conn, step) {
        Ok(step) => (StatusCode::OK, Json(step)).into_response(),
        Err(e) => db_error_response(&e, "Failed to fetch bake step"),
    }
}

#[utoipa::path(
    put,
    path = "/api/bakes/{id}/steps/{step_id}/start",
    tag = "bakes",
    params(
        ("id" = Uuid, Path, description = "Bake ID"),
        ("step_id" = Uuid, Path, description = "Bake step ID")
    ),
    responses(
        (status = 200, description = "Step started", body = BakeStepResponse),
        (status = 400, description = "Bake inactive or step already started", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Bake or step not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn start_step(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path((id, step_id)): Path<(Uuid, Uuid)>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    let step = match find_step(&mut conn, user.id, id, step_id) {
        Ok(s) => s,
        Err(response) => return response,
    };
    if let Err(message) = check_transition(&step.status, StepExecutionStatus::InProgress) {
        tracing::warn!(%step_id, status = %step.status, "rejected bake step transition");
        return error_response(StatusCode::BAD_REQUEST, message);
    }

    let next = StepExecutionStatus::InProgress;
    match diesel::update(
        bake_steps::table
            .filter(bake_steps::id.eq(step_id))
            .filter(bake_steps::status.eq_any(source_statuses(next))),
    )
    .set((
        bake_steps::status.eq(next.as_str()),
        bake_steps::start_timestamp.eq(Some(Utc::now())),
    ))
    .returning(BakeStep::as_returning())
    .get_result(&mut conn)
    .optional()
    {
        Ok(Some(step)) => respond_with_step(&mut conn, step),
        Ok(None) => error_response(StatusCode::BAD_REQUEST, changed_concurrently(step_id, next)),
        Err(e) => db_error_response(&e, "Failed to start step"),
    }
}

#[utoipa::path(
    put,
    path = "/api/bakes/{id}/steps/{step_id}/complete",
    tag = "bakes",
    params(
        ("id" = Uuid, Path, description = "Bake ID"),
        ("step_id" = Uuid, Path, description = "Bake step ID")
    ),
    request_body(content = Option<CompleteStepRequest>, description = "Measured values and notes, all optional"),
    responses(
        (status = 200, description = "Step completed", body = BakeStepResponse),
        (status = 400, description = "Notes too long, bake inactive or step already finished", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Bake or step not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn complete_step(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path((id, step_id)): Path<(Uuid, Uuid)>,
    body: Option<Json<CompleteStepRequest>>,
) -> impl IntoResponse {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let errors = check_step_text(request.notes.as_deref(), request.deviations.as_ref());
    if !errors.is_empty() {
        return validation_error(errors);
    }

    let mut conn = get_conn!(pool);

    let step = match find_step(&mut conn, user.id, id, step_id) {
        Ok(s) => s,
        Err(response) => return response,
    };
    if let Err(message) = check_transition(&step.status, StepExecutionStatus::Completed) {
        tracing::warn!(%step_id, status = %step.status, "rejected bake step transition");
        return error_response(StatusCode::BAD_REQUEST, message);
    }

    let next = StepExecutionStatus::Completed;
    let result = conn.transaction::<_, ApiError, _>(|conn| {
        let step: Option<BakeStep> = diesel::update(
            bake_steps::table
                .filter(bake_steps::id.eq(step_id))
                .filter(bake_steps::status.eq_any(source_statuses(next))),
        )
        .set((
            bake_steps::status.eq(next.as_str()),
            bake_steps::finish_timestamp.eq(Some(Utc::now())),
            request.notes.as_deref().map(|n| bake_steps::notes.eq(n)),
            request
                .deviations
                .clone()
                .map(|d| bake_steps::deviations.eq(d)),
        ))
        .returning(BakeStep::as_returning())
        .get_result(conn)
        .optional()?;
        let Some(step) = step else {
            return Err(ApiError::BadRequest(changed_concurrently(step_id, next)));
        };

        for (parameter_id, value) in actual_values(&request.actual_parameter_values) {
            let updated = diesel::update(
                bake_step_parameter_values::table
                    .filter(bake_step_parameter_values::bake_step_id.eq(step_id))
                    .filter(bake_step_parameter_values::parameter_id.eq(parameter_id)),
            )
            .set(bake_step_parameter_values::actual_value.eq(Some(value.clone())))
            .execute(conn)?;

            if updated == 0 {
                tracing::warn!(
                    %step_id,
                    %parameter_id,
                    "no planned value for parameter; actual value ignored"
                );
            }
        }

        Ok(step)
    });

    match result {
        Ok(step) => respond_with_step(&mut conn, step),
        Err(e) => e.into_response(),
    }
}

#[utoipa::path(
    put,
    path = "/api/bakes/{id}/steps/{step_id}/skip",
    tag = "bakes",
    params(
        ("id" = Uuid, Path, description = "Bake ID"),
        ("step_id" = Uuid, Path, description = "Bake step ID")
    ),
    responses(
        (status = 200, description = "Step skipped", body = BakeStepResponse),
        (status = 400, description = "Bake inactive or step already finished", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Bake or step not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn skip_step(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path((id, step_id)): Path<(Uuid, Uuid)>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    let step = match find_step(&mut conn, user.id, id, step_id) {
        Ok(s) => s,
        Err(response) => return response,
    };
    if let Err(message) = check_transition(&step.status, StepExecutionStatus::Skipped) {
        tracing::warn!(%step_id, status = %step.status, "rejected bake step transition");
        return error_response(StatusCode::BAD_REQUEST, message);
    }

    let next = StepExecutionStatus::Skipped;
    match diesel::update(
        bake_steps::table
            .filter(bake_steps::id.eq(step_id))
            .filter(bake_steps::status.eq_any(source_statuses(next))),
    )
    .set((
        bake_steps::status.eq(next.as_str()),
        bake_steps::finish_timestamp.eq(Some(Utc::now())),
    ))
    .returning(BakeStep::as_returning())
    .get_result(&mut conn)
    .optional()
    {
        Ok(Some(step)) => respond_with_step(&mut conn, step),
        Ok(None) => error_response(StatusCode::BAD_REQUEST, changed_concurrently(step_id, next)),
        Err(e) => db_error_response(&e, "Failed to skip step"),
    }
}

#[utoipa::path(
    put,
    path = "/api/bakes/{id}/steps/{step_id}/note",
    tag = "bakes",
    params(
        ("id" = Uuid, Path, description = "Bake ID"),
        ("step_id" = Uuid, Path, description = "Bake step ID")
    ),
    request_body = StepNoteRequest,
    responses(
        (status = 200, description = "Updated step", body = BakeStepResponse),
        (status = 400, description = "Notes missing or too long, or bake inactive", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Bake or step not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_step_note(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path((id, step_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<StepNoteRequest>,
) -> impl IntoResponse {
    let Some(notes) = request.notes else {
        return error_response(StatusCode::BAD_REQUEST, "Notes field is required");
    };
    let errors = check_step_text(notes.as_deref(), None);
    if !errors.is_empty() {
        return validation_error(errors);
    }

    let mut conn = get_conn!(pool);

    if let Err(response) = find_step(&mut conn, user.id, id, step_id) {
        return response;
    }

    match diesel::update(bake_steps::table.find(step_id))
        .set(bake_steps::notes.eq(notes))
        .returning(BakeStep::as_returning())
        .get_result(&mut conn)
    {
        Ok(step) => respond_with_step(&mut conn, step),
        Err(e) => db_error_response(&e, "Failed to update step notes"),
    }
}

#[utoipa::path(
    put,
    path = "/api/bakes/{id}/steps/{step_id}/deviations",
    tag = "bakes",
    params(
        ("id" = Uuid, Path, description = "Bake ID"),
        ("step_id" = Uuid, Path, description = "Bake step ID")
    ),
    request_body = StepDeviationsRequest,
    responses(
        (status = 200, description = "Updated step", body = BakeStepResponse),
        (status = 400, description = "Deviations missing or too long, or bake inactive", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Bake or step not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_step_deviations(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path((id, step_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<StepDeviationsRequest>,
) -> impl IntoResponse {
    let Some(deviations) = request.deviations else {
        return error_response(StatusCode::BAD_REQUEST, "Deviations field is required");
    };
    let errors = check_step_text(None, deviations.as_ref());
    if !errors.is_empty() {
        return validation_error(errors);
    }

    let mut conn = get_conn!(pool);

    if let Err(response) = find_step(&mut conn, user.id, id, step_id) {
        return response;
    }

    match diesel::update(bake_steps::table.find(step_id))
        .set(bake_steps::deviations.eq(deviations))
        .returning(BakeStep::as_returning())
        .get_result(&mut conn)
    {
        Ok(step) => respond_with_step(&mut conn, step),
        Err(e) => db_error_response(&e, "Failed to update step deviations"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_transitions() {
        use StepExecutionStatus::*;
        assert!(check_transition("PENDING", InProgress).is_ok());
        assert!(check_transition("PENDING", Completed).is_ok());
        assert!(check_transition("IN_PROGRESS", Skipped).is_ok());
        assert_eq!(
            check_transition("IN_PROGRESS", InProgress),
            Err("Cannot change step status from IN_PROGRESS to IN_PROGRESS".to_string())
        );
        assert!(check_transition("COMPLETED", Skipped).is_err());
        assert!(check_transition("SKIPPED", Completed).is_err());
        assert!(check_transition("bogus", Completed).is_err());
    }

    #[test]
    fn test_updates_only_match_statuses_that_allow_the_move() {
        use StepExecutionStatus::*;
        assert_eq!(source_statuses(InProgress), vec!["PENDING"]);
        assert_eq!(source_statuses(Completed), vec!["PENDING", "IN_PROGRESS"]);
        assert_eq!(source_statuses(Skipped), vec!["PENDING", "IN_PROGRESS"]);
        for next in [InProgress, Completed, Skipped] {
            assert!(!source_statuses(next).contains(&"COMPLETED"));
            assert!(!source_statuses(next).contains(&"SKIPPED"));
            for source in source_statuses(next) {
                assert!(check_transition(source, next).is_ok());
            }
        }
    }

    #[test]
    fn test_actual_values_skip_malformed_ids() {
        let id = Uuid::from_u128(7);
        let values: HashMap<String, Value> = [
            (id.to_string(), json!(26.5)),
            ("not-a-uuid".to_string(), json!(1)),
        ]
        .into_iter()
        .collect();

        let parsed = actual_values(&values);
        assert_eq!(parsed, vec![(id, &json!(26.5))]);
    }

    #[test]
    fn test_complete_request_fields_are_optional() {
        let request: CompleteStepRequest = serde_json::from_str("{}").unwrap();
        assert!(request.actual_parameter_values.is_empty());
        assert!(request.notes.is_none());
        assert!(request.deviations.is_none());
    }

    #[test]
    fn test_step_text_limits() {
        let deviations = json!({"bulk": "ran long"});
        assert!(check_step_text(Some("proofed on the counter"), Some(&deviations)).is_empty());

        let long = "a".repeat(5001);
        let errors = check_step_text(Some(&long), Some(&json!({ "bulk": long })));
        let fields: Vec<&str> = errors.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["notes", "deviations"]);
    }

    #[test]
    fn test_deviations_key_is_required() {
        let missing: StepDeviationsRequest = serde_json::from_str("{}").unwrap();
        assert!(missing.deviations.is_none());
        let set: StepDeviationsRequest =
            serde_json::from_str(r#"{"deviations": {"bulk": "ran long"}}"#).unwrap();
        assert_eq!(set.deviations, Some(Some(json!({"bulk": "ran long"}))));
    }
}
