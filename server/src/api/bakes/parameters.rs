use crate::api::meta::library::base_spec;
use crate::api::{db_error_response, error_response, nullable, validation_error, ErrorResponse};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::{BakeStep, StepParameter};
use crate::schema::{bake_step_parameter_values, step_parameters};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use diesel::prelude::*;
use loafly_core::parameters::{normalize_value, typed_json};
use loafly_core::validation::validate_notes;
use loafly_core::{ParameterSpec, ValidationErrors};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::detail::{load_bake_step, BakeStepResponse};
use super::{find_active_bake, find_bake_step};

const VALUE_NOT_FOUND: &str = "Parameter value record not found for this step";

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ActualValueRequest {
    /// Required; null clears the recorded value
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<Object>)]
    pub actual_value: Option<Option<Value>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PlannedValueRequest {
    /// Required; null clears the plan
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<Object>)]
    pub planned_value: Option<Option<Value>>,
}

/// Check a planned value against its parameter; the stored form is typed JSON.
fn checked_planned_value(
    spec: &ParameterSpec,
    value: Option<Value>,
) -> Result<Option<Value>, ValidationErrors> {
    let Some(value) = value else {
        return Ok(None);
    };
    match normalize_value(spec, &value) {
        Ok(text) => Ok(Some(typed_json(spec.data_type, &text))),
        Err(e) => {
            let mut errors = ValidationErrors::new();
            errors.add("planned_value", format!("{}: {}", spec.name, e));
            Err(errors)
        }
    }
}

fn step_response(conn: &mut PgConnection, step: BakeStep) -> axum::response::Response {
    match load_bake_step(conn, step) {
        Ok(step) => (StatusCode::OK, Json(step)).into_response(),
        Err(e) => db_error_response(&e, "Failed to fetch bake step"),
    }
}

#[utoipa::path(
    put,
    path = "/api/bakes/{id}/steps/{step_id}/parameters/{value_id}/actual",
    tag = "bakes",
    params(
        ("id" = Uuid, Path, description = "Bake ID"),
        ("step_id" = Uuid, Path, description = "Bake step ID"),
        ("value_id" = Uuid, Path, description = "Bake step parameter value ID")
    ),
    request_body = ActualValueRequest,
    responses(
        (status = 200, description = "Step with the recorded value", body = BakeStepResponse),
        (status = 400, description = "Actual value missing, notes too long or bake inactive", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Bake, step or value not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn record_actual_value(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path((id, step_id, value_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(request): Json<ActualValueRequest>,
) -> impl IntoResponse {
    let Some(actual_value) = request.actual_value else {
        return error_response(StatusCode::BAD_REQUEST, "Actual value is required");
    };
    let mut errors = ValidationErrors::new();
    validate_notes(&mut errors, "notes", request.notes.as_deref());
    if !errors.is_empty() {
        return validation_error(errors);
    }

    let mut conn = get_conn!(pool);

    if let Err(response) = find_active_bake(&mut conn, user.id, id) {
        return response;
    }
    let step = match find_bake_step(&mut conn, id, step_id) {
        Ok(s) => s,
        Err(response) => return response,
    };

    let target = bake_step_parameter_values::table
        .filter(bake_step_parameter_values::id.eq(value_id))
        .filter(bake_step_parameter_values::bake_step_id.eq(step_id));
    let updated = diesel::update(target)
        .set((
            bake_step_parameter_values::actual_value.eq(actual_value),
            request
                .notes
                .as_deref()
                .map(|n| bake_step_parameter_values::notes.eq(n)),
        ))
        .execute(&mut conn);

    match updated {
        Ok(0) => error_response(StatusCode::NOT_FOUND, VALUE_NOT_FOUND),
        Ok(_) => step_response(&mut conn, step),
        Err(e) => db_error_response(&e, "Failed to record actual value"),
    }
}

#[utoipa::path(
    put,
    path = "/api/bakes/{id}/steps/{step_id}/parameter-values/{value_id}/planned",
    tag = "bakes",
    params(
        ("id" = Uuid, Path, description = "Bake ID"),
        ("step_id" = Uuid, Path, description = "Bake step ID"),
        ("value_id" = Uuid, Path, description = "Bake step parameter value ID")
    ),
    request_body = PlannedValueRequest,
    responses(
        (status = 200, description = "Step with the adjusted plan", body = BakeStepResponse),
        (status = 400, description = "Planned value missing or invalid, or bake inactive", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Bake, step or value not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_planned_value(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path((id, step_id, value_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(request): Json<PlannedValueRequest>,
) -> impl IntoResponse {
    let Some(planned_value) = request.planned_value else {
        return error_response(StatusCode::BAD_REQUEST, "Planned value is required");
    };

    let mut conn = get_conn!(pool);

    if let Err(response) = find_active_bake(&mut conn, user.id, id) {
        return response;
    }
    let step = match find_bake_step(&mut conn, id, step_id) {
        Ok(s) => s,
        Err(response) => return response,
    };

    let parameter = match bake_step_parameter_values::table
        .inner_join(step_parameters::table)
        .filter(bake_step_parameter_values::id.eq(value_id))
        .filter(bake_step_parameter_values::bake_step_id.eq(step_id))
        .select(StepParameter::as_select())
        .first(&mut conn)
        .optional()
    {
        Ok(Some(p)) => p,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, VALUE_NOT_FOUND),
        Err(e) => return db_error_response(&e, "Failed to fetch parameter value"),
    };
    let planned_value = match checked_planned_value(&base_spec(&parameter), planned_value) {
        Ok(v) => v,
        Err(errors) => return validation_error(errors),
    };

    let target = bake_step_parameter_values::table
        .filter(bake_step_parameter_values::id.eq(value_id))
        .filter(bake_step_parameter_values::bake_step_id.eq(step_id));
    match diesel::update(target)
        .set(bake_step_parameter_values::planned_value.eq(planned_value))
        .execute(&mut conn)
    {
        Ok(0) => error_response(StatusCode::NOT_FOUND, VALUE_NOT_FOUND),
        Ok(_) => step_response(&mut conn, step),
        Err(e) => db_error_response(&e, "Failed to update planned value"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loafly_core::parameters::ParameterDataType;
    use serde_json::json;

    #[test]
    fn test_actual_value_key_is_required() {
        let missing: ActualValueRequest =
            serde_json::from_str(r#"{"notes": "ran warm"}"#).unwrap();
        assert!(missing.actual_value.is_none());

        let cleared: ActualValueRequest =
            serde_json::from_str(r#"{"actual_value": null}"#).unwrap();
        assert_eq!(cleared.actual_value, Some(None));

        let set: ActualValueRequest =
            serde_json::from_str(r#"{"actual_value": 27}"#).unwrap();
        assert_eq!(set.actual_value, Some(Some(json!(27))));
    }

    #[test]
    fn test_planned_value_is_checked_against_its_parameter() {
        let mut duration = ParameterSpec::new("Duration (minutes)", ParameterDataType::Duration);
        duration.max_value = Some(2880.0);

        assert_eq!(
            checked_planned_value(&duration, Some(json!("1h 30min"))).unwrap(),
            Some(json!(90))
        );
        assert_eq!(checked_planned_value(&duration, None).unwrap(), None);

        let too_long = checked_planned_value(&duration, Some(json!(1e12))).unwrap_err();
        assert_eq!(too_long.errors()[0].field, "planned_value");
        assert!(too_long.errors()[0].message.starts_with("Duration (minutes): "));

        assert!(checked_planned_value(&duration, Some(json!({"minutes": 90}))).is_err());
        assert!(checked_planned_value(&duration, Some(json!("overnight"))).is_err());
    }
}
