use crate::api::db_error_response;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::StepParameter;
use crate::schema::step_parameters;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use diesel::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ParameterResponse {
    pub id: Uuid,
    pub name: String,
    /// TEXT, NUMBER, INTEGER, BOOLEAN, DURATION or SELECT
    pub parameter_type: String,
    pub help_text: Option<String>,
    pub default_value: Option<String>,
    pub advanced: bool,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub options: Vec<String>,
}

impl From<StepParameter> for ParameterResponse {
    fn from(p: StepParameter) -> Self {
        ParameterResponse {
            id: p.id,
            name: p.name,
            parameter_type: p.parameter_type,
            help_text: p.help_text,
            default_value: p.default_value,
            advanced: p.advanced,
            min_value: p.min_value,
            max_value: p.max_value,
            options: p.options.into_iter().flatten().collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FieldsResponse {
    pub fields: Vec<ParameterResponse>,
}

#[utoipa::path(
    get,
    path = "/api/meta/fields",
    tag = "meta",
    responses(
        (status = 200, description = "All step parameters, by name", body = FieldsResponse)
    )
)]
pub async fn list_fields(State(pool): State<Arc<DbPool>>) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    match step_parameters::table
        .order(step_parameters::name.asc())
        .select(StepParameter::as_select())
        .load(&mut conn)
    {
        Ok(rows) => (
            StatusCode::OK,
            Json(FieldsResponse {
                fields: rows.into_iter().map(ParameterResponse::from).collect(),
            }),
        )
            .into_response(),
        Err(e) => db_error_response(&e, "Failed to fetch fields"),
    }
}
