pub mod create;
pub mod detail;
pub mod get;
pub mod lifecycle;
pub mod list;
pub mod parameters;
pub mod steps;
pub mod timeline;
pub mod update;

use crate::api::{db_error_response, error_response};
use crate::models::{Bake, BakeStep};
use crate::schema::{bake_steps, bakes};
use crate::AppState;
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, put};
use axum::Router;
use diesel::prelude::*;
use utoipa::OpenApi;
use uuid::Uuid;

/// Returns the router for /api/bakes endpoints (mounted at /api/bakes)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list::list_bakes).post(create::create_bake))
        .route("/active", get(list::list_active_bakes))
        .route("/{id}", get(get::get_bake))
        .route("/{id}/notes", put(update::update_bake_notes))
        .route("/{id}/rating", put(update::update_bake_rating))
        .route("/{id}/complete", put(lifecycle::complete_bake))
        .route("/{id}/cancel", put(lifecycle::cancel_bake))
        .route("/{id}/timeline", get(timeline::get_bake_timeline))
        .route("/{id}/steps/{step_id}/start", put(steps::start_step))
        .route("/{id}/steps/{step_id}/complete", put(steps::complete_step))
        .route("/{id}/steps/{step_id}/skip", put(steps::skip_step))
        .route("/{id}/steps/{step_id}/note", put(steps::update_step_note))
        .route(
            "/{id}/steps/{step_id}/deviations",
            put(steps::update_step_deviations),
        )
        .route(
            "/{id}/steps/{step_id}/parameters/{value_id}/actual",
            put(parameters::record_actual_value),
        )
        .route(
            "/{id}/steps/{step_id}/parameter-values/{value_id}/planned",
            put(parameters::update_planned_value),
        )
}

const BAKE_NOT_FOUND: &str = "Bake not found";

/// The caller's bake. Bakes of other users are reported as missing.
pub(crate) fn find_bake(
    conn: &mut PgConnection,
    user_id: Uuid,
    bake_id: Uuid,
) -> Result<Bake, Response> {
    let found = bakes::table
        .filter(bakes::id.eq(bake_id))
        .filter(bakes::owner_id.eq(user_id))
        .select(Bake::as_select())
        .first(conn)
        .optional();

    match found {
        Ok(Some(bake)) => Ok(bake),
        Ok(None) => Err(error_response(StatusCode::NOT_FOUND, BAKE_NOT_FOUND)),
        Err(e) => Err(db_error_response(&e, "Failed to fetch bake")),
    }
}

/// The caller's bake, which must still be running.
pub(crate) fn find_active_bake(
    conn: &mut PgConnection,
    user_id: Uuid,
    bake_id: Uuid,
) -> Result<Bake, Response> {
    let bake = find_bake(conn, user_id, bake_id)?;
    if !bake.active {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "Cannot modify an inactive bake",
        ));
    }
    Ok(bake)
}

pub(crate) fn find_bake_step(
    conn: &mut PgConnection,
    bake_id: Uuid,
    step_id: Uuid,
) -> Result<BakeStep, Response> {
    let found = bake_steps::table
        .filter(bake_steps::id.eq(step_id))
        .filter(bake_steps::bake_id.eq(bake_id))
        .select(BakeStep::as_select())
        .first(conn)
        .optional();

    match found {
        Ok(Some(step)) => Ok(step),
        Ok(None) => Err(error_response(
            StatusCode::NOT_FOUND,
            "Step not found for this bake",
        )),
        Err(e) => Err(db_error_response(&e, "Failed to fetch bake step")),
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        create::create_bake,
        list::list_bakes,
        list::list_active_bakes,
        get::get_bake,
        update::update_bake_notes,
        update::update_bake_rating,
        lifecycle::complete_bake,
        lifecycle::cancel_bake,
        timeline::get_bake_timeline,
        steps::start_step,
        steps::complete_step,
        steps::skip_step,
        steps::update_step_note,
        steps::update_step_deviations,
        parameters::record_actual_value,
        parameters::update_planned_value,
    ),
    components(schemas(
        create::CreateBakeRequest,
        detail::BakeResponse,
        detail::BakeStepResponse,
        detail::BakeParameterValueResponse,
        detail::BakeIngredientResponse,
        list::BakeSummary,
        list::BakeListResponse,
        list::ActiveBakesResponse,
        update::BakeNotesRequest,
        update::BakeRatingRequest,
        steps::CompleteStepRequest,
        steps::StepNoteRequest,
        steps::StepDeviationsRequest,
        parameters::ActualValueRequest,
        parameters::PlannedValueRequest,
        timeline::BakeTimelineResponse,
        loafly_core::timeline::BakeTimeline,
        loafly_core::timeline::TimelineEvent,
        loafly_core::timeline::TimelineEventKind,
        loafly_core::timeline::TimelineEventStatus,
    ))
)]
pub struct ApiDoc;
