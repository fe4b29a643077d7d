pub mod create;
pub mod delete;
pub mod list;
pub mod update;

use crate::api::recipes::full::{assemble_steps, RecipeStepResponse};
use crate::api::{db_error_response, error_response};
use crate::models::{Recipe, RecipeStep, StepTemplate};
use crate::schema::{recipe_steps, recipes, step_templates};
use crate::AppState;
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use diesel::prelude::*;
use utoipa::OpenApi;
use uuid::Uuid;

/// Returns the router for /api/steps endpoints (mounted at /api/steps)
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(create::create_step)).route(
        "/{id}",
        get(list::list_steps)
            .put(update::update_step)
            .delete(delete::delete_step),
    )
}

/// Find a step and make sure the caller owns its recipe.
pub(crate) fn authorize_step(
    conn: &mut PgConnection,
    user_id: Uuid,
    step_id: Uuid,
) -> Result<RecipeStep, Response> {
    let found = recipe_steps::table
        .inner_join(recipes::table)
        .filter(recipe_steps::id.eq(step_id))
        .filter(recipes::deleted_at.is_null())
        .select((RecipeStep::as_select(), Recipe::as_select()))
        .first::<(RecipeStep, Recipe)>(conn)
        .optional();

    match found {
        Ok(Some((step, recipe))) if recipe.owner_id == user_id => Ok(step),
        Ok(Some((_, recipe))) => {
            tracing::warn!(%user_id, %step_id, owner_id = %recipe.owner_id, "step belongs to another user");
            Err(error_response(
                StatusCode::FORBIDDEN,
                "You do not have permission to modify this step",
            ))
        }
        Ok(None) => Err(error_response(StatusCode::NOT_FOUND, "Step not found")),
        Err(e) => Err(db_error_response(&e, "Failed to fetch step")),
    }
}

pub(crate) fn load_step(
    conn: &mut PgConnection,
    step_id: Uuid,
) -> QueryResult<RecipeStepResponse> {
    let row: (RecipeStep, StepTemplate) = recipe_steps::table
        .inner_join(step_templates::table)
        .filter(recipe_steps::id.eq(step_id))
        .select((RecipeStep::as_select(), StepTemplate::as_select()))
        .first(conn)?;

    assemble_steps(conn, vec![row])?
        .pop()
        .ok_or(diesel::result::Error::NotFound)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        create::create_step,
        list::list_steps,
        update::update_step,
        delete::delete_step,
    ),
    components(schemas(
        create::CreateStepRequest,
        list::StepsResponse,
        update::UpdateStepRequest,
    ))
)]
pub struct ApiDoc;
