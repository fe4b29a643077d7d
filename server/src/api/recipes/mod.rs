pub mod by_name;
pub mod calculate;
pub mod clone;
pub mod create;
pub mod delete;
pub mod full;
pub mod get;
pub mod input;
pub mod list;
pub mod update;

use crate::AppState;
use axum::routing::{get, post, put};
use axum::Router;
use utoipa::OpenApi;

/// Returns the router for /api/recipes endpoints (mounted at /api/recipes)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list::list_recipes).post(create::create_recipe))
        .route("/predefined/by-name", get(by_name::get_predefined_by_name))
        .route(
            "/{id}",
            put(update::update_recipe).delete(delete::delete_recipe),
        )
        .route("/{id}/full", get(get::get_full_recipe))
        .route("/{id}/clone", post(clone::clone_recipe))
        .route("/{id}/calculate", get(calculate::calculate_recipe))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        create::create_recipe,
        list::list_recipes,
        get::get_full_recipe,
        by_name::get_predefined_by_name,
        update::update_recipe,
        delete::delete_recipe,
        clone::clone_recipe,
        calculate::calculate_recipe,
    ),
    components(schemas(
        create::CreateRecipeRequest,
        input::StepInput,
        input::ParameterValueInput,
        input::IngredientInput,
        list::ListRecipesResponse,
        list::RecipeSummary,
        full::FullRecipeResponse,
        full::RecipeStepResponse,
        full::StepFieldResponse,
        full::StepIngredientResponse,
        update::UpdateRecipeRequest,
        update::UpdateRecipeResponse,
        loafly_core::FormulaTable,
        loafly_core::formula::StepColumn,
        loafly_core::formula::FlourComponent,
        loafly_core::formula::FormulaTotals,
        loafly_core::formula::FlourTotal,
        loafly_core::CalculationMode,
    ))
)]
pub struct ApiDoc;
