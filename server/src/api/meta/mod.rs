pub mod categories;
pub mod fields;
pub mod ingredients;
pub mod library;
pub mod step_templates;

use crate::AppState;
use axum::routing::get;
use axum::Router;
use utoipa::OpenApi;

/// Returns the router for /api/meta endpoints (public, read-only)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/step-templates", get(step_templates::list_step_templates))
        .route("/ingredients", get(ingredients::list_ingredients))
        .route("/ingredient-categories", get(categories::list_categories))
        .route("/fields", get(fields::list_fields))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        step_templates::list_step_templates,
        ingredients::list_ingredients,
        categories::list_categories,
        fields::list_fields,
    ),
    components(schemas(
        step_templates::StepTemplatesResponse,
        step_templates::StepTemplateResponse,
        step_templates::TemplateFieldResponse,
        step_templates::IngredientRuleResponse,
        ingredients::IngredientsResponse,
        ingredients::IngredientResponse,
        categories::CategoriesResponse,
        categories::CategoryResponse,
        fields::FieldsResponse,
        fields::ParameterResponse,
    ))
)]
pub struct ApiDoc;
