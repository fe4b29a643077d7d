use crate::api::profile::store::record_action;
use crate::api::{db_error_response, validation_error, ApiError, ErrorResponse};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::{NewRecipe, Recipe};
use crate::schema::recipes;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use diesel::prelude::*;
use loafly_core::validation::{validate_recipe_fields, RecipeFields};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use super::full::{load_full_recipe, FullRecipeResponse};
use super::input::{check_steps, insert_step, Libraries, StepInput};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateRecipeRequest {
    pub name: String,
    pub notes: Option<String>,
    /// Target dough weight in grams
    pub total_weight: Option<f64>,
    pub hydration_pct: Option<f64>,
    pub salt_pct: Option<f64>,
    #[serde(default)]
    pub steps: Vec<StepInput>,
}

impl CreateRecipeRequest {
    fn fields(&self) -> RecipeFields<'_> {
        RecipeFields {
            name: Some(&self.name),
            notes: self.notes.as_deref(),
            total_weight: self.total_weight,
            hydration_pct: self.hydration_pct,
            salt_pct: self.salt_pct,
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/recipes",
    tag = "recipes",
    request_body = CreateRecipeRequest,
    responses(
        (status = 201, description = "Recipe created successfully", body = FullRecipeResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_recipe(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Json(request): Json<CreateRecipeRequest>,
) -> impl IntoResponse {
    let errors = validate_recipe_fields(&request.fields(), true);
    if !errors.is_empty() {
        return validation_error(errors);
    }

    let mut conn = get_conn!(pool);

    let libraries = match Libraries::load(&mut conn, &request.steps) {
        Ok(l) => l,
        Err(e) => return db_error_response(&e, "Failed to load step templates"),
    };
    let steps = match check_steps(&libraries, &request.steps) {
        Ok(s) => s,
        Err(errors) => return validation_error(errors),
    };

    let name = request.name.trim();
    let result = conn.transaction::<_, ApiError, _>(|conn| {
        let recipe: Recipe = diesel::insert_into(recipes::table)
            .values(&NewRecipe {
                owner_id: user.id,
                name,
                notes: request.notes.as_deref(),
                total_weight: request.total_weight,
                hydration_pct: request.hydration_pct,
                salt_pct: request.salt_pct,
                is_predefined: false,
            })
            .returning(Recipe::as_returning())
            .get_result(conn)?;

        for step in &steps {
            insert_step(conn, recipe.id, step)?;
        }

        record_action(conn, user.id, "recipe_created", None, None)?;

        Ok(load_full_recipe(conn, recipe)?)
    });

    match result {
        Ok(recipe) => {
            tracing::info!(recipe_id = %recipe.id, steps = recipe.steps.len(), "recipe created");
            (StatusCode::CREATED, Json(recipe)).into_response()
        }
        Err(e) => e.into_response(),
    }
}
