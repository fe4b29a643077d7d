use crate::api::db_error_response;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::Ingredient;
use crate::schema::ingredients;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use diesel::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IngredientResponse {
    pub id: Uuid,
    pub name: String,
    pub ingredient_category_id: Uuid,
    pub advanced: bool,
    pub help_text: Option<String>,
}

impl From<Ingredient> for IngredientResponse {
    fn from(i: Ingredient) -> Self {
        IngredientResponse {
            id: i.id,
            name: i.name,
            ingredient_category_id: i.ingredient_category_id,
            advanced: i.advanced,
            help_text: i.help_text,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IngredientsResponse {
    pub ingredients: Vec<IngredientResponse>,
}

#[utoipa::path(
    get,
    path = "/api/meta/ingredients",
    tag = "meta",
    responses(
        (status = 200, description = "All ingredients, by name", body = IngredientsResponse)
    )
)]
pub async fn list_ingredients(State(pool): State<Arc<DbPool>>) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    match ingredients::table
        .order(ingredients::name.asc())
        .select(Ingredient::as_select())
        .load(&mut conn)
    {
        Ok(rows) => (
            StatusCode::OK,
            Json(IngredientsResponse {
                ingredients: rows.into_iter().map(IngredientResponse::from).collect(),
            }),
        )
            .into_response(),
        Err(e) => db_error_response(&e, "Failed to fetch ingredients"),
    }
}
