use crate::api::db_error_response;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::IngredientCategory;
use crate::schema::ingredient_categories;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use diesel::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    pub sort_order: i32,
    pub description: Option<String>,
}

impl From<IngredientCategory> for CategoryResponse {
    fn from(c: IngredientCategory) -> Self {
        CategoryResponse {
            id: c.id,
            name: c.name,
            sort_order: c.sort_order,
            description: c.description,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CategoriesResponse {
    pub categories: Vec<CategoryResponse>,
}

#[utoipa::path(
    get,
    path = "/api/meta/ingredient-categories",
    tag = "meta",
    responses(
        (status = 200, description = "All ingredient categories, by name", body = CategoriesResponse)
    )
)]
pub async fn list_categories(State(pool): State<Arc<DbPool>>) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    match ingredient_categories::table
        .order(ingredient_categories::name.asc())
        .select(IngredientCategory::as_select())
        .load(&mut conn)
    {
        Ok(rows) => (
            StatusCode::OK,
            Json(CategoriesResponse {
                categories: rows.into_iter().map(CategoryResponse::from).collect(),
            }),
        )
            .into_response(),
        Err(e) => db_error_response(&e, "Failed to fetch ingredient categories"),
    }
}
