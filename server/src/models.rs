use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::types::UserRole;

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[allow(dead_code)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn role(&self) -> UserRole {
        UserRole::from_str(&self.role).unwrap_or(UserRole::User)
    }

    pub fn is_admin(&self) -> bool {
        self.role() == UserRole::Admin
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::users)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::sessions)]
pub struct NewSession<'a> {
    pub user_id: Uuid,
    pub token_hash: &'a str,
    pub expires_at: DateTime<Utc>,
}

// Shared libraries

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::ingredient_categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct IngredientCategory {
    pub id: Uuid,
    pub name: String,
    pub sort_order: i32,
    pub description: Option<String>,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::ingredients)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub ingredient_category_id: Uuid,
    pub advanced: bool,
    pub help_text: Option<String>,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::step_parameters)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StepParameter {
    pub id: Uuid,
    pub name: String,
    pub parameter_type: String,
    pub help_text: Option<String>,
    pub default_value: Option<String>,
    pub advanced: bool,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub options: Vec<Option<String>>,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::step_templates)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StepTemplate {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub role: String,
    pub sort_order: i32,
    pub advanced: bool,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::step_template_parameters)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StepTemplateParameter {
    pub id: Uuid,
    pub step_template_id: Uuid,
    pub parameter_id: Uuid,
    pub sort_order: i32,
    pub advanced: bool,
    pub visible: bool,
    pub help_text: Option<String>,
    pub default_value: Option<String>,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::step_template_ingredient_rules)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StepTemplateIngredientRule {
    pub id: Uuid,
    pub step_template_id: Uuid,
    pub ingredient_category_id: Uuid,
    pub required: bool,
    pub help_text: Option<String>,
}

// Recipes

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::recipes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[allow(dead_code)]
pub struct Recipe {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub notes: Option<String>,
    pub total_weight: Option<f64>,
    pub hydration_pct: Option<f64>,
    pub salt_pct: Option<f64>,
    pub is_predefined: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::recipes)]
pub struct NewRecipe<'a> {
    pub owner_id: Uuid,
    pub name: &'a str,
    pub notes: Option<&'a str>,
    pub total_weight: Option<f64>,
    pub hydration_pct: Option<f64>,
    pub salt_pct: Option<f64>,
    pub is_predefined: bool,
}

/// Partial update of a recipe's own columns. `Some(None)` clears a column.
#[derive(AsChangeset, Default)]
#[diesel(table_name = crate::schema::recipes)]
pub struct RecipeChanges<'a> {
    pub name: Option<&'a str>,
    pub notes: Option<Option<&'a str>>,
    pub total_weight: Option<Option<f64>>,
    pub hydration_pct: Option<Option<f64>>,
    pub salt_pct: Option<Option<f64>>,
}

impl RecipeChanges<'_> {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.notes.is_none()
            && self.total_weight.is_none()
            && self.hydration_pct.is_none()
            && self.salt_pct.is_none()
    }
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::recipe_steps)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RecipeStep {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub step_template_id: Uuid,
    pub step_order: i32,
    pub description: Option<String>,
    pub notes: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::recipe_steps)]
pub struct NewRecipeStep<'a> {
    pub recipe_id: Uuid,
    pub step_template_id: Uuid,
    pub step_order: i32,
    pub description: Option<&'a str>,
    pub notes: Option<&'a str>,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = crate::schema::recipe_steps)]
pub struct RecipeStepChanges<'a> {
    pub step_template_id: Option<Uuid>,
    pub step_order: Option<i32>,
    pub description: Option<Option<&'a str>>,
    pub notes: Option<Option<&'a str>>,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::recipe_step_parameter_values)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RecipeStepParameterValue {
    pub id: Uuid,
    pub recipe_step_id: Uuid,
    pub parameter_id: Uuid,
    pub value: String,
    pub notes: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::recipe_step_parameter_values)]
pub struct NewRecipeStepParameterValue<'a> {
    pub recipe_step_id: Uuid,
    pub parameter_id: Uuid,
    pub value: &'a str,
    pub notes: Option<&'a str>,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::recipe_step_ingredients)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RecipeStepIngredient {
    pub id: Uuid,
    pub recipe_step_id: Uuid,
    pub ingredient_id: Uuid,
    pub amount: f64,
    pub calculation_mode: String,
    pub preparation: Option<String>,
    pub notes: Option<String>,
    pub position: i32,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::recipe_step_ingredients)]
pub struct NewRecipeStepIngredient<'a> {
    pub recipe_step_id: Uuid,
    pub ingredient_id: Uuid,
    pub amount: f64,
    pub calculation_mode: &'a str,
    pub preparation: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub position: i32,
}

// Bakes

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::bakes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[allow(dead_code)]
pub struct Bake {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub recipe_id: Uuid,
    pub notes: Option<String>,
    pub rating: Option<i32>,
    pub active: bool,
    pub start_timestamp: DateTime<Utc>,
    pub finish_timestamp: Option<DateTime<Utc>>,
    pub recipe_total_weight_snapshot: Option<f64>,
    pub recipe_hydration_pct_snapshot: Option<f64>,
    pub recipe_salt_pct_snapshot: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::bakes)]
pub struct NewBake<'a> {
    pub owner_id: Uuid,
    pub recipe_id: Uuid,
    pub notes: Option<&'a str>,
    pub recipe_total_weight_snapshot: Option<f64>,
    pub recipe_hydration_pct_snapshot: Option<f64>,
    pub recipe_salt_pct_snapshot: Option<f64>,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::bake_steps)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BakeStep {
    pub id: Uuid,
    pub bake_id: Uuid,
    pub recipe_step_id: Option<Uuid>,
    pub step_order: i32,
    pub step_name: String,
    pub description: Option<String>,
    pub status: String,
    pub start_timestamp: Option<DateTime<Utc>>,
    pub finish_timestamp: Option<DateTime<Utc>>,
    pub deviations: Option<serde_json::Value>,
    pub notes: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::bake_steps)]
pub struct NewBakeStep<'a> {
    pub bake_id: Uuid,
    pub recipe_step_id: Option<Uuid>,
    pub step_order: i32,
    pub step_name: &'a str,
    pub description: Option<&'a str>,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::bake_step_parameter_values)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BakeStepParameterValue {
    pub id: Uuid,
    pub bake_step_id: Uuid,
    pub parameter_id: Uuid,
    pub planned_value: Option<serde_json::Value>,
    pub actual_value: Option<serde_json::Value>,
    pub notes: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::bake_step_parameter_values)]
pub struct NewBakeStepParameterValue {
    pub bake_step_id: Uuid,
    pub parameter_id: Uuid,
    pub planned_value: Option<serde_json::Value>,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::bake_step_ingredients)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BakeStepIngredient {
    pub id: Uuid,
    pub bake_step_id: Uuid,
    pub ingredient_id: Uuid,
    pub planned_amount: f64,
    pub calculation_mode: String,
    pub planned_preparation: Option<String>,
    pub notes: Option<String>,
    pub position: i32,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::bake_step_ingredients)]
pub struct NewBakeStepIngredient<'a> {
    pub bake_step_id: Uuid,
    pub ingredient_id: Uuid,
    pub planned_amount: f64,
    pub calculation_mode: &'a str,
    pub planned_preparation: Option<&'a str>,
    pub position: i32,
}

// Profiles

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::user_profiles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[allow(dead_code)]
pub struct UserProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub display_name: String,
    pub experience_level: String,
    pub recipes_created: i32,
    pub bakes_completed: i32,
    pub total_bake_time_minutes: i32,
    pub advanced_features_used: Vec<Option<String>>,
    pub show_advanced_fields: bool,
    pub auto_save_enabled: bool,
    pub default_hydration: f64,
    pub preferred_salt_pct: f64,
    pub expand_steps_on_load: bool,
    pub show_ingredient_help: bool,
    pub last_active_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::user_profiles)]
pub struct NewUserProfile {
    pub user_id: Uuid,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = crate::schema::user_profiles)]
pub struct UserProfileChanges<'a> {
    pub display_name: Option<&'a str>,
    pub show_advanced_fields: Option<bool>,
    pub auto_save_enabled: Option<bool>,
    pub default_hydration: Option<f64>,
    pub preferred_salt_pct: Option<f64>,
    pub expand_steps_on_load: Option<bool>,
    pub show_ingredient_help: Option<bool>,
}

impl UserProfileChanges<'_> {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.show_advanced_fields.is_none()
            && self.auto_save_enabled.is_none()
            && self.default_hydration.is_none()
            && self.preferred_salt_pct.is_none()
            && self.expand_steps_on_load.is_none()
            && self.show_ingredient_help.is_none()
    }
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::user_actions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserAction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub action: String,
    pub details: Option<serde_json::Value>,
    pub session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::user_actions)]
pub struct NewUserAction<'a> {
    pub user_id: Uuid,
    pub action: &'a str,
    pub details: Option<serde_json::Value>,
    pub session_id: Option<&'a str>,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::user_preferences)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[allow(dead_code)]
pub struct UserPreference {
    pub id: Uuid,
    pub user_id: Uuid,
    pub key: String,
    pub value: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::user_preferences)]
pub struct NewUserPreference<'a> {
    pub user_id: Uuid,
    pub key: &'a str,
    pub value: serde_json::Value,
}

// Entity requests

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::entity_requests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[allow(dead_code)]
pub struct EntityRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub entity_type: String,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub admin_notes: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::entity_requests)]
pub struct NewEntityRequest<'a> {
    pub user_id: Uuid,
    pub entity_type: &'a str,
    pub name: &'a str,
    pub description: Option<&'a str>,
}
