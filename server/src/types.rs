use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    User,
    Admin,
    /// Owns predefined recipes; never logs in
    System,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "USER",
            UserRole::Admin => "ADMIN",
            UserRole::System => "SYSTEM",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "USER" => Some(UserRole::User),
            "ADMIN" => Some(UserRole::Admin),
            "SYSTEM" => Some(UserRole::System),
            _ => None,
        }
    }
}

/// Which shared library an entity request asks to extend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Ingredient,
    IngredientCategory,
    StepTemplate,
    StepParameter,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Ingredient => "INGREDIENT",
            EntityType::IngredientCategory => "INGREDIENT_CATEGORY",
            EntityType::StepTemplate => "STEP_TEMPLATE",
            EntityType::StepParameter => "STEP_PARAMETER",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "INGREDIENT" => Some(EntityType::Ingredient),
            "INGREDIENT_CATEGORY" => Some(EntityType::IngredientCategory),
            "STEP_TEMPLATE" => Some(EntityType::StepTemplate),
            "STEP_PARAMETER" => Some(EntityType::StepParameter),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Approved => "APPROVED",
            RequestStatus::Rejected => "REJECTED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(RequestStatus::Pending),
            "APPROVED" => Some(RequestStatus::Approved),
            "REJECTED" => Some(RequestStatus::Rejected),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip_through_column_text() {
        for role in [UserRole::User, UserRole::Admin, UserRole::System] {
            assert_eq!(UserRole::from_str(role.as_str()), Some(role));
        }
        assert_eq!(UserRole::from_str("user"), None);
    }

    #[test]
    fn test_entity_type_json_matches_column_text() {
        let json = serde_json::to_value(EntityType::IngredientCategory).unwrap();
        assert_eq!(json, "INGREDIENT_CATEGORY");
        assert_eq!(
            EntityType::from_str("STEP_PARAMETER"),
            Some(EntityType::StepParameter)
        );
    }

    #[test]
    fn test_request_status_parse() {
        assert_eq!(RequestStatus::from_str("APPROVED"), Some(RequestStatus::Approved));
        assert_eq!(RequestStatus::from_str("DONE"), None);
    }
}
