pub mod bakes;
pub mod entity_requests;
pub mod meta;
pub mod profile;
pub mod public;
pub mod recipes;
pub mod steps;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use diesel::result::DatabaseErrorKind;
use loafly_core::{FieldError, ValidationErrors};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{OpenApi, ToSchema};

/// Shared error response used by all endpoints
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// Every field that failed validation; only present on validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        ErrorResponse {
            error: error.into(),
            details: None,
        }
    }
}

/// Shared `{message}` body for endpoints that only confirm success
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Deserialize a field where an explicit `null` differs from an absent key.
///
/// Use with `#[serde(default, deserialize_with = "nullable")]` on an
/// `Option<Option<T>>`: absent is `None`, `null` is `Some(None)`.
pub fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}

pub fn validation_error(errors: ValidationErrors) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: "Validation failed".to_string(),
            details: Some(errors.into_errors()),
        }),
    )
        .into_response()
}

/// Failure inside a multi-statement operation, usually a transaction.
///
/// Converting to a response logs database failures; client errors are
/// returned as-is.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Validation failed: {}", .0.summary())]
    Validation(ValidationErrors),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Database(#[from] diesel::result::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => error_response(StatusCode::BAD_REQUEST, message),
            ApiError::Validation(errors) => validation_error(errors),
            ApiError::Forbidden(message) => error_response(StatusCode::FORBIDDEN, message),
            ApiError::NotFound(message) => error_response(StatusCode::NOT_FOUND, message),
            ApiError::Database(e) => db_error_response(&e, "Database operation failed"),
        }
    }
}

/// Translate a diesel error into a response. `context` is used as the
/// message for unexpected failures.
pub fn db_error_response(error: &diesel::result::Error, context: &str) -> Response {
    match error {
        diesel::result::Error::NotFound => error_response(StatusCode::NOT_FOUND, "Not found"),
        diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            tracing::warn!("Unique violation: {}", info.message());
            error_response(StatusCode::CONFLICT, "Resource already exists")
        }
        diesel::result::Error::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
            tracing::warn!("Foreign key violation: {}", info.message());
            error_response(StatusCode::BAD_REQUEST, "Referenced record does not exist")
        }
        diesel::result::Error::DatabaseError(DatabaseErrorKind::CheckViolation, info) => {
            tracing::warn!("Check violation: {}", info.message());
            error_response(StatusCode::BAD_REQUEST, "Value out of range")
        }
        e => {
            tracing::error!("{}: {}", context, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, context)
        }
    }
}

/// Generate the complete OpenAPI spec by merging all module specs
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Base spec with shared components and security
    #[derive(OpenApi)]
    #[openapi(
        info(title = "Loafly API", description = "Sourdough recipes, steps and bakes"),
        components(schemas(ErrorResponse, MessageResponse, FieldError))
    )]
    struct BaseApi;

    let mut spec = BaseApi::openapi();

    // Add security scheme
    if let Some(components) = spec.components.as_mut() {
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }

    // Merge in each module's spec
    let modules: Vec<utoipa::openapi::OpenApi> = vec![
        public::ApiDoc::openapi(),
        meta::ApiDoc::openapi(),
        recipes::ApiDoc::openapi(),
        steps::ApiDoc::openapi(),
        bakes::ApiDoc::openapi(),
        profile::ApiDoc::openapi(),
        entity_requests::ApiDoc::openapi(),
    ];

    for module_spec in modules {
        // Merge paths
        spec.paths.paths.extend(module_spec.paths.paths);

        // Merge components (schemas)
        if let Some(module_components) = module_spec.components {
            if let Some(spec_components) = spec.components.as_mut() {
                spec_components.schemas.extend(module_components.schemas);
            }
        }
    }

    spec
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_error_lists_every_field() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "Recipe name is required");
        errors.add("salt_pct", "Salt percentage must not exceed 10%");

        let response = validation_error(errors);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Validation failed");
        assert_eq!(body["details"].as_array().unwrap().len(), 2);
        assert_eq!(body["details"][1]["field"], "salt_pct");
    }

    #[tokio::test]
    async fn test_plain_errors_omit_details() {
        let body = body_json(error_response(StatusCode::NOT_FOUND, "Recipe not found")).await;
        assert_eq!(body, serde_json::json!({"error": "Recipe not found"}));
    }

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "nullable")]
        notes: Option<Option<String>>,
    }

    #[test]
    fn test_nullable_distinguishes_null_from_absent() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        let null: Patch = serde_json::from_str(r#"{"notes": null}"#).unwrap();
        let set: Patch = serde_json::from_str(r#"{"notes": "fed at 8am"}"#).unwrap();
        assert_eq!(absent.notes, None);
        assert_eq!(null.notes, Some(None));
        assert_eq!(set.notes, Some(Some("fed at 8am".to_string())));
    }

    #[test]
    fn test_diesel_errors_map_to_status() {
        assert_eq!(
            db_error_response(&diesel::result::Error::NotFound, "x").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            db_error_response(&diesel::result::Error::RollbackTransaction, "x").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Forbidden("Predefined recipes cannot be modified".to_string())
                .into_response()
                .status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_openapi_documents_every_module() {
        let spec = openapi();
        for path in [
            "/api/health",
            "/api/auth/signup",
            "/api/meta/step-templates",
            "/api/recipes",
            "/api/recipes/{id}/full",
            "/api/steps",
            "/api/bakes/{id}/timeline",
            "/api/profile/actions",
            "/api/entity-requests/{id}/status",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {}", path);
        }
        let components = spec.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
