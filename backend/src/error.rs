use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

use crate::token::TokenError;

// Define a custom error type
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal Server Error: {0}")]
    InternalServerError(String),

    #[error("Database error")]
    DatabaseError(sqlx::Error),

    #[error("Token signing error")]
    JwtError(jsonwebtoken::errors::Error),

    #[error("Password hashing error")]
    PasswordError(bcrypt::BcryptError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Duplicate(String),

    #[error("Invalid ID format")]
    InvalidId,

    #[error("Access denied. No token provided.")]
    MissingToken,

    #[error("Access denied. Invalid token format.")]
    MalformedAuthHeader,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Invalid email or password")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(ValidationErrors),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InternalServerError(_)
            | AppError::DatabaseError(_)
            | AppError::JwtError(_)
            | AppError::PasswordError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_)
            | AppError::Duplicate(_)
            | AppError::InvalidId
            | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::MissingToken
            | AppError::MalformedAuthHeader
            | AppError::InvalidToken
            | AppError::TokenExpired
            | AppError::AuthenticationRequired
            | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

/// Messages of every failed field, ordered by field name.
fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("{field} is invalid"),
            })
        })
        .collect()
}

// Implement IntoResponse to convert AppError into an HTTP response
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal server error: {}", msg);
                "Internal server error".to_string()
            }
            AppError::DatabaseError(e) => {
                tracing::error!("Database error: {}", e);
                "Database error".to_string()
            }
            AppError::JwtError(e) => {
                tracing::error!("JWT error: {}", e);
                "Failed to issue token".to_string()
            }
            AppError::PasswordError(e) => {
                tracing::error!("Password error: {}", e);
                "Password processing failed".to_string()
            }
            AppError::ValidationError(errors) => {
                let details = validation_messages(&errors);
                tracing::debug!(?details, "Validation failed");
                return (
                    status,
                    Json(json!({ "error": "Validation failed", "details": details })),
                )
                    .into_response();
            }
            other => {
                if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                    tracing::warn!("Request rejected: {}", other);
                }
                other.to_string()
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

// Add From implementations for easy '?' conversion in handlers
impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        let unique_violation = e
            .as_database_error()
            .is_some_and(|db_err| db_err.is_unique_violation());
        if unique_violation {
            return AppError::Duplicate("Duplicate field value".to_string());
        }
        AppError::DatabaseError(e)
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::ValidationError(errors)
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        AppError::JwtError(e)
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(e: bcrypt::BcryptError) -> Self {
        AppError::PasswordError(e)
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => AppError::TokenExpired,
            TokenError::Invalid(_) => AppError::InvalidToken,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use validator::{Validate, ValidationError};

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn statuses() {
        assert_eq!(AppError::InvalidId.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::TokenExpired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden("no".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("gone".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::InternalServerError("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AppError::Duplicate("dup".into()).status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn internal_details_are_not_leaked() {
        let response = AppError::InternalServerError("secret stack trace".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn validation_errors_list_details() {
        #[derive(Validate)]
        struct Probe {
            #[validate(length(min = 2, message = "name too short"))]
            name: String,
            #[validate(range(min = 1, max = 5))]
            level: i64,
        }

        let errors = Probe { name: "x".into(), level: 9 }.validate().unwrap_err();
        let response = AppError::from(errors).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Validation failed");
        assert_eq!(
            body["details"],
            json!(["level is invalid", "name too short"])
        );
    }

    #[test]
    fn validation_messages_fall_back_to_field_name() {
        let mut errors = ValidationErrors::new();
        errors.add("title", ValidationError::new("required"));
        assert_eq!(validation_messages(&errors), vec!["title is invalid".to_string()]);
    }
}
