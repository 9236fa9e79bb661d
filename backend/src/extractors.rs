use crate::{error::AppError, token::Claims};
use axum::{
    extract::{FromRequest, FromRequestParts, Path},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use common::Role;
use serde::Serialize;

/// The authenticated caller, decoded from the bearer token.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub user_id: i64,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn from_claims(claims: &Claims) -> Result<Self, AppError> {
        Ok(Self {
            user_id: claims.user_id()?,
            email: claims.email.clone(),
            role: claims.role,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Owners and admins may act on a resource.
    pub fn owns_or_admin(&self, owner_id: Option<i64>) -> bool {
        owner_id == Some(self.user_id) || self.is_admin()
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // The auth middleware puts AuthUser in extensions; a route without it
        // has no caller to speak of.
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AppError::AuthenticationRequired)
    }
}

/// Numeric `{id}` path segment; anything else is a 400 rather than axum's
/// plain-text rejection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceId(pub i64);

impl<S> FromRequestParts<S> for ResourceId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::InvalidId)?;
        raw.trim()
            .parse()
            .map(ResourceId)
            .map_err(|_| AppError::InvalidId)
    }
}

/// `axum::Json` whose rejections render as our JSON `{ "error": .. }` 400s.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

impl<T: Serialize> IntoResponse for AppJson<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(role: Role) -> AuthUser {
        AuthUser {
            user_id: 7,
            email: "caller@example.com".into(),
            role,
        }
    }

    #[test]
    fn ownership_rules() {
        assert!(caller(Role::User).owns_or_admin(Some(7)));
        assert!(!caller(Role::User).owns_or_admin(Some(8)));
        assert!(!caller(Role::Moderator).owns_or_admin(None));
        assert!(caller(Role::Admin).owns_or_admin(Some(8)));
        assert!(caller(Role::Admin).owns_or_admin(None));
    }

    #[test]
    fn serializes_like_the_claims_it_came_from() {
        let value = serde_json::to_value(caller(Role::Moderator)).unwrap();
        assert_eq!(value["userId"], 7);
        assert_eq!(value["role"], "moderator");
    }
}
