//! Bearer-token authentication for the API.
//!
//! Provides the `AuthUser` axum extractor that handlers take as an argument
//! to require a valid JWT, plus role helpers for the admin-gated routes.

use crate::AppResources;
use crate::error::ApiError;
use crate::entity::user::Role;
use axum::{
    extract::FromRequestParts,
    http::request::Parts,
};

pub mod jwt;
pub mod password;

pub use jwt::Claims;

/// The authenticated identity behind a request.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub full_name: String,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Reject the request unless the user holds one of `roles`.
    pub fn require_role(&self, roles: &[Role]) -> Result<(), ApiError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!(
                "Requires one of the roles: {}",
                roles
                    .iter()
                    .map(|r| format!("{r:?}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            )))
        }
    }
}

impl From<Claims> for AuthenticatedUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            username: claims.username,
            email: claims.email,
            role: claims.role,
            full_name: claims.full_name,
        }
    }
}

/// Axum extractor that validates `Authorization: Bearer <JWT>`.
///
/// # Example
///
/// ```ignore
/// async fn handler(AuthUser(user): AuthUser) -> impl IntoResponse {
///     format!("Hello, {}", user.username)
/// }
/// ```
pub struct AuthUser(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let resources = parts
            .extensions
            .get::<AppResources>()
            .cloned()
            .ok_or_else(|| {
                tracing::error!("AppResources not found in extensions");
                ApiError::server_error()
            })?;

        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok());

        let token = match auth_header {
            Some(header) if header.starts_with("Bearer ") => &header[7..],
            Some(_) => {
                return Err(ApiError::invalid_token(
                    "Authorization header must use Bearer scheme",
                ));
            }
            None => {
                return Err(ApiError::invalid_token("Missing Authorization header"));
            }
        };

        let claims = jwt::validate_token(token, &resources.config.jwt)
            .map_err(|e| ApiError::invalid_token(format!("Invalid or expired token: {e}")))?;

        Ok(AuthUser(claims.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nurse() -> AuthenticatedUser {
        AuthenticatedUser {
            id: 1,
            username: "nurse".to_string(),
            email: "nurse@example.com".to_string(),
            role: Role::Nurse,
            full_name: "Nurse Example".to_string(),
        }
    }

    #[test]
    fn role_gate_allows_listed_roles() {
        assert!(nurse().require_role(&[Role::Admin, Role::Nurse]).is_ok());
    }

    #[test]
    fn role_gate_rejects_missing_role() {
        let err = nurse().require_role(&[Role::Admin]).unwrap_err();
        assert_eq!(err.error, "forbidden");
    }

    #[test]
    fn only_admin_is_admin() {
        assert!(!nurse().is_admin());
        let admin = AuthenticatedUser {
            role: Role::Admin,
            ..nurse()
        };
        assert!(admin.is_admin());
    }
}
