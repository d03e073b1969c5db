//! Authenticated-user extraction from the `Authorization` header.
//!
//! The extractor re-fetches the user row on every request, so a token for a
//! deleted user stops working immediately.

use crate::auth::Role;
use crate::db::SqlValue;
use crate::error::AppError;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use serde_json::Value;

const USER_BY_ID: &str =
    "SELECT id, username, email, first_name, last_name, role FROM users WHERE id = ?";

/// The requesting user, loaded from the database via the bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub role: Role,
    /// Full row as selected above, for echoing in responses.
    pub row: Value,
}

impl AuthUser {
    fn from_row(row: Value) -> Result<Self, AppError> {
        let id = row
            .get("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| AppError::Internal("user row missing id".into()))?;
        let username = row
            .get("username")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let role = row
            .get("role")
            .and_then(Value::as_str)
            .and_then(Role::parse)
            .unwrap_or(Role::User);
        Ok(AuthUser {
            id,
            username,
            role,
            row,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn ensure_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Insufficient permissions".into()))
        }
    }

    /// Admins pass; everyone else must be operating on their own row.
    pub fn ensure_self_or_admin(&self, user_id: i64, denial: &str) -> Result<(), AppError> {
        if self.is_admin() || self.id == user_id {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!("Access denied: {denial}")))
        }
    }
}

/// Pull the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("Access token required".into()))
}

/// Load a user row by id in the shape the auth layer uses.
pub async fn fetch_user(state: &AppState, id: i64) -> Result<Option<AuthUser>, AppError> {
    let sql = state.db.dialect().adapt(USER_BY_ID);
    let row = state.db.fetch_optional(&sql, &[SqlValue::Int(id)]).await?;
    row.map(AuthUser::from_row).transpose()
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let token = bearer_token(&parts.headers)?;
        let claims = state.auth.verify(token)?;
        fetch_user(state, claims.user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User not found".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bearer_token_requires_scheme() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_err());
        headers.insert(AUTHORIZATION, "Token abc".parse().unwrap());
        assert!(bearer_token(&headers).is_err());
        headers.insert(AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&headers).unwrap(), "abc");
    }

    #[test]
    fn from_row_reads_role() {
        let row = json!({"id": 3, "username": "carol", "role": "admin"});
        let user = AuthUser::from_row(row).unwrap();
        assert!(user.is_admin());
        assert!(user.ensure_admin().is_ok());
        assert!(user.ensure_self_or_admin(99, "nope").is_ok());
    }

    #[test]
    fn non_admin_is_limited_to_own_row() {
        let row = json!({"id": 3, "username": "carol", "role": "user"});
        let user = AuthUser::from_row(row).unwrap();
        assert!(user.ensure_self_or_admin(3, "nope").is_ok());
        assert!(user.ensure_admin().is_err());
        let err = user.ensure_self_or_admin(4, "You can only view your own profile");
        assert_eq!(
            err.unwrap_err().to_string(),
            "Access denied: You can only view your own profile"
        );
    }
}
