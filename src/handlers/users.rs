//! User management: admin listing, profiles, password changes, deletion.

use crate::auth::{password, AuthUser};
use crate::db::SqlValue;
use crate::error::AppError;
use crate::handlers::{count_total, parse_id};
use crate::response::{self, Pagination};
use crate::state::AppState;
use crate::validate::{self, Validator};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use std::collections::HashMap;

/// Every read-back selects this list; `password` is never serialized.
const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, role, created_at, updated_at";

pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    user.ensure_admin()?;

    let mut v = Validator::default();
    let page = validate::page_param(&mut v, &query);
    let limit = validate::limit_param(&mut v, &query);
    let role = validate::one_of_param(
        &mut v,
        &query,
        "role",
        &["admin", "user"],
        "Role must be either admin or user",
    );
    let search = validate::search_param(&mut v, &query);
    v.finish()?;

    let dialect = state.db.dialect();
    let mut conditions: Vec<String> = Vec::new();
    let mut params: Vec<SqlValue> = Vec::new();

    if let Some(role) = role {
        conditions.push(format!("role = {}", dialect.placeholder(params.len())));
        params.push(role.into());
    }
    if let Some(term) = search {
        let like = format!("%{term}%");
        let mut placeholders = Vec::with_capacity(4);
        for _ in 0..4 {
            placeholders.push(dialect.placeholder(params.len()));
            params.push(like.clone().into());
        }
        conditions.push(format!(
            "(username LIKE {} OR email LIKE {} OR first_name LIKE {} OR last_name LIKE {})",
            placeholders[0], placeholders[1], placeholders[2], placeholders[3]
        ));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let count_sql = format!("SELECT COUNT(*) AS total FROM users{where_clause}");
    let total = count_total(state.db.fetch_optional(&count_sql, &params).await?);

    let limit_ph = dialect.placeholder(params.len());
    params.push(i64::from(limit).into());
    let offset_ph = dialect.placeholder(params.len());
    params.push(i64::from((page - 1) * limit).into());
    let list_sql = format!(
        "SELECT {USER_COLUMNS} FROM users{where_clause} \
         ORDER BY created_at DESC LIMIT {limit_ph} OFFSET {offset_ph}"
    );
    let users = state.db.fetch_all(&list_sql, &params).await?;

    Ok(response::ok(json!({
        "users": users,
        "pagination": Pagination::new(page, limit, total),
    })))
}

pub async fn me(user: AuthUser) -> Result<impl IntoResponse, AppError> {
    Ok(response::ok(json!({ "user": user.row })))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, "user")?;
    user.ensure_self_or_admin(id, "You can only view your own profile")?;

    let sql = state
        .db
        .dialect()
        .adapt(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"));
    let row = state
        .db
        .fetch_optional(&sql, &[id.into()])
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(response::ok(json!({ "user": row })))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: AuthUser,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, "user")?;
    user.ensure_self_or_admin(id, "You can only update your own profile")?;
    if body.get("role").is_some() && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Access denied: You cannot change your own role".into(),
        ));
    }

    let mut v = Validator::default();
    let username = validate::str_field(&mut v, &body, "username", "Username must be a string")
        .flatten();
    if let Some(u) = &username {
        if u.len() < 3 || u.len() > 50 {
            v.add("username", "Username must be between 3 and 50 characters");
        } else if !validate::is_valid_username(u) {
            v.add(
                "username",
                "Username can only contain letters, numbers, and underscores",
            );
        }
    }
    let email = validate::str_field(&mut v, &body, "email", "Please provide a valid email")
        .flatten()
        .map(|e| e.to_lowercase());
    if email.as_deref().is_some_and(|e| !validate::is_valid_email(e)) {
        v.add("email", "Please provide a valid email");
    }
    let first_name = validate::str_field(&mut v, &body, "first_name", "First name must be a string");
    if let Some(Some(s)) = &first_name {
        if s.len() > 50 {
            v.add("first_name", "First name must be less than 50 characters");
        }
    }
    let last_name = validate::str_field(&mut v, &body, "last_name", "Last name must be a string");
    if let Some(Some(s)) = &last_name {
        if s.len() > 50 {
            v.add("last_name", "Last name must be less than 50 characters");
        }
    }
    let role = validate::str_field(&mut v, &body, "role", "Role must be either admin or user")
        .flatten();
    if let Some(r) = &role {
        if r != "admin" && r != "user" {
            v.add("role", "Role must be either admin or user");
        }
    }
    v.finish()?;

    let dialect = state.db.dialect();
    let check = dialect.adapt("SELECT id FROM users WHERE id = ?");
    if state.db.fetch_optional(&check, &[id.into()]).await?.is_none() {
        return Err(AppError::NotFound("User not found".into()));
    }

    let mut sets: Vec<String> = Vec::new();
    let mut params: Vec<SqlValue> = Vec::new();
    if let Some(username) = username {
        ensure_unique(&state, "username", &username, id, "Username already exists").await?;
        sets.push(format!("username = {}", dialect.placeholder(params.len())));
        params.push(username.into());
    }
    if let Some(email) = email {
        ensure_unique(&state, "email", &email, id, "Email already exists").await?;
        sets.push(format!("email = {}", dialect.placeholder(params.len())));
        params.push(email.into());
    }
    if let Some(first_name) = first_name {
        sets.push(format!("first_name = {}", dialect.placeholder(params.len())));
        params.push(first_name.into());
    }
    if let Some(last_name) = last_name {
        sets.push(format!("last_name = {}", dialect.placeholder(params.len())));
        params.push(last_name.into());
    }
    if let Some(role) = role {
        sets.push(format!("role = {}", dialect.placeholder(params.len())));
        params.push(role.into());
    }
    if sets.is_empty() {
        return Err(AppError::BadRequest("No valid fields to update".into()));
    }
    sets.push(format!("updated_at = {}", dialect.current_timestamp()));

    let sql = format!(
        "UPDATE users SET {} WHERE id = {}",
        sets.join(", "),
        dialect.placeholder(params.len())
    );
    params.push(id.into());
    state.db.execute(&sql, &params).await?;

    let fetch = dialect.adapt(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"));
    let row = state
        .db
        .fetch_optional(&fetch, &[id.into()])
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(response::ok_message(
        "User updated successfully",
        json!({ "user": row }),
    ))
}

/// Reject a username/email already taken by a different user. The column
/// name is one of two fixed strings, never request data.
async fn ensure_unique(
    state: &AppState,
    column: &str,
    value: &str,
    exclude_id: i64,
    conflict: &str,
) -> Result<(), AppError> {
    let sql = state
        .db
        .dialect()
        .adapt(&format!("SELECT id FROM users WHERE {column} = ? AND id != ?"));
    let taken = state
        .db
        .fetch_optional(&sql, &[value.into(), exclude_id.into()])
        .await?;
    if taken.is_some() {
        return Err(AppError::Conflict(conflict.into()));
    }
    Ok(())
}

pub async fn change_password(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: AuthUser,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, "user")?;
    user.ensure_self_or_admin(id, "You can only change your own password")?;

    let mut v = Validator::default();
    let current = body
        .get("current_password")
        .and_then(Value::as_str)
        .unwrap_or("");
    if current.is_empty() {
        v.add("current_password", "Current password is required");
    }
    let new_password = body
        .get("new_password")
        .and_then(Value::as_str)
        .unwrap_or("");
    if new_password.len() < 6 {
        v.add(
            "new_password",
            "New password must be at least 6 characters long",
        );
    }
    let confirm = body
        .get("confirm_password")
        .and_then(Value::as_str)
        .unwrap_or("");
    if confirm != new_password {
        v.add(
            "confirm_password",
            "Password confirmation does not match new password",
        );
    }
    v.finish()?;

    let dialect = state.db.dialect();
    let fetch = dialect.adapt("SELECT password FROM users WHERE id = ?");
    let row = state
        .db
        .fetch_optional(&fetch, &[id.into()])
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    // An admin resetting someone else's password skips the current-password
    // check; everyone else must prove they know it.
    if !(user.is_admin() && user.id != id) {
        let stored = row
            .get("password")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if !password::verify(current, stored).await? {
            return Err(AppError::Unauthorized("Current password is incorrect".into()));
        }
    }

    let hashed = password::hash(new_password).await?;
    let update = format!(
        "UPDATE users SET password = {}, updated_at = {} WHERE id = {}",
        dialect.placeholder(0),
        dialect.current_timestamp(),
        dialect.placeholder(1)
    );
    state.db.execute(&update, &[hashed.into(), id.into()]).await?;

    Ok(response::message_only("Password changed successfully"))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    user.ensure_admin()?;
    let id = parse_id(&id, "user")?;
    if user.id == id {
        return Err(AppError::BadRequest(
            "You cannot delete your own account".into(),
        ));
    }

    let dialect = state.db.dialect();
    let check = dialect.adapt("SELECT id, username, email FROM users WHERE id = ?");
    let existing = state
        .db
        .fetch_optional(&check, &[id.into()])
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let del = dialect.adapt("DELETE FROM users WHERE id = ?");
    state.db.execute(&del, &[id.into()]).await?;

    Ok(response::ok_message(
        "User deleted successfully",
        json!({ "deleted_user": existing }),
    ))
}
