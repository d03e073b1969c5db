//! Registration, login, and token verification.

use crate::auth::{bearer_token, extract::fetch_user, Role};
use crate::error::AppError;
use crate::response;
use crate::state::AppState;
use crate::validate::{self, Validator};
use axum::{extract::State, http::HeaderMap, response::IntoResponse, Json};
use serde_json::{json, Value};

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let mut v = Validator::default();

    let username = body
        .get("username")
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_string();
    if username.len() < 3 || username.len() > 50 {
        v.add("username", "Username must be between 3 and 50 characters");
    } else if !validate::is_valid_username(&username) {
        v.add(
            "username",
            "Username can only contain letters, numbers, and underscores",
        );
    }

    let email = body
        .get("email")
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_lowercase();
    if !validate::is_valid_email(&email) {
        v.add("email", "Please provide a valid email");
    }

    let password = body.get("password").and_then(Value::as_str).unwrap_or("");
    if password.len() < 6 {
        v.add("password", "Password must be at least 6 characters long");
    }

    let first_name = validate::str_field(&mut v, &body, "first_name", "First name must be a string")
        .flatten();
    if first_name.as_deref().is_some_and(|s| s.len() > 50) {
        v.add("first_name", "First name must be less than 50 characters");
    }
    let last_name = validate::str_field(&mut v, &body, "last_name", "Last name must be a string")
        .flatten();
    if last_name.as_deref().is_some_and(|s| s.len() > 50) {
        v.add("last_name", "Last name must be less than 50 characters");
    }

    v.finish()?;

    let dialect = state.db.dialect();
    let check = dialect.adapt("SELECT id FROM users WHERE username = ? OR email = ?");
    let existing = state
        .db
        .fetch_optional(&check, &[username.as_str().into(), email.as_str().into()])
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "User with this username or email already exists".into(),
        ));
    }

    let hashed = crate::auth::password::hash(password).await?;

    let insert = dialect.adapt(
        "INSERT INTO users (username, email, password, first_name, last_name) VALUES (?, ?, ?, ?, ?)",
    );
    let user_id = state
        .db
        .insert(
            &insert,
            &[
                username.as_str().into(),
                email.as_str().into(),
                hashed.into(),
                first_name.clone().into(),
                last_name.clone().into(),
            ],
        )
        .await?;

    let token = state.auth.sign(user_id, &username, Role::User)?;

    Ok(response::created(
        "User registered successfully",
        json!({
            "user": {
                "id": user_id,
                "username": username,
                "email": email,
                "first_name": first_name,
                "last_name": last_name,
                "role": Role::User.as_str(),
            },
            "token": token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let mut v = Validator::default();
    let username = body
        .get("username")
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_string();
    if username.is_empty() {
        v.add("username", "Username is required");
    }
    let password = body.get("password").and_then(Value::as_str).unwrap_or("");
    if password.is_empty() {
        v.add("password", "Password is required");
    }
    v.finish()?;

    // One credential field matches either username or email.
    let sql = state.db.dialect().adapt(
        "SELECT id, username, email, password, first_name, last_name, role FROM users \
         WHERE username = ? OR email = ?",
    );
    let row = state
        .db
        .fetch_optional(&sql, &[username.as_str().into(), username.as_str().into()])
        .await?;
    let Some(mut user) = row else {
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    };

    let stored_hash = user
        .get("password")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if !crate::auth::password::verify(password, &stored_hash).await? {
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    let id = user.get("id").and_then(Value::as_i64).unwrap_or_default();
    let name = user
        .get("username")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let role = user
        .get("role")
        .and_then(Value::as_str)
        .and_then(Role::parse)
        .unwrap_or(Role::User);
    let token = state.auth.sign(id, &name, role)?;

    if let Some(map) = user.as_object_mut() {
        map.remove("password");
    }

    Ok(response::ok_message(
        "Login successful",
        json!({ "user": user, "token": token }),
    ))
}

/// Echo the authenticated user and the presented token. Implemented without
/// the extractor so the handler can return the token string alongside.
pub async fn verify(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let token = bearer_token(&headers)?;
    let claims = state.auth.verify(token)?;
    let user = fetch_user(&state, claims.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
    Ok(response::ok(json!({ "user": user.row, "token": token })))
}
