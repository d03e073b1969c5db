//! Category endpoints: public reads, admin-only mutations.

use crate::auth::AuthUser;
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

/// Categories with their live product count.
const CATEGORY_SELECT: &str = "SELECT c.id, c.name, c.description, c.created_at, \
     COUNT(p.id) AS product_count \
     FROM categories c LEFT JOIN products p ON c.id = p.category_id AND p.status = 'active'";

const CATEGORY_GROUP: &str = "GROUP BY c.id, c.name, c.description, c.created_at";

pub async fn list(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let sql = format!("{CATEGORY_SELECT} {CATEGORY_GROUP} ORDER BY c.name ASC");
    let categories = state.db.fetch_all(&sql, &[]).await?;
    Ok(response::ok(json!({ "categories": categories })))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, "category")?;
    let sql = state
        .db
        .dialect()
        .adapt(&format!("{CATEGORY_SELECT} WHERE c.id = ? {CATEGORY_GROUP}"));
    let row = state
        .db
        .fetch_optional(&sql, &[id.into()])
        .await?
        .ok_or_else(|| AppError::NotFound("Category not found".into()))?;
    Ok(response::ok(json!({ "category": row })))
}

pub async fn products(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, "category")?;
    let mut v = Validator::default();
    let page = validate::page_param(&mut v, &query);
    let limit = validate::limit_param(&mut v, &query);
    v.finish()?;

    let dialect = state.db.dialect();
    let check = dialect.adapt("SELECT id, name FROM categories WHERE id = ?");
    let category = state
        .db
        .fetch_optional(&check, &[id.into()])
        .await?
        .ok_or_else(|| AppError::NotFound("Category not found".into()))?;

    let count_sql =
        dialect.adapt("SELECT COUNT(*) AS total FROM products WHERE category_id = ? AND status = ?");
    let total = count_total(
        state
            .db
            .fetch_optional(&count_sql, &[id.into(), "active".into()])
            .await?,
    );

    let list_sql = dialect.adapt(
        "SELECT id, name, description, price, quantity, image_url, status, created_at, updated_at \
         FROM products WHERE category_id = ? AND status = ? \
         ORDER BY created_at DESC LIMIT ? OFFSET ?",
    );
    let products = state
        .db
        .fetch_all(
            &list_sql,
            &[
                id.into(),
                "active".into(),
                i64::from(limit).into(),
                i64::from((page - 1) * limit).into(),
            ],
        )
        .await?;

    Ok(response::ok(json!({
        "category": category,
        "products": products,
        "pagination": Pagination::new(page, limit, total),
    })))
}

fn validate_name_and_description(
    v: &mut Validator,
    body: &Value,
) -> (Option<String>, Option<Option<String>>) {
    let name = validate::str_field(v, body, "name", "Category name must be a string").flatten();
    if let Some(name) = &name {
        if name.is_empty() || name.len() > 50 {
            v.add("name", "Category name must be between 1 and 50 characters");
        }
    }
    let description = validate::str_field(v, body, "description", "Description must be a string");
    if let Some(Some(d)) = &description {
        if d.len() > 500 {
            v.add("description", "Description must be less than 500 characters");
        }
    }
    (name, description)
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    user.ensure_admin()?;

    let mut v = Validator::default();
    let (name, description) = validate_name_and_description(&mut v, &body);
    if name.is_none() && body.get("name").map_or(true, Value::is_null) {
        v.add("name", "Category name is required");
    }
    v.finish()?;
    let name = name.unwrap_or_default();

    let dialect = state.db.dialect();
    let check = dialect.adapt("SELECT id FROM categories WHERE name = ?");
    if state
        .db
        .fetch_optional(&check, &[name.as_str().into()])
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(
            "Category with this name already exists".into(),
        ));
    }

    let insert = dialect.adapt("INSERT INTO categories (name, description) VALUES (?, ?)");
    let id = state
        .db
        .insert(&insert, &[name.into(), description.flatten().into()])
        .await?;

    let fetch = dialect.adapt("SELECT id, name, description, created_at FROM categories WHERE id = ?");
    let mut row = state
        .db
        .fetch_optional(&fetch, &[id.into()])
        .await?
        .ok_or_else(|| AppError::Internal("created category could not be read back".into()))?;
    if let Some(map) = row.as_object_mut() {
        map.insert("product_count".into(), json!(0));
    }

    Ok(response::created(
        "Category created successfully",
        json!({ "category": row }),
    ))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: AuthUser,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    user.ensure_admin()?;
    let id = parse_id(&id, "category")?;

    let mut v = Validator::default();
    let (name, description) = validate_name_and_description(&mut v, &body);
    v.finish()?;

    let dialect = state.db.dialect();
    let check = dialect.adapt("SELECT id FROM categories WHERE id = ?");
    if state.db.fetch_optional(&check, &[id.into()]).await?.is_none() {
        return Err(AppError::NotFound("Category not found".into()));
    }

    let mut sets: Vec<String> = Vec::new();
    let mut params: Vec<SqlValue> = Vec::new();
    if let Some(name) = name {
        // Renaming onto an existing name is rejected up front; the UNIQUE
        // constraint backstops concurrent renames.
        let dup = dialect.adapt("SELECT id FROM categories WHERE name = ? AND id != ?");
        if state
            .db
            .fetch_optional(&dup, &[name.as_str().into(), id.into()])
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "Category with this name already exists".into(),
            ));
        }
        sets.push(format!("name = {}", dialect.placeholder(params.len())));
        params.push(name.into());
    }
    if let Some(description) = description {
        sets.push(format!("description = {}", dialect.placeholder(params.len())));
        params.push(description.into());
    }
    if sets.is_empty() {
        return Err(AppError::BadRequest("No valid fields to update".into()));
    }

    let sql = format!(
        "UPDATE categories SET {} WHERE id = {}",
        sets.join(", "),
        dialect.placeholder(params.len())
    );
    params.push(id.into());
    state.db.execute(&sql, &params).await?;

    let fetch = dialect.adapt(&format!("{CATEGORY_SELECT} WHERE c.id = ? {CATEGORY_GROUP}"));
    let row = state
        .db
        .fetch_optional(&fetch, &[id.into()])
        .await?
        .ok_or_else(|| AppError::NotFound("Category not found".into()))?;

    Ok(response::ok_message(
        "Category updated successfully",
        json!({ "category": row }),
    ))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    user.ensure_admin()?;
    let id = parse_id(&id, "category")?;

    let dialect = state.db.dialect();
    let check = dialect.adapt("SELECT id, name FROM categories WHERE id = ?");
    let existing = state
        .db
        .fetch_optional(&check, &[id.into()])
        .await?
        .ok_or_else(|| AppError::NotFound("Category not found".into()))?;

    let count_sql = dialect.adapt("SELECT COUNT(*) AS total FROM products WHERE category_id = ?");
    let product_count = count_total(state.db.fetch_optional(&count_sql, &[id.into()]).await?);
    if product_count > 0 {
        return Err(AppError::Conflict(
            "Cannot delete category that has products. Please remove or reassign products first."
                .into(),
        ));
    }

    let del = dialect.adapt("DELETE FROM categories WHERE id = ?");
    state.db.execute(&del, &[id.into()]).await?;

    Ok(response::ok_message(
        "Category deleted successfully",
        json!({ "deleted_category": existing }),
    ))
}
