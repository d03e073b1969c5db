//! Product CRUD: public reads, authenticated writes.

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
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Product row joined with its category name; shared by every read-back.
const PRODUCT_SELECT: &str = "SELECT p.id, p.name, p.description, p.price, p.quantity, \
     p.category_id, c.name AS category_name, p.image_url, p.status, p.created_at, p.updated_at \
     FROM products p LEFT JOIN categories c ON p.category_id = c.id";

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let mut v = Validator::default();
    let page = validate::page_param(&mut v, &query);
    let limit = validate::limit_param(&mut v, &query);
    let category_id = validate::positive_int_param(
        &mut v,
        &query,
        "category_id",
        "Category ID must be a positive integer",
    );
    let status = validate::one_of_param(
        &mut v,
        &query,
        "status",
        &["active", "inactive"],
        "Status must be either active or inactive",
    );
    let search = validate::search_param(&mut v, &query);
    v.finish()?;

    let dialect = state.db.dialect();
    let mut conditions: Vec<String> = Vec::new();
    let mut params: Vec<SqlValue> = Vec::new();

    if let Some(cid) = category_id {
        conditions.push(format!("p.category_id = {}", dialect.placeholder(params.len())));
        params.push(cid.into());
    }
    if let Some(status) = status {
        conditions.push(format!("p.status = {}", dialect.placeholder(params.len())));
        params.push(status.into());
    }
    if let Some(term) = search {
        let like = format!("%{term}%");
        let name_ph = dialect.placeholder(params.len());
        params.push(like.clone().into());
        let desc_ph = dialect.placeholder(params.len());
        params.push(like.into());
        conditions.push(format!("(p.name LIKE {name_ph} OR p.description LIKE {desc_ph})"));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let count_sql = format!("SELECT COUNT(*) AS total FROM products p{where_clause}");
    let total = count_total(state.db.fetch_optional(&count_sql, &params).await?);

    let limit_ph = dialect.placeholder(params.len());
    params.push(i64::from(limit).into());
    let offset_ph = dialect.placeholder(params.len());
    params.push(i64::from((page - 1) * limit).into());
    let list_sql = format!(
        "{PRODUCT_SELECT}{where_clause} ORDER BY p.created_at DESC LIMIT {limit_ph} OFFSET {offset_ph}"
    );
    let products = state.db.fetch_all(&list_sql, &params).await?;

    Ok(response::ok(json!({
        "products": products,
        "pagination": Pagination::new(page, limit, total),
    })))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, "product")?;
    let sql = state
        .db
        .dialect()
        .adapt(&format!("{PRODUCT_SELECT} WHERE p.id = ?"));
    let row = state
        .db
        .fetch_optional(&sql, &[id.into()])
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".into()))?;
    Ok(response::ok(json!({ "product": row })))
}

struct ProductFields {
    name: Option<String>,
    description: Option<Option<String>>,
    price: Option<Decimal>,
    quantity: Option<i64>,
    category_id: Option<Option<i64>>,
    image_url: Option<Option<String>>,
    status: Option<String>,
}

/// Shared field validation for create and update. `Option` means "absent";
/// the inner `Option` on nullable columns means "explicit null".
fn validate_fields(v: &mut Validator, body: &Value) -> ProductFields {
    let name = validate::str_field(v, body, "name", "Product name must be a string").flatten();
    if let Some(name) = &name {
        if name.is_empty() || name.len() > 100 {
            v.add("name", "Product name must be between 1 and 100 characters");
        }
    }

    let description = validate::str_field(v, body, "description", "Description must be a string");
    if let Some(Some(d)) = &description {
        if d.len() > 1000 {
            v.add("description", "Description must be less than 1000 characters");
        }
    }

    let price = validate::decimal_field(v, body, "price", "Price must be a positive number");
    if price.is_some_and(|p| p.is_sign_negative()) {
        v.add("price", "Price must be a positive number");
    }

    let quantity = validate::int_field(v, body, "quantity", "Quantity must be a non-negative integer")
        .flatten();
    if quantity.is_some_and(|q| q < 0) {
        v.add("quantity", "Quantity must be a non-negative integer");
    }

    let category_id =
        validate::int_field(v, body, "category_id", "Category ID must be a positive integer");
    if let Some(Some(cid)) = category_id {
        if cid < 1 {
            v.add("category_id", "Category ID must be a positive integer");
        }
    }

    let image_url = validate::str_field(v, body, "image_url", "Image URL must be a valid URL");
    if let Some(Some(u)) = &image_url {
        if !validate::is_valid_url(u) {
            v.add("image_url", "Image URL must be a valid URL");
        }
    }

    let status = validate::str_field(v, body, "status", "Status must be either active or inactive")
        .flatten();
    if let Some(s) = &status {
        if s != "active" && s != "inactive" {
            v.add("status", "Status must be either active or inactive");
        }
    }

    ProductFields {
        name,
        description,
        price,
        quantity,
        category_id,
        image_url,
        status,
    }
}

async fn ensure_category_exists(state: &AppState, category_id: i64) -> Result<(), AppError> {
    let sql = state
        .db
        .dialect()
        .adapt("SELECT id FROM categories WHERE id = ?");
    let found = state.db.fetch_optional(&sql, &[category_id.into()]).await?;
    if found.is_none() {
        return Err(AppError::BadRequest("Category not found".into()));
    }
    Ok(())
}

pub async fn create(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let mut v = Validator::default();
    let fields = validate_fields(&mut v, &body);
    // Only report missing required fields; invalid ones were already noted.
    if fields.name.is_none() && body.get("name").map_or(true, Value::is_null) {
        v.add("name", "Product name is required");
    }
    if fields.price.is_none() && body.get("price").map_or(true, Value::is_null) {
        v.add("price", "Price must be a positive number");
    }
    v.finish()?;

    let category_id = fields.category_id.flatten();
    if let Some(cid) = category_id {
        ensure_category_exists(&state, cid).await?;
    }

    let dialect = state.db.dialect();
    let insert = dialect.adapt(
        "INSERT INTO products (name, description, price, quantity, category_id, image_url) \
         VALUES (?, ?, ?, ?, ?, ?)",
    );
    let id = state
        .db
        .insert(
            &insert,
            &[
                fields.name.into(),
                fields.description.flatten().into(),
                fields.price.into(),
                fields.quantity.unwrap_or(0).into(),
                category_id.into(),
                fields.image_url.flatten().into(),
            ],
        )
        .await?;

    let fetch = dialect.adapt(&format!("{PRODUCT_SELECT} WHERE p.id = ?"));
    let row = state
        .db
        .fetch_optional(&fetch, &[id.into()])
        .await?
        .ok_or_else(|| AppError::Internal("created product could not be read back".into()))?;

    Ok(response::created(
        "Product created successfully",
        json!({ "product": row }),
    ))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    _user: AuthUser,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, "product")?;
    let mut v = Validator::default();
    let fields = validate_fields(&mut v, &body);
    v.finish()?;

    let dialect = state.db.dialect();
    let check = dialect.adapt("SELECT id FROM products WHERE id = ?");
    if state.db.fetch_optional(&check, &[id.into()]).await?.is_none() {
        return Err(AppError::NotFound("Product not found".into()));
    }

    if let Some(Some(cid)) = fields.category_id {
        ensure_category_exists(&state, cid).await?;
    }

    let mut sets: Vec<String> = Vec::new();
    let mut params: Vec<SqlValue> = Vec::new();
    if let Some(name) = fields.name {
        sets.push(format!("name = {}", dialect.placeholder(params.len())));
        params.push(name.into());
    }
    if let Some(description) = fields.description {
        sets.push(format!("description = {}", dialect.placeholder(params.len())));
        params.push(description.into());
    }
    if let Some(price) = fields.price {
        sets.push(format!("price = {}", dialect.placeholder(params.len())));
        params.push(price.into());
    }
    if let Some(quantity) = fields.quantity {
        sets.push(format!("quantity = {}", dialect.placeholder(params.len())));
        params.push(quantity.into());
    }
    if let Some(category_id) = fields.category_id {
        sets.push(format!("category_id = {}", dialect.placeholder(params.len())));
        params.push(category_id.into());
    }
    if let Some(image_url) = fields.image_url {
        sets.push(format!("image_url = {}", dialect.placeholder(params.len())));
        params.push(image_url.into());
    }
    if let Some(status) = fields.status {
        sets.push(format!("status = {}", dialect.placeholder(params.len())));
        params.push(status.into());
    }
    if sets.is_empty() {
        return Err(AppError::BadRequest("No valid fields to update".into()));
    }
    sets.push(format!("updated_at = {}", dialect.current_timestamp()));

    let sql = format!(
        "UPDATE products SET {} WHERE id = {}",
        sets.join(", "),
        dialect.placeholder(params.len())
    );
    params.push(id.into());
    state.db.execute(&sql, &params).await?;

    let fetch = dialect.adapt(&format!("{PRODUCT_SELECT} WHERE p.id = ?"));
    let row = state
        .db
        .fetch_optional(&fetch, &[id.into()])
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".into()))?;

    Ok(response::ok_message(
        "Product updated successfully",
        json!({ "product": row }),
    ))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    _user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, "product")?;
    let dialect = state.db.dialect();
    let check = dialect.adapt("SELECT id, name FROM products WHERE id = ?");
    let existing = state
        .db
        .fetch_optional(&check, &[id.into()])
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".into()))?;

    let del = dialect.adapt("DELETE FROM products WHERE id = ?");
    state.db.execute(&del, &[id.into()]).await?;

    Ok(response::ok_message(
        "Product deleted successfully",
        json!({ "deleted_product": existing }),
    ))
}
