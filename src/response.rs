//! Standard response envelope helpers.
//!
//! Every endpoint answers with `{success, message?, data?, errors?}`; error
//! responses go through `AppError::into_response`, which emits the same shape.

use axum::{http::StatusCode, Json};
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

pub fn ok(data: Value) -> (StatusCode, Json<Envelope>) {
    (
        StatusCode::OK,
        Json(Envelope {
            success: true,
            message: None,
            data: Some(data),
        }),
    )
}

pub fn ok_message(message: &str, data: Value) -> (StatusCode, Json<Envelope>) {
    (
        StatusCode::OK,
        Json(Envelope {
            success: true,
            message: Some(message.to_string()),
            data: Some(data),
        }),
    )
}

pub fn created(message: &str, data: Value) -> (StatusCode, Json<Envelope>) {
    (
        StatusCode::CREATED,
        Json(Envelope {
            success: true,
            message: Some(message.to_string()),
            data: Some(data),
        }),
    )
}

pub fn message_only(message: &str) -> (StatusCode, Json<Envelope>) {
    (
        StatusCode::OK,
        Json(Envelope {
            success: true,
            message: Some(message.to_string()),
            data: None,
        }),
    )
}

/// Pagination block attached to list responses.
#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub items_per_page: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total_items: u64) -> Self {
        let total_pages = (total_items.div_ceil(u64::from(limit))) as u32;
        Pagination {
            current_page: page,
            total_pages,
            total_items,
            items_per_page: limit,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_rounds_total_pages_up() {
        let p = Pagination::new(2, 10, 25);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next);
        assert!(p.has_prev);
    }

    #[test]
    fn has_next_is_false_on_last_page() {
        let p = Pagination::new(3, 10, 25);
        assert!(!p.has_next);
        assert!(p.has_prev);
    }

    #[test]
    fn empty_result_has_no_pages() {
        let p = Pagination::new(1, 10, 0);
        assert_eq!(p.total_pages, 0);
        assert!(!p.has_next);
        assert!(!p.has_prev);
    }

    #[test]
    fn envelope_omits_absent_keys() {
        let (_, Json(env)) = message_only("done");
        let v = serde_json::to_value(&env).unwrap();
        assert_eq!(v["success"], true);
        assert_eq!(v["message"], "done");
        assert!(v.get("data").is_none());
    }
}
