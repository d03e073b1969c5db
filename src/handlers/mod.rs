//! HTTP handlers: auth, products, categories, users.

pub mod auth;
pub mod categories;
pub mod products;
pub mod users;

use crate::error::AppError;
use serde_json::Value;

/// Read the `total` column of a `COUNT(*) AS total` row.
pub(crate) fn count_total(row: Option<Value>) -> u64 {
    row.as_ref()
        .and_then(|r| r.get("total"))
        .and_then(Value::as_u64)
        .unwrap_or(0)
}

/// Parse a path id; ids are positive integers.
pub(crate) fn parse_id(raw: &str, what: &str) -> Result<i64, AppError> {
    match raw.parse::<i64>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(AppError::BadRequest(format!("Invalid {what} ID"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn count_total_reads_the_alias() {
        assert_eq!(count_total(Some(json!({"total": 12}))), 12);
        assert_eq!(count_total(Some(json!({"other": 12}))), 0);
        assert_eq!(count_total(None), 0);
    }

    #[test]
    fn ids_must_be_positive_integers() {
        assert_eq!(parse_id("7", "product").unwrap(), 7);
        assert!(parse_id("0", "product").is_err());
        assert!(parse_id("-3", "product").is_err());
        assert!(parse_id("abc", "product").is_err());
    }
}
