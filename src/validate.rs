//! Request validation producing field-level errors.
//!
//! Handlers accumulate failures into a [`Validator`] and call `finish`, so a
//! bad request reports every problem at once rather than the first.

use crate::error::{AppError, FieldError};
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::OnceLock;

#[derive(Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn add(&mut self, field: &str, message: &str) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn finish(self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.errors))
        }
    }
}

fn username_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("^[a-zA-Z0-9_]+$").expect("static regex"))
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static regex"))
}

pub fn is_valid_username(s: &str) -> bool {
    username_re().is_match(s)
}

pub fn is_valid_email(s: &str) -> bool {
    email_re().is_match(s)
}

pub fn is_valid_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// String body field. Outer `None` = absent, inner `None` = explicit null.
/// A non-string, non-null value is reported as invalid.
pub fn str_field(
    v: &mut Validator,
    body: &Value,
    field: &str,
    message: &str,
) -> Option<Option<String>> {
    match body.get(field) {
        None => None,
        Some(Value::Null) => Some(None),
        Some(Value::String(s)) => Some(Some(s.trim().to_string())),
        Some(_) => {
            v.add(field, message);
            None
        }
    }
}

/// Integer body field; null counts as absent-with-null, like `str_field`.
pub fn int_field(
    v: &mut Validator,
    body: &Value,
    field: &str,
    message: &str,
) -> Option<Option<i64>> {
    match body.get(field) {
        None => None,
        Some(Value::Null) => Some(None),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => Some(Some(i)),
            None => {
                v.add(field, message);
                None
            }
        },
        Some(_) => {
            v.add(field, message);
            None
        }
    }
}

/// Decimal body field accepting a JSON number or numeric string. Going via
/// the number's literal text keeps values like 19.99 exact.
pub fn decimal_field(
    v: &mut Validator,
    body: &Value,
    field: &str,
    message: &str,
) -> Option<Decimal> {
    match body.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => match Decimal::from_str(&n.to_string()) {
            Ok(d) => Some(d),
            Err(_) => {
                v.add(field, message);
                None
            }
        },
        Some(Value::String(s)) => match Decimal::from_str(s.trim()) {
            Ok(d) => Some(d),
            Err(_) => {
                v.add(field, message);
                None
            }
        },
        Some(_) => {
            v.add(field, message);
            None
        }
    }
}

/// `page` query parameter: positive integer, default 1.
pub fn page_param(v: &mut Validator, params: &HashMap<String, String>) -> u32 {
    match params.get("page") {
        None => 1,
        Some(raw) => match raw.parse::<u32>() {
            Ok(n) if n >= 1 => n,
            _ => {
                v.add("page", "Page must be a positive integer");
                1
            }
        },
    }
}

/// `limit` query parameter: 1..=100, default 10.
pub fn limit_param(v: &mut Validator, params: &HashMap<String, String>) -> u32 {
    match params.get("limit") {
        None => 10,
        Some(raw) => match raw.parse::<u32>() {
            Ok(n) if (1..=100).contains(&n) => n,
            _ => {
                v.add("limit", "Limit must be between 1 and 100");
                10
            }
        },
    }
}

/// Positive-integer query parameter (e.g. `category_id`).
pub fn positive_int_param(
    v: &mut Validator,
    params: &HashMap<String, String>,
    name: &str,
    message: &str,
) -> Option<i64> {
    let raw = params.get(name)?;
    match raw.parse::<i64>() {
        Ok(n) if n >= 1 => Some(n),
        _ => {
            v.add(name, message);
            None
        }
    }
}

/// Query parameter restricted to a fixed set of values.
pub fn one_of_param(
    v: &mut Validator,
    params: &HashMap<String, String>,
    name: &str,
    allowed: &[&str],
    message: &str,
) -> Option<String> {
    let raw = params.get(name)?;
    if allowed.contains(&raw.as_str()) {
        Some(raw.clone())
    } else {
        v.add(name, message);
        None
    }
}

/// `search` query parameter, capped at 100 characters.
pub fn search_param(v: &mut Validator, params: &HashMap<String, String>) -> Option<String> {
    let raw = params.get("search")?;
    if raw.len() > 100 {
        v.add("search", "Search term must be less than 100 characters");
        None
    } else if raw.is_empty() {
        None
    } else {
        Some(raw.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn username_charset() {
        assert!(is_valid_username("alice_99"));
        assert!(!is_valid_username("alice-99"));
        assert!(!is_valid_username("alice bob"));
        assert!(!is_valid_username(""));
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a b@c.co"));
    }

    #[test]
    fn page_and_limit_defaults_and_bounds() {
        let mut v = Validator::default();
        let params = HashMap::new();
        assert_eq!(page_param(&mut v, &params), 1);
        assert_eq!(limit_param(&mut v, &params), 10);
        assert!(v.finish().is_ok());

        let mut v = Validator::default();
        let params: HashMap<_, _> = [
            ("page".to_string(), "0".to_string()),
            ("limit".to_string(), "500".to_string()),
        ]
        .into();
        page_param(&mut v, &params);
        limit_param(&mut v, &params);
        let err = v.finish().unwrap_err();
        match err {
            AppError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn decimal_field_keeps_literal_precision() {
        let mut v = Validator::default();
        let body = json!({"price": 19.99});
        let d = decimal_field(&mut v, &body, "price", "bad").unwrap();
        assert_eq!(d.to_string(), "19.99");

        let body = json!({"price": "7.50"});
        let d = decimal_field(&mut v, &body, "price", "bad").unwrap();
        assert_eq!(d.to_string(), "7.50");
        assert!(v.finish().is_ok());
    }

    #[test]
    fn str_field_distinguishes_absent_and_null() {
        let mut v = Validator::default();
        let body = json!({"description": null, "name": " x "});
        assert_eq!(str_field(&mut v, &body, "missing", "bad"), None);
        assert_eq!(str_field(&mut v, &body, "description", "bad"), Some(None));
        assert_eq!(
            str_field(&mut v, &body, "name", "bad"),
            Some(Some("x".to_string()))
        );
    }
}
