//! Environment-driven configuration.
//!
//! Defaults mirror a local development setup; only `JWT_SECRET` is required.

use crate::db::Dialect;
use crate::error::ConfigError;
use chrono::Duration;
use std::env;

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub dialect: Dialect,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl DbConfig {
    /// Read `DB_TYPE`, `DB_HOST`, `DB_PORT`, `DB_USER`, `DB_PASSWORD`,
    /// `DB_NAME`. Port and user defaults follow the selected dialect.
    pub fn from_env() -> Result<Self, ConfigError> {
        let db_type = env::var("DB_TYPE").unwrap_or_else(|_| "mysql".into());
        let dialect = Dialect::from_db_type(&db_type).ok_or_else(|| ConfigError::Invalid {
            var: "DB_TYPE",
            value: db_type.clone(),
        })?;
        let (default_port, default_user) = match dialect {
            Dialect::MySql => (3306, "root"),
            Dialect::Postgres => (5432, "postgres"),
        };
        let port = match env::var("DB_PORT") {
            Ok(v) => v.parse().map_err(|_| ConfigError::Invalid {
                var: "DB_PORT",
                value: v.clone(),
            })?,
            Err(_) => default_port,
        };
        Ok(DbConfig {
            dialect,
            host: env::var("DB_HOST").unwrap_or_else(|_| "localhost".into()),
            port,
            user: env::var("DB_USER").unwrap_or_else(|_| default_user.into()),
            password: env::var("DB_PASSWORD").unwrap_or_default(),
            database: env::var("DB_NAME").unwrap_or_else(|_| "universal_crud".into()),
        })
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db: DbConfig,
    pub jwt_secret: String,
    pub jwt_expires_in: Duration,
    pub bind_addr: String,
    /// When set and the users table is empty, an initial admin account is
    /// seeded at startup.
    pub admin_password: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret =
            env::var("JWT_SECRET").map_err(|_| ConfigError::MissingVar("JWT_SECRET"))?;
        let expires = env::var("JWT_EXPIRES_IN").unwrap_or_else(|_| "24h".into());
        let jwt_expires_in = parse_expiry(&expires).ok_or_else(|| ConfigError::Invalid {
            var: "JWT_EXPIRES_IN",
            value: expires.clone(),
        })?;
        Ok(AppConfig {
            db: DbConfig::from_env()?,
            jwt_secret,
            jwt_expires_in,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into()),
            admin_password: env::var("ADMIN_PASSWORD").ok().filter(|s| !s.is_empty()),
        })
    }
}

/// Parse a token-lifetime string: `90s`, `15m`, `24h`, `7d`, or bare seconds.
pub fn parse_expiry(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let (digits, unit) = match s.chars().last() {
        Some(c) if c.is_ascii_alphabetic() => (&s[..s.len() - 1], Some(c.to_ascii_lowercase())),
        _ => (s, None),
    };
    let n: i64 = digits.parse().ok()?;
    if n <= 0 {
        return None;
    }
    match unit {
        None | Some('s') => Some(Duration::seconds(n)),
        Some('m') => Some(Duration::minutes(n)),
        Some('h') => Some(Duration::hours(n)),
        Some('d') => Some(Duration::days(n)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_accepts_suffixed_durations() {
        assert_eq!(parse_expiry("90s"), Some(Duration::seconds(90)));
        assert_eq!(parse_expiry("15m"), Some(Duration::minutes(15)));
        assert_eq!(parse_expiry("24h"), Some(Duration::hours(24)));
        assert_eq!(parse_expiry("7d"), Some(Duration::days(7)));
    }

    #[test]
    fn expiry_accepts_bare_seconds() {
        assert_eq!(parse_expiry("3600"), Some(Duration::seconds(3600)));
    }

    #[test]
    fn expiry_rejects_junk() {
        assert_eq!(parse_expiry(""), None);
        assert_eq!(parse_expiry("soon"), None);
        assert_eq!(parse_expiry("24x"), None);
        assert_eq!(parse_expiry("-5m"), None);
        assert_eq!(parse_expiry("0h"), None);
    }
}
