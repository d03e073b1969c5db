//! Universal CRUD: one REST backend, two SQL dialects.
//!
//! Route handlers write logical SQL with `?` placeholders; the [`db::Dialect`]
//! selected at startup rewrites it for the active database (MySQL passthrough,
//! PostgreSQL `$n` placeholders, double-quoted identifiers, SERIAL) and the
//! [`db::Db`] executor returns rows in one shape for both drivers.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod schema;
pub mod state;
pub mod validate;

pub use auth::{JwtKeys, Role};
pub use config::{AppConfig, DbConfig};
pub use db::{Db, Dialect, SqlValue};
pub use error::{AppError, ConfigError};
pub use routes::api_router;
pub use state::AppState;
