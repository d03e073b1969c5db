//! Pooled query execution against MySQL or PostgreSQL.
//!
//! `Db` owns the connection pool and the active [`Dialect`]. Rows come back
//! as JSON objects (column name → value) in the same shape for both drivers,
//! and mutations report one canonical outcome: `execute` returns affected
//! rows, `insert` returns the new row id.

use crate::config::DbConfig;
use crate::db::{Dialect, SqlValue};
use crate::error::AppError;
use serde_json::{Map, Value};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow};

const POOL_SIZE: u32 = 10;

#[derive(Clone)]
enum Pool {
    MySql(MySqlPool),
    Postgres(PgPool),
}

#[derive(Clone)]
pub struct Db {
    pool: Pool,
    dialect: Dialect,
}

impl Db {
    /// Connect a bounded pool and verify the connection.
    pub async fn connect(config: &DbConfig) -> Result<Self, AppError> {
        let db = match config.dialect {
            Dialect::MySql => {
                let pool = MySqlPoolOptions::new()
                    .max_connections(POOL_SIZE)
                    .connect_with(mysql_options(config))
                    .await?;
                Db {
                    pool: Pool::MySql(pool),
                    dialect: Dialect::MySql,
                }
            }
            Dialect::Postgres => {
                let pool = PgPoolOptions::new()
                    .max_connections(POOL_SIZE)
                    .connect_with(pg_options(config))
                    .await?;
                Db {
                    pool: Pool::Postgres(pool),
                    dialect: Dialect::Postgres,
                }
            }
        };
        db.ping().await?;
        Ok(db)
    }

    /// Create the pool without connecting. Connections are established on
    /// first use; used by tests that only exercise the pre-database surface.
    pub fn connect_lazy(config: &DbConfig) -> Self {
        match config.dialect {
            Dialect::MySql => Db {
                pool: Pool::MySql(
                    MySqlPoolOptions::new()
                        .max_connections(POOL_SIZE)
                        .connect_lazy_with(mysql_options(config)),
                ),
                dialect: Dialect::MySql,
            },
            Dialect::Postgres => Db {
                pool: Pool::Postgres(
                    PgPoolOptions::new()
                        .max_connections(POOL_SIZE)
                        .connect_lazy_with(pg_options(config)),
                ),
                dialect: Dialect::Postgres,
            },
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Liveness probe for the readiness endpoint.
    pub async fn ping(&self) -> Result<(), AppError> {
        match &self.pool {
            Pool::MySql(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
            }
            Pool::Postgres(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
            }
        }
        Ok(())
    }

    /// Run a query and return every row as a JSON object.
    pub async fn fetch_all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Value>, AppError> {
        tracing::debug!(sql = %sql, params = ?params, "query");
        match &self.pool {
            Pool::MySql(pool) => {
                let mut query = sqlx::query(sql);
                for p in params {
                    query = bind_mysql(query, p);
                }
                let rows = query.fetch_all(pool).await?;
                Ok(rows.iter().map(mysql_row_to_json).collect())
            }
            Pool::Postgres(pool) => {
                let mut query = sqlx::query(sql);
                for p in params {
                    query = bind_pg(query, p);
                }
                let rows = query.fetch_all(pool).await?;
                Ok(rows.iter().map(pg_row_to_json).collect())
            }
        }
    }

    /// Run a query expected to yield at most one row.
    pub async fn fetch_optional(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Option<Value>, AppError> {
        tracing::debug!(sql = %sql, params = ?params, "query");
        match &self.pool {
            Pool::MySql(pool) => {
                let mut query = sqlx::query(sql);
                for p in params {
                    query = bind_mysql(query, p);
                }
                let row = query.fetch_optional(pool).await?;
                Ok(row.map(|r| mysql_row_to_json(&r)))
            }
            Pool::Postgres(pool) => {
                let mut query = sqlx::query(sql);
                for p in params {
                    query = bind_pg(query, p);
                }
                let row = query.fetch_optional(pool).await?;
                Ok(row.map(|r| pg_row_to_json(&r)))
            }
        }
    }

    /// Run a mutation and return the number of affected rows.
    pub async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64, AppError> {
        tracing::debug!(sql = %sql, params = ?params, "execute");
        match &self.pool {
            Pool::MySql(pool) => {
                let mut query = sqlx::query(sql);
                for p in params {
                    query = bind_mysql(query, p);
                }
                Ok(query.execute(pool).await?.rows_affected())
            }
            Pool::Postgres(pool) => {
                let mut query = sqlx::query(sql);
                for p in params {
                    query = bind_pg(query, p);
                }
                Ok(query.execute(pool).await?.rows_affected())
            }
        }
    }

    /// Run an INSERT and return the new row's id, uniformly for both drivers:
    /// MySQL reports `last_insert_id`, PostgreSQL gets `RETURNING id`
    /// appended. `sql` is the already-adapted statement without RETURNING.
    pub async fn insert(&self, sql: &str, params: &[SqlValue]) -> Result<i64, AppError> {
        tracing::debug!(sql = %sql, params = ?params, "insert");
        match &self.pool {
            Pool::MySql(pool) => {
                let mut query = sqlx::query(sql);
                for p in params {
                    query = bind_mysql(query, p);
                }
                let result = query.execute(pool).await?;
                Ok(result.last_insert_id() as i64)
            }
            Pool::Postgres(pool) => {
                use sqlx::Row;
                let returning = format!("{sql} RETURNING id");
                let mut query = sqlx::query(&returning);
                for p in params {
                    query = bind_pg(query, p);
                }
                let row = query.fetch_one(pool).await?;
                let id = row
                    .try_get::<i32, _>(0)
                    .map(i64::from)
                    .or_else(|_| row.try_get::<i64, _>(0))?;
                Ok(id)
            }
        }
    }
}

fn mysql_options(config: &DbConfig) -> MySqlConnectOptions {
    MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.database)
}

fn pg_options(config: &DbConfig) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.database)
}

type MySqlQuery<'q> = sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments>;
type PgQuery<'q> = sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>;

fn bind_mysql<'q>(query: MySqlQuery<'q>, value: &SqlValue) -> MySqlQuery<'q> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(b) => query.bind(*b),
        SqlValue::Int(n) => query.bind(*n),
        SqlValue::Float(f) => query.bind(*f),
        SqlValue::Decimal(d) => query.bind(*d),
        SqlValue::Text(s) => query.bind(s.clone()),
    }
}

fn bind_pg<'q>(query: PgQuery<'q>, value: &SqlValue) -> PgQuery<'q> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(b) => query.bind(*b),
        SqlValue::Int(n) => query.bind(*n),
        SqlValue::Float(f) => query.bind(*f),
        SqlValue::Decimal(d) => query.bind(*d),
        SqlValue::Text(s) => query.bind(s.clone()),
    }
}

fn mysql_row_to_json(row: &MySqlRow) -> Value {
    use sqlx::{Column, Row};
    let mut map = Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), mysql_cell_to_value(row, name));
    }
    Value::Object(map)
}

fn pg_row_to_json(row: &PgRow) -> Value {
    use sqlx::{Column, Row};
    let mut map = Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), pg_cell_to_value(row, name));
    }
    Value::Object(map)
}

// Decode by trying types in a fixed order; the first compatible one wins.
// DECIMAL columns serialize as strings so values like prices round-trip
// without float drift.
fn mysql_cell_to_value(row: &MySqlRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<u64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(d)) = row.try_get::<Option<rust_decimal::Decimal>, _>(name) {
        return Value::String(d.to_string());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(f64::from(n)) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    Value::Null
}

fn pg_cell_to_value(row: &PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(d)) = row.try_get::<Option<rust_decimal::Decimal>, _>(name) {
        return Value::String(d.to_string());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(f64::from(n)) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    Value::Null
}
