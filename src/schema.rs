//! Idempotent table bootstrap and optional admin seed.
//!
//! The UNIQUE constraints here are load-bearing: the handlers' friendly
//! duplicate probes are racy (check-then-insert), and the constraint is what
//! actually prevents a duplicate row under concurrency.

use crate::auth::password;
use crate::db::{Db, Dialect, SqlValue};
use crate::error::AppError;
use crate::handlers::count_total;

/// CREATE TABLE statements for the dialect, in dependency order.
pub fn create_table_statements(dialect: Dialect) -> Vec<String> {
    let pk = dialect.auto_increment_pk();
    vec![
        format!(
            "CREATE TABLE IF NOT EXISTS users (\
             id {pk}, \
             username VARCHAR(50) NOT NULL UNIQUE, \
             email VARCHAR(100) NOT NULL UNIQUE, \
             password VARCHAR(255) NOT NULL, \
             first_name VARCHAR(50), \
             last_name VARCHAR(50), \
             role VARCHAR(20) NOT NULL DEFAULT 'user', \
             created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP, \
             updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP)"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS categories (\
             id {pk}, \
             name VARCHAR(50) NOT NULL UNIQUE, \
             description VARCHAR(500), \
             created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP)"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS products (\
             id {pk}, \
             name VARCHAR(100) NOT NULL, \
             description TEXT, \
             price DECIMAL(10, 2) NOT NULL, \
             quantity INT NOT NULL DEFAULT 0, \
             category_id INT, \
             image_url VARCHAR(500), \
             status VARCHAR(20) NOT NULL DEFAULT 'active', \
             created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP, \
             updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP, \
             CONSTRAINT fk_products_category FOREIGN KEY (category_id) REFERENCES categories(id))"
        ),
    ]
}

pub async fn ensure_tables(db: &Db) -> Result<(), AppError> {
    for ddl in create_table_statements(db.dialect()) {
        db.execute(&ddl, &[]).await?;
    }
    tracing::info!(dialect = db.dialect().as_str(), "schema ready");
    Ok(())
}

/// Seed an `admin` account when the users table is empty, so a fresh
/// deployment has a working admin login.
pub async fn seed_admin(db: &Db, admin_password: &str) -> Result<(), AppError> {
    let total = count_total(
        db.fetch_optional("SELECT COUNT(*) AS total FROM users", &[])
            .await?,
    );
    if total > 0 {
        return Ok(());
    }
    let hashed = password::hash(admin_password).await?;
    let insert = db
        .dialect()
        .adapt("INSERT INTO users (username, email, password, role) VALUES (?, ?, ?, ?)");
    db.insert(
        &insert,
        &[
            SqlValue::Text("admin".into()),
            SqlValue::Text("admin@localhost".into()),
            hashed.into(),
            SqlValue::Text("admin".into()),
        ],
    )
    .await?;
    tracing::info!("seeded initial admin user");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postgres_ddl_uses_serial_and_no_backticks() {
        let ddl = create_table_statements(Dialect::Postgres).join("\n");
        assert!(ddl.contains("SERIAL PRIMARY KEY"));
        assert!(!ddl.contains("AUTO_INCREMENT"));
        assert!(!ddl.contains('`'));
    }

    #[test]
    fn mysql_ddl_uses_auto_increment() {
        let ddl = create_table_statements(Dialect::MySql).join("\n");
        assert!(ddl.contains("AUTO_INCREMENT"));
        assert!(!ddl.contains("SERIAL"));
    }

    #[test]
    fn unique_constraints_cover_username_email_and_category_name() {
        let ddl = create_table_statements(Dialect::MySql).join("\n");
        assert!(ddl.contains("username VARCHAR(50) NOT NULL UNIQUE"));
        assert!(ddl.contains("email VARCHAR(100) NOT NULL UNIQUE"));
        assert!(ddl.contains("name VARCHAR(50) NOT NULL UNIQUE"));
    }
}
