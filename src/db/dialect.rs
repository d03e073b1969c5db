//! SQL dialect capability, selected once at startup.
//!
//! Handlers write logical SQL in MySQL form: `?` placeholders, backtick
//! identifier quoting, `AUTO_INCREMENT`. [`Dialect::adapt`] rewrites that text
//! for the active database; for MySQL it is the identity function.

/// The two supported placeholder/syntax conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    MySql,
    Postgres,
}

impl Dialect {
    /// Parse the `DB_TYPE` configuration value.
    pub fn from_db_type(s: &str) -> Option<Self> {
        match s {
            "mysql" => Some(Dialect::MySql),
            "postgresql" | "postgres" => Some(Dialect::Postgres),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::MySql => "mysql",
            Dialect::Postgres => "postgresql",
        }
    }

    /// Rewrite a logical SQL template for this dialect.
    ///
    /// PostgreSQL: each `?` becomes `$1`, `$2`, ... in order of occurrence,
    /// backtick-quoted identifiers become double-quoted, and `AUTO_INCREMENT`
    /// becomes `SERIAL`. MySQL: the input is returned unchanged.
    ///
    /// The rewrite is purely textual. A `?` or backtick inside a string
    /// literal is rewritten too; callers bind all user data as parameters, so
    /// literals never appear in the templates used here.
    pub fn adapt(&self, sql: &str) -> String {
        match self {
            Dialect::MySql => sql.to_string(),
            Dialect::Postgres => {
                let mut out = String::with_capacity(sql.len() + 8);
                let mut index = 0u32;
                for ch in sql.chars() {
                    match ch {
                        '?' => {
                            index += 1;
                            out.push('$');
                            out.push_str(&index.to_string());
                        }
                        '`' => out.push('"'),
                        _ => out.push(ch),
                    }
                }
                out.replace("AUTO_INCREMENT", "SERIAL")
            }
        }
    }

    /// Placeholder for the parameter at `index` (0-based), for code that
    /// assembles clauses incrementally instead of adapting a whole template.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::MySql => "?".to_string(),
            Dialect::Postgres => format!("${}", index + 1),
        }
    }

    /// Expression yielding the current time, for `SET updated_at = ...`.
    pub fn current_timestamp(&self) -> &'static str {
        match self {
            Dialect::MySql => "NOW()",
            Dialect::Postgres => "CURRENT_TIMESTAMP",
        }
    }

    /// Column definition for an auto-incrementing integer primary key.
    pub fn auto_increment_pk(&self) -> &'static str {
        match self {
            Dialect::MySql => "INT AUTO_INCREMENT PRIMARY KEY",
            Dialect::Postgres => "SERIAL PRIMARY KEY",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mysql_is_passthrough() {
        let sql = "SELECT * FROM `users` WHERE id = ? AND role = ?";
        assert_eq!(Dialect::MySql.adapt(sql), sql);
    }

    #[test]
    fn postgres_renumbers_placeholders_in_order() {
        let sql = "INSERT INTO users (username, email, password) VALUES (?, ?, ?)";
        let out = Dialect::Postgres.adapt(sql);
        assert_eq!(
            out,
            "INSERT INTO users (username, email, password) VALUES ($1, $2, $3)"
        );
        assert!(!out.contains('?'));
    }

    #[test]
    fn postgres_numbers_run_left_to_right_across_clauses() {
        let out = Dialect::Postgres
            .adapt("SELECT id FROM users WHERE username = ? OR email = ? LIMIT ? OFFSET ?");
        assert_eq!(
            out,
            "SELECT id FROM users WHERE username = $1 OR email = $2 LIMIT $3 OFFSET $4"
        );
    }

    #[test]
    fn backticks_become_double_quotes() {
        let out = Dialect::Postgres.adapt("SELECT `name` FROM `categories`");
        assert_eq!(out, "SELECT \"name\" FROM \"categories\"");
    }

    #[test]
    fn auto_increment_becomes_serial() {
        let out = Dialect::Postgres.adapt("id INT AUTO_INCREMENT");
        assert_eq!(out, "id INT SERIAL");
    }

    #[test]
    fn rewrite_is_textual_even_inside_literals() {
        // Known limitation: no SQL parsing, so a placeholder character inside
        // a string literal is renumbered like any other.
        let out = Dialect::Postgres.adapt("SELECT '?' FROM t WHERE a = ?");
        assert_eq!(out, "SELECT '$1' FROM t WHERE a = $2");
    }

    #[test]
    fn placeholder_is_one_based_for_postgres() {
        assert_eq!(Dialect::MySql.placeholder(0), "?");
        assert_eq!(Dialect::MySql.placeholder(7), "?");
        assert_eq!(Dialect::Postgres.placeholder(0), "$1");
        assert_eq!(Dialect::Postgres.placeholder(7), "$8");
    }

    #[test]
    fn db_type_parsing() {
        assert_eq!(Dialect::from_db_type("mysql"), Some(Dialect::MySql));
        assert_eq!(Dialect::from_db_type("postgresql"), Some(Dialect::Postgres));
        assert_eq!(Dialect::from_db_type("postgres"), Some(Dialect::Postgres));
        assert_eq!(Dialect::from_db_type("sqlite"), None);
    }
}
