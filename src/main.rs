//! Server entry point: config from env, pool, schema bootstrap, serve.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use universal_crud::{api_router, schema, AppConfig, AppState, Db, JwtKeys};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("universal_crud=info".parse()?),
        )
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(dialect = config.db.dialect.as_str(), db = %config.db.database, "connecting");
    let db = Db::connect(&config.db).await?;

    schema::ensure_tables(&db).await?;
    if let Some(admin_password) = &config.admin_password {
        schema::seed_admin(&db, admin_password).await?;
    }

    let state = AppState {
        db,
        auth: Arc::new(JwtKeys::new(
            config.jwt_secret.as_bytes(),
            config.jwt_expires_in,
        )),
    };
    let app = api_router(state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
