//! Shared application state. Constructed once in `main` and injected into
//! every handler; there is no ambient pool singleton.

use crate::auth::JwtKeys;
use crate::db::Db;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub auth: Arc<JwtKeys>,
}
