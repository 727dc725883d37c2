use std::sync::Arc;

use crate::applications::upload::UploadStore;
use crate::auth::sessions::SessionStore;
use crate::config::Config;
use crate::mail::Mailer;
use crate::store::Store;

/// Shared application state injected into all route handlers via Axum
/// extractors. The store and mailer sit behind trait objects so tests run
/// against in-memory implementations.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub sessions: SessionStore,
    pub mailer: Arc<dyn Mailer>,
    pub uploads: UploadStore,
    pub config: Config,
}
