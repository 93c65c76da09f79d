use std::sync::Arc;

use axum::{routing::get, Router};

use crate::context::ClinicContext;
use crate::handlers;

pub fn sync_routes(state: Arc<ClinicContext>) -> Router {
    Router::new()
        .route("/status", get(handlers::get_sync_status))
        .route("/events", get(handlers::sync_events))
        .with_state(state)
}
