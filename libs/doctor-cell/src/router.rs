use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get},
    middleware,
};

use shared_utils::extractor::require_session;
use sync_cell::ClinicContext;

use crate::handlers;

pub fn doctor_routes(state: Arc<ClinicContext>) -> Router {
    // Administration only; the role check happens in the service
    let protected_routes = Router::new()
        .route("/", get(handlers::list_doctors).post(handlers::add_doctor))
        .route("/{login}", delete(handlers::remove_doctor))
        .layer(middleware::from_fn_with_state(state.clone(), require_session));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
