use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
    middleware,
};

use shared_utils::extractor::require_session;
use sync_cell::ClinicContext;

use crate::handlers;

pub fn session_routes(state: Arc<ClinicContext>) -> Router {
    let public_routes = Router::new()
        .route("/", get(handlers::get_session))
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout));

    let protected_routes = Router::new()
        .route("/filter", put(handlers::set_filter))
        .layer(middleware::from_fn_with_state(state.clone(), require_session));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
