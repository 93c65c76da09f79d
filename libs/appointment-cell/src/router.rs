// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_utils::extractor::require_session;
use sync_cell::ClinicContext;

use crate::handlers;

pub fn appointment_routes(state: Arc<ClinicContext>) -> Router {
    let public_routes = Router::new()
        .route("/calendar/settings", get(handlers::get_calendar_settings));

    // Everything touching appointments needs a logged-in user
    let protected_routes = Router::new()
        .route("/", post(handlers::create_appointment))
        .route("/new", get(handlers::new_appointment))
        .route("/calendar", get(handlers::get_calendar))
        .route("/attachments", post(handlers::upload_attachment))
        .route(
            "/{appointment_id}",
            get(handlers::get_appointment)
                .put(handlers::update_appointment)
                .delete(handlers::delete_appointment),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_session));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
