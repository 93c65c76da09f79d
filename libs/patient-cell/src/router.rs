use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use shared_utils::extractor::require_session;
use sync_cell::ClinicContext;

use crate::handlers::*;

pub fn patient_routes(state: Arc<ClinicContext>) -> Router {
    Router::new()
        .route("/", get(search_patients))
        .route("/history/{phone}", get(patient_history))
        .layer(middleware::from_fn_with_state(state.clone(), require_session))
        .with_state(state)
}
