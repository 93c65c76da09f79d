use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::appointment_routes;
use auth_cell::session_routes;
use doctor_cell::doctor_routes;
use patient_cell::patient_routes;
use sync_cell::{sync_routes, ClinicContext};

pub fn create_router(state: Arc<ClinicContext>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic desk is running!" }))
        .nest("/session", session_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/patients", patient_routes(state.clone()))
        .nest("/doctors", doctor_routes(state.clone()))
        .nest("/sync", sync_routes(state))
}
