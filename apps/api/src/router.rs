use axum::{routing::get, Router};

use booking_cell::router::appointment_routes;
use booking_cell::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "Scheduling API is running!" }))
        .nest("/appointments", appointment_routes(state))
}
