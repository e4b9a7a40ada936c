// libs/booking-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;

use directory_cell::DirectoryApi;

use crate::handlers;
use crate::store::BookingStore;

/// Shared state for the booking routes. The store is the only mutable
/// resource; everything else is read-only configuration and directory data.
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<dyn DirectoryApi>,
    pub store: Arc<dyn BookingStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        directory: Arc<dyn DirectoryApi>,
        store: Arc<dyn BookingStore>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            directory,
            store,
            config,
        }
    }
}

pub fn appointment_routes(state: AppState) -> Router {
    Router::new()
        .route("/availability", get(handlers::get_availability))
        .route("/", post(handlers::book_appointment))
        .route("/search", get(handlers::search_appointments))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route(
            "/{appointment_id}/transition",
            post(handlers::transition_appointment),
        )
        .with_state(state)
}
