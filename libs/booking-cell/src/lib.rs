//! Appointment scheduling and booking engine: availability calculation,
//! atomic seat reservation, the appointment status lifecycle, fee totals
//! and the two-phase booking wizard.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod store;

pub use router::AppState;
