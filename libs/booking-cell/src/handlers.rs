// libs/booking-cell/src/handlers.rs
use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;

use directory_cell::models::ConsultationMode;

use crate::models::{AppointmentQuery, BookingDraft, BookingError, TransitionRequest};
use crate::router::AppState;
use crate::services::availability::AvailabilityService;
use crate::services::booking::BookingService;
use crate::services::lifecycle::LifecycleService;

#[derive(Debug, Deserialize)]
pub struct AvailabilityQueryParams {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub mode: ConsultationMode,
    pub service_id: Option<Uuid>,
}

fn map_booking_error(err: BookingError) -> AppError {
    use BookingError::*;
    match &err {
        AppointmentNotFound | DoctorNotFound | PatientNotFound | ServiceNotFound
        | SlotNotFound => AppError::NotFound(err.to_string()),
        InvalidMode(_) | TooEarly => AppError::BadRequest(err.to_string()),
        ValidationError(msg) => AppError::ValidationError(msg.clone()),
        SlotUnavailable => {
            AppError::Conflict("This slot was just taken, please choose another".to_string())
        }
        InvalidTransition { .. } => AppError::Conflict(err.to_string()),
        Storage(msg) => AppError::Internal(msg.clone()),
    }
}

#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<AppState>,
    Query(params): Query<AvailabilityQueryParams>,
) -> Result<Json<Value>, AppError> {
    let availability = AvailabilityService::new(state.directory.clone(), state.store.clone());

    let slots = availability
        .available_slots(
            params.doctor_id,
            params.date,
            params.mode,
            params.service_id,
            Utc::now(),
        )
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "slots": slots
    })))
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<AppState>,
    Json(draft): Json<BookingDraft>,
) -> Result<Json<Value>, AppError> {
    let booking = BookingService::new(
        state.directory.clone(),
        state.store.clone(),
        &state.config,
    );

    let appointment = booking
        .create_appointment(draft, Utc::now())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let booking = BookingService::new(
        state.directory.clone(),
        state.store.clone(),
        &state.config,
    );

    let appointment = booking
        .get_appointment(appointment_id)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn transition_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<TransitionRequest>,
) -> Result<Json<Value>, AppError> {
    let lifecycle = LifecycleService::new(state.store.clone());

    let appointment = lifecycle
        .transition(appointment_id, request, Utc::now())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn search_appointments(
    State(state): State<AppState>,
    Query(query): Query<AppointmentQuery>,
) -> Result<Json<Value>, AppError> {
    let booking = BookingService::new(
        state.directory.clone(),
        state.store.clone(),
        &state.config,
    );

    let appointments = booking
        .search_appointments(&query)
        .await
        .map_err(map_booking_error)?;

    let count = appointments.len();
    Ok(Json(json!({
        "success": true,
        "appointments": appointments,
        "count": count
    })))
}
