// libs/booking-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use directory_cell::models::ConsultationMode;

// ==============================================================================
// SLOT MODEL
// ==============================================================================

/// Deterministic slot identity. Slots are derived from schedule windows, not
/// allocated, so the same (schedule, date, start) always names the same slot
/// across repeated availability reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotId {
    pub schedule_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub id: SlotId,
    pub doctor_id: Uuid,
    pub mode: ConsultationMode,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Maximum concurrent bookings for this slot.
    pub capacity: i32,
    /// Seats left. Invariant: `0 <= remaining <= capacity`.
    pub remaining: i32,
}

// ==============================================================================
// APPOINTMENT MODEL
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    /// All legal next statuses. Anything not listed here is rejected.
    pub fn valid_transitions(&self) -> &'static [AppointmentStatus] {
        match self {
            AppointmentStatus::Pending => {
                &[AppointmentStatus::Confirmed, AppointmentStatus::Cancelled]
            }
            AppointmentStatus::Confirmed => {
                &[AppointmentStatus::Completed, AppointmentStatus::Cancelled]
            }
            // Terminal states
            AppointmentStatus::Completed => &[],
            AppointmentStatus::Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, target: AppointmentStatus) -> bool {
        self.valid_transitions().contains(&target)
    }

    pub fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InlineAddress {
    pub line1: String,
    pub city: String,
    pub postal_code: String,
}

/// Where an offline consultation takes place: a saved address-book entry or
/// an address typed in during the wizard's confirmation phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentAddress {
    Saved(Uuid),
    Inline(InlineAddress),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub service_id: Option<Uuid>,
    pub slot: SlotId,
    pub appointment_date: NaiveDate,
    pub mode: ConsultationMode,
    pub status: AppointmentStatus,
    pub address: Option<AppointmentAddress>,
    pub total_fee: f64,
    pub paid: bool,
    pub notes: Option<String>,
    pub medical_record_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn scheduled_start_time(&self) -> DateTime<Utc> {
        self.slot.date.and_time(self.slot.start_time).and_utc()
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

/// An in-memory, not-yet-persisted booking request. The appointment date is
/// the slot's date; only the booking transaction manager turns a draft into
/// persisted state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingDraft {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub slot: SlotId,
    pub mode: ConsultationMode,
    pub service_id: Option<Uuid>,
    pub address: Option<AppointmentAddress>,
    pub medical_record_id: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub target: AppointmentStatus,
    pub notes: Option<String>,
    /// Administrative override for the too-early completion check.
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentQuery {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum BookingError {
    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Service not found")]
    ServiceNotFound,

    #[error("Slot not found")]
    SlotNotFound,

    #[error("Consultation mode not supported: {0}")]
    InvalidMode(ConsultationMode),

    #[error("Slot no longer available")]
    SlotUnavailable,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Appointment cannot be completed before its scheduled time")]
    TooEarly,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl BookingError {
    pub fn storage(err: impl fmt::Display) -> Self {
        BookingError::Storage(err.to_string())
    }
}
