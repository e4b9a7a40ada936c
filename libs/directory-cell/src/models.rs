use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationMode {
    Online,
    Offline,
}

impl fmt::Display for ConsultationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsultationMode::Online => write!(f, "online"),
            ConsultationMode::Offline => write!(f, "offline"),
        }
    }
}

/// Per-doctor base consultation fees. A mode is enabled for a doctor iff its
/// base fee is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub online: Option<f64>,
    pub offline: Option<f64>,
}

impl FeeSchedule {
    pub fn base_fee(&self, mode: ConsultationMode) -> Option<f64> {
        match mode {
            ConsultationMode::Online => self.online,
            ConsultationMode::Offline => self.offline,
        }
    }

    pub fn supports(&self, mode: ConsultationMode) -> bool {
        self.base_fee(mode).is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub full_name: String,
    pub specialty: String,
    pub is_active: bool,
    pub is_verified: bool,
    pub fee_schedule: FeeSchedule,
}

impl Doctor {
    /// Only active, verified doctors are bookable.
    pub fn is_bookable(&self) -> bool {
        self.is_active && self.is_verified
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub name: String,
    pub duration_minutes: i32,
    pub fee: f64,
}

/// When a schedule definition applies: a single calendar date or a weekly
/// recurrence. Templates are materialized by the directory owner; the engine
/// never edits them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    OnDate(NaiveDate),
    Weekly(Weekday),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Default slot length when no service dictates one.
    pub slot_minutes: i32,
    /// Seats per slot derived from this window.
    pub capacity: i32,
}

impl TimeWindow {
    pub fn contains(&self, start: NaiveTime) -> bool {
        start >= self.start_time && start < self.end_time
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub mode: ConsultationMode,
    pub recurrence: Recurrence,
    pub windows: Vec<TimeWindow>,
}

impl Schedule {
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        match self.recurrence {
            Recurrence::OnDate(d) => d == date,
            Recurrence::Weekly(weekday) => {
                use chrono::Datelike;
                date.weekday() == weekday
            }
        }
    }

    /// The window a slot starting at `start` falls into, if any.
    pub fn window_for(&self, start: NaiveTime) -> Option<&TimeWindow> {
        self.windows.iter().find(|w| w.contains(start))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientProfile {
    pub id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub default_address_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub line1: String,
    pub city: String,
    pub postal_code: String,
}

/// Seed format for the in-memory directory, loaded from JSON at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectorySnapshot {
    #[serde(default)]
    pub doctors: Vec<Doctor>,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub schedules: Vec<Schedule>,
    #[serde(default)]
    pub patients: Vec<PatientProfile>,
    #[serde(default)]
    pub addresses: Vec<Address>,
}
