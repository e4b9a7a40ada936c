use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{
    Appointment, AppointmentQuery, AppointmentStatus, BookingError, SlotId,
};
use crate::store::BookingStore;

#[derive(Debug, Clone)]
struct SlotRow {
    capacity: i32,
    remaining: i32,
}

#[derive(Default)]
struct StoreInner {
    slots: HashMap<SlotId, SlotRow>,
    appointments: HashMap<Uuid, Appointment>,
}

/// In-memory booking store. Each mutating operation is one critical section
/// over the write lock, which is what makes the conditional decrement and
/// the cancel-with-seat-release atomic.
#[derive(Default)]
pub struct MemoryBookingStore {
    inner: RwLock<StoreInner>,
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn append_notes(existing: Option<String>, extra: Option<String>) -> Option<String> {
    match (existing, extra) {
        (Some(current), Some(extra)) => Some(format!("{}\n{}", current, extra)),
        (Some(current), None) => Some(current),
        (None, extra) => extra,
    }
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    async fn remaining(&self, slot: &SlotId, capacity: i32) -> Result<i32, BookingError> {
        let inner = self.inner.read().await;
        Ok(inner
            .slots
            .get(slot)
            .map(|row| row.remaining)
            .unwrap_or(capacity))
    }

    async fn book(
        &self,
        appointment: Appointment,
        capacity: i32,
    ) -> Result<Appointment, BookingError> {
        let mut inner = self.inner.write().await;

        let duplicate = inner.appointments.values().any(|existing| {
            existing.slot == appointment.slot
                && existing.patient_id == appointment.patient_id
                && !existing.status.is_terminal()
        });
        if duplicate {
            return Err(BookingError::ValidationError(
                "Patient already holds an active appointment for this slot".to_string(),
            ));
        }

        let row = inner
            .slots
            .entry(appointment.slot)
            .or_insert(SlotRow {
                capacity,
                remaining: capacity,
            });

        if row.remaining <= 0 {
            debug!("Seat reservation lost for slot {:?}", appointment.slot);
            return Err(BookingError::SlotUnavailable);
        }
        row.remaining -= 1;

        let stored = appointment.clone();
        inner.appointments.insert(appointment.id, appointment);
        debug!("Appointment {} stored, seat reserved", stored.id);
        Ok(stored)
    }

    async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, BookingError> {
        let inner = self.inner.read().await;
        inner
            .appointments
            .get(&appointment_id)
            .cloned()
            .ok_or(BookingError::AppointmentNotFound)
    }

    async fn transition(
        &self,
        appointment_id: Uuid,
        target: AppointmentStatus,
        notes: Option<String>,
    ) -> Result<Appointment, BookingError> {
        let mut inner = self.inner.write().await;

        let current = inner
            .appointments
            .get(&appointment_id)
            .ok_or(BookingError::AppointmentNotFound)?;

        if !current.status.can_transition_to(target) {
            return Err(BookingError::InvalidTransition {
                from: current.status,
                to: target,
            });
        }

        let slot = current.slot;
        if target == AppointmentStatus::Cancelled {
            // Seat release happens under the same lock as the status flip.
            match inner.slots.get_mut(&slot) {
                Some(row) => {
                    row.remaining = (row.remaining + 1).min(row.capacity);
                }
                None => {
                    warn!("No seat row for slot {:?} during cancellation", slot);
                }
            }
        }

        let appointment = inner
            .appointments
            .get_mut(&appointment_id)
            .ok_or(BookingError::AppointmentNotFound)?;
        appointment.status = target;
        appointment.notes = append_notes(appointment.notes.take(), notes);
        appointment.updated_at = Utc::now();
        Ok(appointment.clone())
    }

    async fn search(&self, query: &AppointmentQuery) -> Result<Vec<Appointment>, BookingError> {
        let inner = self.inner.read().await;
        let mut matches: Vec<Appointment> = inner
            .appointments
            .values()
            .filter(|a| query.patient_id.map_or(true, |id| a.patient_id == id))
            .filter(|a| query.doctor_id.map_or(true, |id| a.doctor_id == id))
            .filter(|a| query.status.map_or(true, |s| a.status == s))
            .filter(|a| query.from_date.map_or(true, |d| a.appointment_date >= d))
            .filter(|a| query.to_date.map_or(true, |d| a.appointment_date <= d))
            .cloned()
            .collect();
        matches.sort_by(|a, b| {
            a.appointment_date
                .cmp(&b.appointment_date)
                .then(a.slot.start_time.cmp(&b.slot.start_time))
        });
        Ok(matches)
    }
}
