//! Persistence seam for slots and appointments. The only mutators of a
//! slot's seat count live behind this trait, so every implementation can
//! make "check remaining, then decrement" a single atomic unit. A SQL
//! backend would implement [`BookingStore::book`] with a conditional
//! `UPDATE ... SET remaining = remaining - 1 WHERE remaining > 0`.

pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    Appointment, AppointmentQuery, AppointmentStatus, BookingError, SlotId,
};

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Seats left on a slot. Seat rows are created lazily at booking time;
    /// a slot with no row still has all `capacity` seats.
    async fn remaining(&self, slot: &SlotId, capacity: i32) -> Result<i32, BookingError>;

    /// Atomically reserve one seat and persist the appointment. Fails with
    /// `SlotUnavailable` when no seat is left and `ValidationError` when the
    /// patient already holds a non-terminal appointment for the slot. On
    /// failure nothing is written.
    async fn book(&self, appointment: Appointment, capacity: i32)
        -> Result<Appointment, BookingError>;

    async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, BookingError>;

    /// Atomically apply a status transition, releasing the seat when the
    /// target is `Cancelled`. The transition table is re-checked under the
    /// same lock that mutates the seat count, so a half-applied cancellation
    /// can never be observed.
    async fn transition(
        &self,
        appointment_id: Uuid,
        target: AppointmentStatus,
        notes: Option<String>,
    ) -> Result<Appointment, BookingError>;

    async fn search(&self, query: &AppointmentQuery) -> Result<Vec<Appointment>, BookingError>;
}
