// libs/booking-cell/src/services/lifecycle.rs
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{Appointment, AppointmentStatus, BookingError, TransitionRequest};
use crate::store::BookingStore;

/// Drives appointments through pending -> confirmed -> completed/cancelled.
/// The transition table itself lives on [`AppointmentStatus`]; this service
/// adds the time rules and hands the mutation to the store, which re-checks
/// the table atomically with the seat release.
pub struct LifecycleService {
    store: Arc<dyn BookingStore>,
}

impl LifecycleService {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    pub async fn transition(
        &self,
        appointment_id: Uuid,
        request: TransitionRequest,
        now: DateTime<Utc>,
    ) -> Result<Appointment, BookingError> {
        debug!(
            "Transition requested for appointment {}: -> {}",
            appointment_id, request.target
        );

        let current = self.store.get_appointment(appointment_id).await?;

        if !current.status.can_transition_to(request.target) {
            warn!(
                "Invalid status transition attempted: {} -> {}",
                current.status, request.target
            );
            return Err(BookingError::InvalidTransition {
                from: current.status,
                to: request.target,
            });
        }

        // Completion is only allowed at or after the scheduled start. The
        // slot start never changes, so this pre-check cannot race with the
        // store mutation.
        if request.target == AppointmentStatus::Completed
            && now < current.scheduled_start_time()
            && !request.force
        {
            return Err(BookingError::TooEarly);
        }

        let updated = self
            .store
            .transition(appointment_id, request.target, request.notes)
            .await?;

        info!(
            "Appointment {} transitioned {} -> {}",
            appointment_id, current.status, updated.status
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryBookingStore;
    use assert_matches::assert_matches;
    use chrono::{Duration, NaiveDate, NaiveTime};
    use directory_cell::models::ConsultationMode;
    use crate::models::SlotId;

    fn future_appointment(start: DateTime<Utc>) -> Appointment {
        let now = Utc::now();
        Appointment {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            service_id: None,
            slot: SlotId {
                schedule_id: Uuid::new_v4(),
                date: start.date_naive(),
                start_time: start.time(),
            },
            appointment_date: start.date_naive(),
            mode: ConsultationMode::Online,
            status: AppointmentStatus::Pending,
            address: None,
            total_fee: 50.0,
            paid: false,
            notes: None,
            medical_record_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn seeded(start: DateTime<Utc>) -> (LifecycleService, Uuid) {
        let store = Arc::new(MemoryBookingStore::new());
        let appointment = store
            .book(future_appointment(start), 1)
            .await
            .expect("booking fixture");
        (LifecycleService::new(store), appointment.id)
    }

    fn target(status: AppointmentStatus) -> TransitionRequest {
        TransitionRequest {
            target: status,
            notes: None,
            force: false,
        }
    }

    #[tokio::test]
    async fn transition_table_is_exhaustive() {
        use AppointmentStatus::*;
        let allowed = [
            (Pending, Confirmed),
            (Pending, Cancelled),
            (Confirmed, Completed),
            (Confirmed, Cancelled),
        ];
        for from in [Pending, Confirmed, Completed, Cancelled] {
            for to in [Pending, Confirmed, Completed, Cancelled] {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{} -> {}",
                    from,
                    to
                );
            }
        }
    }

    #[tokio::test]
    async fn pending_confirm_then_complete_after_start() {
        let start = Utc::now() - Duration::minutes(5);
        let (service, id) = seeded(start).await;

        service
            .transition(id, target(AppointmentStatus::Confirmed), Utc::now())
            .await
            .unwrap();
        let done = service
            .transition(id, target(AppointmentStatus::Completed), Utc::now())
            .await
            .unwrap();
        assert_eq!(done.status, AppointmentStatus::Completed);
    }

    #[tokio::test]
    async fn complete_before_start_is_too_early_unless_forced() {
        let start = Utc::now() + Duration::hours(2);
        let (service, id) = seeded(start).await;

        service
            .transition(id, target(AppointmentStatus::Confirmed), Utc::now())
            .await
            .unwrap();

        let err = service
            .transition(id, target(AppointmentStatus::Completed), Utc::now())
            .await
            .unwrap_err();
        assert_matches!(err, BookingError::TooEarly);

        let forced = service
            .transition(
                id,
                TransitionRequest {
                    target: AppointmentStatus::Completed,
                    notes: Some("admin override".to_string()),
                    force: true,
                },
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(forced.status, AppointmentStatus::Completed);
    }

    #[tokio::test]
    async fn terminal_states_reject_everything() {
        let start = Utc::now() + Duration::hours(1);
        let (service, id) = seeded(start).await;

        service
            .transition(id, target(AppointmentStatus::Cancelled), Utc::now())
            .await
            .unwrap();

        for to in [
            AppointmentStatus::Pending,
            AppointmentStatus::Confirmed,
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
        ] {
            let err = service.transition(id, target(to), Utc::now()).await.unwrap_err();
            assert_matches!(err, BookingError::InvalidTransition { .. });
        }
    }

    #[tokio::test]
    async fn unknown_appointment_is_not_found() {
        let store = Arc::new(MemoryBookingStore::new());
        let service = LifecycleService::new(store);
        let err = service
            .transition(Uuid::new_v4(), target(AppointmentStatus::Confirmed), Utc::now())
            .await
            .unwrap_err();
        assert_matches!(err, BookingError::AppointmentNotFound);
    }

    #[tokio::test]
    async fn slot_date_helpers_line_up() {
        // Guards scheduled_start_time against timezone drift.
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let time = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let appointment = future_appointment(date.and_time(time).and_utc());
        assert_eq!(
            appointment.scheduled_start_time(),
            date.and_time(time).and_utc()
        );
    }
}
