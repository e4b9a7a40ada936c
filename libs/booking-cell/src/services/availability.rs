// libs/booking-cell/src/services/availability.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use directory_cell::models::{ConsultationMode, Schedule, Service};
use directory_cell::DirectoryApi;

use crate::models::{BookingError, Slot, SlotId};
use crate::store::BookingStore;

/// Derives the bookable slots for a doctor on a date. Pure read: seat counts
/// come from the store but nothing is written, so the result is advisory and
/// may be stale by the time a booking commits.
pub struct AvailabilityService {
    directory: Arc<dyn DirectoryApi>,
    store: Arc<dyn BookingStore>,
}

impl AvailabilityService {
    pub fn new(directory: Arc<dyn DirectoryApi>, store: Arc<dyn BookingStore>) -> Self {
        Self { directory, store }
    }

    pub async fn available_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        mode: ConsultationMode,
        service_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Slot>, BookingError> {
        debug!(
            "Computing availability for doctor {} on {} ({})",
            doctor_id, date, mode
        );

        let doctor = self
            .directory
            .get_doctor(doctor_id)
            .await
            .map_err(BookingError::storage)?
            .ok_or(BookingError::DoctorNotFound)?;
        if !doctor.is_bookable() {
            return Err(BookingError::DoctorNotFound);
        }
        if !doctor.fee_schedule.supports(mode) {
            return Err(BookingError::InvalidMode(mode));
        }
        if date < now.date_naive() {
            return Err(BookingError::ValidationError(
                "Availability can only be requested for today or later".to_string(),
            ));
        }

        let service = self.resolve_service(doctor_id, service_id).await?;

        let schedules = self
            .directory
            .schedules_for(doctor_id, date, mode)
            .await
            .map_err(BookingError::storage)?;

        let mut slots = Vec::new();
        for schedule in &schedules {
            self.expand_schedule(schedule, date, service.as_ref(), now, &mut slots)
                .await?;
        }

        // Deterministic order: start time ascending, ties by schedule id.
        slots.sort_by(|a, b| {
            a.start_time
                .cmp(&b.start_time)
                .then(a.id.schedule_id.cmp(&b.id.schedule_id))
        });

        debug!("Found {} bookable slots", slots.len());
        Ok(slots)
    }

    async fn resolve_service(
        &self,
        doctor_id: Uuid,
        service_id: Option<Uuid>,
    ) -> Result<Option<Service>, BookingError> {
        let Some(service_id) = service_id else {
            return Ok(None);
        };
        let service = self
            .directory
            .get_service(service_id)
            .await
            .map_err(BookingError::storage)?
            .ok_or(BookingError::ServiceNotFound)?;
        if service.doctor_id != doctor_id {
            return Err(BookingError::ValidationError(
                "Service does not belong to this doctor".to_string(),
            ));
        }
        Ok(Some(service))
    }

    async fn expand_schedule(
        &self,
        schedule: &Schedule,
        date: NaiveDate,
        service: Option<&Service>,
        now: DateTime<Utc>,
        slots: &mut Vec<Slot>,
    ) -> Result<(), BookingError> {
        for window in &schedule.windows {
            let step = service
                .map(|s| s.duration_minutes)
                .unwrap_or(window.slot_minutes);
            if step <= 0 {
                continue;
            }

            // Minute arithmetic keeps NaiveTime from wrapping at midnight.
            let window_start = window.start_time.num_seconds_from_midnight() as i64 / 60;
            let window_end = window.end_time.num_seconds_from_midnight() as i64 / 60;
            let step = step as i64;

            let mut minute = window_start;
            while minute + step <= window_end {
                let (Some(start_time), Some(end_time)) = (
                    NaiveTime::from_num_seconds_from_midnight_opt((minute * 60) as u32, 0),
                    NaiveTime::from_num_seconds_from_midnight_opt(((minute + step) * 60) as u32, 0),
                ) else {
                    break;
                };
                minute += step;

                let slot_id = SlotId {
                    schedule_id: schedule.id,
                    date,
                    start_time,
                };
                let start = date.and_time(start_time).and_utc();

                // Same-day slots already underway are not bookable.
                if date == now.date_naive() && start < now {
                    continue;
                }

                let remaining = self.store.remaining(&slot_id, window.capacity).await?;
                if remaining == 0 {
                    continue;
                }

                slots.push(Slot {
                    id: slot_id,
                    doctor_id: schedule.doctor_id,
                    mode: schedule.mode,
                    start_time: start,
                    end_time: date.and_time(end_time).and_utc(),
                    capacity: window.capacity,
                    remaining,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Appointment, AppointmentStatus};
    use crate::store::memory::MemoryBookingStore;
    use assert_matches::assert_matches;
    use chrono::TimeZone;
    use directory_cell::models::{
        Doctor, FeeSchedule, Recurrence, TimeWindow,
    };
    use directory_cell::InMemoryDirectory;

    fn doctor() -> Doctor {
        Doctor {
            id: Uuid::new_v4(),
            full_name: "Dr. Elena Voss".to_string(),
            specialty: "General Practice".to_string(),
            is_active: true,
            is_verified: true,
            fee_schedule: FeeSchedule {
                online: Some(50.0),
                offline: Some(80.0),
            },
        }
    }

    fn window(start_h: u32, end_h: u32, slot_minutes: i32, capacity: i32) -> TimeWindow {
        TimeWindow {
            start_time: NaiveTime::from_hms_opt(start_h, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end_h, 0, 0).unwrap(),
            slot_minutes,
            capacity,
        }
    }

    fn schedule_on(doctor_id: Uuid, date: NaiveDate, windows: Vec<TimeWindow>) -> Schedule {
        Schedule {
            id: Uuid::new_v4(),
            doctor_id,
            mode: ConsultationMode::Online,
            recurrence: Recurrence::OnDate(date),
            windows,
        }
    }

    async fn fixture(
        schedules: Vec<Schedule>,
        doc: Doctor,
    ) -> (AvailabilityService, Arc<MemoryBookingStore>) {
        let directory = Arc::new(InMemoryDirectory::new());
        directory.insert_doctor(doc).await;
        for schedule in schedules {
            directory.insert_schedule(schedule).await;
        }
        let store = Arc::new(MemoryBookingStore::new());
        (
            AvailabilityService::new(directory, store.clone()),
            store,
        )
    }

    fn day_before(date: NaiveDate) -> DateTime<Utc> {
        date.pred_opt().unwrap().and_hms_opt(12, 0, 0).unwrap().and_utc()
    }

    #[tokio::test]
    async fn expands_windows_in_order() {
        let doc = doctor();
        let doctor_id = doc.id;
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let (service, _store) = fixture(
            vec![schedule_on(doctor_id, date, vec![window(9, 10, 30, 1)])],
            doc,
        )
        .await;

        let slots = service
            .available_slots(doctor_id, date, ConsultationMode::Online, None, day_before(date))
            .await
            .unwrap();

        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].start_time.time(), NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(slots[1].start_time.time(), NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert!(slots.iter().all(|s| s.remaining == 1 && s.capacity == 1));
    }

    #[tokio::test]
    async fn repeated_reads_are_identical() {
        let doc = doctor();
        let doctor_id = doc.id;
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let (service, _store) = fixture(
            vec![schedule_on(doctor_id, date, vec![window(9, 12, 20, 2)])],
            doc,
        )
        .await;

        let now = day_before(date);
        let first = service
            .available_slots(doctor_id, date, ConsultationMode::Online, None, now)
            .await
            .unwrap();
        let second = service
            .available_slots(doctor_id, date, ConsultationMode::Online, None, now)
            .await
            .unwrap();
        let ids: Vec<_> = first.iter().map(|s| s.id).collect();
        let ids2: Vec<_> = second.iter().map(|s| s.id).collect();
        assert_eq!(ids, ids2);
    }

    #[tokio::test]
    async fn full_slots_are_excluded() {
        let doc = doctor();
        let doctor_id = doc.id;
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let schedule = schedule_on(doctor_id, date, vec![window(9, 10, 30, 1)]);
        let schedule_id = schedule.id;
        let (service, store) = fixture(vec![schedule], doc).await;

        // Burn the 09:00 seat.
        let now = Utc::now();
        let slot = SlotId {
            schedule_id,
            date,
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        };
        store
            .book(
                Appointment {
                    id: Uuid::new_v4(),
                    patient_id: Uuid::new_v4(),
                    doctor_id,
                    service_id: None,
                    slot,
                    appointment_date: date,
                    mode: ConsultationMode::Online,
                    status: AppointmentStatus::Pending,
                    address: None,
                    total_fee: 50.0,
                    paid: false,
                    notes: None,
                    medical_record_id: None,
                    created_at: now,
                    updated_at: now,
                },
                1,
            )
            .await
            .unwrap();

        let slots = service
            .available_slots(doctor_id, date, ConsultationMode::Online, None, day_before(date))
            .await
            .unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].start_time.time(), NaiveTime::from_hms_opt(9, 30, 0).unwrap());
    }

    #[tokio::test]
    async fn todays_past_slots_are_excluded() {
        let doc = doctor();
        let doctor_id = doc.id;
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let (service, _store) = fixture(
            vec![schedule_on(doctor_id, date, vec![window(9, 11, 30, 1)])],
            doc,
        )
        .await;

        // It is 10:00 on the requested day: 09:00 and 09:30 are gone.
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        let slots = service
            .available_slots(doctor_id, date, ConsultationMode::Online, None, now)
            .await
            .unwrap();
        let starts: Vec<_> = slots.iter().map(|s| s.start_time.time()).collect();
        assert_eq!(
            starts,
            vec![
                NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
            ]
        );
    }

    #[tokio::test]
    async fn service_duration_overrides_window_step() {
        let doc = doctor();
        let doctor_id = doc.id;
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let directory = Arc::new(InMemoryDirectory::new());
        directory.insert_doctor(doc).await;
        directory
            .insert_schedule(schedule_on(doctor_id, date, vec![window(9, 10, 30, 1)]))
            .await;
        let svc = Service {
            id: Uuid::new_v4(),
            doctor_id,
            name: "Extended consult".to_string(),
            duration_minutes: 60,
            fee: 20.0,
        };
        let service_id = svc.id;
        directory.insert_service(svc).await;
        let store = Arc::new(MemoryBookingStore::new());
        let availability = AvailabilityService::new(directory, store);

        let slots = availability
            .available_slots(
                doctor_id,
                date,
                ConsultationMode::Online,
                Some(service_id),
                day_before(date),
            )
            .await
            .unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].end_time.time(), NaiveTime::from_hms_opt(10, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn error_cases() {
        let doc = doctor();
        let doctor_id = doc.id;
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let mut inactive = doctor();
        inactive.is_active = false;
        let inactive_id = inactive.id;

        let directory = Arc::new(InMemoryDirectory::new());
        directory.insert_doctor(doc).await;
        directory.insert_doctor(inactive).await;
        let store = Arc::new(MemoryBookingStore::new());
        let availability = AvailabilityService::new(directory, store);
        let now = day_before(date);

        let err = availability
            .available_slots(Uuid::new_v4(), date, ConsultationMode::Online, None, now)
            .await
            .unwrap_err();
        assert_matches!(err, BookingError::DoctorNotFound);

        let err = availability
            .available_slots(inactive_id, date, ConsultationMode::Online, None, now)
            .await
            .unwrap_err();
        assert_matches!(err, BookingError::DoctorNotFound);

        let past = date.pred_opt().unwrap().pred_opt().unwrap();
        let err = availability
            .available_slots(doctor_id, past, ConsultationMode::Online, None, now)
            .await
            .unwrap_err();
        assert_matches!(err, BookingError::ValidationError(_));

        // No schedules at all: empty list, not an error.
        let slots = availability
            .available_slots(doctor_id, date, ConsultationMode::Online, None, now)
            .await
            .unwrap();
        assert!(slots.is_empty());
    }
}
