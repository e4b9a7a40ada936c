// libs/booking-cell/src/services/booking.rs
use chrono::{DateTime, Timelike, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;

use directory_cell::models::{PatientProfile, Schedule, Service, TimeWindow};
use directory_cell::DirectoryApi;

use crate::models::{
    Appointment, AppointmentAddress, AppointmentQuery, AppointmentStatus, BookingDraft,
    BookingError,
};
use crate::services::fees;
use crate::store::BookingStore;

/// Turns a validated draft into a persisted appointment. The commit itself
/// is a single atomic store operation; everything before it is validation
/// against the directory and can run unlocked.
pub struct BookingService {
    directory: Arc<dyn DirectoryApi>,
    store: Arc<dyn BookingStore>,
    auto_confirm: bool,
}

impl BookingService {
    pub fn new(
        directory: Arc<dyn DirectoryApi>,
        store: Arc<dyn BookingStore>,
        config: &AppConfig,
    ) -> Self {
        Self {
            directory,
            store,
            auto_confirm: config.auto_confirm_bookings,
        }
    }

    pub async fn create_appointment(
        &self,
        draft: BookingDraft,
        now: DateTime<Utc>,
    ) -> Result<Appointment, BookingError> {
        info!(
            "Booking slot {:?} for patient {} with doctor {}",
            draft.slot, draft.patient_id, draft.doctor_id
        );

        let patient = self
            .directory
            .get_patient(draft.patient_id)
            .await
            .map_err(BookingError::storage)?
            .ok_or(BookingError::PatientNotFound)?;

        let doctor = self
            .directory
            .get_doctor(draft.doctor_id)
            .await
            .map_err(BookingError::storage)?
            .ok_or(BookingError::DoctorNotFound)?;
        if !doctor.is_bookable() {
            return Err(BookingError::DoctorNotFound);
        }
        if !doctor.fee_schedule.supports(draft.mode) {
            return Err(BookingError::InvalidMode(draft.mode));
        }

        let service = self.resolve_service(&draft).await?;
        let (schedule, window) = self.resolve_slot(&draft, service.as_ref()).await?;

        let slot_start = draft.slot.date.and_time(draft.slot.start_time).and_utc();
        if slot_start < now {
            return Err(BookingError::ValidationError(
                "Cannot book a slot in the past".to_string(),
            ));
        }

        let address = self.resolve_address(&draft, &patient).await?;

        let total_fee = fees::compute_fee(draft.mode, &doctor.fee_schedule, service.as_ref())?;

        let status = if self.auto_confirm {
            AppointmentStatus::Confirmed
        } else {
            AppointmentStatus::Pending
        };

        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id: draft.patient_id,
            doctor_id: draft.doctor_id,
            service_id: draft.service_id,
            slot: draft.slot,
            appointment_date: draft.slot.date,
            mode: draft.mode,
            status,
            address,
            total_fee,
            paid: false,
            notes: draft.notes,
            medical_record_id: draft.medical_record_id,
            created_at: now,
            updated_at: now,
        };

        // The seat check and decrement happen inside the store as one unit.
        // A lost race surfaces as SlotUnavailable; the caller re-queries
        // availability instead of retrying on the stale slot.
        let booked = self.store.book(appointment, window.capacity).await?;

        info!(
            "Appointment {} booked with doctor {} (schedule {})",
            booked.id, doctor.id, schedule.id
        );
        Ok(booked)
    }

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, BookingError> {
        self.store.get_appointment(appointment_id).await
    }

    pub async fn search_appointments(
        &self,
        query: &AppointmentQuery,
    ) -> Result<Vec<Appointment>, BookingError> {
        debug!("Searching appointments with filters: {:?}", query);
        self.store.search(query).await
    }

    async fn resolve_service(
        &self,
        draft: &BookingDraft,
    ) -> Result<Option<Service>, BookingError> {
        let Some(service_id) = draft.service_id else {
            return Ok(None);
        };
        let service = self
            .directory
            .get_service(service_id)
            .await
            .map_err(BookingError::storage)?
            .ok_or(BookingError::ServiceNotFound)?;
        if service.doctor_id != draft.doctor_id {
            return Err(BookingError::ValidationError(
                "Service does not belong to this doctor".to_string(),
            ));
        }
        Ok(Some(service))
    }

    /// The slot must name a schedule that belongs to the doctor, matches the
    /// draft's mode, applies on the slot date, and would actually produce
    /// this slot during expansion.
    async fn resolve_slot(
        &self,
        draft: &BookingDraft,
        service: Option<&Service>,
    ) -> Result<(Schedule, TimeWindow), BookingError> {
        let schedule = self
            .directory
            .get_schedule(draft.slot.schedule_id)
            .await
            .map_err(BookingError::storage)?
            .ok_or(BookingError::SlotNotFound)?;

        if schedule.doctor_id != draft.doctor_id {
            return Err(BookingError::ValidationError(
                "Slot does not belong to this doctor".to_string(),
            ));
        }
        if schedule.mode != draft.mode {
            return Err(BookingError::ValidationError(
                "Slot does not match the requested consultation mode".to_string(),
            ));
        }
        if !schedule.applies_on(draft.slot.date) {
            return Err(BookingError::SlotNotFound);
        }

        let window = schedule
            .window_for(draft.slot.start_time)
            .cloned()
            .ok_or(BookingError::SlotNotFound)?;

        let step = service
            .map(|s| s.duration_minutes)
            .unwrap_or(window.slot_minutes) as i64;
        let window_start = window.start_time.num_seconds_from_midnight() as i64 / 60;
        let window_end = window.end_time.num_seconds_from_midnight() as i64 / 60;
        let start = draft.slot.start_time.num_seconds_from_midnight() as i64 / 60;
        let aligned =
            step > 0 && (start - window_start) % step == 0 && start + step <= window_end;
        if !aligned {
            warn!("Rejecting unaligned slot start {:?}", draft.slot);
            return Err(BookingError::SlotNotFound);
        }

        Ok((schedule, window))
    }

    async fn resolve_address(
        &self,
        draft: &BookingDraft,
        patient: &PatientProfile,
    ) -> Result<Option<AppointmentAddress>, BookingError> {
        use directory_cell::models::ConsultationMode;

        if draft.mode == ConsultationMode::Online {
            return Ok(None);
        }

        match &draft.address {
            Some(AppointmentAddress::Saved(address_id)) => {
                let address = self
                    .directory
                    .get_address(*address_id)
                    .await
                    .map_err(BookingError::storage)?
                    .ok_or_else(|| {
                        BookingError::ValidationError("Address not found".to_string())
                    })?;
                if address.patient_id != draft.patient_id {
                    return Err(BookingError::ValidationError(
                        "Address does not belong to this patient".to_string(),
                    ));
                }
                Ok(Some(AppointmentAddress::Saved(*address_id)))
            }
            Some(inline @ AppointmentAddress::Inline(_)) => Ok(Some(inline.clone())),
            None => patient
                .default_address_id
                .map(AppointmentAddress::Saved)
                .map(Some)
                .ok_or_else(|| {
                    BookingError::ValidationError(
                        "Offline consultations require an address".to_string(),
                    )
                }),
        }
    }
}
