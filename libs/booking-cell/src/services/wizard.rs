// libs/booking-cell/src/services/wizard.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use directory_cell::models::ConsultationMode;
use directory_cell::DirectoryApi;

use crate::models::{
    Appointment, AppointmentAddress, BookingDraft, BookingError, Slot, SlotId,
};
use crate::services::availability::AvailabilityService;
use crate::services::booking::BookingService;

/// Two-phase booking interaction: pick a slot, then confirm with patient
/// details. The whole wizard is a serializable value, so a session can stash
/// it and resume; abandoning it mutates nothing, since only the booking
/// transaction manager writes state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingWizard {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub phase: WizardPhase,
    pub draft: WizardDraft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardPhase {
    SlotSelection,
    Confirmation,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WizardDraft {
    pub date: Option<NaiveDate>,
    pub mode: Option<ConsultationMode>,
    pub service_id: Option<Uuid>,
    pub slot: Option<SlotId>,
    pub address: Option<AppointmentAddress>,
    pub medical_record_id: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug)]
pub enum WizardOutcome {
    Booked(Appointment),
    /// The selected slot was taken between display and submit. The wizard is
    /// back in slot selection with a fresh list.
    SlotTaken { refreshed: Vec<Slot> },
}

impl BookingWizard {
    pub fn new(patient_id: Uuid, doctor_id: Uuid) -> Self {
        Self {
            patient_id,
            doctor_id,
            phase: WizardPhase::SlotSelection,
            draft: WizardDraft::default(),
        }
    }

    /// Change the (date, mode, service) criteria. Any previously selected
    /// slot is stale and cleared; the wizard drops back to slot selection.
    pub fn set_criteria(
        &mut self,
        date: NaiveDate,
        mode: ConsultationMode,
        service_id: Option<Uuid>,
    ) {
        self.draft.date = Some(date);
        self.draft.mode = Some(mode);
        self.draft.service_id = service_id;
        self.draft.slot = None;
        self.phase = WizardPhase::SlotSelection;
    }

    pub async fn refresh_slots(
        &self,
        availability: &AvailabilityService,
        now: DateTime<Utc>,
    ) -> Result<Vec<Slot>, BookingError> {
        let (date, mode) = self.criteria()?;
        availability
            .available_slots(self.doctor_id, date, mode, self.draft.service_id, now)
            .await
    }

    pub fn select_slot(&mut self, slot: &Slot) {
        debug!("Wizard slot selected: {:?}", slot.id);
        self.draft.slot = Some(slot.id);
    }

    pub fn proceed_to_confirmation(&mut self) -> Result<(), BookingError> {
        if self.draft.slot.is_none() {
            return Err(BookingError::ValidationError(
                "Select a slot before confirming".to_string(),
            ));
        }
        self.phase = WizardPhase::Confirmation;
        Ok(())
    }

    /// Pre-fill confirmation fields from the patient profile. Fields the
    /// user already edited are left alone.
    pub async fn prefill(&mut self, directory: &dyn DirectoryApi) -> Result<(), BookingError> {
        let patient = directory
            .get_patient(self.patient_id)
            .await
            .map_err(BookingError::storage)?
            .ok_or(BookingError::PatientNotFound)?;

        if self.draft.address.is_none() && self.draft.mode == Some(ConsultationMode::Offline) {
            self.draft.address = patient.default_address_id.map(AppointmentAddress::Saved);
        }
        Ok(())
    }

    /// Submit once per explicit user confirmation. No implicit retries: a
    /// lost seat race sends the user back to phase 1 with fresh slots.
    pub async fn submit(
        &mut self,
        booking: &BookingService,
        availability: &AvailabilityService,
        now: DateTime<Utc>,
    ) -> Result<WizardOutcome, BookingError> {
        if self.phase != WizardPhase::Confirmation {
            return Err(BookingError::ValidationError(
                "Wizard is not in the confirmation phase".to_string(),
            ));
        }
        let (_, mode) = self.criteria()?;
        let slot = self.draft.slot.ok_or_else(|| {
            BookingError::ValidationError("No slot selected".to_string())
        })?;

        let draft = BookingDraft {
            patient_id: self.patient_id,
            doctor_id: self.doctor_id,
            slot,
            mode,
            service_id: self.draft.service_id,
            address: self.draft.address.clone(),
            medical_record_id: self.draft.medical_record_id,
            notes: self.draft.notes.clone(),
        };

        match booking.create_appointment(draft, now).await {
            Ok(appointment) => {
                info!("Wizard booked appointment {}", appointment.id);
                Ok(WizardOutcome::Booked(appointment))
            }
            Err(BookingError::SlotUnavailable) => {
                self.phase = WizardPhase::SlotSelection;
                self.draft.slot = None;
                let refreshed = self.refresh_slots(availability, now).await?;
                Ok(WizardOutcome::SlotTaken { refreshed })
            }
            Err(other) => Err(other),
        }
    }

    fn criteria(&self) -> Result<(NaiveDate, ConsultationMode), BookingError> {
        match (self.draft.date, self.draft.mode) {
            (Some(date), Some(mode)) => Ok((date, mode)),
            _ => Err(BookingError::ValidationError(
                "Date and consultation mode must be chosen first".to_string(),
            )),
        }
    }
}
