use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::models::{
    Address, ConsultationMode, DirectorySnapshot, Doctor, PatientProfile, Schedule, Service,
};

/// Read API the scheduling engine consumes. The production implementation
/// proxies the profile-management service; tests and single-node deployments
/// use [`InMemoryDirectory`].
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    async fn get_doctor(&self, doctor_id: Uuid) -> Result<Option<Doctor>>;
    async fn get_service(&self, service_id: Uuid) -> Result<Option<Service>>;
    async fn get_schedule(&self, schedule_id: Uuid) -> Result<Option<Schedule>>;
    /// Schedules for a doctor that apply on `date` in the given mode.
    async fn schedules_for(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        mode: ConsultationMode,
    ) -> Result<Vec<Schedule>>;
    async fn get_patient(&self, patient_id: Uuid) -> Result<Option<PatientProfile>>;
    async fn get_address(&self, address_id: Uuid) -> Result<Option<Address>>;
}

#[derive(Default)]
struct DirectoryInner {
    doctors: HashMap<Uuid, Doctor>,
    services: HashMap<Uuid, Service>,
    schedules: HashMap<Uuid, Schedule>,
    patients: HashMap<Uuid, PatientProfile>,
    addresses: HashMap<Uuid, Address>,
}

#[derive(Default)]
pub struct InMemoryDirectory {
    inner: RwLock<DirectoryInner>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load_snapshot(&self, snapshot: DirectorySnapshot) {
        let mut inner = self.inner.write().await;
        for doctor in snapshot.doctors {
            inner.doctors.insert(doctor.id, doctor);
        }
        for service in snapshot.services {
            inner.services.insert(service.id, service);
        }
        for schedule in snapshot.schedules {
            inner.schedules.insert(schedule.id, schedule);
        }
        for patient in snapshot.patients {
            inner.patients.insert(patient.id, patient);
        }
        for address in snapshot.addresses {
            inner.addresses.insert(address.id, address);
        }
        debug!(
            "Directory snapshot loaded: {} doctors, {} schedules",
            inner.doctors.len(),
            inner.schedules.len()
        );
    }

    pub async fn from_snapshot(snapshot: DirectorySnapshot) -> Self {
        let directory = Self::new();
        directory.load_snapshot(snapshot).await;
        directory
    }

    pub async fn insert_doctor(&self, doctor: Doctor) {
        self.inner.write().await.doctors.insert(doctor.id, doctor);
    }

    pub async fn insert_service(&self, service: Service) {
        self.inner.write().await.services.insert(service.id, service);
    }

    pub async fn insert_schedule(&self, schedule: Schedule) {
        self.inner.write().await.schedules.insert(schedule.id, schedule);
    }

    pub async fn insert_patient(&self, patient: PatientProfile) {
        self.inner.write().await.patients.insert(patient.id, patient);
    }

    pub async fn insert_address(&self, address: Address) {
        self.inner.write().await.addresses.insert(address.id, address);
    }
}

#[async_trait]
impl DirectoryApi for InMemoryDirectory {
    async fn get_doctor(&self, doctor_id: Uuid) -> Result<Option<Doctor>> {
        Ok(self.inner.read().await.doctors.get(&doctor_id).cloned())
    }

    async fn get_service(&self, service_id: Uuid) -> Result<Option<Service>> {
        Ok(self.inner.read().await.services.get(&service_id).cloned())
    }

    async fn get_schedule(&self, schedule_id: Uuid) -> Result<Option<Schedule>> {
        Ok(self.inner.read().await.schedules.get(&schedule_id).cloned())
    }

    async fn schedules_for(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        mode: ConsultationMode,
    ) -> Result<Vec<Schedule>> {
        let inner = self.inner.read().await;
        let mut schedules: Vec<Schedule> = inner
            .schedules
            .values()
            .filter(|s| s.doctor_id == doctor_id && s.mode == mode && s.applies_on(date))
            .cloned()
            .collect();
        schedules.sort_by_key(|s| s.id);
        Ok(schedules)
    }

    async fn get_patient(&self, patient_id: Uuid) -> Result<Option<PatientProfile>> {
        Ok(self.inner.read().await.patients.get(&patient_id).cloned())
    }

    async fn get_address(&self, address_id: Uuid) -> Result<Option<Address>> {
        Ok(self.inner.read().await.addresses.get(&address_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeeSchedule, Recurrence, TimeWindow};
    use chrono::{NaiveTime, Weekday};

    fn sample_doctor() -> Doctor {
        Doctor {
            id: Uuid::new_v4(),
            full_name: "Dr. Asha Rao".to_string(),
            specialty: "Dermatology".to_string(),
            is_active: true,
            is_verified: true,
            fee_schedule: FeeSchedule {
                online: Some(50.0),
                offline: Some(80.0),
            },
        }
    }

    #[tokio::test]
    async fn schedules_for_filters_by_date_and_mode() {
        let directory = InMemoryDirectory::new();
        let doctor = sample_doctor();
        let doctor_id = doctor.id;
        directory.insert_doctor(doctor).await;

        let window = TimeWindow {
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            slot_minutes: 30,
            capacity: 1,
        };
        directory
            .insert_schedule(Schedule {
                id: Uuid::new_v4(),
                doctor_id,
                mode: ConsultationMode::Online,
                recurrence: Recurrence::Weekly(Weekday::Mon),
                windows: vec![window.clone()],
            })
            .await;
        directory
            .insert_schedule(Schedule {
                id: Uuid::new_v4(),
                doctor_id,
                mode: ConsultationMode::Offline,
                recurrence: Recurrence::Weekly(Weekday::Mon),
                windows: vec![window],
            })
            .await;

        // 2025-06-02 is a Monday.
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let online = directory
            .schedules_for(doctor_id, date, ConsultationMode::Online)
            .await
            .unwrap();
        assert_eq!(online.len(), 1);
        assert_eq!(online[0].mode, ConsultationMode::Online);

        // Tuesday: nothing recurs.
        let tuesday = NaiveDate::from_ymd_opt(2025, 6, 3).unwrap();
        let none = directory
            .schedules_for(doctor_id, tuesday, ConsultationMode::Online)
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn snapshot_round_trip() {
        let doctor = sample_doctor();
        let snapshot = DirectorySnapshot {
            doctors: vec![doctor.clone()],
            ..Default::default()
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: DirectorySnapshot = serde_json::from_str(&json).unwrap();
        let directory = InMemoryDirectory::from_snapshot(parsed).await;
        let loaded = directory.get_doctor(doctor.id).await.unwrap().unwrap();
        assert_eq!(loaded.full_name, doctor.full_name);
    }
}
