//! In-process backend for unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::Utc;

use crate::care::{Consultation, ConsultationCreate, EmergencyAlert, EmergencyAlertCreate};
use crate::pharmacy::{sample_catalog, MedicineRequest, MedicineRequestCreate, Pharmacy};
use crate::profile::{UserCreate, UserProfile};
use crate::record::HealthRecord;
use crate::triage::{Assessment, Severity, SymptomCheckCreate};

use super::{ApiError, ApiResult, ClinicApi, RecordSink, RecordSource, SyncReceipt};

/// Keeps synced records in memory and can be switched offline.
#[derive(Debug)]
pub(crate) struct FakeApi {
    online: AtomicBool,
    pub(crate) server_records: Mutex<Vec<HealthRecord>>,
    pub(crate) batches: AtomicUsize,
    pub(crate) symptom_checks: Mutex<Vec<SymptomCheckCreate>>,
}

impl FakeApi {
    pub(crate) fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
            server_records: Mutex::new(Vec::new()),
            batches: AtomicUsize::new(0),
            symptom_checks: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    fn check(&self, endpoint: &str) -> ApiResult<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ApiError::Transport {
                endpoint: endpoint.to_string(),
                message: "network unreachable".to_string(),
            })
        }
    }
}

#[async_trait::async_trait]
impl RecordSink for FakeApi {
    async fn submit_batch(&self, records: &[HealthRecord]) -> ApiResult<SyncReceipt> {
        self.check("/health-records/sync")?;
        self.batches.fetch_add(1, Ordering::SeqCst);
        let mut stored = self.server_records.lock().unwrap();
        let base = stored.len();
        let synced: Vec<HealthRecord> = records
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, mut r)| {
                r.id = Some(format!("srv-{}", base + i));
                r.is_synced = true;
                r
            })
            .collect();
        stored.extend(synced.iter().cloned());
        Ok(SyncReceipt {
            synced_count: synced.len(),
            records: synced,
        })
    }
}

#[async_trait::async_trait]
impl RecordSource for FakeApi {
    async fn fetch_records(&self, user_id: &str) -> ApiResult<Vec<HealthRecord>> {
        self.check("/health-records")?;
        Ok(self
            .server_records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl ClinicApi for FakeApi {
    async fn register_user(&self, user: &UserCreate) -> ApiResult<UserProfile> {
        self.check("/users")?;
        let mut profile = user.clone().into_offline_profile("user-1".to_string());
        profile.created_at = Some(Utc::now());
        Ok(profile)
    }

    async fn list_pharmacies(&self) -> ApiResult<Vec<Pharmacy>> {
        self.check("/pharmacies")?;
        let mut catalog = sample_catalog();
        catalog[0].id = "remote-1".to_string();
        Ok(catalog)
    }

    async fn book_medicines(
        &self,
        request: &MedicineRequestCreate,
    ) -> ApiResult<MedicineRequest> {
        self.check("/medicine-requests")?;
        Ok(MedicineRequest {
            id: "req-1".to_string(),
            user_id: request.user_id.clone(),
            pharmacy_id: request.pharmacy_id.clone(),
            medicines: request.medicines.clone(),
            status: "pending".to_string(),
            booking_date: Some(Utc::now()),
        })
    }

    async fn book_consultation(&self, request: &ConsultationCreate) -> ApiResult<Consultation> {
        self.check("/consultations")?;
        Ok(Consultation {
            id: "c-1".to_string(),
            patient_id: request.patient_id.clone(),
            doctor_name: request.doctor_name.clone(),
            symptoms: request.symptoms.clone(),
            status: "scheduled".to_string(),
            appointment_time: request.appointment_time,
            consultation_type: request.consultation_type,
            room_id: None,
        })
    }

    async fn send_emergency_alert(
        &self,
        alert: &EmergencyAlertCreate,
    ) -> ApiResult<EmergencyAlert> {
        self.check("/emergency-alert")?;
        Ok(EmergencyAlert {
            id: "alert-1".to_string(),
            user_id: alert.user_id.clone(),
            location: alert.location,
            status: "active".to_string(),
            responders_notified: vec!["108".to_string()],
        })
    }

    async fn check_symptoms(&self, request: &SymptomCheckCreate) -> ApiResult<Assessment> {
        self.check("/symptom-check")?;
        self.symptom_checks.lock().unwrap().push(request.clone());
        Ok(Assessment {
            severity: Severity::Medium,
            assessment: "Reviewed by the clinic's assessment service".to_string(),
            recommendations: vec!["Visit the health centre within two days".to_string()],
            referral_needed: true,
            notes: String::new(),
        })
    }
}
