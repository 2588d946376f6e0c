//! Consultation booking and emergency alerts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::ClinicApi;
use crate::capability::{Location, LocationProvider};
use crate::error::{Error, Result};
use crate::profile::UserProfile;
use crate::queue::SyncQueue;
use crate::record::{HealthRecord, RecordType};

/// How the consultation is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsultationType {
    /// Video call.
    #[default]
    Video,
    /// Voice only, for weak connections.
    Audio,
    /// Text chat.
    Chat,
}

impl std::fmt::Display for ConsultationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
            Self::Chat => write!(f, "chat"),
        }
    }
}

/// Body of a consultation booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsultationCreate {
    /// The patient.
    pub patient_id: String,
    /// Requested doctor.
    pub doctor_name: String,
    /// What the patient reports.
    pub symptoms: String,
    /// Requested slot.
    pub appointment_time: DateTime<Utc>,
    /// Call type.
    #[serde(default)]
    pub consultation_type: ConsultationType,
}

/// A booked consultation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consultation {
    /// Server id.
    pub id: String,
    /// The patient.
    pub patient_id: String,
    /// Assigned doctor.
    pub doctor_name: String,
    /// What the patient reported.
    #[serde(default)]
    pub symptoms: String,
    /// `scheduled`, `ongoing`, `completed` or `cancelled`.
    #[serde(default)]
    pub status: String,
    /// Booked slot.
    #[serde(deserialize_with = "crate::timestamp::deserialize")]
    pub appointment_time: DateTime<Utc>,
    /// Call type.
    #[serde(default)]
    pub consultation_type: ConsultationType,
    /// Video room, once allocated.
    #[serde(default)]
    pub room_id: Option<String>,
}

/// What happened to a consultation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsultationOutcome {
    /// The server accepted the booking.
    Booked(Consultation),
    /// The server was unreachable; the request was queued as a record.
    Queued(HealthRecord),
}

impl ConsultationCreate {
    fn as_record(&self) -> HealthRecord {
        HealthRecord::new(
            self.patient_id.clone(),
            RecordType::Consultation,
            format!("Consultation with {}", self.doctor_name),
            format!("{} ({})", self.symptoms, self.consultation_type),
        )
        .with_doctor(self.doctor_name.clone())
        .with_date(self.appointment_time)
    }
}

/// Book a consultation, queueing it locally if the server is unreachable.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the doctor or symptoms are blank.
pub async fn book_consultation<A: ClinicApi + ?Sized>(
    api: &A,
    queue: &SyncQueue,
    request: &ConsultationCreate,
) -> Result<ConsultationOutcome> {
    if request.doctor_name.trim().is_empty() {
        return Err(Error::invalid_input("doctor_name", "must not be empty"));
    }
    if request.symptoms.trim().is_empty() {
        return Err(Error::invalid_input("symptoms", "must not be empty"));
    }

    match api.book_consultation(request).await {
        Ok(consultation) => {
            info!(doctor = %consultation.doctor_name, "Consultation booked");
            Ok(ConsultationOutcome::Booked(consultation))
        }
        Err(e) => {
            warn!("Consultation saved offline: {e}");
            Ok(ConsultationOutcome::Queued(queue.enqueue(request.as_record())))
        }
    }
}

/// Kind of emergency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    /// Medical emergency.
    #[default]
    Medical,
    /// Road or farm accident.
    Accident,
}

/// Body of an emergency alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyAlertCreate {
    /// The person in need.
    pub user_id: String,
    /// Their name, for responders.
    pub user_name: String,
    /// Their phone, for responders.
    pub user_phone: String,
    /// Where to go.
    pub location: Location,
    /// Kind of emergency.
    #[serde(default)]
    pub alert_type: AlertType,
    /// Free text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// An alert as stored by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyAlert {
    /// Server id.
    pub id: String,
    /// The person in need.
    pub user_id: String,
    /// Where to go.
    pub location: Location,
    /// `active`, `responded` or `resolved`.
    #[serde(default)]
    pub status: String,
    /// Who has been told.
    #[serde(default)]
    pub responders_notified: Vec<String>,
}

/// What happened to an emergency alert.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertOutcome {
    /// Responders were notified.
    Sent(EmergencyAlert),
    /// The server was unreachable. Alerts are never queued; the user should
    /// call for help directly.
    Offline,
    /// No position fix, so nothing was sent.
    NoLocation,
}

/// Raise an emergency alert at the device's current position.
pub async fn raise_emergency<A, L>(
    api: &A,
    locator: &L,
    user: &UserProfile,
    alert_type: AlertType,
    description: Option<String>,
) -> AlertOutcome
where
    A: ClinicApi + ?Sized,
    L: LocationProvider + ?Sized,
{
    let Some(location) = locator.current_location().await else {
        warn!("No location fix, emergency alert not sent");
        return AlertOutcome::NoLocation;
    };

    let alert = EmergencyAlertCreate {
        user_id: user.id.clone(),
        user_name: user.name.clone(),
        user_phone: user.phone.clone(),
        location,
        alert_type,
        description: description.or_else(|| Some("Emergency help requested".to_string())),
    };

    match api.send_emergency_alert(&alert).await {
        Ok(sent) => {
            info!(alert_id = %sent.id, "Emergency responders notified");
            AlertOutcome::Sent(sent)
        }
        Err(e) => {
            warn!("Emergency alert not delivered: {e}");
            AlertOutcome::Offline
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_consultation_as_record() {
        let request = ConsultationCreate {
            patient_id: "u1".to_string(),
            doctor_name: "Dr. Manjeet Singh".to_string(),
            symptoms: "Cough for a week".to_string(),
            appointment_time: Utc.with_ymd_and_hms(2025, 4, 2, 11, 30, 0).unwrap(),
            consultation_type: ConsultationType::Audio,
        };
        let record = request.as_record();

        assert_eq!(record.record_type, RecordType::Consultation);
        assert_eq!(record.title, "Consultation with Dr. Manjeet Singh");
        assert_eq!(record.description, "Cough for a week (audio)");
        assert_eq!(record.doctor_name.as_deref(), Some("Dr. Manjeet Singh"));
        assert_eq!(record.date, request.appointment_time);
    }

    #[test]
    fn test_alert_payload_shape() {
        let alert = EmergencyAlertCreate {
            user_id: "u1".to_string(),
            user_name: "Asha".to_string(),
            user_phone: "9876543210".to_string(),
            location: Location {
                lat: 30.0,
                lng: 76.0,
            },
            alert_type: AlertType::Medical,
            description: None,
        };
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["location"]["lat"], 30.0);
        assert_eq!(json["alert_type"], "medical");
        assert!(json.get("description").is_none());
    }
}
