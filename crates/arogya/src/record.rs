//! Health record types.
//!
//! A [`HealthRecord`] is either fetched from the remote API (carrying a
//! server-assigned `id` and `is_synced = true`) or created on the device and
//! parked in the [`SyncQueue`](crate::queue::SyncQueue) until a flush succeeds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of event a record documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    /// Notes from a consultation with a doctor.
    #[default]
    Consultation,
    /// A prescription issued to the patient.
    Prescription,
    /// A laboratory or diagnostic result.
    TestResult,
    /// Vital signs taken during a visit.
    Vitals,
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Consultation => write!(f, "consultation"),
            Self::Prescription => write!(f, "prescription"),
            Self::TestResult => write!(f, "test_result"),
            Self::Vitals => write!(f, "vitals"),
        }
    }
}

/// A prescribed medication and how to take it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medication {
    /// Medicine name.
    pub name: String,
    /// Dosage instructions, e.g. "500mg twice daily".
    #[serde(default)]
    pub dosage: String,
}

impl Medication {
    /// Create a medication entry.
    #[must_use]
    pub fn new(name: impl Into<String>, dosage: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dosage: dosage.into(),
        }
    }
}

/// A single entry in a patient's health history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthRecord {
    /// Server-assigned identifier, present only once the record has synced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// The patient this record belongs to.
    #[serde(default)]
    pub user_id: String,

    /// What kind of record this is.
    #[serde(rename = "type", default)]
    pub record_type: RecordType,

    /// Short heading shown in the records list.
    pub title: String,

    /// Free-text body.
    #[serde(default)]
    pub description: String,

    /// Attending doctor, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_name: Option<String>,

    /// Medications in the order they were prescribed.
    #[serde(default)]
    pub medications: Vec<Medication>,

    /// References to attached documents.
    #[serde(default)]
    pub attachments: Vec<String>,

    /// When the record was created.
    #[serde(deserialize_with = "crate::timestamp::deserialize")]
    pub date: DateTime<Utc>,

    /// Whether this copy came from the server.
    #[serde(default)]
    pub is_synced: bool,

    /// Locally generated token assigned when the record was queued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offline_id: Option<String>,
}

impl HealthRecord {
    /// Create a new, unsynced record dated now.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        record_type: RecordType,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            user_id: user_id.into(),
            record_type,
            title: title.into(),
            description: description.into(),
            doctor_name: None,
            medications: Vec::new(),
            attachments: Vec::new(),
            date: Utc::now(),
            is_synced: false,
            offline_id: None,
        }
    }

    /// Set the attending doctor.
    #[must_use]
    pub fn with_doctor(mut self, doctor_name: impl Into<String>) -> Self {
        self.doctor_name = Some(doctor_name.into());
        self
    }

    /// Append a medication.
    #[must_use]
    pub fn with_medication(mut self, medication: Medication) -> Self {
        self.medications.push(medication);
        self
    }

    /// Set the record date.
    #[must_use]
    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }

    /// Whether the record is still waiting to reach the server.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.id.is_none() || !self.is_synced
    }

    /// Label shown next to the record in the list view.
    #[must_use]
    pub fn provenance(&self) -> &'static str {
        if self.is_synced {
            "Synced"
        } else {
            "Offline"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_type_display() {
        assert_eq!(RecordType::Consultation.to_string(), "consultation");
        assert_eq!(RecordType::TestResult.to_string(), "test_result");
        assert_eq!(RecordType::Vitals.to_string(), "vitals");
    }

    #[test]
    fn test_new_record_is_pending() {
        let record = HealthRecord::new("u1", RecordType::Consultation, "Checkup", "All fine");
        assert!(record.id.is_none());
        assert!(record.offline_id.is_none());
        assert!(!record.is_synced);
        assert!(record.is_pending());
        assert_eq!(record.provenance(), "Offline");
    }

    #[test]
    fn test_builder_helpers() {
        let record = HealthRecord::new("u1", RecordType::Prescription, "Fever", "")
            .with_doctor("Dr. Priya Sharma")
            .with_medication(Medication::new("paracetamol", "500mg"))
            .with_medication(Medication::new("ors", "1 sachet"));

        assert_eq!(record.doctor_name.as_deref(), Some("Dr. Priya Sharma"));
        assert_eq!(record.medications.len(), 2);
        assert_eq!(record.medications[1].name, "ors");
    }

    #[test]
    fn test_server_payload_deserializes() {
        let json = r#"{
            "id": "5f1c",
            "user_id": "u1",
            "type": "test_result",
            "title": "Blood sugar",
            "description": "Fasting 92 mg/dL",
            "doctor_name": null,
            "medications": [{"name": "metformin"}],
            "attachments": [],
            "date": "2025-03-01T10:00:00+00:00",
            "is_synced": true,
            "offline_id": null
        }"#;
        let record: HealthRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.id.as_deref(), Some("5f1c"));
        assert_eq!(record.record_type, RecordType::TestResult);
        assert_eq!(record.medications[0].dosage, "");
        assert!(record.is_synced);
        assert!(!record.is_pending());
        assert_eq!(record.provenance(), "Synced");
    }

    #[test]
    fn test_offsetless_server_date_reads_as_utc() {
        let json = r#"[{
            "id": "5f1d",
            "user_id": "u1",
            "type": "vitals",
            "title": "BP",
            "date": "2025-03-01T10:00:00.123000",
            "is_synced": true
        }]"#;
        let records: Vec<HealthRecord> = serde_json::from_str(json).unwrap();

        let expected = "2025-03-01T10:00:00.123Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(records[0].date, expected);

        let merged = crate::merge::merge_fetched(Ok(records), &[]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id.as_deref(), Some("5f1d"));
    }

    #[test]
    fn test_queued_record_survives_persistence() {
        let record = HealthRecord::new("u1", RecordType::Vitals, "Pulse", "72");
        let json = serde_json::to_string(&record).unwrap();
        let back: HealthRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_pending_record_omits_empty_ids() {
        let record = HealthRecord::new("u1", RecordType::Vitals, "BP", "120/80");
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("\"id\""));
        assert!(!json.contains("offline_id"));
        assert!(json.contains("\"type\":\"vitals\""));
    }
}
