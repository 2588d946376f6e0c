//! Symptom triage.
//!
//! [`check_symptoms`] asks the clinic's assessment service first and falls
//! back to [`classify`], a rule-based pass that runs entirely on the device.
//! Either way the result is a coarse first pass for a community health
//! worker, not a diagnosis.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::api::ClinicApi;

/// Symptoms that always mean "get help now".
pub const EMERGENCY_SYMPTOMS: &[&str] = &[
    "chest pain",
    "difficulty breathing",
    "severe bleeding",
    "unconscious",
];

/// Symptoms that warrant a consultation soon.
pub const MODERATE_SYMPTOMS: &[&str] = &["fever", "headache", "body ache"];

/// The checklist offered to the user.
pub const COMMON_SYMPTOMS: &[&str] = &[
    "Fever",
    "Headache",
    "Cough",
    "Sore throat",
    "Body ache",
    "Stomach pain",
    "Nausea",
    "Dizziness",
    "Chest pain",
    "Difficulty breathing",
];

const BASE_RECOMMENDATIONS: [&str; 2] = [
    "Consult with nearest healthcare provider",
    "Monitor symptoms carefully",
];

/// Triage errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TriageError {
    /// Nothing to classify.
    #[error("invalid triage input: {0}")]
    InvalidInput(String),
}

/// Severity tier, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Self-care is likely enough.
    Low,
    /// See a provider soon.
    Medium,
    /// Seek care immediately. The server's `high` tier lands here too.
    #[serde(alias = "high")]
    Emergency,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::Emergency => write!(f, "emergency"),
        }
    }
}

impl Severity {
    fn summary(self) -> &'static str {
        match self {
            Self::Emergency => {
                "Symptoms indicate a possible emergency. Seek medical help immediately."
            }
            Self::Medium => {
                "Symptoms need attention. Please consult with a healthcare provider."
            }
            Self::Low => "Symptoms appear mild. Please consult with a healthcare provider if they persist.",
        }
    }

    fn final_recommendation(self) -> &'static str {
        match self {
            Self::Emergency => "Go to the nearest hospital or call emergency services now",
            Self::Medium | Self::Low => "Rest and stay hydrated",
        }
    }
}

/// Result of classifying a symptom set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    /// Severity tier.
    pub severity: Severity,
    /// One-line summary for the tier.
    pub assessment: String,
    /// What to do, in order.
    pub recommendations: Vec<String>,
    /// Whether to refer the patient to a provider. [`classify`] always sets it.
    pub referral_needed: bool,
    /// Free text the user entered alongside the checklist.
    #[serde(default)]
    pub notes: String,
}

/// Body of a remote symptom check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymptomCheckCreate {
    /// Who is asking.
    pub user_id: String,
    /// Selected symptom labels.
    pub symptoms: Vec<String>,
    /// Free-text notes, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
}

/// Which classifier produced an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriageSource {
    /// The clinic's assessment service.
    Remote,
    /// The on-device rules in [`classify`].
    Local,
}

/// An assessment and where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriageReport {
    /// The assessment itself.
    #[serde(flatten)]
    pub assessment: Assessment,
    /// Which path produced it.
    pub source: TriageSource,
}

fn matches_any(symptoms: &[String], set: &[&str]) -> bool {
    symptoms.iter().any(|s| set.contains(&s.as_str()))
}

/// Classify a set of symptom labels.
///
/// Matching is case-insensitive and ignores surrounding whitespace. The
/// highest matching tier wins regardless of order.
///
/// # Errors
///
/// Returns [`TriageError::InvalidInput`] if no non-blank symptom is given.
pub fn classify<S: AsRef<str>>(symptoms: &[S], notes: &str) -> Result<Assessment, TriageError> {
    let normalized: Vec<String> = symptoms
        .iter()
        .map(|s| s.as_ref().trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();

    if normalized.is_empty() {
        return Err(TriageError::InvalidInput(
            "at least one symptom is required".to_string(),
        ));
    }

    let severity = if matches_any(&normalized, EMERGENCY_SYMPTOMS) {
        Severity::Emergency
    } else if matches_any(&normalized, MODERATE_SYMPTOMS) {
        Severity::Medium
    } else {
        Severity::Low
    };

    let recommendations = BASE_RECOMMENDATIONS
        .iter()
        .copied()
        .chain(std::iter::once(severity.final_recommendation()))
        .map(str::to_string)
        .collect();

    Ok(Assessment {
        severity,
        assessment: severity.summary().to_string(),
        recommendations,
        referral_needed: true,
        notes: notes.to_string(),
    })
}

/// Assess symptoms remotely, falling back to [`classify`] on any API error.
///
/// Input is validated before the network is touched. Without a `user_id`
/// there is nobody to file the check under, so only the local rules run.
///
/// # Errors
///
/// Returns [`TriageError::InvalidInput`] if no non-blank symptom is given.
pub async fn check_symptoms<A, S>(
    api: &A,
    user_id: Option<&str>,
    symptoms: &[S],
    notes: &str,
) -> Result<TriageReport, TriageError>
where
    A: ClinicApi + ?Sized,
    S: AsRef<str>,
{
    let local = classify(symptoms, notes)?;
    let Some(user_id) = user_id else {
        return Ok(TriageReport {
            assessment: local,
            source: TriageSource::Local,
        });
    };

    let request = SymptomCheckCreate {
        user_id: user_id.to_string(),
        symptoms: symptoms
            .iter()
            .map(|s| s.as_ref().trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        additional_info: Some(notes.trim())
            .filter(|n| !n.is_empty())
            .map(str::to_string),
    };

    match api.check_symptoms(&request).await {
        Ok(mut assessment) => {
            debug!(severity = %assessment.severity, "Remote symptom check");
            assessment.notes = notes.to_string();
            Ok(TriageReport {
                assessment,
                source: TriageSource::Remote,
            })
        }
        Err(e) => {
            warn!("Symptom check unavailable, using on-device rules: {e}");
            Ok(TriageReport {
                assessment: local,
                source: TriageSource::Local,
            })
        }
    }
}
