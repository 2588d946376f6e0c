//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::care::{AlertType, ConsultationType};
use crate::profile::{Language, Role};
use crate::record::RecordType;

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Register command arguments.
#[derive(Debug, Args)]
pub struct RegisterCommand {
    /// Full name
    #[arg(long)]
    pub name: String,

    /// Phone number (10-13 digits, optional leading +)
    #[arg(long)]
    pub phone: String,

    /// Home village
    #[arg(long)]
    pub village: String,

    /// Preferred language
    #[arg(short, long, value_enum, default_value = "en")]
    pub language: LanguageArg,

    /// Role in the health system
    #[arg(short, long, value_enum, default_value = "patient")]
    pub role: RoleArg,

    /// Phone number to call in an emergency
    #[arg(long)]
    pub emergency_contact: Option<String>,
}

/// Profile commands.
#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    /// Show the registered profile
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Forget the registered profile (queued records are kept)
    Clear,
}

/// Health record commands.
#[derive(Debug, Subcommand)]
pub enum RecordsCommand {
    /// List synced and offline records
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Add a record (queued, then synced if online)
    Add(AddRecordArgs),
}

/// Arguments for `records add`.
#[derive(Debug, Args)]
pub struct AddRecordArgs {
    /// Record type
    #[arg(short = 't', long = "type", value_enum, default_value = "consultation")]
    pub record_type: RecordTypeArg,

    /// Short heading
    #[arg(long)]
    pub title: String,

    /// Free-text body
    #[arg(short, long, default_value = "")]
    pub description: String,

    /// Attending doctor
    #[arg(long)]
    pub doctor: Option<String>,

    /// Medication as NAME or NAME:DOSAGE (repeatable)
    #[arg(short, long = "medication")]
    pub medications: Vec<String>,
}

/// Triage command arguments.
#[derive(Debug, Args)]
pub struct TriageCommand {
    /// Symptoms, e.g. "fever" "body ache"
    #[arg(required = true)]
    pub symptoms: Vec<String>,

    /// Additional notes
    #[arg(short, long, default_value = "")]
    pub notes: String,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Pharmacy commands.
#[derive(Debug, Subcommand)]
pub enum PharmacyCommand {
    /// List pharmacies and their stock
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Check whether a medicine is in stock
    Check {
        /// Medicine name
        medicine: String,

        /// Only check this pharmacy
        #[arg(short, long)]
        pharmacy: Option<String>,
    },

    /// Book medicines for pickup
    Book {
        /// Pharmacy id
        #[arg(short, long)]
        pharmacy: String,

        /// Medicine as NAME or NAME:QUANTITY (repeatable)
        #[arg(required = true)]
        items: Vec<String>,
    },
}

/// Directory commands.
#[derive(Debug, Subcommand)]
pub enum DirectoryCommand {
    /// List doctors
    Doctors,

    /// List hospitals
    Hospitals,
}

/// Consultation command arguments.
#[derive(Debug, Args)]
pub struct ConsultCommand {
    /// Doctor name
    #[arg(short, long)]
    pub doctor: String,

    /// What the patient reports
    #[arg(short, long)]
    pub symptoms: String,

    /// Appointment time (RFC 3339); defaults to now
    #[arg(long)]
    pub at: Option<String>,

    /// Call type
    #[arg(short = 't', long = "type", value_enum, default_value = "video")]
    pub consultation_type: ConsultationTypeArg,
}

/// Emergency command arguments.
#[derive(Debug, Args)]
pub struct EmergencyCommand {
    /// Latitude of the emergency
    #[arg(long, allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude of the emergency
    #[arg(long, allow_hyphen_values = true)]
    pub lng: Option<f64>,

    /// Report an accident rather than a medical emergency
    #[arg(long)]
    pub accident: bool,

    /// Free-text description
    #[arg(short, long)]
    pub description: Option<String>,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Record type argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RecordTypeArg {
    /// Consultation notes
    Consultation,
    /// Prescription
    Prescription,
    /// Test result
    TestResult,
    /// Vital signs
    Vitals,
}

impl From<RecordTypeArg> for RecordType {
    fn from(arg: RecordTypeArg) -> Self {
        match arg {
            RecordTypeArg::Consultation => Self::Consultation,
            RecordTypeArg::Prescription => Self::Prescription,
            RecordTypeArg::TestResult => Self::TestResult,
            RecordTypeArg::Vitals => Self::Vitals,
        }
    }
}

/// Language argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LanguageArg {
    /// English
    En,
    /// Hindi
    Hi,
    /// Punjabi
    Pa,
    /// Bengali
    Bn,
    /// Telugu
    Te,
    /// Marathi
    Mr,
    /// Tamil
    Ta,
    /// Gujarati
    Gu,
    /// Kannada
    Kn,
    /// Malayalam
    Ml,
}

impl From<LanguageArg> for Language {
    fn from(arg: LanguageArg) -> Self {
        match arg {
            LanguageArg::En => Self::En,
            LanguageArg::Hi => Self::Hi,
            LanguageArg::Pa => Self::Pa,
            LanguageArg::Bn => Self::Bn,
            LanguageArg::Te => Self::Te,
            LanguageArg::Mr => Self::Mr,
            LanguageArg::Ta => Self::Ta,
            LanguageArg::Gu => Self::Gu,
            LanguageArg::Kn => Self::Kn,
            LanguageArg::Ml => Self::Ml,
        }
    }
}

/// Role argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    /// Patient
    Patient,
    /// Community health worker
    Asha,
    /// Doctor
    Doctor,
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::Patient => Self::Patient,
            RoleArg::Asha => Self::Asha,
            RoleArg::Doctor => Self::Doctor,
        }
    }
}

/// Consultation type argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConsultationTypeArg {
    /// Video call
    Video,
    /// Voice only
    Audio,
    /// Text chat
    Chat,
}

impl From<ConsultationTypeArg> for ConsultationType {
    fn from(arg: ConsultationTypeArg) -> Self {
        match arg {
            ConsultationTypeArg::Video => Self::Video,
            ConsultationTypeArg::Audio => Self::Audio,
            ConsultationTypeArg::Chat => Self::Chat,
        }
    }
}

impl EmergencyCommand {
    /// The alert type selected by `--accident`.
    #[must_use]
    pub fn alert_type(&self) -> AlertType {
        if self.accident {
            AlertType::Accident
        } else {
            AlertType::Medical
        }
    }
}

/// Split `NAME:VALUE`; a missing value yields `None`.
#[must_use]
pub fn split_pair(raw: &str) -> (&str, Option<&str>) {
    match raw.split_once(':') {
        Some((name, value)) => (name.trim(), Some(value.trim())),
        None => (raw.trim(), None),
    }
}
