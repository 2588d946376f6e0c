//! User profile, role and language types.
//!
//! The profile is owned by the device session: it is written once when the
//! user registers (from the server's response, or built locally if the server
//! is unreachable) and read back once at startup.

use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::storage::{read_json, write_json, KeyValueStore, USER_PROFILE_KEY};

/// Languages the client can present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English.
    #[default]
    En,
    /// Hindi.
    Hi,
    /// Punjabi.
    Pa,
    /// Bengali.
    Bn,
    /// Telugu.
    Te,
    /// Marathi.
    Mr,
    /// Tamil.
    Ta,
    /// Gujarati.
    Gu,
    /// Kannada.
    Kn,
    /// Malayalam.
    Ml,
}

impl Language {
    /// Every supported language, in menu order.
    pub const ALL: [Language; 10] = [
        Self::En,
        Self::Hi,
        Self::Pa,
        Self::Bn,
        Self::Te,
        Self::Mr,
        Self::Ta,
        Self::Gu,
        Self::Kn,
        Self::Ml,
    ];

    /// Two-letter ISO 639-1 code.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Hi => "hi",
            Self::Pa => "pa",
            Self::Bn => "bn",
            Self::Te => "te",
            Self::Mr => "mr",
            Self::Ta => "ta",
            Self::Gu => "gu",
            Self::Kn => "kn",
            Self::Ml => "ml",
        }
    }

    /// Name in English.
    #[must_use]
    pub fn english_name(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Hi => "Hindi",
            Self::Pa => "Punjabi",
            Self::Bn => "Bengali",
            Self::Te => "Telugu",
            Self::Mr => "Marathi",
            Self::Ta => "Tamil",
            Self::Gu => "Gujarati",
            Self::Kn => "Kannada",
            Self::Ml => "Malayalam",
        }
    }

    /// Name in the language itself.
    #[must_use]
    pub fn native_name(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Hi => "हिंदी",
            Self::Pa => "ਪੰਜਾਬੀ",
            Self::Bn => "বাংলা",
            Self::Te => "తెలుగు",
            Self::Mr => "मराठी",
            Self::Ta => "தமிழ்",
            Self::Gu => "ગુજરાતી",
            Self::Kn => "ಕನ್ನಡ",
            Self::Ml => "മലയാളം",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let code = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|lang| lang.code() == code)
            .ok_or_else(|| Error::invalid_input("language", format!("unsupported code '{s}'")))
    }
}

/// What the user does in the health system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A patient managing their own records.
    #[default]
    Patient,
    /// An Accredited Social Health Activist (community health worker).
    Asha,
    /// A doctor.
    Doctor,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Patient => write!(f, "patient"),
            Self::Asha => write!(f, "asha"),
            Self::Doctor => write!(f, "doctor"),
        }
    }
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Server-assigned id, or a timestamp-derived id for offline registrations.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Contact phone number.
    pub phone: String,
    /// Home village.
    pub village: String,
    /// Role in the health system.
    #[serde(default)]
    pub role: Role,
    /// Preferred language.
    #[serde(default)]
    pub language: Language,
    /// Phone number to call in an emergency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<String>,
    /// When the server created the account.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::timestamp::option::deserialize"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

/// Registration form contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCreate {
    /// Display name.
    pub name: String,
    /// Contact phone number.
    pub phone: String,
    /// Home village.
    pub village: String,
    /// Preferred language.
    #[serde(default)]
    pub language: Language,
    /// Role in the health system.
    #[serde(default)]
    pub role: Role,
    /// Phone number to call in an emergency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<String>,
}

fn phone_pattern() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| Regex::new(r"^\+?[0-9]{10,13}$").expect("phone pattern is valid"))
}

/// Strip spaces and dashes and check the result looks like a phone number.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the number is not 10 to 13 digits with
/// an optional leading `+`.
pub fn normalize_phone(raw: &str) -> Result<String> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    if phone_pattern().is_match(&compact) {
        Ok(compact)
    } else {
        Err(Error::invalid_input(
            "phone",
            "must contain 10 to 13 digits with an optional leading '+'",
        ))
    }
}

impl UserCreate {
    /// Check and normalize the form before it is sent anywhere.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] naming the first bad field.
    pub fn validated(mut self) -> Result<Self> {
        self.name = self.name.trim().to_string();
        self.village = self.village.trim().to_string();
        if self.name.is_empty() {
            return Err(Error::invalid_input("name", "must not be empty"));
        }
        if self.village.is_empty() {
            return Err(Error::invalid_input("village", "must not be empty"));
        }
        self.phone = normalize_phone(&self.phone)?;
        if let Some(contact) = self.emergency_contact.take() {
            if !contact.trim().is_empty() {
                self.emergency_contact = Some(normalize_phone(&contact)?);
            }
        }
        Ok(self)
    }

    /// Build a profile locally when the server can't be reached.
    #[must_use]
    pub fn into_offline_profile(self, id: String) -> UserProfile {
        UserProfile {
            id,
            name: self.name,
            phone: self.phone,
            village: self.village,
            role: self.role,
            language: self.language,
            emergency_contact: self.emergency_contact,
            created_at: None,
        }
    }
}

/// Load the stored profile.
///
/// A missing or unreadable profile yields `None`; corrupt data is logged and
/// otherwise ignored so the user is simply asked to register again.
#[must_use]
pub fn load_profile(store: &dyn KeyValueStore) -> Option<UserProfile> {
    match read_json(store, USER_PROFILE_KEY) {
        Ok(profile) => profile,
        Err(e) => {
            warn!("Ignoring stored profile: {e}");
            None
        }
    }
}

/// Persist the profile.
///
/// # Errors
///
/// Returns an error if the store write fails.
pub fn save_profile(store: &dyn KeyValueStore, profile: &UserProfile) -> Result<()> {
    write_json(store, USER_PROFILE_KEY, profile)
}

/// Forget the stored profile.
///
/// # Errors
///
/// Returns an error if the store write fails.
pub fn clear_profile(store: &dyn KeyValueStore) -> Result<()> {
    store.remove(USER_PROFILE_KEY)
}
