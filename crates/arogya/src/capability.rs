//! Host capabilities the core depends on but does not implement.
//!
//! A phone shell supplies GPS and text-to-speech; the CLI and tests use the
//! simple implementations here.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::profile::Language;

/// A latitude/longitude fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Degrees north.
    pub lat: f64,
    /// Degrees east.
    pub lng: f64,
}

/// Source of the device position.
#[async_trait::async_trait]
pub trait LocationProvider: Send + Sync + std::fmt::Debug {
    /// Current position, or `None` if no fix is available.
    async fn current_location(&self) -> Option<Location>;
}

/// Reads text aloud.
pub trait SpeechAnnouncer: Send + Sync + std::fmt::Debug {
    /// Speak `text` in `language`.
    fn announce(&self, text: &str, language: Language);
}

/// Always reports the same position, or none.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedLocation(pub Option<Location>);

#[async_trait::async_trait]
impl LocationProvider for FixedLocation {
    async fn current_location(&self) -> Option<Location> {
        self.0
    }
}

/// "Speaks" by logging at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAnnouncer;

impl SpeechAnnouncer for TracingAnnouncer {
    fn announce(&self, text: &str, language: Language) {
        info!(locale = speech_locale(language), "{text}");
    }
}

/// BCP 47 voice locale for a language. Voices outside Hindi and Punjabi fall
/// back to Indian English.
#[must_use]
pub fn speech_locale(language: Language) -> &'static str {
    match language {
        Language::Hi => "hi-IN",
        Language::Pa => "pa-IN",
        _ => "en-IN",
    }
}
