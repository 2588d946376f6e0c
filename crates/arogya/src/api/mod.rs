//! Remote API abstraction.
//!
//! The core never talks HTTP directly. It depends on the narrow traits in this
//! module so the sync queue and record view can be driven by an in-process
//! fake in tests and by [`HttpApi`] on a device.

mod http;
#[cfg(test)]
pub(crate) mod testing;

pub use http::HttpApi;

use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::care::{Consultation, ConsultationCreate, EmergencyAlert, EmergencyAlertCreate};
use crate::pharmacy::{MedicineRequest, MedicineRequestCreate, Pharmacy};
use crate::profile::{UserCreate, UserProfile};
use crate::record::HealthRecord;
use crate::triage::{Assessment, SymptomCheckCreate};

/// Errors from a remote call.
///
/// Every variant is transient from the client's point of view: the caller
/// falls back to local state rather than surfacing a fault.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never got a response.
    #[error("request to {endpoint} failed: {message}")]
    Transport {
        /// Endpoint path, e.g. `/health-records/sync`.
        endpoint: String,
        /// Underlying transport error.
        message: String,
    },

    /// The server answered with a non-success status.
    #[error("{endpoint} returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Endpoint path.
        endpoint: String,
    },

    /// The response body was not what we expected.
    #[error("malformed response from {endpoint}: {message}")]
    Decode {
        /// Endpoint path.
        endpoint: String,
        /// Decoder error.
        message: String,
    },

    /// The request timed out.
    #[error("request to {endpoint} timed out")]
    Timeout {
        /// Endpoint path.
        endpoint: String,
    },

    /// The client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Result type for remote calls.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Server acknowledgement of a record batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReceipt {
    /// How many records the server stored.
    pub synced_count: usize,
    /// The server's canonical copies, when it returns them.
    #[serde(default)]
    pub records: Vec<HealthRecord>,
}

/// Accepts queued records.
#[async_trait::async_trait]
pub trait RecordSink: Send + Sync + Debug {
    /// Submit a whole batch. The server treats it atomically.
    async fn submit_batch(&self, records: &[HealthRecord]) -> ApiResult<SyncReceipt>;
}

/// Supplies a user's synced records.
#[async_trait::async_trait]
pub trait RecordSource: Send + Sync + Debug {
    /// Fetch every record the server holds for `user_id`.
    async fn fetch_records(&self, user_id: &str) -> ApiResult<Vec<HealthRecord>>;
}

/// The rest of the backend surface.
#[async_trait::async_trait]
pub trait ClinicApi: Send + Sync + Debug {
    /// Create a user account.
    async fn register_user(&self, user: &UserCreate) -> ApiResult<UserProfile>;

    /// List known pharmacies and their stock.
    async fn list_pharmacies(&self) -> ApiResult<Vec<Pharmacy>>;

    /// Reserve medicines for pickup.
    async fn book_medicines(&self, request: &MedicineRequestCreate)
        -> ApiResult<MedicineRequest>;

    /// Book a consultation slot.
    async fn book_consultation(&self, request: &ConsultationCreate) -> ApiResult<Consultation>;

    /// Notify responders of an emergency.
    async fn send_emergency_alert(&self, alert: &EmergencyAlertCreate)
        -> ApiResult<EmergencyAlert>;

    /// Ask the server's assessment service about a symptom set.
    async fn check_symptoms(&self, request: &SymptomCheckCreate) -> ApiResult<Assessment>;
}

/// Everything the application needs from the backend.
pub trait RemoteApi: RecordSink + RecordSource + ClinicApi {}

impl<T: RecordSink + RecordSource + ClinicApi + ?Sized> RemoteApi for T {}
