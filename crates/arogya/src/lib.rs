//! `arogya` - offline-first core of a rural healthcare client
//!
//! Health records created without connectivity are queued on the device and
//! flushed to the backend when the network returns. The crate also carries a
//! rule-based symptom triage classifier, the pharmacy catalog and cart, and a
//! small doctor/hospital directory.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod api;
pub mod app;
pub mod capability;
pub mod care;
pub mod cli;
pub mod config;
pub mod connectivity;
pub mod directory;
pub mod error;
pub mod logging;
pub mod merge;
pub mod pharmacy;
pub mod profile;
pub mod queue;
pub mod record;
pub mod storage;
pub mod timestamp;
pub mod triage;

pub use api::{ApiError, HttpApi, RecordSink, RecordSource, RemoteApi};
pub use app::AppState;
pub use config::Config;
pub use connectivity::{ConnectivityEvent, ConnectivityMonitor, ConnectivityState};
pub use error::{Error, Result};
pub use logging::init_logging;
pub use merge::{merge, RecordView};
pub use queue::{FlushOutcome, SyncQueue};
pub use record::{HealthRecord, Medication, RecordType};
pub use storage::{KeyValueStore, MemoryStore, SqliteStore};
pub use triage::{classify, Assessment, Severity, TriageReport, TriageSource};
