//! Application state.
//!
//! [`AppState`] owns everything a session needs: the chosen language, the
//! registered user, the sync queue, the connectivity monitor and the handles
//! to the backend and host capabilities. Operations take `&self` or
//! `&mut self` explicitly instead of reaching for shared globals.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::api::RemoteApi;
use crate::capability::{FixedLocation, LocationProvider, SpeechAnnouncer, TracingAnnouncer};
use crate::care::{
    self, AlertOutcome, AlertType, ConsultationCreate, ConsultationOutcome, ConsultationType,
};
use crate::connectivity::{ConnectivityEvent, ConnectivityMonitor, ConnectivityState};
use crate::error::{Error, Result};
use crate::merge::RecordView;
use crate::pharmacy::{self, BookingOutcome, Cart, Pharmacy};
use crate::profile::{self, Language, UserCreate, UserProfile};
use crate::queue::{self, FlushOutcome, SyncQueue};
use crate::record::HealthRecord;
use crate::storage::KeyValueStore;
use crate::triage::{self, TriageError, TriageReport};

/// Result of a registration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// The stored profile.
    pub profile: UserProfile,
    /// True if the server was unreachable and the profile was built locally.
    pub offline: bool,
}

/// Per-session application state.
#[derive(Debug)]
pub struct AppState {
    language: Language,
    profile: Option<UserProfile>,
    store: Arc<dyn KeyValueStore>,
    queue: Arc<SyncQueue>,
    monitor: ConnectivityMonitor,
    api: Arc<dyn RemoteApi>,
    locator: Arc<dyn LocationProvider>,
    announcer: Arc<dyn SpeechAnnouncer>,
}

impl AppState {
    /// Restore a session from `store`.
    ///
    /// Loads the saved profile and pending queue. The language comes from the
    /// profile if there is one, otherwise `default_language`.
    #[must_use]
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        api: Arc<dyn RemoteApi>,
        connectivity: ConnectivityState,
        default_language: Language,
    ) -> Self {
        let profile = profile::load_profile(store.as_ref());
        let language = profile.as_ref().map_or(default_language, |p| p.language);
        let queue = Arc::new(SyncQueue::restore(store.clone()));

        Self {
            language,
            profile,
            store,
            queue,
            monitor: ConnectivityMonitor::new(connectivity),
            api,
            locator: Arc::new(FixedLocation::default()),
            announcer: Arc::new(TracingAnnouncer),
        }
    }

    /// Replace the host capabilities.
    #[must_use]
    pub fn with_capabilities(
        mut self,
        locator: Arc<dyn LocationProvider>,
        announcer: Arc<dyn SpeechAnnouncer>,
    ) -> Self {
        self.locator = locator;
        self.announcer = announcer;
        self
    }

    /// Session language.
    #[must_use]
    pub fn language(&self) -> Language {
        self.language
    }

    /// Change the session language.
    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    /// The registered user, if any.
    #[must_use]
    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    /// The pending record queue.
    #[must_use]
    pub fn queue(&self) -> &Arc<SyncQueue> {
        &self.queue
    }

    /// The connectivity monitor.
    #[must_use]
    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.monitor
    }

    /// Feed a host network report in.
    pub fn report_connectivity(&self, online: bool) -> Option<ConnectivityEvent> {
        self.monitor.report(online)
    }

    /// Start the task that flushes the queue on every reconnect.
    #[must_use]
    pub fn spawn_sync_driver(&self) -> JoinHandle<()> {
        queue::spawn_flush_on_reconnect(
            self.queue.clone(),
            self.api.clone(),
            self.monitor.subscribe(),
        )
    }

    fn current_user(&self) -> Result<&UserProfile> {
        self.profile
            .as_ref()
            .ok_or_else(|| Error::invalid_input("user", "register before using this feature"))
    }

    /// Register a user.
    ///
    /// The server's profile is stored when it answers; otherwise a local
    /// profile with a timestamp id is stored and `offline` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the form is invalid or the profile cannot be
    /// persisted.
    pub async fn register(&mut self, form: UserCreate) -> Result<Registration> {
        let form = form.validated()?;

        let (profile, offline) = match self.api.register_user(&form).await {
            Ok(profile) => (profile, false),
            Err(e) => {
                warn!("Registration saved offline: {e}");
                let id = Utc::now().timestamp_millis().to_string();
                (form.into_offline_profile(id), true)
            }
        };

        profile::save_profile(self.store.as_ref(), &profile)?;
        info!(user_id = %profile.id, offline, "User registered");
        self.language = profile.language;
        self.profile = Some(profile.clone());
        Ok(Registration { profile, offline })
    }

    /// Forget the registered user. Queued records are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn logout(&mut self) -> Result<()> {
        profile::clear_profile(self.store.as_ref())?;
        self.profile = None;
        Ok(())
    }

    /// Save a record for the current user.
    ///
    /// The record is always queued first. When online a flush follows right
    /// away and its outcome is returned; offline it is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if nobody is registered.
    pub async fn add_record(
        &self,
        mut record: HealthRecord,
    ) -> Result<(HealthRecord, Option<FlushOutcome>)> {
        record.user_id.clone_from(&self.current_user()?.id);
        let queued = self.queue.enqueue(record);
        let outcome = if self.monitor.is_online() {
            Some(self.queue.flush(self.api.as_ref()).await)
        } else {
            None
        };
        Ok((queued, outcome))
    }

    /// Flush the queue now, regardless of connectivity.
    pub async fn sync(&self) -> FlushOutcome {
        self.queue.flush(self.api.as_ref()).await
    }

    /// Records for the current user, server copies first.
    ///
    /// # Errors
    ///
    /// Returns an error if nobody is registered.
    pub async fn records(&self) -> Result<RecordView> {
        let user_id = self.current_user()?.id.clone();
        Ok(RecordView::load(self.api.as_ref(), &user_id, &self.queue).await)
    }

    /// Assess symptoms and read the result aloud.
    ///
    /// The server is asked first when someone is registered; any API error
    /// falls back to the on-device rules. The report says which one answered.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::InvalidInput`] if no symptom is given.
    pub async fn triage<S: AsRef<str>>(
        &self,
        symptoms: &[S],
        notes: &str,
    ) -> std::result::Result<TriageReport, TriageError> {
        let user_id = self.profile.as_ref().map(|p| p.id.as_str());
        let report = triage::check_symptoms(self.api.as_ref(), user_id, symptoms, notes).await?;
        self.announcer.announce(&report.assessment.assessment, self.language);
        Ok(report)
    }

    /// Read text aloud in the session language.
    pub fn announce(&self, text: &str) {
        self.announcer.announce(text, self.language);
    }

    /// Pharmacies with stock, falling back to the built-in catalog.
    pub async fn pharmacies(&self) -> Vec<Pharmacy> {
        pharmacy::list_pharmacies(self.api.as_ref()).await
    }

    /// Book the cart at a pharmacy.
    ///
    /// # Errors
    ///
    /// Returns an error if nobody is registered or the cart is empty.
    pub async fn book_medicines(&self, cart: &Cart, pharmacy_id: &str) -> Result<BookingOutcome> {
        let user = self.current_user()?;
        pharmacy::book(self.api.as_ref(), cart, pharmacy_id, user).await
    }

    /// Book a consultation for the current user.
    ///
    /// # Errors
    ///
    /// Returns an error if nobody is registered or the request is blank.
    pub async fn book_consultation(
        &self,
        doctor_name: &str,
        symptoms: &str,
        appointment_time: DateTime<Utc>,
        consultation_type: ConsultationType,
    ) -> Result<ConsultationOutcome> {
        let request = ConsultationCreate {
            patient_id: self.current_user()?.id.clone(),
            doctor_name: doctor_name.trim().to_string(),
            symptoms: symptoms.trim().to_string(),
            appointment_time,
            consultation_type,
        };
        care::book_consultation(self.api.as_ref(), &self.queue, &request).await
    }

    /// Alert emergency responders.
    ///
    /// # Errors
    ///
    /// Returns an error if nobody is registered.
    pub async fn raise_emergency(
        &self,
        alert_type: AlertType,
        description: Option<String>,
    ) -> Result<AlertOutcome> {
        let user = self.current_user()?;
        Ok(care::raise_emergency(
            self.api.as_ref(),
            self.locator.as_ref(),
            user,
            alert_type,
            description,
        )
        .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::FakeApi;
    use crate::capability::Location;
    use crate::profile::Role;
    use crate::record::RecordType;
    use crate::storage::MemoryStore;
    use crate::triage::{Severity, TriageSource};
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct RecordingAnnouncer(Mutex<Vec<(String, Language)>>);

    impl SpeechAnnouncer for RecordingAnnouncer {
        fn announce(&self, text: &str, language: Language) {
            self.0.lock().unwrap().push((text.to_string(), language));
        }
    }

    fn form() -> UserCreate {
        UserCreate {
            name: "Sunita Devi".to_string(),
            phone: "+91 98140 12345".to_string(),
            village: "Kharar".to_string(),
            language: Language::Hi,
            role: Role::Asha,
            emergency_contact: None,
        }
    }

    fn state(online: bool) -> (AppState, Arc<FakeApi>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let api = Arc::new(FakeApi::new(online));
        let state = AppState::new(
            store.clone(),
            api.clone(),
            ConnectivityState::from_online(online),
            Language::En,
        );
        (state, api, store)
    }

    #[tokio::test]
    async fn test_register_online() {
        let (mut app, _api, store) = state(true);
        let registration = app.register(form()).await.unwrap();

        assert!(!registration.offline);
        assert_eq!(registration.profile.id, "user-1");
        assert_eq!(app.language(), Language::Hi);
        assert_eq!(profile::load_profile(store.as_ref()), Some(registration.profile));
    }

    #[tokio::test]
    async fn test_register_offline_fallback() {
        let (mut app, _api, store) = state(false);
        let registration = app.register(form()).await.unwrap();

        assert!(registration.offline);
        assert!(registration.profile.id.parse::<i64>().is_ok());
        assert_eq!(registration.profile.phone, "+919814012345");
        assert!(profile::load_profile(store.as_ref()).is_some());
    }

    #[tokio::test]
    async fn test_register_rejects_bad_phone() {
        let (mut app, _api, _store) = state(true);
        let mut bad = form();
        bad.phone = "12".to_string();
        assert!(app.register(bad).await.is_err());
        assert!(app.profile().is_none());
    }

    #[tokio::test]
    async fn test_session_restores_profile_language() {
        let (mut app, api, store) = state(true);
        app.register(form()).await.unwrap();

        let restored = AppState::new(store, api, ConnectivityState::Online, Language::En);
        assert_eq!(restored.language(), Language::Hi);
        assert!(restored.profile().is_some());
    }

    #[tokio::test]
    async fn test_logout_keeps_queue() {
        let (mut app, _api, store) = state(false);
        app.register(form()).await.unwrap();
        app.add_record(HealthRecord::new("", RecordType::Vitals, "BP", "130/85"))
            .await
            .unwrap();

        app.logout().unwrap();
        assert!(app.profile().is_none());
        assert!(profile::load_profile(store.as_ref()).is_none());
        assert_eq!(app.queue().len(), 1);
    }

    #[tokio::test]
    async fn test_operations_require_registration() {
        let (app, _api, _store) = state(true);
        assert!(app.records().await.is_err());
        assert!(app
            .add_record(HealthRecord::new("", RecordType::Vitals, "BP", ""))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_offline_record_then_reconnect() {
        let (mut app, api, _store) = state(false);
        app.register(form()).await.unwrap();
        let driver = app.spawn_sync_driver();

        let (queued, outcome) = app
            .add_record(HealthRecord::new("", RecordType::Consultation, "Checkup", ""))
            .await
            .unwrap();
        assert!(outcome.is_none());
        assert_eq!(queued.user_id, app.profile().unwrap().id);

        let view = app.records().await.unwrap();
        assert_eq!(view.pending, 1);
        assert_eq!(view.records[0].provenance(), "Offline");

        api.set_online(true);
        app.report_connectivity(true);
        while !app.queue().is_empty() {
            tokio::task::yield_now().await;
        }
        assert_eq!(api.batches.load(Ordering::SeqCst), 1);

        let view = app.records().await.unwrap();
        assert_eq!(view.pending, 0);
        assert!(view.records[0].is_synced);

        drop(app);
        driver.await.unwrap();
    }

    #[tokio::test]
    async fn test_online_record_flushes_immediately() {
        let (mut app, api, _store) = state(true);
        app.register(form()).await.unwrap();

        let (_, outcome) = app
            .add_record(HealthRecord::new("", RecordType::Prescription, "Rx", ""))
            .await
            .unwrap();
        assert!(matches!(outcome, Some(FlushOutcome::Flushed { count: 1 })));
        assert!(app.queue().is_empty());
        assert_eq!(api.server_records.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_triage_announces_in_session_language() {
        let announcer = Arc::new(RecordingAnnouncer::default());
        let (mut app, _api, _store) = state(true);
        app = app.with_capabilities(Arc::new(FixedLocation::default()), announcer.clone());
        app.set_language(Language::Pa);

        let report = app.triage(&["Chest pain"], "").await.unwrap();
        assert_eq!(report.source, TriageSource::Local);
        assert_eq!(report.assessment.severity, Severity::Emergency);

        let spoken = announcer.0.lock().unwrap();
        assert_eq!(spoken.len(), 1);
        assert_eq!(spoken[0].1, Language::Pa);
    }

    #[tokio::test]
    async fn test_triage_asks_server_for_registered_user() {
        let (mut app, api, _store) = state(true);
        app.register(form()).await.unwrap();

        let report = app.triage(&["Cough"], "").await.unwrap();
        assert_eq!(report.source, TriageSource::Remote);
        assert_eq!(api.symptom_checks.lock().unwrap()[0].user_id, "user-1");

        api.set_online(false);
        let report = app.triage(&["Cough"], "").await.unwrap();
        assert_eq!(report.source, TriageSource::Local);
        assert_eq!(report.assessment.severity, Severity::Low);
    }

    #[tokio::test]
    async fn test_pharmacies_fallback() {
        let (app, api, _store) = state(true);
        assert_eq!(app.pharmacies().await[0].id, "remote-1");

        api.set_online(false);
        assert_eq!(app.pharmacies().await[0].id, "1");
    }

    #[tokio::test]
    async fn test_book_medicines() {
        let (mut app, api, _store) = state(true);
        app.register(form()).await.unwrap();

        assert!(app.book_medicines(&Cart::new(), "1").await.is_err());

        let mut cart = Cart::new();
        cart.set_quantity("paracetamol", 2, 10.0);
        assert!(matches!(
            app.book_medicines(&cart, "1").await.unwrap(),
            BookingOutcome::Confirmed(_)
        ));

        api.set_online(false);
        assert_eq!(
            app.book_medicines(&cart, "1").await.unwrap(),
            BookingOutcome::Offline
        );
    }

    #[tokio::test]
    async fn test_consultation_queued_when_offline() {
        let (mut app, api, _store) = state(true);
        app.register(form()).await.unwrap();
        api.set_online(false);

        let outcome = app
            .book_consultation(
                "Dr. Rajesh Kumar",
                "Fever for three days",
                Utc::now(),
                ConsultationType::Audio,
            )
            .await
            .unwrap();

        let ConsultationOutcome::Queued(record) = outcome else {
            panic!("expected queued consultation");
        };
        assert_eq!(record.record_type, RecordType::Consultation);
        assert_eq!(app.queue().len(), 1);
    }

    #[tokio::test]
    async fn test_consultation_booked_online() {
        let (mut app, _api, _store) = state(true);
        app.register(form()).await.unwrap();

        let outcome = app
            .book_consultation("Dr. Priya Sharma", "Cough", Utc::now(), ConsultationType::Video)
            .await
            .unwrap();
        assert!(matches!(outcome, ConsultationOutcome::Booked(_)));
        assert!(app.queue().is_empty());
    }

    #[tokio::test]
    async fn test_emergency_outcomes() {
        let (mut app, api, _store) = state(true);
        app.register(form()).await.unwrap();

        assert_eq!(
            app.raise_emergency(AlertType::Medical, None).await.unwrap(),
            AlertOutcome::NoLocation
        );

        let here = Location {
            lat: 30.74,
            lng: 76.64,
        };
        app = app.with_capabilities(Arc::new(FixedLocation(Some(here))), Arc::new(TracingAnnouncer));
        assert!(matches!(
            app.raise_emergency(AlertType::Accident, None).await.unwrap(),
            AlertOutcome::Sent(_)
        ));

        api.set_online(false);
        assert_eq!(
            app.raise_emergency(AlertType::Medical, None).await.unwrap(),
            AlertOutcome::Offline
        );
        assert!(app.queue().is_empty());
    }
}
