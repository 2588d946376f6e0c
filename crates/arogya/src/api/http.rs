//! `reqwest`-backed implementation of the remote API traits.

use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::care::{Consultation, ConsultationCreate, EmergencyAlert, EmergencyAlertCreate};
use crate::config::ApiConfig;
use crate::pharmacy::{MedicineRequest, MedicineRequestCreate, Pharmacy};
use crate::profile::{UserCreate, UserProfile};
use crate::record::HealthRecord;
use crate::triage::{Assessment, SymptomCheckCreate};

use super::{ApiError, ApiResult, ClinicApi, RecordSink, RecordSource, SyncReceipt};

/// HTTP client for the backend's `/api` routes.
#[derive(Debug, Clone)]
pub struct HttpApi {
    base_url: String,
    client: Client,
    auth_token: Option<String>,
}

impl HttpApi {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Client`] if the TLS backend cannot be initialized.
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
            client,
            auth_token: config.auth_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{path}", self.base_url)
    }

    /// `path` followed by one caller-supplied segment, percent-encoded.
    fn url_with_segment(&self, path: &str, segment: &str) -> ApiResult<Url> {
        let mut url = Url::parse(&self.url(path))
            .map_err(|e| ApiError::Client(format!("invalid base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| ApiError::Client("base URL cannot carry a path".to_string()))?
            .push(segment);
        Ok(url)
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder, endpoint: &str) -> ApiResult<T> {
        let response = self
            .authorized(req)
            .send()
            .await
            .map_err(|e| transport_error(endpoint, &e))?;

        let status = response.status();
        debug!(endpoint, status = status.as_u16(), "API response");
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                endpoint: endpoint.to_string(),
            });
        }

        response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout {
                    endpoint: endpoint.to_string(),
                }
            } else {
                ApiError::Decode {
                    endpoint: endpoint.to_string(),
                    message: e.to_string(),
                }
            }
        })
    }
}

fn transport_error(endpoint: &str, err: &reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout {
            endpoint: endpoint.to_string(),
        }
    } else {
        ApiError::Transport {
            endpoint: endpoint.to_string(),
            message: err.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl RecordSink for HttpApi {
    async fn submit_batch(&self, records: &[HealthRecord]) -> ApiResult<SyncReceipt> {
        let endpoint = "/health-records/sync";
        let req = self.client.post(self.url(endpoint)).json(records);
        self.send(req, endpoint).await
    }
}

#[async_trait::async_trait]
impl RecordSource for HttpApi {
    async fn fetch_records(&self, user_id: &str) -> ApiResult<Vec<HealthRecord>> {
        let endpoint = "/health-records";
        let req = self.client.get(self.url_with_segment(endpoint, user_id)?);
        self.send(req, endpoint).await
    }
}

#[async_trait::async_trait]
impl ClinicApi for HttpApi {
    async fn register_user(&self, user: &UserCreate) -> ApiResult<UserProfile> {
        let endpoint = "/users";
        let req = self.client.post(self.url(endpoint)).json(user);
        self.send(req, endpoint).await
    }

    async fn list_pharmacies(&self) -> ApiResult<Vec<Pharmacy>> {
        let endpoint = "/pharmacies";
        let req = self.client.get(self.url(endpoint));
        self.send(req, endpoint).await
    }

    async fn book_medicines(
        &self,
        request: &MedicineRequestCreate,
    ) -> ApiResult<MedicineRequest> {
        let endpoint = "/medicine-requests";
        let req = self.client.post(self.url(endpoint)).json(request);
        self.send(req, endpoint).await
    }

    async fn book_consultation(&self, request: &ConsultationCreate) -> ApiResult<Consultation> {
        let endpoint = "/consultations";
        let req = self.client.post(self.url(endpoint)).json(request);
        self.send(req, endpoint).await
    }

    async fn send_emergency_alert(
        &self,
        alert: &EmergencyAlertCreate,
    ) -> ApiResult<EmergencyAlert> {
        let endpoint = "/emergency-alert";
        let req = self.client.post(self.url(endpoint)).json(alert);
        self.send(req, endpoint).await
    }

    async fn check_symptoms(&self, request: &SymptomCheckCreate) -> ApiResult<Assessment> {
        let endpoint = "/symptom-check";
        let req = self.client.post(self.url(endpoint)).json(request);
        self.send(req, endpoint).await
    }
}
