//! `HttpApi` against a one-shot local HTTP server.

use arogya::api::{ApiError, ClinicApi, HttpApi, RecordSink, RecordSource};
use arogya::config::ApiConfig;
use arogya::triage::SymptomCheckCreate;
use arogya::{HealthRecord, RecordType, Severity};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Serve one request with `status` and `body`, handing back the raw request.
async fn serve_once(status: &'static str, body: &'static str) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            assert!(n > 0, "connection closed before headers");
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
        let content_length = head
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .map_or(0, |v| v.trim().parse::<usize>().unwrap());
        while buf.len() < header_end + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }

        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });

    (base_url, rx)
}

fn api(base_url: &str, token: Option<&str>) -> HttpApi {
    HttpApi::new(&ApiConfig {
        base_url: base_url.to_string(),
        timeout_secs: 5,
        auth_token: token.map(str::to_string),
    })
    .unwrap()
}

#[tokio::test]
async fn test_submit_batch_posts_json_array() {
    let (base, request) = serve_once("200 OK", r#"{"synced_count": 1, "records": []}"#).await;
    let mut record = HealthRecord::new("u1", RecordType::Vitals, "BP", "120/80");
    record.offline_id = Some("1700000000000".to_string());

    let receipt = api(&base, Some("secret"))
        .submit_batch(&[record])
        .await
        .unwrap();
    assert_eq!(receipt.synced_count, 1);

    let raw = request.await.unwrap();
    assert!(raw.starts_with("POST /api/health-records/sync HTTP/1.1"));
    assert!(raw.to_lowercase().contains("authorization: bearer secret"));
    assert!(raw.contains(r#""offline_id":"1700000000000""#));
    assert!(raw.contains(r#""type":"vitals""#));
}

#[tokio::test]
async fn test_fetch_records_decodes_server_payload() {
    let body = r#"[{
        "id": "a1",
        "user_id": "u1",
        "type": "prescription",
        "title": "Fever",
        "description": "",
        "medications": [{"name": "paracetamol", "dosage": "500mg"}],
        "date": "2025-02-10T08:00:00Z",
        "is_synced": true
    }]"#;
    let (base, request) = serve_once("200 OK", body).await;

    let records = api(&base, None).fetch_records("u1").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].medications[0].name, "paracetamol");

    let raw = request.await.unwrap();
    assert!(raw.starts_with("GET /api/health-records/u1 HTTP/1.1"));
    assert!(!raw.to_lowercase().contains("authorization:"));
}

#[tokio::test]
async fn test_fetch_records_accepts_offsetless_dates() {
    let body = r#"[{
        "id": "a2",
        "user_id": "u1",
        "type": "vitals",
        "title": "Pulse",
        "description": "72 bpm",
        "medications": [],
        "attachments": [],
        "date": "2025-03-01T10:00:00.123000",
        "is_synced": true
    }]"#;
    let (base, _request) = serve_once("200 OK", body).await;

    let records = api(&base, None).fetch_records("u1").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].date.to_rfc3339(),
        "2025-03-01T10:00:00.123+00:00"
    );
}

#[tokio::test]
async fn test_check_symptoms_posts_request() {
    let body = r#"{
        "id": "sc-9",
        "user_id": "u1",
        "symptoms": ["Fever"],
        "assessment": "Likely viral fever",
        "severity": "low",
        "recommendations": ["Drink fluids"],
        "referral_needed": false,
        "created_at": "2025-03-01T10:00:00.123000"
    }"#;
    let (base, request) = serve_once("200 OK", body).await;
    let check = SymptomCheckCreate {
        user_id: "u1".to_string(),
        symptoms: vec!["Fever".to_string()],
        additional_info: None,
    };

    let assessment = api(&base, None).check_symptoms(&check).await.unwrap();
    assert_eq!(assessment.severity, Severity::Low);
    assert!(!assessment.referral_needed);

    let raw = request.await.unwrap();
    assert!(raw.starts_with("POST /api/symptom-check HTTP/1.1"));
    assert!(raw.contains(r#""symptoms":["Fever"]"#));
    assert!(!raw.contains("additional_info"));
}

#[tokio::test]
async fn test_server_error_maps_to_status() {
    let (base, _request) = serve_once("503 Service Unavailable", "{}").await;

    let err = api(&base, None).list_pharmacies().await.unwrap_err();
    assert!(matches!(
        err,
        ApiError::Status { status: 503, ref endpoint } if endpoint == "/pharmacies"
    ));
}

#[tokio::test]
async fn test_malformed_body_maps_to_decode() {
    let (base, _request) = serve_once("200 OK", r#"{"not": "a list"}"#).await;

    let err = api(&base, None).fetch_records("u1").await.unwrap_err();
    assert!(matches!(err, ApiError::Decode { .. }));
}
