//! HttpTransport against a stub collection API

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{post, put};
use axum::{Json, Router};
use nudge_core::ClientConfig;
use nudge_core::delivery::QueuedResponseUpdate;
use nudge_core::error::TransportError;
use nudge_core::transport::{
    DisplayRequest, FileUpload, HttpTransport, SubmissionContext, Transport, UploadConfig,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct Recorded {
    requests: Arc<Mutex<Vec<(String, Value)>>>,
    addr: Arc<Mutex<Option<SocketAddr>>>,
}

impl Recorded {
    fn push(&self, route: String, body: Value) {
        self.requests.lock().unwrap().push((route, body));
    }

    fn all(&self) -> Vec<(String, Value)> {
        self.requests.lock().unwrap().clone()
    }
}

async fn create_display(State(rec): State<Recorded>, Json(body): Json<Value>) -> Json<Value> {
    rec.push("POST displays".to_string(), body);
    Json(json!({ "data": { "id": "display-1" } }))
}

async fn create_response(State(rec): State<Recorded>, Json(body): Json<Value>) -> Json<Value> {
    rec.push("POST responses".to_string(), body);
    Json(json!({ "data": { "id": "response-1" } }))
}

async fn update_response(
    State(rec): State<Recorded>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    rec.push(format!("PUT responses/{}", id), body);
    Json(json!({ "data": {} }))
}

async fn storage(State(rec): State<Recorded>, Json(body): Json<Value>) -> Json<Value> {
    rec.push("POST storage".to_string(), body);
    let addr = rec.addr.lock().unwrap().expect("address recorded");
    Json(json!({
        "data": {
            "signedUrl": format!("http://{}/upload", addr),
            "fileUrl": "https://files.example.com/receipt.pdf",
            "updatedFileName": "receipt--fid--1.pdf"
        }
    }))
}

async fn upload(State(rec): State<Recorded>, Json(body): Json<Value>) -> StatusCode {
    rec.push("POST upload".to_string(), body);
    StatusCode::OK
}

async fn spawn_stub(environment: &str) -> (Recorded, SocketAddr) {
    let recorded = Recorded::default();
    let base = format!("/api/v1/client/{}", environment);
    let app = Router::new()
        .route(&format!("{}/displays", base), post(create_display))
        .route(&format!("{}/responses", base), post(create_response))
        .route(&format!("{}/responses/:id", base), put(update_response))
        .route(&format!("{}/storage", base), post(storage))
        .route("/upload", post(upload))
        .with_state(recorded.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    *recorded.addr.lock().unwrap() = Some(addr);

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (recorded, addr)
}

fn transport_for(addr: SocketAddr, environment: &str) -> HttpTransport {
    HttpTransport::new(&ClientConfig::new(format!("http://{}", addr), environment)).unwrap()
}

#[tokio::test]
async fn display_creation_returns_server_id() {
    let (recorded, addr) = spawn_stub("env-1").await;
    let transport = transport_for(addr, "env-1");

    let created = transport
        .create_display(&DisplayRequest {
            survey_id: "s1".to_string(),
            user_id: Some("user-1".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(created.id, "display-1");
    let (route, body) = &recorded.all()[0];
    assert_eq!(route, "POST displays");
    assert_eq!(body, &json!({ "surveyId": "s1", "userId": "user-1" }));
}

#[tokio::test]
async fn first_submission_creates_with_hidden_fields_in_data() {
    let (recorded, addr) = spawn_stub("env-1").await;
    let transport = transport_for(addr, "env-1");

    let update = QueuedResponseUpdate {
        data: [("q1".to_string(), json!("yes"))].into(),
        hidden_fields: [("plan".to_string(), json!("pro"))].into(),
        language_code: "en".to_string(),
        ..Default::default()
    };
    let context = SubmissionContext {
        survey_id: "s1".to_string(),
        display_id: Some("display-1".to_string()),
        response_id: None,
        user_id: None,
    };

    let receipt = transport.submit_response(&update, &context).await.unwrap();
    assert_eq!(receipt.response_id, "response-1");

    let (route, body) = &recorded.all()[0];
    assert_eq!(route, "POST responses");
    assert_eq!(body["surveyId"], "s1");
    assert_eq!(body["displayId"], "display-1");
    assert_eq!(body["data"]["q1"], "yes");
    assert_eq!(body["data"]["plan"], "pro");
    assert_eq!(body["language"], "en");
}

#[tokio::test]
async fn later_submission_updates_by_id() {
    let (recorded, addr) = spawn_stub("env-1").await;
    let transport = transport_for(addr, "env-1");

    let update = QueuedResponseUpdate {
        data: [("q2".to_string(), json!(3))].into(),
        finished: true,
        ..Default::default()
    };
    let context = SubmissionContext {
        survey_id: "s1".to_string(),
        display_id: Some("display-1".to_string()),
        response_id: Some("response-9".to_string()),
        user_id: None,
    };

    let receipt = transport.submit_response(&update, &context).await.unwrap();
    assert_eq!(receipt.response_id, "response-9");

    let (route, body) = &recorded.all()[0];
    assert_eq!(route, "PUT responses/response-9");
    assert_eq!(body["finished"], true);
    assert_eq!(body["data"]["q2"], 3);
}

#[tokio::test]
async fn upload_uses_signed_url_and_returns_file_url() {
    let (recorded, addr) = spawn_stub("env-1").await;
    let transport = transport_for(addr, "env-1");

    let url = transport
        .upload_file(
            &FileUpload {
                name: "receipt.pdf".to_string(),
                mime_type: "application/pdf".to_string(),
                base64: "JVBERi0=".to_string(),
            },
            &UploadConfig {
                allowed_file_extensions: Some(vec!["pdf".to_string()]),
                survey_id: Some("s1".to_string()),
            },
        )
        .await
        .unwrap();

    assert_eq!(url, "https://files.example.com/receipt.pdf");
    let requests = recorded.all();
    assert_eq!(requests[0].0, "POST storage");
    assert_eq!(requests[0].1["fileName"], "receipt.pdf");
    assert_eq!(requests[1].0, "POST upload");
    assert_eq!(requests[1].1["fileName"], "receipt--fid--1.pdf");
}

#[tokio::test]
async fn unknown_environment_is_a_status_error() {
    let (_recorded, addr) = spawn_stub("env-1").await;
    let transport = transport_for(addr, "env-other");

    let err = transport
        .create_display(&DisplayRequest {
            survey_id: "s1".to_string(),
            user_id: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Status { status: 404, .. }));
}

#[tokio::test]
async fn unreachable_host_is_a_request_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let transport = transport_for(addr, "env-1");

    let err = transport
        .create_display(&DisplayRequest {
            survey_id: "s1".to_string(),
            user_id: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Request(_)));
}
