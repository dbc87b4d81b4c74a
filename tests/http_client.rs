use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use intake_desk::api::{ApiClient, NewRequest, ReqwestHttpClient, RequestId};
use intake_desk::error::{FlowError, Step, TransportError};
use intake_desk::flow::{AttachPolicy, FlowSettings, FlowState, RequestSubmissionFlow};
use intake_desk::presenter::RecordingPresenter;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio_test::{assert_err, assert_ok};

#[derive(Debug, Clone, PartialEq)]
struct Recorded {
    path: String,
    content_type: Option<String>,
    body: Value,
}

#[derive(Clone, Default)]
struct StubState {
    recorded: Arc<Mutex<Vec<Recorded>>>,
    fail_creation: bool,
}

async fn list_modules() -> Json<Value> {
    Json(json!(["id_card", "payslip", "drivers_license"]))
}

async fn create_request(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, String)> {
    record(&state, "/requests".to_string(), &headers, body);
    if state.fail_creation {
        return Err((StatusCode::INTERNAL_SERVER_ERROR, "db down".to_string()));
    }
    Ok(Json(json!({"id": 17, "token": "4f2c9a", "expires_at": null})))
}

async fn attach_module(
    State(state): State<StubState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    record(&state, format!("/requests/{id}/modules"), &headers, body);
    Json(json!({"status": "ok"}))
}

async fn slow_modules() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(2)).await;
    Json(json!([]))
}

fn record(state: &StubState, path: String, headers: &HeaderMap, body: Value) {
    state.recorded.lock().push(Recorded {
        path,
        content_type: headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });
}

async fn spawn_stub(state: StubState) -> String {
    let app = Router::new()
        .route("/modules", get(list_modules))
        .route("/slow/modules", get(slow_modules))
        .route("/requests", post(create_request))
        .route("/requests/{id}/modules", post(attach_module))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn flow_for(
    base_url: &str,
) -> RequestSubmissionFlow<ReqwestHttpClient, RecordingPresenter> {
    RequestSubmissionFlow::new(
        ApiClient::new(ReqwestHttpClient::new(base_url)),
        RecordingPresenter::new(),
        FlowSettings {
            public_origin: "https://app.example".to_string(),
            attach_policy: AttachPolicy::Sequential,
            default_expires_days: 7,
        },
    )
}

#[tokio::test]
async fn test_submission_against_live_server() {
    let state = StubState::default();
    let base_url = spawn_stub(state.clone()).await;
    let mut flow = flow_for(&base_url);

    let modules = assert_ok!(flow.initialize().await);
    assert_eq!(modules, vec!["id_card", "payslip", "drivers_license"]);

    flow.form_mut().nickname = "Alice".to_string();
    flow.form_mut().expires_days = 30;
    flow.form_mut().modules.set_checked("drivers_license", true);
    flow.form_mut().modules.set_checked("id_card", true);
    let submission = assert_ok!(flow.submit_form().await);

    assert_eq!(submission.request.id, RequestId::new("17"));
    assert_eq!(
        submission.share_url,
        "https://app.example/customer?token=4f2c9a"
    );

    let recorded = state.recorded.lock().clone();
    assert_eq!(
        recorded,
        vec![
            Recorded {
                path: "/requests".to_string(),
                content_type: Some("application/json".to_string()),
                body: json!({"nickname": "Alice", "expires_days": 30}),
            },
            Recorded {
                path: "/requests/17/modules".to_string(),
                content_type: Some("application/json".to_string()),
                body: json!({"kind": "id_card"}),
            },
            Recorded {
                path: "/requests/17/modules".to_string(),
                content_type: Some("application/json".to_string()),
                body: json!({"kind": "drivers_license"}),
            },
        ]
    );
}

#[tokio::test]
async fn test_server_error_on_creation_stops_flow() {
    let state = StubState {
        fail_creation: true,
        ..Default::default()
    };
    let base_url = spawn_stub(state.clone()).await;
    let mut flow = flow_for(&base_url);
    flow.initialize().await.unwrap();
    flow.form_mut().modules.set_checked("payslip", true);

    let err = assert_err!(flow.submit_form().await);

    match err {
        FlowError::Server { step, status, body } => {
            assert_eq!(step, Step::Creation);
            assert_eq!(status, 500);
            assert_eq!(body, "db down");
        }
        other => panic!("expected server error, got {other:?}"),
    }
    assert_eq!(state.recorded.lock().len(), 1);
    assert_eq!(flow.state(), FlowState::Failed(Step::Creation));
}

#[tokio::test]
async fn test_unknown_route_is_server_error() {
    let base_url = spawn_stub(StubState::default()).await;
    let api = ApiClient::new(ReqwestHttpClient::new(format!("{base_url}/missing")));

    let err = assert_err!(api.list_modules().await);

    assert!(matches!(
        err,
        FlowError::Server {
            step: Step::Listing,
            status: 404,
            ..
        }
    ));
}

#[tokio::test]
async fn test_timeout_is_network_error() {
    let base_url = spawn_stub(StubState::default()).await;
    let api = ApiClient::new(
        ReqwestHttpClient::new(format!("{base_url}/slow"))
            .with_timeout(Some(Duration::from_millis(100))),
    );

    let err = assert_err!(api.list_modules().await);

    assert!(matches!(
        err,
        FlowError::Network {
            step: Step::Listing,
            source: TransportError::Timeout,
        }
    ));
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = ApiClient::new(ReqwestHttpClient::new(format!("http://{addr}")));
    let err = api
        .create_request(&NewRequest {
            nickname: "Alice".to_string(),
            expires_days: 1,
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FlowError::Network {
            step: Step::Creation,
            ..
        }
    ));
}
