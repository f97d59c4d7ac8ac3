use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// A request received by the mock vendor.
#[derive(Debug, Clone)]
pub struct Call {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

/// How long `/device/slow/...` requests take to answer.
#[allow(dead_code)]
pub const SLOW_RESPONSE: Duration = Duration::from_millis(400);

/// Stand-in for the Dot. cloud API on an ephemeral local port.
#[derive(Clone)]
#[allow(dead_code)]
pub struct MockVendor {
    pub base_url: String,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl MockVendor {
    pub async fn start() -> Self {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new().fallback(vendor).with_state(calls.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{address}"),
            calls,
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_call(&self) -> Call {
        self.calls().pop().expect("no request reached the vendor")
    }
}

async fn vendor(
    State(calls): State<Arc<Mutex<Vec<Call>>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body: Option<Value> = serde_json::from_slice(&body).ok();
    calls.lock().unwrap().push(Call {
        method: method.to_string(),
        path: uri.path().to_string(),
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string()),
        body: body.clone(),
    });

    let Some(route) = uri.path().strip_prefix("/api/authV2/open") else {
        return (StatusCode::NOT_FOUND, "unknown prefix").into_response();
    };

    if route.starts_with("/device/slow/") {
        tokio::time::sleep(SLOW_RESPONSE).await;
    }

    match (method.as_str(), route) {
        ("GET", "/devices") => Json(json!([
            {"id": "DEV1", "series": "Quote", "model": "Quote/0", "edition": 1},
            {"id": "DEV2", "series": "Quote", "model": "Quote/0", "edition": 2}
        ]))
        .into_response(),
        ("GET", "/device/missing/status") => (
            StatusCode::NOT_FOUND,
            Json(json!({"message": "device not found"})),
        )
            .into_response(),
        ("GET", "/device/broken/status") => {
            (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response()
        }
        ("GET", r) if r.ends_with("/status") => Json(json!({
            "deviceId": "DEV1",
            "alias": "Desk",
            "status": {"version": "1.0.3", "battery": "80%", "wifi": "-48"}
        }))
        .into_response(),
        ("POST", r) if r.ends_with("/next") => {
            Json(json!({"code": 200, "message": "ok"})).into_response()
        }
        ("GET", r) if r.ends_with("/list") => {
            Json(json!([{"type": "TEXT_API", "key": "k1", "title": "hello"}])).into_response()
        }
        ("POST", r) if r.ends_with("/text") || r.ends_with("/image") => {
            Json(json!({"code": 200, "message": "ok", "result": {"accepted": true}}))
                .into_response()
        }
        _ => (StatusCode::NOT_FOUND, Json(json!({"message": "no route"}))).into_response(),
    }
}
