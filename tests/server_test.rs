#![cfg(feature = "axum")]

use std::path::PathBuf;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{json, Value};
use tower::ServiceExt;

use quote0::server::{create_app, AppState};
use quote0::settings::{Settings, SettingsStore};
use quote0::Client;

use crate::common::mock_vendor::MockVendor;

mod common;

fn temp_settings_file(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "quote0-server-{}-{}.json",
        name,
        std::process::id()
    ))
}

fn app_for(vendor: &MockVendor, default_device: &str, settings_file: PathBuf) -> Router {
    let settings = Settings {
        dot_api_base_url: vendor.base_url.clone(),
        dot_api_key: "env-key".to_string(),
        dot_default_device_id: default_device.to_string(),
        ui_settings_file: settings_file.clone(),
        ..Settings::default()
    };
    let client = Client::new(settings.client_config(None));
    create_app(AppState::new(
        client,
        settings,
        SettingsStore::new(settings_file),
    ))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let vendor = MockVendor::start().await;
    let app = app_for(&vendor, "", temp_settings_file("health"));

    let (status, body) = send(&app, empty_request(Method::GET, "/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_list_devices_envelope() {
    let vendor = MockVendor::start().await;
    let app = app_for(&vendor, "", temp_settings_file("devices"));

    let (status, body) = send(&app, empty_request(Method::GET, "/devices")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "ok");
    assert_eq!(body["data"][1]["id"], "DEV2");
    assert_eq!(
        vendor.last_call().authorization.as_deref(),
        Some("Bearer env-key")
    );
}

#[tokio::test]
async fn test_vendor_error_keeps_status() {
    let vendor = MockVendor::start().await;
    let app = app_for(&vendor, "", temp_settings_file("error"));

    let (status, body) =
        send(&app, empty_request(Method::GET, "/devices/missing/status")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "device not found");
}

#[tokio::test]
async fn test_device_routes() {
    let vendor = MockVendor::start().await;
    let app = app_for(&vendor, "", temp_settings_file("routes"));

    let (status, _) = send(&app, empty_request(Method::POST, "/devices/DEV1/next")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(vendor.last_call().path, "/api/authV2/open/device/DEV1/next");

    let (status, body) = send(&app, empty_request(Method::GET, "/devices/DEV1/tasks")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["type"], "TEXT_API");
    assert_eq!(vendor.last_call().path, "/api/authV2/open/device/DEV1/loop/list");
}

#[tokio::test]
async fn test_send_text_requires_device() {
    let vendor = MockVendor::start().await;
    let app = app_for(&vendor, "", temp_settings_file("nodevice"));

    let (status, body) = send(
        &app,
        json_request(Method::POST, "/text", json!({"title": "Hi"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(vendor.calls().is_empty());
}

#[tokio::test]
async fn test_send_text() {
    let vendor = MockVendor::start().await;
    let app = app_for(&vendor, "DEV1", temp_settings_file("text"));

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/text",
            json!({"title": "Hi", "message": "there", "refresh_now": false, "task_key": "k"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Text sent");

    let call = vendor.last_call();
    assert_eq!(call.path, "/api/authV2/open/device/DEV1/text");
    let payload = call.body.unwrap();
    assert_eq!(payload["refreshNow"], false);
    assert_eq!(payload["taskKey"], "k");
    assert!(payload.get("signature").is_none());
}

#[tokio::test]
async fn test_send_image_rejects_unknown_dither() {
    let vendor = MockVendor::start().await;
    let app = app_for(&vendor, "DEV1", temp_settings_file("dither"));

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/image",
            json!({"image": "AAAA", "dither_type": "SPARKLE"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("dither_type"));
    assert!(vendor.calls().is_empty());
}

#[tokio::test]
async fn test_malformed_input_uses_envelope() {
    let vendor = MockVendor::start().await;
    let app = app_for(&vendor, "DEV1", temp_settings_file("malformed"));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/text")
        .header("Content-Type", "application/json")
        .body(Body::from("{\"title\": "))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["data"], Value::Null);

    let (status, body) = send(
        &app,
        empty_request(Method::POST, "/text-to-image?title=x&title_size=huge"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("title_size"));

    assert!(vendor.calls().is_empty());
}

#[tokio::test]
async fn test_text_to_image_ignores_unreadable_font() {
    let vendor = MockVendor::start().await;
    let app = app_for(&vendor, "DEV1", temp_settings_file("devzero"));

    let (status, body) = send(
        &app,
        empty_request(Method::POST, "/text-to-image?message=hi&font_path=/dev/zero"),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(vendor.last_call().path, "/api/authV2/open/device/DEV1/image");
}

#[tokio::test]
async fn test_text_to_image_pushes_screen_sized_png() {
    let vendor = MockVendor::start().await;
    let app = app_for(&vendor, "DEV1", temp_settings_file("t2i"));

    let (status, body) = send(
        &app,
        empty_request(
            Method::POST,
            "/text-to-image?title=Hi&message=Hello%20world&signature=me",
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Text rendered and sent as image");

    let call = vendor.last_call();
    assert_eq!(call.path, "/api/authV2/open/device/DEV1/image");
    let payload = call.body.unwrap();
    assert_eq!(payload["ditherType"], "NONE");
    assert_eq!(payload["ditherKernel"], "FLOYD_STEINBERG");

    let png = STANDARD.decode(payload["image"].as_str().unwrap()).unwrap();
    let image = image::load_from_memory(&png).unwrap();
    assert_eq!((image.width(), image.height()), (296, 152));
}

#[tokio::test]
async fn test_image_upload_resizes() {
    let vendor = MockVendor::start().await;
    let app = app_for(&vendor, "", temp_settings_file("upload"));

    let source = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        640,
        480,
        image::Rgb([200, 10, 10]),
    ));
    let png = quote0::encode::png_bytes(&source).unwrap();

    let boundary = "quote0-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"device_id\"\r\n\r\nDEV2\r\n\
             --{boundary}\r\nContent-Disposition: form-data; name=\"border\"\r\n\r\n1\r\n\
             --{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"photo.png\"\r\n\
             Content-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(&png);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/image/upload")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();

    let (status, response) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK, "{response}");
    assert_eq!(response["message"], "Image uploaded and sent");

    let call = vendor.last_call();
    assert_eq!(call.path, "/api/authV2/open/device/DEV2/image");
    let payload = call.body.unwrap();
    assert_eq!(payload["border"], 1);
    assert_eq!(payload["ditherType"], "DIFFUSION");

    let png = STANDARD.decode(payload["image"].as_str().unwrap()).unwrap();
    let image = image::load_from_memory(&png).unwrap();
    assert_eq!((image.width(), image.height()), (296, 152));
}

#[tokio::test]
async fn test_upload_rejects_invalid_image() {
    let vendor = MockVendor::start().await;
    let app = app_for(&vendor, "DEV1", temp_settings_file("badupload"));

    let boundary = "quote0-boundary";
    let body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"x.png\"\r\n\
         Content-Type: image/png\r\n\r\nnot really a png\r\n--{boundary}--\r\n"
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/image/upload")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();

    let (status, response) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["message"], "Invalid image file");
    assert!(vendor.calls().is_empty());
}

#[tokio::test]
async fn test_save_settings_reconfigures_client() {
    let vendor = MockVendor::start().await;
    let path = temp_settings_file("save");
    let app = app_for(&vendor, "", path.clone());

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/ui/api/settings",
            json!({"api_key": "ui-key", "device_id": "DEV7", "base_url": vendor.base_url.clone()}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Settings saved");

    let saved: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(saved["api_key"], "ui-key");

    send(&app, empty_request(Method::GET, "/devices")).await;
    assert_eq!(
        vendor.last_call().authorization.as_deref(),
        Some("Bearer ui-key")
    );

    // The saved device becomes the default
    send(&app, json_request(Method::POST, "/text", json!({"title": "x"}))).await;
    assert_eq!(vendor.last_call().path, "/api/authV2/open/device/DEV7/text");

    let response = app
        .clone()
        .oneshot(empty_request(Method::GET, "/ui/settings"))
        .await
        .unwrap();
    let html = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&html).contains("value=\"DEV7\""));

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_ui_pages() {
    let vendor = MockVendor::start().await;
    let app = app_for(&vendor, "", temp_settings_file("pages"));

    for uri in ["/", "/ui/text", "/ui/image", "/ui/settings"] {
        let response = app
            .clone()
            .oneshot(empty_request(Method::GET, uri))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
    }
}
