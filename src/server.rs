//! HTTP service in front of the Dot. API.
//!
//! Every content-returning endpoint answers with a [`ServiceResponse`]
//! envelope. Vendor errors keep the vendor's status code and message.
//!
//! | Endpoint | Method | Purpose |
//! |----------|--------|---------|
//! | `/health` | GET | Liveness |
//! | `/devices` | GET | List devices |
//! | `/devices/{id}/status` | GET | Device status |
//! | `/devices/{id}/next` | POST | Next content in the loop |
//! | `/devices/{id}/tasks` | GET | Task list (`?task_type=loop`) |
//! | `/text` | POST | Push text |
//! | `/image` | POST | Push a base64 PNG |
//! | `/image/upload` | POST | Upload, resize and push an image file |
//! | `/text-to-image` | POST | Render text server-side and push it |
//! | `/`, `/ui/*` | GET | Browser UI |
//! | `/ui/api/settings` | POST | Save credentials and reconfigure the client |
//!
//! # Example
//!
//! ```rust,no_run
//! use quote0::server;
//! use quote0::settings::Settings;
//!
//! # async fn example() -> Result<(), quote0::Error> {
//! let settings = Settings::new().expect("invalid configuration");
//! server::run(settings).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use axum::extract::{
    DefaultBodyLimit, FromRequest, FromRequestParts, Multipart, Path, Query, Request, State,
};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::client::Client;
use crate::encode;
use crate::error::Error;
use crate::protocol::{DitherKernel, DitherType, ImagePush, ServiceResponse, TextPush};
use crate::render::{render, RenderSpec};
use crate::settings::{SavedSettings, Settings, SettingsStore};
use crate::ui;

/// Largest accepted upload body
const UPLOAD_LIMIT: usize = 16 * 1024 * 1024;

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub client: Arc<Client>,
    pub settings: Arc<Settings>,
    pub store: Arc<SettingsStore>,
}

impl AppState {
    pub fn new(client: Client, settings: Settings, store: SettingsStore) -> Self {
        Self {
            client: Arc::new(client),
            settings: Arc::new(settings),
            store: Arc::new(store),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let (message, data) = match self {
            Error::Api { message, body, .. } => (message, Some(body)),
            other => {
                if status.is_server_error() {
                    tracing::error!("Request failed: {}", other);
                }
                (other.to_string(), None)
            }
        };

        (status, Json(ServiceResponse::error(message, data))).into_response()
    }
}

/// JSON body extractor whose rejections use the [`ServiceResponse`] envelope.
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| Error::InvalidInput(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Query string extractor whose rejections use the [`ServiceResponse`] envelope.
pub struct ApiQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| Error::InvalidInput(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Build the router.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(ui::dashboard))
        .route("/ui/text", get(ui::text_page))
        .route("/ui/image", get(ui::image_page))
        .route("/ui/settings", get(ui::settings_page))
        .route("/ui/api/settings", post(save_settings))
        .route("/health", get(health))
        .route("/devices", get(list_devices))
        .route("/devices/{device_id}/status", get(device_status))
        .route("/devices/{device_id}/next", post(switch_next_content))
        .route("/devices/{device_id}/tasks", get(device_tasks))
        .route("/text", post(send_text))
        .route("/image", post(send_image))
        .route(
            "/image/upload",
            post(send_image_upload).layer(DefaultBodyLimit::max(UPLOAD_LIMIT)),
        )
        .route("/text-to-image", post(send_text_as_image))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until Ctrl-C, then release the vendor connection.
pub async fn run(settings: Settings) -> Result<(), Error> {
    let store = SettingsStore::new(settings.ui_settings_file.clone());
    let saved = store.load().await;
    let client = Client::new(settings.client_config(saved.as_ref()));
    let address = format!("{}:{}", settings.service_host, settings.service_port);

    let state = AppState::new(client, settings, store);
    let client = state.client.clone();
    let app = create_app(state);

    let listener = TcpListener::bind(&address).await?;
    tracing::info!("listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    client.close().await;
    tracing::info!("Dot service shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

fn default_true() -> bool {
    true
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

fn parse_form_bool(name: &str, value: &str) -> Result<bool, Error> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(Error::InvalidInput(format!("invalid {name}: {value}"))),
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_devices(State(state): State<AppState>) -> Result<Json<ServiceResponse>, Error> {
    let devices = state.client.list_devices().await?;
    Ok(Json(ServiceResponse::ok("ok", devices)))
}

async fn device_status(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<ServiceResponse>, Error> {
    let status = state.client.get_device_status(&device_id).await?;
    Ok(Json(ServiceResponse::ok("ok", status)))
}

async fn switch_next_content(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<ServiceResponse>, Error> {
    let response = state.client.switch_next_content(&device_id).await?;
    Ok(Json(ServiceResponse::ok("ok", response)))
}

#[derive(Debug, Deserialize)]
struct TaskQuery {
    task_type: Option<String>,
}

async fn device_tasks(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    ApiQuery(query): ApiQuery<TaskQuery>,
) -> Result<Json<ServiceResponse>, Error> {
    let tasks = state
        .client
        .list_device_tasks(&device_id, query.task_type.as_deref())
        .await?;
    Ok(Json(ServiceResponse::ok("ok", tasks)))
}

/// Body of `POST /text`.
#[derive(Debug, Deserialize)]
pub struct SendTextRequest {
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default = "default_true")]
    pub refresh_now: bool,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub task_key: Option<String>,
}

impl From<SendTextRequest> for TextPush {
    fn from(req: SendTextRequest) -> Self {
        Self {
            device_id: req.device_id,
            refresh_now: req.refresh_now,
            title: req.title,
            message: req.message,
            signature: req.signature,
            icon: req.icon,
            link: req.link,
            task_key: req.task_key,
        }
    }
}

async fn send_text(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SendTextRequest>,
) -> Result<Json<ServiceResponse>, Error> {
    let response = state.client.send_text(&req.into()).await?;
    Ok(Json(ServiceResponse::ok("Text sent", response)))
}

/// Body of `POST /image`.
#[derive(Debug, Deserialize)]
pub struct SendImageRequest {
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default = "default_true")]
    pub refresh_now: bool,
    pub image: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub border: u8,
    #[serde(default)]
    pub dither_type: DitherType,
    #[serde(default)]
    pub dither_kernel: DitherKernel,
    #[serde(default)]
    pub task_key: Option<String>,
}

impl From<SendImageRequest> for ImagePush {
    fn from(req: SendImageRequest) -> Self {
        Self {
            device_id: req.device_id,
            refresh_now: req.refresh_now,
            image: req.image,
            border: req.border,
            dither_type: req.dither_type,
            dither_kernel: req.dither_kernel,
            link: req.link,
            task_key: req.task_key,
        }
    }
}

async fn send_image(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SendImageRequest>,
) -> Result<Json<ServiceResponse>, Error> {
    let response = state.client.send_image(&req.into()).await?;
    Ok(Json(ServiceResponse::ok("Image sent", response)))
}

async fn send_image_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ServiceResponse>, Error> {
    let mut file = None;
    let mut push = ImagePush::new(String::new());

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidInput(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "file" {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| Error::InvalidInput(e.to_string()))?;
            file = Some(bytes);
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| Error::InvalidInput(e.to_string()))?;

        match name.as_str() {
            "device_id" => push.device_id = non_empty(value),
            "refresh_now" => push.refresh_now = parse_form_bool("refresh_now", &value)?,
            "link" => push.link = non_empty(value),
            "border" => {
                push.border = value
                    .trim()
                    .parse()
                    .map_err(|_| Error::InvalidInput(format!("invalid border: {value}")))?
            }
            "dither_type" => push.dither_type = value.parse()?,
            "dither_kernel" => push.dither_kernel = value.parse()?,
            "task_key" => push.task_key = non_empty(value),
            _ => tracing::debug!("Ignoring upload field {}", name),
        }
    }

    let file = file.ok_or_else(|| Error::InvalidInput("file is required".to_string()))?;
    push.device_id = Some(state.client.resolve_device(push.device_id.as_deref()).await?);

    let (width, height) = (state.settings.screen_width, state.settings.screen_height);
    push.image = tokio::task::spawn_blocking(move || encode::prepare_upload(&file, width, height))
        .await
        .map_err(|e| Error::Image(e.to_string()))??;

    let response = state.client.send_image(&push).await?;
    Ok(Json(ServiceResponse::ok("Image uploaded and sent", response)))
}

fn default_dither_none() -> DitherType {
    DitherType::None
}

fn default_title_size() -> u32 {
    18
}

fn default_message_size() -> u32 {
    14
}

fn default_signature_size() -> u32 {
    10
}

/// Query of `POST /text-to-image`.
#[derive(Debug, Deserialize)]
pub struct TextToImageQuery {
    pub device_id: Option<String>,
    pub title: Option<String>,
    pub message: Option<String>,
    pub signature: Option<String>,
    #[serde(default = "default_true")]
    pub refresh_now: bool,
    #[serde(default)]
    pub border: u8,
    #[serde(default = "default_dither_none")]
    pub dither_type: DitherType,
    #[serde(default)]
    pub dither_kernel: DitherKernel,
    pub font_path: Option<String>,
    #[serde(default = "default_title_size")]
    pub title_size: u32,
    #[serde(default = "default_message_size")]
    pub message_size: u32,
    #[serde(default = "default_signature_size")]
    pub signature_size: u32,
    pub task_key: Option<String>,
}

async fn send_text_as_image(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TextToImageQuery>,
) -> Result<Json<ServiceResponse>, Error> {
    let device_id = state.client.resolve_device(query.device_id.as_deref()).await?;

    let spec = RenderSpec {
        title: query.title,
        message: query.message,
        signature: query.signature,
        width: state.settings.screen_width,
        height: state.settings.screen_height,
        title_size: query.title_size,
        message_size: query.message_size,
        signature_size: query.signature_size,
        font_path: query.font_path.filter(|p| !p.is_empty()).map(Into::into),
        ..RenderSpec::default()
    };

    let image = tokio::task::spawn_blocking(move || encode::bitmap_to_base64(&render(&spec)))
        .await
        .map_err(|e| Error::Image(e.to_string()))??;

    let push = ImagePush {
        device_id: Some(device_id),
        refresh_now: query.refresh_now,
        image,
        border: query.border,
        dither_type: query.dither_type,
        dither_kernel: query.dither_kernel,
        link: None,
        task_key: query.task_key,
    };

    let response = state.client.send_image(&push).await?;
    Ok(Json(ServiceResponse::ok(
        "Text rendered and sent as image",
        response,
    )))
}

async fn save_settings(
    State(state): State<AppState>,
    ApiJson(saved): ApiJson<SavedSettings>,
) -> Result<Json<ServiceResponse>, Error> {
    state.store.save(&saved).await?;
    state
        .client
        .reconfigure(state.settings.client_config(Some(&saved)))
        .await;
    Ok(Json(ServiceResponse::message("Settings saved")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_form_bool() {
        assert!(parse_form_bool("refresh_now", "true").unwrap());
        assert!(parse_form_bool("refresh_now", "On").unwrap());
        assert!(!parse_form_bool("refresh_now", "0").unwrap());
        assert!(parse_form_bool("refresh_now", "maybe").is_err());
    }

    #[test]
    fn test_text_request_defaults() {
        let req: SendTextRequest = serde_json::from_str(r#"{"title": "Hi"}"#).unwrap();
        let push = TextPush::from(req);

        assert!(push.refresh_now);
        assert_eq!(push.title.as_deref(), Some("Hi"));
        assert_eq!(push.device_id, None);
    }

    #[test]
    fn test_image_request_defaults() {
        let req: SendImageRequest =
            serde_json::from_str(r#"{"image": "AAAA", "dither_type": "ORDERED"}"#).unwrap();
        let push = ImagePush::from(req);

        assert_eq!(push.border, 0);
        assert_eq!(push.dither_type, DitherType::Ordered);
        assert_eq!(push.dither_kernel, DitherKernel::FloydSteinberg);
    }

    #[tokio::test]
    async fn test_api_error_response_keeps_vendor_status() {
        let err = Error::from_response(404, r#"{"message":"device not found"}"#.to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "device not found");
        assert_eq!(json["data"]["message"], "device not found");
    }

    #[tokio::test]
    async fn test_not_configured_response() {
        let response = Error::NotConfigured.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
