//! Dot. cloud API client for Quote/0 devices.

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

use crate::error::Error;
use crate::protocol::{ApiResponse, Device, DeviceStatus, DeviceTask, ImagePush, TextPush};
use crate::{API_BASE_PATH, API_BASE_URL, DEFAULT_TASK_TYPE, DEFAULT_TIMEOUT_SECS};

/// Credentials and routing for a [`Client`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Dot. developer API key (sent as a bearer token)
    pub api_key: String,

    /// API host, without the `/api/authV2/open` prefix
    pub base_url: String,

    /// Device used when a push names none
    pub default_device_id: Option<String>,

    /// Per-request timeout, 30 seconds by default
    pub timeout: Duration,
}

impl ClientConfig {
    /// Create a config for the public Dot. API host.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: API_BASE_URL.to_string(),
            default_device_id: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Set a custom base URL (useful for testing).
    ///
    /// Trailing slashes are stripped.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the default device. An empty ID clears it.
    #[must_use]
    pub fn with_default_device(mut self, device_id: impl Into<String>) -> Self {
        let device_id = device_id.into();
        self.default_device_id = (!device_id.is_empty()).then_some(device_id);
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create a config from `DOT_API_KEY`, `DOT_API_BASE_URL` and
    /// `DOT_DEFAULT_DEVICE_ID`.
    ///
    /// Returns `None` if `DOT_API_KEY` is not set.
    pub fn from_env() -> Option<Self> {
        let mut config = Self::new(std::env::var("DOT_API_KEY").ok()?);
        if let Ok(base_url) = std::env::var("DOT_API_BASE_URL") {
            config = config.with_base_url(base_url);
        }
        if let Ok(device_id) = std::env::var("DOT_DEFAULT_DEVICE_ID") {
            config = config.with_default_device(device_id);
        }
        Some(config)
    }
}

/// Current credentials plus the lazily built connection pool.
struct Session {
    config: ClientConfig,
    http: OnceLock<reqwest::Client>,
}

impl Session {
    fn new(config: ClientConfig) -> Self {
        Self {
            config,
            http: OnceLock::new(),
        }
    }

    fn http(&self) -> Result<&reqwest::Client, Error> {
        if let Some(http) = self.http.get() {
            return Ok(http);
        }

        tracing::debug!("Opening connection pool for {}", self.config.base_url);
        let http = reqwest::Client::builder()
            .timeout(self.config.timeout)
            .build()?;
        Ok(self.http.get_or_init(|| http))
    }
}

/// Dot. API client shared by every request handler.
///
/// The connection pool is opened on the first call and reused afterwards.
/// Calls hold a read lock for their whole duration while
/// [`reconfigure`](Client::reconfigure) and [`close`](Client::close) take the
/// write lock, so a call never mixes old and new credentials and no request
/// with the previous key is dispatched once `reconfigure` has returned.
///
/// # Example
///
/// ```rust,no_run
/// use quote0::{Client, ClientConfig, TextPush};
///
/// # async fn example() -> Result<(), quote0::Error> {
/// let client = Client::new(ClientConfig::new("dot_app_xxx").with_default_device("ABC123"));
///
/// for device in client.list_devices().await? {
///     println!("{}", device.id);
/// }
///
/// client.send_text(&TextPush::new().with_title("Hello")).await?;
/// client.close().await;
/// # Ok(())
/// # }
/// ```
pub struct Client {
    session: RwLock<Session>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

impl Client {
    /// Create a new client. No connection is opened until the first call.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            session: RwLock::new(Session::new(config)),
        }
    }

    /// Create a client from environment variables (see [`ClientConfig::from_env`]).
    pub fn from_env() -> Option<Self> {
        ClientConfig::from_env().map(Self::new)
    }

    /// Snapshot of the current configuration.
    pub async fn config(&self) -> ClientConfig {
        self.session.read().await.config.clone()
    }

    /// Replace the credentials, base URL and default device.
    ///
    /// Waits for in-flight calls, releases the previous connection pool and
    /// installs the new configuration. The new pool opens lazily.
    pub async fn reconfigure(&self, config: ClientConfig) {
        let mut session = self.session.write().await;
        // Dropping the old session drops its pool
        *session = Session::new(config);
        tracing::info!("Dot client reconfigured for {}", session.config.base_url);
    }

    /// Release the connection pool. A later call opens a new one.
    pub async fn close(&self) {
        let mut session = self.session.write().await;
        if session.http.take().is_some() {
            tracing::info!("Dot client connection closed");
        }
    }

    /// Return `device_id`, or the configured default device.
    ///
    /// # Errors
    ///
    /// [`Error::NotConfigured`] when neither is available.
    pub async fn resolve_device(&self, device_id: Option<&str>) -> Result<String, Error> {
        match device_id.filter(|id| !id.is_empty()) {
            Some(id) => Ok(id.to_string()),
            None => self
                .session
                .read()
                .await
                .config
                .default_device_id
                .clone()
                .ok_or(Error::NotConfigured),
        }
    }

    /// List all devices bound to the API key (`GET /devices`).
    pub async fn list_devices(&self) -> Result<Vec<Device>, Error> {
        self.request(Method::GET, "/devices", None).await
    }

    /// Battery, wifi, firmware and render info (`GET /device/{id}/status`).
    pub async fn get_device_status(&self, device_id: &str) -> Result<DeviceStatus, Error> {
        self.request(Method::GET, &format!("/device/{device_id}/status"), None)
            .await
    }

    /// Advance the device's content loop (`POST /device/{id}/next`).
    pub async fn switch_next_content(&self, device_id: &str) -> Result<ApiResponse, Error> {
        self.request(Method::POST, &format!("/device/{device_id}/next"), None)
            .await
    }

    /// List tasks of the given type (`GET /device/{id}/{taskType}/list`).
    ///
    /// `None` lists the `loop` tasks.
    pub async fn list_device_tasks(
        &self,
        device_id: &str,
        task_type: Option<&str>,
    ) -> Result<Vec<DeviceTask>, Error> {
        let task_type = task_type.unwrap_or(DEFAULT_TASK_TYPE);
        self.request(
            Method::GET,
            &format!("/device/{device_id}/{task_type}/list"),
            None,
        )
        .await
    }

    /// Push text content (`POST /device/{id}/text`).
    ///
    /// # Errors
    ///
    /// [`Error::NotConfigured`] is returned before any network call when the
    /// push names no device and no default is configured.
    pub async fn send_text(&self, push: &TextPush) -> Result<ApiResponse, Error> {
        let device_id = self.resolve_device(push.device_id.as_deref()).await?;
        let body = serde_json::to_value(push)?;
        self.request(Method::POST, &format!("/device/{device_id}/text"), Some(body))
            .await
    }

    /// Push a base64 PNG (`POST /device/{id}/image`).
    ///
    /// The image is forwarded as-is; sizing it to the screen is the caller's job.
    pub async fn send_image(&self, push: &ImagePush) -> Result<ApiResponse, Error> {
        let device_id = self.resolve_device(push.device_id.as_deref()).await?;
        let body = serde_json::to_value(push)?;
        self.request(
            Method::POST,
            &format!("/device/{device_id}/image"),
            Some(body),
        )
        .await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, Error> {
        let session = self.session.read().await;
        let url = format!("{}{}{}", session.config.base_url, API_BASE_PATH, path);

        let mut request = session
            .http()?
            .request(method.clone(), &url)
            .bearer_auth(&session.config.api_key)
            .header("Content-Type", "application/json");
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("Dot API {} {} -> {}", method, path, status.as_u16());

        let text = response.text().await?;
        drop(session);

        if status.as_u16() >= 400 {
            return Err(Error::from_response(status.as_u16(), text));
        }

        Ok(serde_json::from_str(&text)?)
    }
}
