//! Dot. cloud API protocol types.
//!
//! Request payloads serialize to the camelCase shape the vendor expects and
//! never carry `null` for an absent optional field. Response types are
//! lenient: unknown fields are kept in `extra` and every field the vendor may
//! omit is optional.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Dithering strategy applied by the vendor before the image reaches the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DitherType {
    /// Error diffusion (default)
    #[default]
    Diffusion,
    /// Ordered dithering
    Ordered,
    /// Plain threshold, best for crisp text
    None,
}

/// Error-diffusion kernel used when [`DitherType::Diffusion`] is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DitherKernel {
    Threshold,
    Atkinson,
    Burkes,
    #[default]
    FloydSteinberg,
    Sierra2,
    Stucki,
    JarvisJudiceNinke,
    DiffusionRow,
    DiffusionColumn,
    #[serde(rename = "DIFFUSION_2D")]
    Diffusion2d,
}

fn parse_wire_name<T: serde::de::DeserializeOwned>(kind: &str, s: &str) -> Result<T, Error> {
    serde_json::from_value(serde_json::Value::String(s.trim().to_string()))
        .map_err(|_| Error::InvalidInput(format!("invalid {kind}: {s}")))
}

impl FromStr for DitherType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_wire_name("dither_type", s)
    }
}

impl FromStr for DitherKernel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_wire_name("dither_kernel", s)
    }
}

/// Text push payload (`POST /device/{id}/text`).
///
/// # Example
///
/// ```
/// use quote0::TextPush;
///
/// let push = TextPush::new()
///     .with_title("Hello")
///     .with_message("From the server");
///
/// let json = serde_json::to_string(&push).unwrap();
/// assert!(json.contains("\"refreshNow\":true"));
/// assert!(!json.contains("signature"));
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextPush {
    /// Target device; falls back to the client's default device when absent
    #[serde(skip)]
    pub device_id: Option<String>,

    /// Display the content immediately
    pub refresh_now: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,

    /// Base64-encoded 40x40 PNG icon
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    /// NFC tap redirect URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,

    /// Targets a specific Text API task slot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_key: Option<String>,
}

impl Default for TextPush {
    fn default() -> Self {
        Self {
            device_id: None,
            refresh_now: true,
            title: None,
            message: None,
            signature: None,
            icon: None,
            link: None,
            task_key: None,
        }
    }
}

impl TextPush {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_device(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }
}

/// Image push payload (`POST /device/{id}/image`).
///
/// `refreshNow`, `border`, `ditherType` and `ditherKernel` are always sent.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePush {
    /// Target device; falls back to the client's default device when absent
    #[serde(skip)]
    pub device_id: Option<String>,

    pub refresh_now: bool,

    /// Base64-encoded PNG, expected to match the screen resolution
    pub image: String,

    /// 0 = white border, 1 = black border
    pub border: u8,

    pub dither_type: DitherType,

    pub dither_kernel: DitherKernel,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_key: Option<String>,
}

impl ImagePush {
    /// Create an image push with the vendor defaults.
    pub fn new(image_base64: impl Into<String>) -> Self {
        Self {
            device_id: None,
            refresh_now: true,
            image: image_base64.into(),
            border: 0,
            dither_type: DitherType::default(),
            dither_kernel: DitherKernel::default(),
            link: None,
            task_key: None,
        }
    }

    #[must_use]
    pub fn with_device(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    #[must_use]
    pub fn with_dither(mut self, dither_type: DitherType, dither_kernel: DitherKernel) -> Self {
        self.dither_type = dither_type;
        self.dither_kernel = dither_kernel;
        self
    }
}

/// Device summary returned by `GET /devices`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// Device serial number
    #[serde(default)]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edition: Option<serde_json::Value>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Hardware and connectivity details inside [`DeviceStatus`].
///
/// The vendor reports these as free-form values (`"80%"`, `80`, `"Charging"`),
/// so they are kept as raw JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceStatusInfo {
    /// Firmware version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wifi: Option<serde_json::Value>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Full device status (`GET /device/{id}/status`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    #[serde(default)]
    pub device_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DeviceStatusInfo>,

    /// Last/current/next render details, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_info: Option<serde_json::Value>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// An entry of a device's task loop (`GET /device/{id}/{taskType}/list`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceTask {
    #[serde(rename = "type", default)]
    pub task_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_now: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dither_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dither_kernel: Option<String>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Standard acknowledgement from the vendor (`next`, `text`, `image`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Envelope wrapping every content-returning response of this service.
///
/// # Example
///
/// ```
/// use quote0::ServiceResponse;
///
/// let response = ServiceResponse::ok("Text sent", serde_json::json!({"code": 200}));
/// let json = serde_json::to_string(&response).unwrap();
/// assert!(json.contains("\"success\":true"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceResponse {
    pub success: bool,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

impl ServiceResponse {
    /// Successful response carrying `data`.
    ///
    /// Data that fails to serialize is reported as `null`.
    pub fn ok(message: impl Into<String>, data: impl Serialize) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: serde_json::to_value(data).ok(),
        }
    }

    /// Successful response without data.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    /// Failure response.
    pub fn error(message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data,
        }
    }
}
