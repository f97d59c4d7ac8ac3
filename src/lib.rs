//! # quote0
//!
//! An HTTP service for the MindReset Dot. [Quote/0](https://dot.mindreset.tech)
//! e-ink display.
//!
//! The Quote/0 is driven entirely through the Dot. cloud API. This crate wraps
//! that API and adds what the vendor does not provide:
//! - A typed client for device management, text push and image push
//! - Server-side text-to-image rendering with a custom layout
//! - Upload handling that resizes arbitrary images to the panel
//! - An axum service with a small browser UI for credentials
//!
//! ## Quick Start (client)
//!
//! ```rust,no_run
//! use quote0::{Client, ClientConfig, ImagePush, RenderSpec};
//!
//! # async fn example() -> Result<(), quote0::Error> {
//! let client = Client::new(ClientConfig::new("dot_app_xxx").with_default_device("ABC123"));
//!
//! let bitmap = quote0::render(
//!     &RenderSpec::new()
//!         .with_title("Today")
//!         .with_message("Standup moved to 10:30")
//!         .with_signature("ops"),
//! );
//! let image = quote0::encode::bitmap_to_base64(&bitmap)?;
//!
//! client.send_image(&ImagePush::new(image)).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Display Dimensions
//!
//! The Quote/0 panel is 296x152 pixels, black and white. Images pushed to the
//! vendor should be exactly that size; dithering happens on the vendor side.
//!
//! ## Vendor API
//!
//! | Operation | Method | Path |
//! |-----------|--------|------|
//! | List devices | GET | `/api/authV2/open/devices` |
//! | Device status | GET | `/api/authV2/open/device/{id}/status` |
//! | Next content | POST | `/api/authV2/open/device/{id}/next` |
//! | Task list | GET | `/api/authV2/open/device/{id}/{taskType}/list` |
//! | Push text | POST | `/api/authV2/open/device/{id}/text` |
//! | Push image | POST | `/api/authV2/open/device/{id}/image` |
//!
//! ## Feature Flags
//!
//! - `render` - Text-to-image rendering and PNG/base64 encoding
//! - `axum` - The HTTP service, configuration and browser UI
//! - `full` - All features

mod client;
mod error;
mod protocol;

pub use client::{Client, ClientConfig};
pub use error::Error;
pub use protocol::{
    ApiResponse, Device, DeviceStatus, DeviceStatusInfo, DeviceTask, DitherKernel, DitherType,
    ImagePush, ServiceResponse, TextPush,
};

/// Quote/0 display width in pixels
pub const SCREEN_WIDTH: u32 = 296;

/// Quote/0 display height in pixels
pub const SCREEN_HEIGHT: u32 = 152;

/// Dot. API host
pub const API_BASE_URL: &str = "https://dot.mindreset.tech";

/// Path prefix of the open (authV2) endpoints
pub const API_BASE_PATH: &str = "/api/authV2/open";

/// Per-request timeout for vendor calls
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Task type listed when none is given
pub const DEFAULT_TASK_TYPE: &str = "loop";

// Optional modules
#[cfg(feature = "render")]
pub mod encode;
#[cfg(feature = "render")]
pub mod font;
#[cfg(feature = "render")]
pub mod render;
#[cfg(feature = "render")]
pub use render::{layout, render, wrap_text, Bitmap, Field, RenderSpec, TextRun};

#[cfg(feature = "axum")]
pub mod server;
#[cfg(feature = "axum")]
pub mod settings;
#[cfg(feature = "axum")]
mod ui;
