//! Error types for the Quote/0 service.

use thiserror::Error;

/// Errors that can occur when talking to the Dot. API or serving requests.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed (connection refused, DNS, TLS, ...)
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// HTTP request exceeded the client timeout
    #[error("HTTP request timed out")]
    Timeout,

    /// Dot. API returned an error status code
    #[error("API returned error status {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Vendor message (the body's `message` field, or the body itself)
        message: String,
        /// Response body, parsed as JSON or kept as a JSON string
        body: serde_json::Value,
    },

    /// No device ID supplied and no default device configured
    #[error("device_id is required (no default configured)")]
    NotConfigured,

    /// Caller supplied input that cannot be used
    #[error("{0}")]
    InvalidInput(String),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(String),

    /// Image encoding error
    #[error("Image encoding failed: {0}")]
    Image(String),

    /// File system error
    #[error("I/O error: {0}")]
    Io(String),
}

impl Error {
    /// Build an [`Error::Api`] from a vendor status and raw response text.
    ///
    /// The body is parsed as JSON when possible; the message is taken from a
    /// top-level `message` string, falling back to the body text.
    pub fn from_response(status: u16, text: String) -> Self {
        let body = serde_json::from_str::<serde_json::Value>(&text)
            .unwrap_or(serde_json::Value::String(text));

        let message = match &body {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Object(map) => match map.get("message") {
                Some(serde_json::Value::String(m)) => m.clone(),
                _ => body.to_string(),
            },
            other => other.to_string(),
        };

        Error::Api {
            status,
            message,
            body,
        }
    }

    /// HTTP status a caller-facing response should carry for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Api { status, .. } => *status,
            Error::NotConfigured | Error::InvalidInput(_) => 400,
            Error::Request(_) => 502,
            Error::Timeout => 504,
            Error::Serialization(_) | Error::Image(_) | Error::Io(_) => 500,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout
        } else {
            Error::Request(err.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}
