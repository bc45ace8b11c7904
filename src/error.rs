use bytes::Bytes;
use http::{header, Response, StatusCode};
use http_body_util::Full;
use std::io;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Environment variable error: {0}")]
    EnvVar(String),
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("Listener task failed: {0}")]
    Join(String),
}

/// Failures that can occur while capturing a single request.
///
/// Every variant is converted into a well-formed HTTP response at the listener
/// boundary. The `Display` text is for logs only; callers on the network see
/// the generic message from [`CaptureError::public_message`].
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to read request body: {0}")]
    BodyRead(String),

    #[error("Request body not received within {0:?}")]
    ReadTimeout(Duration),

    #[error("Request body exceeded {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Capture store is closed")]
    StoreClosed,

    #[error("Forwarding to upstream failed: {0}")]
    Forward(String),
}

impl CaptureError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CaptureError::BodyRead(_) | CaptureError::StoreClosed => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            CaptureError::ReadTimeout(_) => StatusCode::REQUEST_TIMEOUT,
            CaptureError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            CaptureError::Forward(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn public_message(&self) -> &'static str {
        match self {
            CaptureError::BodyRead(_) | CaptureError::StoreClosed => {
                "Internal error while capturing request"
            }
            CaptureError::ReadTimeout(_) => "Timed out reading request body",
            CaptureError::PayloadTooLarge(_) => "Request body too large",
            CaptureError::Forward(_) => "Request captured but upstream forwarding failed",
        }
    }

    /// Label used for the failure counter.
    pub fn reason(&self) -> &'static str {
        match self {
            CaptureError::BodyRead(_) => "body_read",
            CaptureError::ReadTimeout(_) => "read_timeout",
            CaptureError::PayloadTooLarge(_) => "payload_too_large",
            CaptureError::StoreClosed => "store_closed",
            CaptureError::Forward(_) => "forward",
        }
    }

    pub fn to_response(&self) -> Response<Full<Bytes>> {
        plain_text_response(self.status_code(), self.public_message())
    }
}

pub(crate) fn plain_text_response(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

pub type Result<T> = std::result::Result<T, ProxyError>;
