//! What happens to a request after it has been captured
//!
//! The listener always appends to the store before calling a [`Forwarder`],
//! so a failed forward never loses the capture. Forward failures surface as
//! 502, distinct from capture failures.

use crate::capture::{CapturedRequest, TargetKind};
use crate::config::{Config, UpstreamsConfig};
use crate::error::{plain_text_response, CaptureError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderMap, HeaderName};
use http::{Response, StatusCode, Uri};
use http_body_util::Full;
use std::time::Duration;
use url::Url;

pub type CaptureResponse = Response<Full<Bytes>>;

pub const NOT_FORWARDED_MESSAGE: &str = "Request captured - not forwarded";

#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(
        &self,
        record: &CapturedRequest,
    ) -> std::result::Result<CaptureResponse, CaptureError>;
}

pub fn not_forwarded_response() -> CaptureResponse {
    plain_text_response(StatusCode::NOT_IMPLEMENTED, NOT_FORWARDED_MESSAGE)
}

/// Answers every capture with 501 and never contacts an upstream
#[derive(Debug, Clone, Copy, Default)]
pub struct NotForwarded;

#[async_trait]
impl Forwarder for NotForwarded {
    async fn forward(
        &self,
        _record: &CapturedRequest,
    ) -> std::result::Result<CaptureResponse, CaptureError> {
        Ok(not_forwarded_response())
    }
}

/// Replays captures against the configured embedding or vector-store upstream
pub struct HttpForwarder {
    client: reqwest::Client,
    embedding: Url,
    vector_store: Url,
}

impl HttpForwarder {
    pub fn new(upstreams: &UpstreamsConfig, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .map_err(|e| CaptureError::Forward(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            embedding: upstreams.embedding.base_url()?,
            vector_store: upstreams.vector_store.base_url()?,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.upstreams, config.forward_timeout())
    }

    fn upstream_url(
        &self,
        target: TargetKind,
        request_target: &str,
    ) -> std::result::Result<Option<Url>, CaptureError> {
        let base = match target {
            TargetKind::Embedding => &self.embedding,
            TargetKind::VectorStore => &self.vector_store,
            TargetKind::Unclassified => return Ok(None),
        };

        // Absolute-form targets keep only their path and query.
        let path_and_query = request_target
            .parse::<Uri>()
            .ok()
            .and_then(|uri| uri.path_and_query().map(|pq| pq.as_str().to_string()))
            .unwrap_or_else(|| "/".to_string());

        base.join(&path_and_query)
            .map(Some)
            .map_err(|e| CaptureError::Forward(format!("Invalid upstream URL: {e}")))
    }
}

#[async_trait]
impl Forwarder for HttpForwarder {
    async fn forward(
        &self,
        record: &CapturedRequest,
    ) -> std::result::Result<CaptureResponse, CaptureError> {
        let Some(url) = self.upstream_url(record.target(), record.url())? else {
            tracing::debug!(capture_id = %record.id(), "No upstream for unclassified request");
            return Ok(not_forwarded_response());
        };

        let response = self
            .client
            .request(record.method().clone(), url.clone())
            .headers(end_to_end_headers(record.headers()))
            .body(record.body().clone())
            .send()
            .await
            .map_err(|e| CaptureError::Forward(e.to_string()))?;

        let status = response.status();
        let headers = end_to_end_headers(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|e| CaptureError::Forward(e.to_string()))?;

        tracing::info!(
            capture_id = %record.id(),
            upstream = %url,
            status = status.as_u16(),
            "Forwarded captured request"
        );

        let mut forwarded = Response::new(Full::new(body));
        *forwarded.status_mut() = status;
        *forwarded.headers_mut() = headers;
        Ok(forwarded)
    }
}

const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

fn end_to_end_headers(headers: &HeaderMap) -> HeaderMap {
    let mut filtered = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if !is_hop_by_hop(name) {
            filtered.append(name.clone(), value.clone());
        }
    }
    filtered
}
