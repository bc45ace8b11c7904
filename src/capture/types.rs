//! Core type definitions for captured traffic

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::{HeaderMap, Method};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Logical upstream a request is destined for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetKind {
    /// Embedding-style API (Ollama and friends)
    #[serde(alias = "upstream-a")]
    Embedding,
    /// Vector-store API (Qdrant and friends)
    #[serde(alias = "upstream-b")]
    VectorStore,
    /// No classification rule matched
    Unclassified,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Embedding => "embedding",
            TargetKind::VectorStore => "vector-store",
            TargetKind::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One fully-received inbound HTTP request.
///
/// Built once by the listener after the body has been read and classified;
/// there are no mutating accessors.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    id: String,
    timestamp: DateTime<Utc>,
    method: Method,
    url: String,
    headers: HeaderMap,
    body: Bytes,
    target: TargetKind,
}

impl CapturedRequest {
    pub fn new(
        timestamp: DateTime<Utc>,
        method: Method,
        url: String,
        headers: HeaderMap,
        body: Bytes,
        target: TargetKind,
    ) -> Self {
        Self {
            id: format!("cap_{}", Uuid::new_v4()),
            timestamp,
            method,
            url,
            headers,
            body,
            target,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Time the request head was received
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// All values received for `name`, in arrival order
    pub fn header_values(&self, name: &str) -> Vec<&[u8]> {
        self.headers
            .get_all(name)
            .iter()
            .map(|value| value.as_bytes())
            .collect()
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn target(&self) -> TargetKind {
        self.target
    }
}

/// Serializable view of a capture, used by tooling that dumps the store
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureSummary {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub url: String,
    pub target: TargetKind,
    pub header_count: usize,
    pub body_bytes: usize,
}

impl From<&CapturedRequest> for CaptureSummary {
    fn from(record: &CapturedRequest) -> Self {
        Self {
            id: record.id.clone(),
            timestamp: record.timestamp,
            method: record.method.to_string(),
            url: record.url.clone(),
            target: record.target,
            header_count: record.headers.len(),
            body_bytes: record.body.len(),
        }
    }
}
