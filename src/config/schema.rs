use crate::capture::classifier::{default_rules, ClassificationRule};
use crate::capture::redaction::default_sensitive_tokens;
use crate::capture::{RedactionPolicy, RequestClassifier, TargetKind};
use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub listener: ListenerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub upstreams: UpstreamsConfig,
    #[serde(default)]
    pub classification: ClassificationConfig,
    #[serde(default)]
    pub redaction: RedactionConfig,
    #[serde(default)]
    pub forwarding: ForwardingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenerConfig {
    #[serde(default = "default_listener_host")]
    pub host: String,
    #[serde(default = "default_listener_port")]
    pub port: u16,
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// Maximum number of captures kept before the oldest is evicted
    #[serde(default = "default_store_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamsConfig {
    #[serde(default = "default_embedding_upstream")]
    pub embedding: UpstreamEndpoint,
    #[serde(default = "default_vector_store_upstream")]
    pub vector_store: UpstreamEndpoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamEndpoint {
    #[serde(default = "default_scheme")]
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationConfig {
    #[serde(default = "default_rules")]
    pub rules: Vec<ClassificationRule>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedactionConfig {
    #[serde(default = "default_sensitive_tokens")]
    pub sensitive_tokens: Vec<String>,
    #[serde(default = "default_visible_prefix_chars")]
    pub visible_prefix_chars: usize,
    #[serde(default = "default_body_preview_chars")]
    pub body_preview_chars: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardingConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_forward_timeout")]
    pub timeout_ms: u64,
}

// Default value functions
fn default_listener_host() -> String {
    "127.0.0.1".to_string()
}

fn default_listener_port() -> u16 {
    8080
}

fn default_read_timeout() -> u64 {
    30000
}

fn default_max_body_bytes() -> usize {
    16 * 1024 * 1024
}

fn default_shutdown_grace() -> u64 {
    5000
}

fn default_store_capacity() -> usize {
    1000
}

fn default_scheme() -> String {
    "http".to_string()
}

fn default_embedding_upstream() -> UpstreamEndpoint {
    UpstreamEndpoint::new("localhost", 11434)
}

fn default_vector_store_upstream() -> UpstreamEndpoint {
    UpstreamEndpoint::new("localhost", 6333)
}

fn default_visible_prefix_chars() -> usize {
    20
}

fn default_body_preview_chars() -> usize {
    200
}

fn default_forward_timeout() -> u64 {
    30000
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: default_listener_host(),
            port: default_listener_port(),
            read_timeout_ms: default_read_timeout(),
            max_body_bytes: default_max_body_bytes(),
            shutdown_grace_ms: default_shutdown_grace(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            capacity: default_store_capacity(),
        }
    }
}

impl Default for UpstreamsConfig {
    fn default() -> Self {
        Self {
            embedding: default_embedding_upstream(),
            vector_store: default_vector_store_upstream(),
        }
    }
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            rules: default_rules(),
        }
    }
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            sensitive_tokens: default_sensitive_tokens(),
            visible_prefix_chars: default_visible_prefix_chars(),
            body_preview_chars: default_body_preview_chars(),
        }
    }
}

impl Default for ForwardingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_ms: default_forward_timeout(),
        }
    }
}

impl UpstreamEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme: default_scheme(),
            host: host.into(),
            port,
        }
    }

    /// Parses `host:port`; the scheme defaults to http.
    pub fn parse_host_port(value: &str) -> Result<Self> {
        let (host, port) = value.rsplit_once(':').ok_or_else(|| {
            ConfigError::Parse(format!("Expected host:port, got '{value}'"))
        })?;
        let port = port
            .parse::<u16>()
            .map_err(|e| ConfigError::Parse(format!("Invalid port in '{value}': {e}")))?;
        if host.is_empty() {
            return Err(ConfigError::Parse(format!("Missing host in '{value}'")).into());
        }
        Ok(Self::new(host, port))
    }

    pub fn base_url(&self) -> Result<Url> {
        let raw = format!("{}://{}:{}/", self.scheme, self.host, self.port);
        Url::parse(&raw)
            .map_err(|e| ConfigError::Validation(format!("Invalid upstream '{raw}': {e}")).into())
    }
}

impl Config {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.listener.host, self.listener.port)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.listener.read_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.listener.shutdown_grace_ms)
    }

    pub fn forward_timeout(&self) -> Duration {
        Duration::from_millis(self.forwarding.timeout_ms)
    }

    pub fn classifier(&self) -> RequestClassifier {
        RequestClassifier::new(self.classification.rules.clone())
    }

    pub fn redaction_policy(&self) -> RedactionPolicy {
        RedactionPolicy::new(
            self.redaction.sensitive_tokens.clone(),
            self.redaction.visible_prefix_chars,
        )
    }

    pub fn upstream_for(&self, target: TargetKind) -> Option<&UpstreamEndpoint> {
        match target {
            TargetKind::Embedding => Some(&self.upstreams.embedding),
            TargetKind::VectorStore => Some(&self.upstreams.vector_store),
            TargetKind::Unclassified => None,
        }
    }
}
