use super::schema::{Config, UpstreamEndpoint};

/// Command-line overrides layered on top of the file/environment config
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub embedding_upstream: Option<UpstreamEndpoint>,
    pub vector_store_upstream: Option<UpstreamEndpoint>,
    pub capacity: Option<usize>,
    /// Only ever switches forwarding on; absence keeps the configured value
    pub forward: bool,
}

impl CliOverrides {
    pub fn is_empty(&self) -> bool {
        self.host.is_none()
            && self.port.is_none()
            && self.embedding_upstream.is_none()
            && self.vector_store_upstream.is_none()
            && self.capacity.is_none()
            && !self.forward
    }
}

/// Apply overrides to base configuration
pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) {
    if let Some(host) = &overrides.host {
        tracing::debug!(host = %host, "Overriding listener host");
        config.listener.host = host.clone();
    }
    if let Some(port) = overrides.port {
        tracing::debug!(port, "Overriding listener port");
        config.listener.port = port;
    }
    if let Some(endpoint) = &overrides.embedding_upstream {
        config.upstreams.embedding = endpoint.clone();
    }
    if let Some(endpoint) = &overrides.vector_store_upstream {
        config.upstreams.vector_store = endpoint.clone();
    }
    if let Some(capacity) = overrides.capacity {
        config.store.capacity = capacity;
    }
    if overrides.forward {
        config.forwarding.enabled = true;
    }
}
