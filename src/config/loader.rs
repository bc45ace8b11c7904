use super::schema::{Config, UpstreamEndpoint};
use crate::error::{ConfigError, Result};
use figment::{
    providers::{Env, Format, Json, Toml, Yaml},
    value::{Uncased, UncasedStr},
    Figment,
};
use std::path::Path;
use std::sync::OnceLock;

const ENV_PREFIX: &str = "CAPTURE_PROXY_";

pub fn load_from_env_or_file() -> Result<Config> {
    let config: Config = Figment::new()
        // Try to load from various config files
        .merge(Toml::file("capture-proxy.toml"))
        .merge(Json::file("capture-proxy.json"))
        .merge(Yaml::file("capture-proxy.yaml"))
        .merge(Yaml::file("capture-proxy.yml"))
        // Override with environment variables (CAPTURE_PROXY_LISTENER__READ_TIMEOUT_MS=5000)
        .merge(env_provider())
        .extract()
        .map_err(|e| ConfigError::Parse(e.to_string()))?;

    finish(config)
}

pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();

    let figment = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => Figment::new().merge(Toml::file(path)),
        Some("json") => Figment::new().merge(Json::file(path)),
        Some("yaml") | Some("yml") => Figment::new().merge(Yaml::file(path)),
        _ => {
            return Err(ConfigError::Parse(
                "Unsupported config file format. Use .toml, .json, .yaml, or .yml".into(),
            )
            .into());
        }
    };

    if !path.exists() {
        return Err(ConfigError::Parse(format!(
            "Configuration file not found: {}",
            path.display()
        ))
        .into());
    }

    let config: Config = figment
        .merge(env_provider())
        .extract()
        .map_err(|e| ConfigError::Parse(e.to_string()))?;

    finish(config)
}

fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX).lowercase(false).map(env_key)
}

/// `LISTENER__READ_TIMEOUT_MS` -> `listener.readTimeoutMs`
fn env_key(key: &UncasedStr) -> Uncased<'_> {
    key.as_str()
        .split("__")
        .map(camel_case)
        .collect::<Vec<_>>()
        .join(".")
        .into()
}

fn camel_case(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut upper_next = false;
    for ch in segment.chars() {
        if ch == '_' {
            upper_next = !out.is_empty();
        } else if upper_next {
            out.push(ch.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(ch.to_ascii_lowercase());
        }
    }
    out
}

fn finish(config: Config) -> Result<Config> {
    let config = apply_env_substitutions(config)?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.listener.host.is_empty() {
        return Err(ConfigError::Validation("Listener host must not be empty".into()).into());
    }

    if config.listener.read_timeout_ms == 0 {
        return Err(
            ConfigError::Validation("Read timeout must be greater than 0".into()).into(),
        );
    }

    if config.listener.max_body_bytes == 0 {
        return Err(
            ConfigError::Validation("Max body size must be greater than 0".into()).into(),
        );
    }

    if config.store.capacity == 0 {
        return Err(
            ConfigError::Validation("Store capacity must be greater than 0".into()).into(),
        );
    }

    for (index, rule) in config.classification.rules.iter().enumerate() {
        if rule.pattern.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Classification rule #{index} has an empty pattern"
            ))
            .into());
        }
    }

    validate_upstream("embedding", &config.upstreams.embedding)?;
    validate_upstream("vectorStore", &config.upstreams.vector_store)?;

    if config.forwarding.enabled && config.forwarding.timeout_ms == 0 {
        return Err(
            ConfigError::Validation("Forwarding timeout must be greater than 0".into()).into(),
        );
    }

    Ok(())
}

fn validate_upstream(name: &str, endpoint: &UpstreamEndpoint) -> Result<()> {
    if endpoint.scheme != "http" && endpoint.scheme != "https" {
        return Err(ConfigError::Validation(format!(
            "Upstream '{name}' has unsupported scheme '{}'",
            endpoint.scheme
        ))
        .into());
    }
    endpoint.base_url()?;
    Ok(())
}

fn apply_env_substitutions(mut config: Config) -> Result<Config> {
    config.listener.host = substitute_env_vars(&config.listener.host)?;

    for endpoint in [
        &mut config.upstreams.embedding,
        &mut config.upstreams.vector_store,
    ] {
        endpoint.host = substitute_env_vars(&endpoint.host)?;
    }

    for token in &mut config.redaction.sensitive_tokens {
        *token = substitute_env_vars(token)?;
    }

    Ok(config)
}

fn env_var_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        regex::Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is a valid regex")
    })
}

fn substitute_env_vars(input: &str) -> Result<String> {
    let mut result = input.to_string();

    for cap in env_var_pattern().captures_iter(input) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(value) => {
                result = result.replace(&cap[0], &value);
            }
            Err(_) => {
                // Check if there's a default value (e.g., ${VAR:-default})
                if let Some((name, default)) = var_name.split_once(":-") {
                    match std::env::var(name) {
                        Ok(value) => result = result.replace(&cap[0], &value),
                        Err(_) => result = result.replace(&cap[0], default),
                    }
                } else {
                    return Err(ConfigError::EnvVar(format!(
                        "Environment variable '{var_name}' not found"
                    ))
                    .into());
                }
            }
        }
    }

    Ok(result)
}
