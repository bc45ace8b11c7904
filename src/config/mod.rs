pub mod loader;
pub mod overrides;
pub mod schema;

pub use loader::{load_from_env_or_file, load_from_path, validate};
pub use overrides::{apply_overrides, CliOverrides};
pub use schema::{
    ClassificationConfig, Config, ForwardingConfig, ListenerConfig, RedactionConfig, StoreConfig,
    UpstreamEndpoint, UpstreamsConfig,
};
