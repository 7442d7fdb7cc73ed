//! corvin-watch configuration (figment-deserialized from defaults /
//! config.toml / env vars)
//
// Two equivalent ways to configure:
//
//   config.toml:     [stream]
//                    endpoint = "http://127.0.0.1:8754/stream/tasks"
//
//   env var:         CORVIN_STREAM__ENDPOINT=...   (double underscore = nesting)

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level tunable configuration, deserialized by figment.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub stream: StreamFileConfig,
}

/// Stream tunables (lives under `[stream]` in config.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StreamFileConfig {
    /// Task event stream endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Start with the stream paused; resume with SIGUSR2.
    #[serde(default)]
    pub paused_on_start: bool,
}

impl Default for StreamFileConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            paused_on_start: false,
        }
    }
}

fn default_endpoint() -> String {
    "http://127.0.0.1:8754/stream/tasks".to_string()
}

/// Build the layered configuration for a data directory.
pub fn load_config(data_dir: &Path) -> figment::Figment {
    use figment::{
        Figment,
        providers::{Env, Format, Serialized, Toml},
    };

    Figment::from(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(data_dir.join("config.toml")))
        .merge(Env::prefixed("CORVIN_").split("__"))
}
