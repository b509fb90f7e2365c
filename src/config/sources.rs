use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "LOGBEAT_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/logbeat.toml";
const ENV_PREFIX: &str = "LOGBEAT";
const ENV_SEPARATOR: &str = "__";

/// Where the loaded settings came from
///
/// Loading happens before the tracing subscriber exists, so the caller logs
/// this once telemetry is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    File(PathBuf),
    Defaults { missing: PathBuf },
}

impl ConfigOrigin {
    pub fn log(&self) {
        match self {
            ConfigOrigin::File(path) => {
                tracing::info!("Loaded configuration from: {}", path.display());
            }
            ConfigOrigin::Defaults { missing } => {
                tracing::warn!(
                    "Configuration file not found at {}, using defaults and environment overrides",
                    missing.display()
                );
            }
        }
    }
}

/// Config file location: `LOGBEAT_CONFIG` or the default path
fn default_path() -> PathBuf {
    env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (`path`, else `LOGBEAT_CONFIG`, else the default path)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load(path: Option<PathBuf>) -> Result<(Config, ConfigOrigin), ConfigError> {
    // Load .env file if it exists (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    load_from_sources(path.unwrap_or_else(default_path))
}

/// Layer the worker/journal/telemetry settings from `config_path` under `LOGBEAT__*` overrides
pub fn load_from_sources(config_path: PathBuf) -> Result<(Config, ConfigOrigin), ConfigError> {
    let mut builder = config::Config::builder();

    let origin = if config_path.exists() {
        builder = builder.add_source(File::from(config_path.clone()).required(false));
        ConfigOrigin::File(config_path)
    } else {
        ConfigOrigin::Defaults {
            missing: config_path,
        }
    };

    // LOGBEAT__WORKER__HEARTBEAT_INTERVAL -> worker.heartbeat_interval
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let config = builder.build()?.try_deserialize()?;
    Ok((config, origin))
}
