//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.kestrace/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{LevelFilter, debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::table::DEFAULT_HISTORY;

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TraceConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub trace: TraceSection,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    pub endpoint: Option<String>,
    pub client_cert: Option<PathBuf>,
    pub client_key: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TraceSection {
    pub history: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LogConfig {
    pub file: Option<PathBuf>,
    pub level: Option<String>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_ENDPOINT: &str = "https://127.0.0.1:7373";
pub const DEFAULT_LOG_FILE: &str = "kestrace.log";

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub endpoint: String,
    pub client_cert: Option<PathBuf>,
    pub client_key: Option<PathBuf>,
    pub insecure: bool,
    pub history: usize,
    pub log_file: PathBuf,
    pub log_level: LevelFilter,
}

/// Values supplied on the command line. `None` means "not specified".
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub endpoint: Option<String>,
    pub insecure: bool,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.kestrace/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".kestrace").join("config.toml"))
}

/// Load config from `~/.kestrace/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `TraceConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<TraceConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(TraceConfig::default());
        }
    };

    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(&path);
        return Ok(TraceConfig::default());
    }

    let contents = fs::read_to_string(&path).map_err(ConfigError::Io)?;
    let config: TraceConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &Path) {
    let default_content = r#"# kestrace Configuration
# All settings are optional; defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [server]
# endpoint = "https://127.0.0.1:7373"   # Or set KES_SERVER env var / --server
# client_cert = "/path/to/client.crt"   # Or set KES_CLIENT_CERT env var
# client_key = "/path/to/client.key"    # Or set KES_CLIENT_KEY env var

# [trace]
# history = 1000                        # Rows kept in the table

# [log]
# file = "kestrace.log"
# level = "debug"                       # "off", "error", "warn", "info", "debug", "trace"
"#;

    if let Some(parent) = path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!("Failed to create config directory: {}", e);
        return;
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
pub fn resolve(config: &TraceConfig, cli: &CliOverrides) -> ResolvedConfig {
    resolve_with_env(config, cli, |key| std::env::var(key).ok())
}

/// Like [`resolve`], reading environment variables through `env`.
pub fn resolve_with_env(
    config: &TraceConfig,
    cli: &CliOverrides,
    env: impl Fn(&str) -> Option<String>,
) -> ResolvedConfig {
    // Endpoint: CLI → env → config → default
    let endpoint = cli
        .endpoint
        .clone()
        .or_else(|| env("KES_SERVER"))
        .or_else(|| config.server.endpoint.clone())
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

    // Client identity: env → config
    let client_cert = env("KES_CLIENT_CERT")
        .map(PathBuf::from)
        .or_else(|| config.server.client_cert.clone());
    let client_key = env("KES_CLIENT_KEY")
        .map(PathBuf::from)
        .or_else(|| config.server.client_key.clone());

    let log_level = match config.log.level.as_deref() {
        None => LevelFilter::Debug,
        Some(level) => level.parse().unwrap_or_else(|_| {
            warn!("Unknown log level {:?}, using debug", level);
            LevelFilter::Debug
        }),
    };

    ResolvedConfig {
        endpoint,
        client_cert,
        client_key,
        insecure: cli.insecure,
        history: config.trace.history.unwrap_or(DEFAULT_HISTORY),
        log_file: config
            .log
            .file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
        log_level,
    }
}
