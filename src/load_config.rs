/// `load_config` module: Loads a static YAML config and injects credentials from the environment.
///
/// This module is the only place where the user-supplied YAML file is parsed and
/// mapped to the strongly-typed [`SynchroniseConfig`] plus connection settings.
///
/// # Responsibilities
/// - Parse the YAML file into type-safe Rust structs
/// - Validate the endpoint URL and the local root before anything touches the network
/// - Inject credentials from `CMIS_USERNAME` / `CMIS_PASSWORD`, falling back to
///   the `admin`/`admin` development defaults with a warning
///
/// # Errors
/// All errors use `anyhow::Error` for context-rich diagnostics and surface at the CLI boundary.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cmis_sync_core::synchronise::SynchroniseConfig;
use serde::Deserialize;
use tracing::{error, info, warn};
use url::Url;

use crate::cmis::Credentials;

pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "admin";
pub const USERNAME_ENV: &str = "CMIS_USERNAME";
pub const PASSWORD_ENV: &str = "CMIS_PASSWORD";

/// Where and how to connect.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub url: Url,
    pub repository_id: Option<String>,
    pub credentials: Credentials,
}

/// Everything the `upload` command needs.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub connection: ConnectionConfig,
    pub sync: SynchroniseConfig,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StaticConfig {
    url: String,
    #[serde(default)]
    repository_id: Option<String>,
    local_path: PathBuf,
    dest_path: String,
    #[serde(default)]
    overwrite: bool,
    #[serde(default)]
    skip_segments: usize,
    #[serde(default)]
    fail_fast: bool,
    #[serde(default)]
    allow_duplicates: bool,
}

/// Loads a static YAML config file (no secrets) and injects credentials from the environment.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = fs::read_to_string(path_ref).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
        anyhow::anyhow!("Failed to read config file {:?}: {}", path_ref, e)
    })?;

    let raw: StaticConfig = serde_yaml::from_str(&config_content).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
        anyhow::anyhow!("Failed to parse config YAML: {e}")
    })?;
    info!(config_path = ?path_ref, "Parsed config YAML successfully");

    let url = Url::parse(&raw.url).with_context(|| format!("Invalid CMIS url {:?}", raw.url))?;

    if !raw.local_path.is_dir() {
        error!(local_path = %raw.local_path.display(), "local_path is not a directory");
        anyhow::bail!(
            "local_path {} is not an existing directory",
            raw.local_path.display()
        );
    }
    if raw.dest_path.trim().is_empty() {
        anyhow::bail!("dest_path must not be empty");
    }

    let credentials = credentials_from_env();

    let mut sync = SynchroniseConfig::new(raw.local_path, raw.dest_path);
    sync.overwrite = raw.overwrite;
    sync.skip_segments = raw.skip_segments;
    sync.fail_fast = raw.fail_fast;
    sync.allow_duplicates = raw.allow_duplicates;

    info!(
        url = %url,
        local_path = %sync.local_root.display(),
        dest_path = %sync.dest_root,
        overwrite = sync.overwrite,
        skip_segments = sync.skip_segments,
        "Config loaded and merged successfully"
    );

    Ok(CliConfig {
        connection: ConnectionConfig {
            url,
            repository_id: raw.repository_id,
            credentials,
        },
        sync,
    })
}

fn credentials_from_env() -> Credentials {
    let username = std::env::var(USERNAME_ENV).ok();
    let password = std::env::var(PASSWORD_ENV).ok();
    if username.is_none() || password.is_none() {
        warn!(
            "{USERNAME_ENV}/{PASSWORD_ENV} not set, using default credentials (not for production use)"
        );
    }
    Credentials {
        username: username.unwrap_or_else(|| DEFAULT_USERNAME.to_string()),
        password: password.unwrap_or_else(|| DEFAULT_PASSWORD.to_string()),
    }
}
