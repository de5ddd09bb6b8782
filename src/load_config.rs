/// `load_config` module: turns a YAML file or the process environment into a validated
/// [`TransferConfig`].
///
/// Two entry shapes exist because the job runs both locally (config file next to the
/// binary) and as a scheduled function (everything in environment variables). Both end
/// in [`TransferConfig::validate`], so a missing required value is fatal before any
/// request is made.
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::Path;
use tracing::{error, info};

use crate::config::{NameMatch, SinkConfig, SourceConfig, TransferConfig};

pub const ENV_FOLDER_ID: &str = "DRIVE_FOLDER_ID";
pub const ENV_SHARED_DRIVE_ID: &str = "SHARED_DRIVE_ID";
pub const ENV_FILE_NAMES: &str = "DRIVE_FILE_NAMES";
pub const ENV_NAME_MATCH: &str = "DRIVE_NAME_MATCH";
pub const ENV_PAGE_SIZE: &str = "DRIVE_PAGE_SIZE";
pub const ENV_BUCKET: &str = "GCS_BUCKET_NAME";
pub const ENV_PREFIX: &str = "GCS_DESTINATION_PREFIX";
pub const ENV_TIMEOUT: &str = "TRANSFER_TIMEOUT_SECS";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<TransferConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let config: TransferConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    config.validate().context("Invalid configuration")?;
    config.trace_loaded();
    Ok(config)
}

/// Builds the configuration from environment variables only (scheduled-function mode).
pub fn load_config_from_env() -> Result<TransferConfig> {
    info!("Loading configuration from environment");

    let file_names = optional_var(ENV_FILE_NAMES)
        .map(|raw| split_names(&raw))
        .unwrap_or_default();

    let name_match = match optional_var(ENV_NAME_MATCH) {
        Some(raw) => raw
            .parse::<NameMatch>()
            .with_context(|| format!("{ENV_NAME_MATCH} is invalid"))?,
        None => NameMatch::default(),
    };

    let page_size = match optional_var(ENV_PAGE_SIZE) {
        Some(raw) => raw
            .parse::<u32>()
            .with_context(|| format!("{ENV_PAGE_SIZE} must be an integer, got '{raw}'"))?,
        None => 200,
    };

    let task_timeout_secs = match optional_var(ENV_TIMEOUT) {
        Some(raw) => Some(
            raw.parse::<u64>()
                .with_context(|| format!("{ENV_TIMEOUT} must be an integer, got '{raw}'"))?,
        ),
        None => None,
    };

    let config = TransferConfig {
        source: SourceConfig {
            folder_id: optional_var(ENV_FOLDER_ID).unwrap_or_default(),
            shared_drive_id: optional_var(ENV_SHARED_DRIVE_ID),
            file_names,
            name_match,
            page_size,
        },
        sink: SinkConfig {
            bucket: optional_var(ENV_BUCKET).unwrap_or_default(),
            destination_prefix: optional_var(ENV_PREFIX).unwrap_or_default(),
        },
        task_timeout_secs,
    };

    if let Err(e) = config.validate() {
        error!(error = %e, "Environment configuration is incomplete");
        return Err(anyhow::Error::new(e).context("Invalid configuration from environment"));
    }
    config.trace_loaded();
    Ok(config)
}

/// Empty values count as unset.
fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn split_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_owned)
        .collect()
}
