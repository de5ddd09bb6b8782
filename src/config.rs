use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

/// Drive's own upper bound on `pageSize`.
pub const MAX_PAGE_SIZE: u32 = 1000;

fn default_page_size() -> u32 {
    200
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferConfig {
    pub source: SourceConfig,
    pub sink: SinkConfig,
    /// Per-file limit; a transfer still running after this is reported as failed.
    #[serde(default)]
    pub task_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub folder_id: String,
    /// Shared drive to search. Without it only the caller's own drive is listed.
    #[serde(default)]
    pub shared_drive_id: Option<String>,
    pub file_names: Vec<String>,
    #[serde(default)]
    pub name_match: NameMatch,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SinkConfig {
    pub bucket: String,
    #[serde(default)]
    pub destination_prefix: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameMatch {
    #[default]
    Exact,
    Contains,
}

impl std::str::FromStr for NameMatch {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(NameMatch::Exact),
            "contains" => Ok(NameMatch::Contains),
            other => Err(ConfigError::Invalid {
                field: "name_match",
                reason: format!("expected 'exact' or 'contains', got '{other}'"),
            }),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration value: {0}")]
    Missing(&'static str),
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl TransferConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.folder_id.trim().is_empty() {
            return Err(ConfigError::Missing("source.folder_id"));
        }
        if self.sink.bucket.trim().is_empty() {
            return Err(ConfigError::Missing("sink.bucket"));
        }
        if self.source.file_names.iter().all(|n| n.trim().is_empty()) {
            return Err(ConfigError::Missing("source.file_names"));
        }
        if self.source.page_size == 0 || self.source.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::Invalid {
                field: "source.page_size",
                reason: format!("must be between 1 and {MAX_PAGE_SIZE}"),
            });
        }
        if self.task_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid {
                field: "task_timeout_secs",
                reason: "must be positive when set".to_string(),
            });
        }
        Ok(())
    }

    pub fn task_timeout(&self) -> Option<std::time::Duration> {
        self.task_timeout_secs.map(std::time::Duration::from_secs)
    }

    pub fn trace_loaded(&self) {
        info!(
            folder_id = %self.source.folder_id,
            shared_drive = self.source.shared_drive_id.is_some(),
            file_names = self.source.file_names.len(),
            bucket = %self.sink.bucket,
            prefix = %self.sink.destination_prefix,
            "Loaded TransferConfig"
        );
        debug!(?self, "TransferConfig loaded (full debug)");
    }
}
