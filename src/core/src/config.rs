use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{PipeError, Result};

/// Default artifact service URL
pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

/// Default container tool executable
pub const DEFAULT_TOOL_PROGRAM: &str = "docker";

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Artifact service base URL
    pub server_url: String,

    /// Directory holding soldexer.json, the build context, archives and `.env`
    pub work_dir: PathBuf,

    /// Container tool executable (docker or a compatible CLI)
    pub tool_program: String,

    /// Stage timeouts
    pub timeouts: StageTimeouts,

    /// Reject archives larger than this before uploading (disabled when None)
    pub max_archive_bytes: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            work_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            tool_program: DEFAULT_TOOL_PROGRAM.to_string(),
            timeouts: StageTimeouts::default(),
            max_archive_bytes: None,
        }
    }
}

impl PipelineConfig {
    /// Path of the manifest inside the working directory.
    pub fn manifest_path(&self) -> PathBuf {
        self.work_dir.join(crate::manifest::MANIFEST_FILE)
    }

    /// Path of the environment file inside the working directory.
    pub fn env_file_path(&self) -> PathBuf {
        self.work_dir.join(crate::envfile::ENV_FILE)
    }

    /// Validated server URL with any trailing slash removed.
    pub fn server_base(&self) -> Result<String> {
        validate_server_url(&self.server_url)
    }
}

/// Per-stage timeouts, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTimeouts {
    pub build_secs: u64,
    pub save_secs: u64,
    pub load_secs: u64,
    pub locate_secs: u64,
    pub env_schema_secs: u64,
    pub list_secs: u64,
    pub upload_secs: u64,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            build_secs: 300,
            save_secs: 180,
            load_secs: 300,
            locate_secs: 30,
            env_schema_secs: 10,
            list_secs: 30,
            upload_secs: 600,
        }
    }
}

impl StageTimeouts {
    pub fn build(&self) -> Duration {
        Duration::from_secs(self.build_secs)
    }

    pub fn save(&self) -> Duration {
        Duration::from_secs(self.save_secs)
    }

    pub fn load(&self) -> Duration {
        Duration::from_secs(self.load_secs)
    }

    pub fn locate(&self) -> Duration {
        Duration::from_secs(self.locate_secs)
    }

    pub fn env_schema(&self) -> Duration {
        Duration::from_secs(self.env_schema_secs)
    }

    pub fn list(&self) -> Duration {
        Duration::from_secs(self.list_secs)
    }

    pub fn upload(&self) -> Duration {
        Duration::from_secs(self.upload_secs)
    }
}

/// Check that a server URL is absolute http(s) and return it without a trailing slash.
pub fn validate_server_url(server_url: &str) -> Result<String> {
    let url = reqwest::Url::parse(server_url.trim())
        .map_err(|_| PipeError::Validation("Invalid server URL format".to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(PipeError::Validation(
            "Server URL must use HTTP or HTTPS protocol".to_string(),
        ));
    }

    if url.host_str().is_none() {
        return Err(PipeError::Validation("Invalid server URL format".to_string()));
    }

    Ok(server_url.trim().trim_end_matches('/').to_string())
}
