use std::path::PathBuf;

use thiserror::Error;

/// Soldexer pipeline error types
#[derive(Error, Debug)]
pub enum PipeError {
    /// Manifest file is absent
    #[error("File not found: {}", path.display())]
    ConfigNotFound { path: PathBuf },

    /// Manifest is not parseable JSON
    #[error("Invalid soldexer.json: {0}")]
    ConfigMalformed(String),

    /// Manifest parsed but a field is missing, wrong-typed, or out of range
    #[error("Invalid soldexer.json: {0}")]
    ConfigInvalid(String),

    /// Bad user input (server URL, package reference, size policy)
    #[error("{0}")]
    Validation(String),

    /// Image build failed
    #[error("Image build failed: {message}")]
    BuildFailed { message: String, output: String },

    /// Image could not be serialized to an archive
    #[error("Image save failed: {message}")]
    SerializeFailed { message: String, output: String },

    /// Archive could not be loaded into the container runtime
    #[error("Image load failed: {message}")]
    LoadFailed { message: String, output: String },

    /// An external tool could not be started at all
    #[error("Failed to start {program}: {message}")]
    SpawnFailed { program: String, message: String },

    /// Project template could not be fetched
    #[error("Failed to fetch project template: {message}")]
    TemplateFailed { message: String, output: String },

    /// Container ran but exited with a nonzero status
    #[error("Container exited with code {code}")]
    ContainerRunFailed { code: i32 },

    /// Server has no package under this name and version
    #[error("Package not found: {name}:{version}")]
    PackageNotFound { name: String, version: String },

    /// Server answered with an unexpected status
    #[error("Server responded with status {status}{}", server_message(.message))]
    ServerError {
        status: u16,
        message: Option<String>,
    },

    /// Network or transport failure
    #[error("Transfer error: {0}")]
    Transfer(String),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

fn server_message(message: &Option<String>) -> String {
    match message {
        Some(m) => format!(": {m}"),
        None => String::new(),
    }
}

impl PipeError {
    /// Operator-actionable advice printed after the error message.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            PipeError::ConfigNotFound { .. } => {
                Some("Make sure soldexer.json exists in the current directory")
            }
            PipeError::ConfigMalformed(_) | PipeError::ConfigInvalid(_) => {
                Some("Please check your soldexer.json file format")
            }
            PipeError::BuildFailed { .. } => Some(
                "Make sure you have a Dockerfile in the current directory and Docker is running",
            ),
            PipeError::SerializeFailed { .. } | PipeError::LoadFailed { .. } => {
                Some("Ensure the Docker daemon is running and has enough disk space")
            }
            PipeError::SpawnFailed { .. } => {
                Some("Ensure the build tool is installed and available on PATH")
            }
            PipeError::TemplateFailed { .. } => {
                Some("Make sure git is installed and you have network connectivity")
            }
            PipeError::Transfer(_) | PipeError::Timeout(_) => {
                Some("Make sure the server is running and accessible")
            }
            _ => None,
        }
    }

    /// Process exit status for this error.
    ///
    /// A failed container forwards its own code; everything else is 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            PipeError::ContainerRunFailed { code } if *code != 0 => *code,
            _ => 1,
        }
    }

    /// Diagnostic output captured from the external tool, if any.
    pub fn tool_output(&self) -> Option<&str> {
        match self {
            PipeError::BuildFailed { output, .. }
            | PipeError::SerializeFailed { output, .. }
            | PipeError::LoadFailed { output, .. }
            | PipeError::TemplateFailed { output, .. } => {
                if output.trim().is_empty() {
                    None
                } else {
                    Some(output.as_str())
                }
            }
            _ => None,
        }
    }
}

impl From<serde_json::Error> for PipeError {
    fn from(err: serde_json::Error) -> Self {
        PipeError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for PipeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PipeError::Timeout(err.to_string())
        } else {
            PipeError::Transfer(err.to_string())
        }
    }
}

/// Result type alias for Soldexer operations
pub type Result<T> = std::result::Result<T, PipeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_not_found_display() {
        let error = PipeError::ConfigNotFound {
            path: PathBuf::from("/work/soldexer.json"),
        };
        assert_eq!(error.to_string(), "File not found: /work/soldexer.json");
        assert!(error.hint().unwrap().contains("soldexer.json"));
    }

    #[test]
    fn test_config_invalid_display() {
        let error = PipeError::ConfigInvalid("Missing or invalid \"name\" field".to_string());
        assert_eq!(
            error.to_string(),
            "Invalid soldexer.json: Missing or invalid \"name\" field"
        );
    }

    #[test]
    fn test_build_failed_keeps_output() {
        let error = PipeError::BuildFailed {
            message: "exit status 1".to_string(),
            output: "failed to read Dockerfile".to_string(),
        };
        assert_eq!(error.to_string(), "Image build failed: exit status 1");
        assert_eq!(error.tool_output(), Some("failed to read Dockerfile"));
    }

    #[test]
    fn test_tool_output_empty_is_none() {
        let error = PipeError::LoadFailed {
            message: "exit status 1".to_string(),
            output: "  \n".to_string(),
        };
        assert!(error.tool_output().is_none());
    }

    #[test]
    fn test_server_error_display() {
        let error = PipeError::ServerError {
            status: 500,
            message: Some("disk full".to_string()),
        };
        assert_eq!(
            error.to_string(),
            "Server responded with status 500: disk full"
        );

        let error = PipeError::ServerError {
            status: 502,
            message: None,
        };
        assert_eq!(error.to_string(), "Server responded with status 502");
    }

    #[test]
    fn test_package_not_found_display() {
        let error = PipeError::PackageNotFound {
            name: "demo".to_string(),
            version: "1.0.0".to_string(),
        };
        assert_eq!(error.to_string(), "Package not found: demo:1.0.0");
    }

    #[test]
    fn test_exit_code_forwards_container_code() {
        assert_eq!(PipeError::ContainerRunFailed { code: 3 }.exit_code(), 3);
        assert_eq!(PipeError::ContainerRunFailed { code: 0 }.exit_code(), 1);
        assert_eq!(PipeError::Validation("bad".to_string()).exit_code(), 1);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: PipeError = io_error.into();
        assert!(matches!(error, PipeError::Io(_)));
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let result: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope");
        let error: PipeError = result.unwrap_err().into();
        assert!(matches!(error, PipeError::Serialization(_)));
    }

    #[test]
    fn test_spawn_failed_hint() {
        let error = PipeError::SpawnFailed {
            program: "docker".to_string(),
            message: "No such file or directory".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to start docker: No such file or directory"
        );
        assert!(error.hint().unwrap().contains("installed"));
    }
}
