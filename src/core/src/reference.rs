//! `name:version` package references.

use std::fmt;
use std::str::FromStr;

use crate::error::{PipeError, Result};

/// Identifies a remote pipe by name and version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactReference {
    pub name: String,
    pub version: String,
}

impl ArtifactReference {
    /// Parse a `name:version` token.
    ///
    /// Both parts must be non-empty and exactly one `:` is allowed.
    pub fn parse(spec: &str) -> Result<Self> {
        let invalid = || {
            PipeError::Validation(
                "Package specification must be in format <name>:<version>".to_string(),
            )
        };

        let (name, version) = spec.trim().split_once(':').ok_or_else(invalid)?;
        if name.is_empty() || version.is_empty() || version.contains(':') {
            return Err(invalid());
        }
        for part in [name, version] {
            if !is_path_safe(part) {
                return Err(PipeError::Validation(format!(
                    "Invalid package specification \"{part}\": '/', '\\', '?', '#' and '..' are not allowed"
                )));
            }
        }

        Ok(Self {
            name: name.to_string(),
            version: version.to_string(),
        })
    }

    /// File name of the archive downloaded by `run`.
    pub fn archive_file_name(&self) -> String {
        format!("{}_{}.tar", self.name, self.version)
    }
}

/// Whether `part` is a single URL path segment and a plain file name.
fn is_path_safe(part: &str) -> bool {
    !part.contains(['/', '\\', '?', '#']) && !part.contains("..")
}

impl FromStr for ArtifactReference {
    type Err = PipeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ArtifactReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}
