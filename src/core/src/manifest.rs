//! Pipe manifest (`soldexer.json`) loading and validation.
//!
//! The manifest is read once per publish and must validate before any image
//! build starts, so a typo never costs a full `docker build`.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PipeError, Result};

/// Manifest file name, looked up in the working directory.
pub const MANIFEST_FILE: &str = "soldexer.json";

/// Environment variable declarations keyed by variable name.
///
/// Ordered so generated `.env` files are stable between runs.
pub type EnvironmentSchema = BTreeMap<String, EnvVarSpec>;

/// A single declared environment variable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVarSpec {
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, deserialize_with = "lenient_string")]
    pub default: String,
}

/// Accept strings, numbers, booleans and null where a string is expected.
///
/// Server-side schemas are not always typed as strictly as local manifests.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string, found {other}"
        ))),
    }
}

/// Local declarative description of a pipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub name: String,
    pub description: String,
    pub version: String,
    #[serde(default)]
    pub env_schema: EnvironmentSchema,
}

impl Manifest {
    /// Image tag built and saved for this manifest (`name:version`).
    pub fn image_tag(&self) -> String {
        format!("{}:{}", self.name, self.version)
    }

    /// File name of the archive produced by `publish`.
    pub fn archive_file_name(&self) -> String {
        format!("{}-{}.tar", self.name, self.version)
    }

    /// Validate an already-parsed JSON document and convert it.
    pub fn from_value(value: Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| invalid("Configuration must be an object"))?;

        let name = required_string(obj, "name")?;
        let description = required_string(obj, "description")?;
        let version = required_string(obj, "version")?;

        if !is_semver(&version) {
            return Err(invalid(
                "Version must follow semantic versioning format (e.g., 1.0.0)",
            ));
        }

        let env_schema = match obj.get("envSchema") {
            None | Some(Value::Null) => EnvironmentSchema::new(),
            Some(raw) => serde_json::from_value(raw.clone()).map_err(|e| {
                invalid(&format!("Invalid \"envSchema\" field: {e}"))
            })?,
        };

        Ok(Self {
            name,
            description,
            version,
            env_schema,
        })
    }
}

/// Read and validate a manifest file.
pub fn load(path: &Path) -> Result<Manifest> {
    if !path.exists() {
        return Err(PipeError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read(path)?;
    let value: Value = serde_json::from_slice(&content)
        .map_err(|_| PipeError::ConfigMalformed("Invalid JSON format".to_string()))?;

    let manifest = Manifest::from_value(value)?;
    tracing::debug!(
        name = %manifest.name,
        version = %manifest.version,
        env_vars = manifest.env_schema.len(),
        "Loaded manifest"
    );
    Ok(manifest)
}

/// Whether `version` matches `MAJOR.MINOR.PATCH[-PRERELEASE]`.
pub fn is_semver(version: &str) -> bool {
    static SEMVER: OnceLock<Regex> = OnceLock::new();
    SEMVER
        .get_or_init(|| {
            Regex::new(r"^\d+\.\d+\.\d+(-[A-Za-z0-9-]+)?$").expect("semver pattern is valid")
        })
        .is_match(version)
}

fn required_string(obj: &serde_json::Map<String, Value>, field: &str) -> Result<String> {
    match obj.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        _ => Err(invalid(&format!("Missing or invalid \"{field}\" field"))),
    }
}

fn invalid(message: &str) -> PipeError {
    PipeError::ConfigInvalid(message.to_string())
}
