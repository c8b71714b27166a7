//! `.env` materialization from an environment schema.
//!
//! An existing `.env` is never touched: users edit it by hand after the
//! first run and those values must survive every later run.

use std::io::Write;
use std::path::Path;

use crate::error::Result;
use crate::manifest::EnvironmentSchema;

/// Environment file name, looked up in the working directory.
pub const ENV_FILE: &str = ".env";

/// What [`materialize`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvFileOutcome {
    /// A new file was written with this many variables.
    Created(usize),
    /// A file already existed and was left as is.
    AlreadyPresent,
}

/// Render `KEY=default` lines, one per schema entry.
pub fn render(schema: &EnvironmentSchema) -> String {
    schema
        .iter()
        .map(|(key, spec)| format!("{key}={}", spec.default))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Write `path` from `schema` unless it already exists.
pub fn materialize(path: &Path, schema: &EnvironmentSchema) -> Result<EnvFileOutcome> {
    if path.exists() {
        return Ok(EnvFileOutcome::AlreadyPresent);
    }

    // create_new closes the gap between the exists() check and the write.
    let mut file = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
    {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            return Ok(EnvFileOutcome::AlreadyPresent)
        }
        Err(e) => return Err(e.into()),
    };
    file.write_all(render(schema).as_bytes())?;

    tracing::debug!(path = %path.display(), vars = schema.len(), "Created env file");
    Ok(EnvFileOutcome::Created(schema.len()))
}
