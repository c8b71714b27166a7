//! New project scaffolding from the pipe template repository.

use std::path::Path;
use std::time::Duration;

use serde_json::Value;

use crate::error::{PipeError, Result};
use crate::manifest::MANIFEST_FILE;
use crate::tool::ExternalTool;

/// Template cloned by `init`.
pub const TEMPLATE_REPOSITORY: &str = "https://github.com/iankressin/pipe-template.git";

/// Directory name used when none is given.
pub const DEFAULT_PROJECT_NAME: &str = "my-soldexer-project";

/// Upper bound for the template clone.
pub const CLONE_TIMEOUT: Duration = Duration::from_secs(120);

/// Clone `template_url` into `target` and make it a fresh project.
///
/// The template's git history is dropped and the manifest `name` is set to
/// the directory name. Returns that name.
pub async fn init_project(
    git: &dyn ExternalTool,
    target: &Path,
    template_url: &str,
) -> Result<String> {
    if target.exists() {
        return Err(PipeError::Validation(format!(
            "Directory {} already exists",
            target.display()
        )));
    }

    let project_name = target
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| {
            PipeError::Validation(format!("Invalid project directory: {}", target.display()))
        })?;

    println!("Creating new Soldexer project in {}...", target.display());

    let args = vec![
        "clone".to_string(),
        template_url.to_string(),
        target.display().to_string(),
    ];
    let output = git.execute(&args, CLONE_TIMEOUT).await?;
    if !output.success() {
        return Err(PipeError::TemplateFailed {
            message: format!("{} clone {}", git.program(), output.failure_summary(CLONE_TIMEOUT)),
            output: output.diagnostics(),
        });
    }

    match tokio::fs::remove_dir_all(target.join(".git")).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let manifest_path = target.join(MANIFEST_FILE);
    if manifest_path.exists() {
        rename_manifest(&manifest_path, &project_name).await?;
    }

    tracing::debug!(path = %target.display(), "Project created");
    Ok(project_name)
}

async fn rename_manifest(path: &Path, name: &str) -> Result<()> {
    let content = tokio::fs::read_to_string(path).await?;
    let mut value: Value = serde_json::from_str(&content)
        .map_err(|_| PipeError::ConfigMalformed("Invalid JSON format".to_string()))?;

    let obj = value
        .as_object_mut()
        .ok_or_else(|| PipeError::ConfigInvalid("Configuration must be an object".to_string()))?;
    obj.insert("name".to_string(), Value::String(name.to_string()));

    let mut rendered = serde_json::to_string_pretty(&value)?;
    rendered.push('\n');
    tokio::fs::write(path, rendered).await?;
    Ok(())
}
