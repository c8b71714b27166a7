//! Image build and archive serialization.

use std::path::{Path, PathBuf};

use crate::config::StageTimeouts;
use crate::error::{PipeError, Result};
use crate::manifest::Manifest;
use crate::tool::ExternalTool;

/// Builds the image for a manifest and saves it to a single `.tar` file.
pub struct ArchiveBuilder<'a> {
    tool: &'a dyn ExternalTool,
    context_dir: PathBuf,
    timeouts: StageTimeouts,
}

impl<'a> ArchiveBuilder<'a> {
    pub fn new(tool: &'a dyn ExternalTool, context_dir: &Path, timeouts: StageTimeouts) -> Self {
        Self {
            tool,
            context_dir: context_dir.to_path_buf(),
            timeouts,
        }
    }

    /// Deterministic archive location for `manifest`.
    pub fn archive_path(&self, manifest: &Manifest) -> PathBuf {
        self.context_dir.join(manifest.archive_file_name())
    }

    /// Build `name:version` from the context directory and save it.
    ///
    /// The caller owns the returned file and is responsible for removing it.
    pub async fn build(&self, manifest: &Manifest) -> Result<PathBuf> {
        let tag = manifest.image_tag();
        self.build_image(&tag).await?;

        let archive = self.archive_path(manifest);
        self.save_image(&tag, &archive).await?;
        Ok(archive)
    }

    async fn build_image(&self, tag: &str) -> Result<()> {
        println!("🏗️  Building Docker image: {tag}");

        let args = vec![
            "build".to_string(),
            "-t".to_string(),
            tag.to_string(),
            self.context_dir.display().to_string(),
        ];
        let timeout = self.timeouts.build();
        let output = self.tool.execute(&args, timeout).await?;

        if !output.success() {
            return Err(PipeError::BuildFailed {
                message: format!("{} build {}", self.tool.program(), output.failure_summary(timeout)),
                output: output.diagnostics(),
            });
        }

        // docker build writes its progress log to stderr even on success.
        if !output.stderr.trim().is_empty() {
            tracing::debug!(output = %output.stderr.trim(), "Build output");
        }
        println!("✅ Docker image built successfully");
        Ok(())
    }

    async fn save_image(&self, tag: &str, archive: &Path) -> Result<()> {
        println!("📦 Saving Docker image to {}", archive.display());

        let args = vec![
            "save".to_string(),
            "-o".to_string(),
            archive.display().to_string(),
            tag.to_string(),
        ];
        let timeout = self.timeouts.save();
        let output = self.tool.execute(&args, timeout).await?;

        if !output.success() {
            return Err(PipeError::SerializeFailed {
                message: format!("{} save {}", self.tool.program(), output.failure_summary(timeout)),
                output: output.diagnostics(),
            });
        }

        if !archive.exists() {
            return Err(PipeError::SerializeFailed {
                message: format!("archive {} was not created", archive.display()),
                output: output.diagnostics(),
            });
        }

        println!("✅ Docker image saved successfully");
        Ok(())
    }
}
