//! Load a downloaded archive into the container runtime and run it.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use crate::cleanup::ArchiveGuard;
use crate::error::{PipeError, Result};
use crate::tool::ExternalTool;

/// How a run ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Container exited 0.
    Completed { image: String },
    /// The load output named no image, so nothing was run.
    NoImage,
}

/// Drives `load` then `run --rm` through a [`ExternalTool`].
pub struct Orchestrator<'a> {
    tool: &'a dyn ExternalTool,
    load_timeout: Duration,
}

impl<'a> Orchestrator<'a> {
    pub fn new(tool: &'a dyn ExternalTool, load_timeout: Duration) -> Self {
        Self { tool, load_timeout }
    }

    /// Load `archive`, delete it, then run the loaded image.
    ///
    /// `env_file` is passed as `--env-file` when present. The archive is
    /// removed on every path, including load failure.
    pub async fn load_and_run(
        &self,
        archive: ArchiveGuard,
        env_file: Option<&Path>,
    ) -> Result<RunOutcome> {
        let image = self.load(archive.path()).await?;
        archive.cleanup();

        let Some(image) = image else {
            tracing::warn!("Load output did not name an image");
            eprintln!("⚠ Could not extract image name from docker load output");
            return Ok(RunOutcome::NoImage);
        };

        self.run(&image, env_file).await?;
        Ok(RunOutcome::Completed { image })
    }

    /// Load the archive and return the image it reported, if any.
    async fn load(&self, archive: &Path) -> Result<Option<String>> {
        println!("Loading Docker image...");

        let args = vec![
            "load".to_string(),
            "-i".to_string(),
            archive.display().to_string(),
        ];
        let output = self.tool.execute(&args, self.load_timeout).await?;

        if !output.success() {
            return Err(PipeError::LoadFailed {
                message: format!(
                    "{} load {}",
                    self.tool.program(),
                    output.failure_summary(self.load_timeout)
                ),
                output: output.diagnostics(),
            });
        }

        println!("✓ Docker image loaded successfully");
        if !output.stdout.trim().is_empty() {
            println!("{}", output.stdout.trim());
        }
        Ok(parse_loaded_image(&output.stdout))
    }

    async fn run(&self, image: &str, env_file: Option<&Path>) -> Result<()> {
        println!("Running Docker container: {image}");

        let args = run_args(image, env_file);
        let code = self.tool.run_attached(&args).await?;
        if code != 0 {
            return Err(PipeError::ContainerRunFailed { code });
        }

        println!("\n✓ Docker container executed successfully");
        Ok(())
    }
}

/// Arguments for `run --rm [--env-file FILE] IMAGE`.
pub fn run_args(image: &str, env_file: Option<&Path>) -> Vec<String> {
    let mut args = vec!["run".to_string(), "--rm".to_string()];
    if let Some(path) = env_file {
        args.push("--env-file".to_string());
        args.push(path.display().to_string());
    }
    args.push(image.to_string());
    args
}

/// First image named by `docker load` output.
///
/// Recognizes `Loaded image: name:tag` and `Loaded image ID: sha256:...`.
pub fn parse_loaded_image(stdout: &str) -> Option<String> {
    static LOADED: OnceLock<Regex> = OnceLock::new();
    LOADED
        .get_or_init(|| Regex::new(r"Loaded image(?: ID)?: (\S+)").expect("load pattern is valid"))
        .captures(stdout)
        .map(|c| c[1].to_string())
}

/// Env file to pass to `run`, if one exists.
pub fn existing_env_file(path: PathBuf) -> Option<PathBuf> {
    path.is_file().then_some(path)
}
