//! The `publish` and `run` pipelines.
//!
//! publish: load manifest → build → save → size check → upload → cleanup.
//! run: locate package → prepare `.env` → download → load → run.
//!
//! Each archive is held by an [`ArchiveGuard`] from before it is created
//! until it is consumed, so it is removed on every exit path.

use std::path::Path;

use crate::builder::ArchiveBuilder;
use crate::cleanup::ArchiveGuard;
use crate::config::PipelineConfig;
use crate::envfile::{self, EnvFileOutcome};
use crate::error::{PipeError, Result};
use crate::manifest;
use crate::orchestrator::{existing_env_file, Orchestrator, RunOutcome};
use crate::progress::{format_bytes, track_elapsed, SharedProgress};
use crate::reference::ArtifactReference;
use crate::tool::ExternalTool;
use crate::transfer::{Download, TransferClient};

/// Summary of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub name: String,
    pub version: String,
    pub archive_bytes: u64,
}

/// Build the pipe in `config.work_dir` and upload it.
pub async fn publish(
    config: &PipelineConfig,
    tool: &dyn ExternalTool,
    progress: SharedProgress,
) -> Result<PublishReport> {
    let server = config.server_base()?;
    let manifest = manifest::load(&config.manifest_path())?;
    let client = TransferClient::new(&server, config.timeouts.clone())?;

    let builder = ArchiveBuilder::new(tool, &config.work_dir, config.timeouts.clone());
    let archive = ArchiveGuard::new(builder.archive_path(&manifest));
    builder.build(&manifest).await?;

    let archive_bytes = tokio::fs::metadata(archive.path()).await?.len();
    if let Some(max) = config.max_archive_bytes {
        if archive_bytes > max {
            return Err(PipeError::Validation(format!(
                "Archive size ({}) exceeds maximum allowed size ({})",
                format_bytes(archive_bytes),
                format_bytes(max)
            )));
        }
    }

    println!("\n🚀 Uploading to server...");
    println!(
        "Publishing {} v{} ({}) to {}",
        manifest.name,
        manifest.version,
        format_bytes(archive_bytes),
        client.base_url()
    );
    println!("Description: {}", manifest.description);

    let result = client.upload(&manifest, archive.path(), progress).await;
    archive.cleanup();

    if !result.success {
        let error = result.error.unwrap_or_else(|| "unknown error".to_string());
        return Err(PipeError::Transfer(format!("Upload failed: {error}")));
    }

    println!(
        "✓ Successfully published {}:{}",
        manifest.name, manifest.version
    );
    Ok(PublishReport {
        name: manifest.name,
        version: manifest.version,
        archive_bytes,
    })
}

/// Download `reference` into `config.work_dir`, load it and run it.
///
/// `query_progress` shows the time-based indicator while the server locates
/// the package; `download_progress` shows the byte transfer.
pub async fn run(
    config: &PipelineConfig,
    reference: &ArtifactReference,
    tool: &dyn ExternalTool,
    query_progress: SharedProgress,
    download_progress: SharedProgress,
) -> Result<RunOutcome> {
    let server = config.server_base()?;
    let client = TransferClient::new(&server, config.timeouts.clone())?;

    println!("Querying server for {reference}...");
    let stream = match track_elapsed(query_progress, client.download(reference)).await? {
        Download::Stream(stream) => stream,
        Download::NotFound => {
            return Err(PipeError::PackageNotFound {
                name: reference.name.clone(),
                version: reference.version.clone(),
            })
        }
    };
    println!("✓ Package found");

    let env_path = config.env_file_path();
    prepare_env_file(&client, reference, &env_path).await;

    let archive = ArchiveGuard::new(config.work_dir.join(reference.archive_file_name()));
    let bytes = stream.write_to(archive.path(), download_progress).await?;
    println!(
        "✓ Downloaded {} ({})",
        reference.archive_file_name(),
        format_bytes(bytes)
    );

    let orchestrator = Orchestrator::new(tool, config.timeouts.load());
    let env_file = existing_env_file(env_path);
    orchestrator.load_and_run(archive, env_file.as_deref()).await
}

/// Write `.env` from the server's schema unless one exists. Never fails the run.
async fn prepare_env_file(client: &TransferClient, reference: &ArtifactReference, path: &Path) {
    if path.exists() {
        println!("✓ Found existing .env file");
        return;
    }

    println!("Fetching environment schema...");
    match client.fetch_env_schema(reference).await {
        Ok(Some(schema)) => match envfile::materialize(path, &schema) {
            Ok(EnvFileOutcome::Created(count)) => {
                println!("✓ Created .env file with {count} variable(s)")
            }
            Ok(EnvFileOutcome::AlreadyPresent) => println!("✓ Found existing .env file"),
            Err(e) => {
                tracing::warn!(error = %e, "Could not write env file");
                eprintln!("⚠ Could not create .env file: {e}");
            }
        },
        Ok(None) => eprintln!("⚠ No environment schema found for this package"),
        Err(e) => {
            tracing::warn!(error = %e, "Environment schema fetch failed");
            eprintln!("⚠ Could not fetch environment schema, proceeding without .env file");
        }
    }
}
