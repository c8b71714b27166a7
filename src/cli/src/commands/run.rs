//! `soldexer run` command.

use std::sync::Arc;

use clap::Args;
use soldexer_core::{pipeline, ArtifactReference, CliTool, PipelineConfig, Result, RunOutcome};

use crate::progress::TerminalProgress;

#[derive(Args)]
pub struct RunArgs {
    /// Package to run, as <name>:<version> (e.g., "demo:1.0.0")
    pub package: String,
}

pub async fn execute(args: RunArgs, config: PipelineConfig) -> Result<()> {
    // Rejected here, before any network call.
    let reference = ArtifactReference::parse(&args.package)?;
    let tool = CliTool::new(config.tool_program.clone());

    let outcome = pipeline::run(
        &config,
        &reference,
        &tool,
        Arc::new(TerminalProgress::searching()),
        Arc::new(TerminalProgress::download()),
    )
    .await?;

    if outcome == RunOutcome::NoImage {
        tracing::debug!(package = %reference, "Nothing was run");
    }
    Ok(())
}
