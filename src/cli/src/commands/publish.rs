//! `soldexer publish` command.

use std::sync::Arc;

use clap::Args;
use soldexer_core::{pipeline, CliTool, PipelineConfig, Result};

use crate::output::parse_size_bytes;
use crate::progress::TerminalProgress;

#[derive(Args)]
pub struct PublishArgs {
    /// Refuse to upload archives larger than this (e.g., "500m", "2g")
    #[arg(long, env = "SOLDEXER_MAX_ARCHIVE_SIZE", value_parser = parse_size_bytes)]
    pub max_size: Option<u64>,
}

pub async fn execute(args: PublishArgs, mut config: PipelineConfig) -> Result<()> {
    config.max_archive_bytes = args.max_size;
    let tool = CliTool::new(config.tool_program.clone());

    println!("📦 Publishing pipe from {}", config.work_dir.display());
    pipeline::publish(&config, &tool, Arc::new(TerminalProgress::upload())).await?;
    Ok(())
}
