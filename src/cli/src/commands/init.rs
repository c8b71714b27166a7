//! `soldexer init` command.

use std::path::PathBuf;

use clap::Args;
use soldexer_core::scaffold::{self, DEFAULT_PROJECT_NAME, TEMPLATE_REPOSITORY};
use soldexer_core::{CliTool, Result};

#[derive(Args)]
pub struct InitArgs {
    /// Project name (also the directory name unless --directory is given)
    pub project_name: Option<String>,

    /// Directory to create the project in
    #[arg(short, long)]
    pub directory: Option<PathBuf>,
}

impl InitArgs {
    pub fn target_dir(&self) -> PathBuf {
        self.directory
            .clone()
            .or_else(|| self.project_name.as_ref().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROJECT_NAME))
    }
}

pub async fn execute(args: InitArgs) -> Result<()> {
    let target = args.target_dir();
    let git = CliTool::new("git");

    let name = scaffold::init_project(&git, &target, TEMPLATE_REPOSITORY).await?;

    println!("✓ Project {name} created successfully");
    println!("\nNext steps:");
    println!("  cd {}", target.display());
    println!("  # edit soldexer.json and the Dockerfile");
    println!("  soldexer publish");
    Ok(())
}
