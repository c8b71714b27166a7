//! CLI command definitions and dispatch.

mod init;
mod list;
mod publish;
mod run;

use clap::{Parser, Subcommand};
use soldexer_core::config::{DEFAULT_SERVER_URL, DEFAULT_TOOL_PROGRAM};
use soldexer_core::{PipelineConfig, Result};

/// Soldexer: build, publish and run data pipes.
#[derive(Parser)]
#[command(name = "soldexer", version, about)]
pub struct Cli {
    /// Artifact service URL
    #[arg(long, global = true, env = "SOLDEXER_SERVER", default_value = DEFAULT_SERVER_URL)]
    pub server: String,

    /// Container tool executable
    #[arg(long, global = true, env = "SOLDEXER_DOCKER", default_value = DEFAULT_TOOL_PROGRAM)]
    pub docker: String,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Command {
    /// Build the pipe in the current directory and publish it
    Publish(publish::PublishArgs),
    /// Download a published pipe and run it
    Run(run::RunArgs),
    /// List published pipes
    List(list::ListArgs),
    /// Create a new pipe project from the template
    Init(init::InitArgs),
}

impl Cli {
    /// Pipeline settings for the current directory.
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        Ok(PipelineConfig {
            server_url: self.server.clone(),
            work_dir: std::env::current_dir()?,
            tool_program: self.docker.clone(),
            ..Default::default()
        })
    }
}

/// Dispatch a parsed CLI to the appropriate command handler.
pub async fn dispatch(cli: Cli) -> Result<()> {
    let config = cli.pipeline_config()?;
    match cli.command {
        Command::Publish(args) => publish::execute(args, config).await,
        Command::Run(args) => run::execute(args, config).await,
        Command::List(args) => list::execute(args, config).await,
        Command::Init(args) => init::execute(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_publish_with_global_flags() {
        let cli = Cli::try_parse_from([
            "soldexer",
            "publish",
            "--server",
            "https://pipes.example.com",
            "--docker",
            "podman",
            "--max-size",
            "500m",
        ])
        .unwrap();

        assert_eq!(cli.server, "https://pipes.example.com");
        assert_eq!(cli.docker, "podman");
        match cli.command {
            Command::Publish(args) => assert_eq!(args.max_size, Some(500 * 1024 * 1024)),
            _ => panic!("expected publish"),
        }
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from(["soldexer", "-v", "run", "demo:1.0.0"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Run(args) => assert_eq!(args.package, "demo:1.0.0"),
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_parse_run_requires_package() {
        assert!(Cli::try_parse_from(["soldexer", "run"]).is_err());
    }

    #[test]
    fn test_parse_rejects_bad_size() {
        assert!(Cli::try_parse_from(["soldexer", "publish", "--max-size", "lots"]).is_err());
    }

    #[test]
    fn test_parse_init() {
        let cli = Cli::try_parse_from(["soldexer", "init", "my-pipe", "-d", "pipes/mine"]).unwrap();
        match cli.command {
            Command::Init(args) => {
                assert_eq!(args.project_name.as_deref(), Some("my-pipe"));
                assert_eq!(args.target_dir(), std::path::PathBuf::from("pipes/mine"));
            }
            _ => panic!("expected init"),
        }
    }

    #[test]
    fn test_pipeline_config_uses_flags() {
        let cli = Cli::try_parse_from(["soldexer", "list", "--server", "http://10.0.0.5:3000"])
            .unwrap();
        let config = cli.pipeline_config().unwrap();
        assert_eq!(config.server_url, "http://10.0.0.5:3000");
        assert_eq!(config.work_dir, std::env::current_dir().unwrap());
        assert!(config.max_archive_bytes.is_none());
    }
}
