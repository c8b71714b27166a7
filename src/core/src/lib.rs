//! Soldexer Core - Pipe Packaging and Execution
//!
//! This crate provides the manifest model, the external tool capability, the
//! artifact service client, and the `publish` and `run` pipelines used by
//! the `soldexer` CLI.

pub mod builder;
pub mod catalog;
pub mod cleanup;
pub mod config;
pub mod envfile;
pub mod error;
pub mod manifest;
pub mod orchestrator;
pub mod pipeline;
pub mod progress;
pub mod reference;
pub mod scaffold;
pub mod tool;
pub mod transfer;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export commonly used types
pub use catalog::{PipeCatalog, PipeSummary, PipeVersion};
pub use config::{PipelineConfig, StageTimeouts};
pub use error::{PipeError, Result};
pub use manifest::{EnvVarSpec, EnvironmentSchema, Manifest};
pub use orchestrator::RunOutcome;
pub use pipeline::PublishReport;
pub use progress::{NoProgress, ProgressSink, SharedProgress, TransferState};
pub use reference::ArtifactReference;
pub use tool::{CliTool, CommandOutput, ExternalTool};
pub use transfer::TransferClient;

/// Soldexer version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
