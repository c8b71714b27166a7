//! Soldexer CLI - build, publish and run pipes.

pub mod commands;
pub mod output;
pub mod progress;
