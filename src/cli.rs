//! Command line argument parsing.

use crate::workflow::WorkflowConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "shellbox")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Runs shell scripts inside a fresh ephemeral container")]
#[command(arg_required_else_help = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a container, run the scripts inside it, and tear it down
    Run {
        /// Container image to run the scripts in
        #[arg(short, long, default_value = "ubuntu:latest")]
        image: String,
        /// KEY=VALUE environment entry injected into the container (repeatable)
        #[arg(short, long = "env", value_name = "KEY=VALUE")]
        env: Vec<String>,
        /// Directory inside the container where scripts are placed and run
        #[arg(long, default_value = "/app")]
        workdir: String,
        /// Shell used to run each script
        #[arg(long, default_value = "bash")]
        shell: String,
        /// Per-operation timeout in seconds (default: wait indefinitely)
        #[arg(short, long, value_name = "SECONDS")]
        timeout: Option<u64>,
        /// Script files copied into the container and run in order
        #[arg(required = true, value_name = "SCRIPT")]
        scripts: Vec<PathBuf>,
    },
}

impl Commands {
    /// Turn the parsed arguments into a workflow configuration.
    pub fn into_workflow(self) -> WorkflowConfig {
        match self {
            Commands::Run {
                image,
                env,
                workdir,
                shell,
                timeout,
                scripts,
            } => WorkflowConfig {
                image,
                environment: env,
                workdir,
                shell,
                scripts,
                deadline: timeout.map(Duration::from_secs),
            },
        }
    }
}
