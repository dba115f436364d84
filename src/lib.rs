//! # Shellbox
//!
//! Runs generated shell scripts inside a fresh, ephemeral container and
//! guarantees teardown. One invocation owns exactly one container: it is
//! created from an image, started with a live combined log stream, fed
//! files and commands, and always stopped and removed — normally at the
//! end of the sequence, abnormally when an interrupt signal arrives.
//!
//! ## Architecture Overview
//!
//! - **[`container`]**: the lifecycle and I/O core — client connection,
//!   container creation, the state machine with its interrupt watcher,
//!   command execution with completion detection, and file transfer
//! - **[`archive`]**: lazy single-file tar payloads for container injection
//! - **[`workflow`]**: the one-shot driver sequencing the core operations
//! - **[`cli`]**: argument plumbing for the `shellbox` binary
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shellbox::workflow::{self, WorkflowConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = WorkflowConfig {
//!         image: "ubuntu:latest".to_string(),
//!         environment: vec!["REPO_NAME=demo".to_string()],
//!         scripts: vec!["./build.sh".into()],
//!         ..WorkflowConfig::default()
//!     };
//!
//!     workflow::run(&config).await?;
//!     Ok(())
//! }
//! ```

/// Lazy tar payloads for file injection.
pub mod archive;

/// Command line argument parsing.
pub mod cli;

/// Container lifecycle and I/O core.
///
/// Creation, startup with log streaming, exec with completion detection,
/// archive-based file transfer, and interrupt-driven cleanup for the one
/// container an invocation owns.
pub mod container;

/// One-shot invocation driver.
pub mod workflow;

pub use container::{
    Container, ContainerSpec, ContainerState, DockerClient, Result, SandboxError,
};
pub use workflow::WorkflowConfig;
