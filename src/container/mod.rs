//! Container lifecycle and I/O core.
//!
//! This module manages exactly one ephemeral container per invocation via
//! the Docker/Podman API (bollard): creation from an image, startup with a
//! live combined log stream, command execution with completion detection,
//! file injection through tar archives, and interrupt-driven forced stop.
//!
//! ## Architecture
//!
//! - [`client`]: Docker/Podman API client wrapper with connection fallback
//! - [`factory`]: container specification and creation
//! - [`lifecycle`]: the [`Container`] handle and its state machine,
//!   including the interrupt watcher and the background log pump
//! - [`exec`]: command execution inside the running container
//! - [`transfer`]: streaming local files into the container filesystem
//! - [`stream`]: shared wait-for-completion primitive over chunked streams
//!
//! ## Usage
//!
//! ```rust,no_run
//! use shellbox::container::{ContainerSpec, DockerClient, create};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = DockerClient::new().await?;
//!
//!     let spec = ContainerSpec::builder()
//!         .image("ubuntu:latest")
//!         .env("PROJECT_NAME=demo")
//!         .build()?;
//!
//!     let mut container = create(&client, &spec).await?;
//!     container.start().await?;
//!
//!     container.exec(vec!["mkdir", "-p", "/app"], None).await?;
//!     container.copy_into("./build.sh", "/app").await?;
//!     container.exec(vec!["bash", "/app/build.sh"], None).await?;
//!
//!     container.stop().await?;
//!     container.remove().await?;
//!     Ok(())
//! }
//! ```

mod client;
mod exec;
mod factory;
mod lifecycle;
pub(crate) mod stream;
mod transfer;

pub use client::DockerClient;
pub use factory::{ContainerSpec, ContainerSpecBuilder, create};
pub use lifecycle::{Container, ContainerState};

use std::path::PathBuf;
use std::time::Duration;

/// Errors of the container core, one variant per failing stage.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// Runtime endpoint unreachable or image unavailable. Fatal, no retry.
    #[error("container creation failed: {0}")]
    Creation(String),

    /// Container did not transition to running.
    #[error("container {id} failed to start: {reason}")]
    Start { id: String, reason: String },

    /// Command could not be started inside the container.
    #[error("exec in container {id} failed: {reason}")]
    Exec { id: String, reason: String },

    /// Local file missing or destination not writable inside the container.
    #[error("transfer of '{path}' to container {id} failed: {reason}")]
    Transfer {
        id: String,
        path: PathBuf,
        reason: String,
    },

    /// An output stream errored before signalling its end.
    #[error("output stream of container {id} failed: {reason}")]
    Stream { id: String, reason: String },

    /// A blocking wait exceeded its configured deadline.
    #[error("{operation} on container {id} timed out after {after:?}")]
    Deadline {
        id: String,
        operation: &'static str,
        after: Duration,
    },

    /// Stop or remove failed on a container known to exist.
    #[error("teardown of container {id} failed: {reason}")]
    Teardown { id: String, reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for container operations.
pub type Result<T> = std::result::Result<T, SandboxError>;
