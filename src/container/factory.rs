//! Container specification and creation.
//!
//! A [`ContainerSpec`] describes the one ephemeral container an invocation
//! owns: the image, an ordered `KEY=VALUE` environment, and a blocking
//! shell entrypoint kept alive on an interactive TTY so the container waits
//! for exec/copy operations instead of exiting.

use crate::container::lifecycle::Container;
use crate::container::{DockerClient, Result, SandboxError};
use tracing::{debug, info};
use uuid::Uuid;

/// Default entrypoint: a shell blocking on its open stdin.
const DEFAULT_ENTRYPOINT: &[&str] = &["/bin/sh"];

/// Immutable description of the container to create.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    /// Image name (with optional tag)
    pub image: String,
    /// Ordered `KEY=VALUE` environment entries, passed through verbatim
    pub environment: Vec<String>,
    /// Allocate a pseudo-TTY and keep stdin open
    pub interactive: bool,
    /// Entrypoint command keeping the container alive
    pub entrypoint_command: Vec<String>,
}

impl ContainerSpec {
    /// Create a new specification builder.
    pub fn builder() -> ContainerSpecBuilder {
        ContainerSpecBuilder::new()
    }
}

/// Fluent builder for [`ContainerSpec`].
pub struct ContainerSpecBuilder {
    image: Option<String>,
    environment: Vec<String>,
    interactive: bool,
    entrypoint_command: Vec<String>,
}

impl Default for ContainerSpecBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerSpecBuilder {
    /// Create a new specification builder.
    pub fn new() -> Self {
        Self {
            image: None,
            environment: Vec::new(),
            interactive: true,
            entrypoint_command: DEFAULT_ENTRYPOINT.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Set the container image.
    pub fn image<S: Into<String>>(mut self, image: S) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Append one `KEY=VALUE` environment entry.
    pub fn env<S: Into<String>>(mut self, entry: S) -> Self {
        self.environment.push(entry.into());
        self
    }

    /// Append multiple `KEY=VALUE` environment entries, order preserved.
    pub fn envs<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for entry in entries {
            self.environment.push(entry.into());
        }
        self
    }

    /// Toggle TTY allocation and open stdin (default: true).
    pub fn interactive(mut self, enable: bool) -> Self {
        self.interactive = enable;
        self
    }

    /// Override the blocking entrypoint command.
    pub fn entrypoint<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entrypoint_command = command.into_iter().map(|s| s.into()).collect();
        self
    }

    /// Build the specification.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::Creation`] if no image was set.
    pub fn build(self) -> Result<ContainerSpec> {
        let image = self
            .image
            .ok_or_else(|| SandboxError::Creation("image is required".to_string()))?;

        Ok(ContainerSpec {
            image,
            environment: self.environment,
            interactive: self.interactive,
            entrypoint_command: self.entrypoint_command,
        })
    }
}

/// Creates a container from `spec` and returns its handle in `Created`
/// state. Nothing is started here; the entrypoint begins running only once
/// [`Container::start`] is called.
///
/// # Errors
///
/// Returns [`SandboxError::Creation`] if the image is unavailable or the
/// runtime rejects the request. Fatal to the invocation — no retry.
pub async fn create(client: &DockerClient, spec: &ContainerSpec) -> Result<Container> {
    let name = format!("shellbox-{}", Uuid::new_v4());

    debug!("Creating container '{}' from image {}", name, spec.image);

    let options = bollard::container::CreateContainerOptions {
        name: name.as_str(),
        ..Default::default()
    };

    let config = bollard::container::Config {
        image: Some(spec.image.clone()),
        entrypoint: Some(spec.entrypoint_command.clone()),
        env: if spec.environment.is_empty() {
            None
        } else {
            Some(spec.environment.clone())
        },
        tty: Some(spec.interactive),
        open_stdin: Some(spec.interactive),
        ..Default::default()
    };

    let response = client
        .docker()
        .create_container(Some(options), config)
        .await
        .map_err(|e| {
            SandboxError::Creation(format!(
                "runtime refused to create container from image '{}': {}",
                spec.image, e
            ))
        })?;

    info!("Created container: {} ({})", name, response.id);

    Ok(Container::new(client.docker().clone(), response.id, name))
}
