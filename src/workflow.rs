//! One-shot invocation driver.
//!
//! Wires the container core into the sequence the tool performs: create a
//! container, start it, make the working directory, then copy and run each
//! supplied script in order, and tear the container down. Teardown runs
//! even when a stage fails; the stage error is what surfaces to the caller.

use crate::container::{Container, ContainerSpec, DockerClient, Result, SandboxError, create};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Configuration of one invocation.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Container image to run the scripts in
    pub image: String,
    /// Ordered `KEY=VALUE` environment entries
    pub environment: Vec<String>,
    /// Directory inside the container where scripts are placed and run
    pub workdir: String,
    /// Shell used to run each script
    pub shell: String,
    /// Script files copied into the container and run in order
    pub scripts: Vec<PathBuf>,
    /// Per-operation deadline; `None` waits indefinitely
    pub deadline: Option<Duration>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            image: "ubuntu:latest".to_string(),
            environment: Vec::new(),
            workdir: "/app".to_string(),
            shell: "bash".to_string(),
            scripts: Vec::new(),
            deadline: None,
        }
    }
}

/// Runs the whole invocation: connect, create, drive, tear down.
///
/// # Errors
///
/// Surfaces the first failing stage. Once a container exists, stop and
/// remove are still attempted before the error is returned.
pub async fn run(config: &WorkflowConfig) -> Result<()> {
    let client = DockerClient::new().await?;

    let spec = ContainerSpec::builder()
        .image(&config.image)
        .envs(config.environment.iter().cloned())
        .build()?;

    let mut container = create(&client, &spec).await?;

    let outcome = drive(&mut container, config).await;

    if let Err(e) = &outcome {
        warn!(
            "Invocation failed ({}), cleaning up container {}",
            e,
            container.id()
        );
    }

    if let Err(e) = container.stop().await {
        warn!("Cleanup stop failed: {}", e);
    }
    match container.remove().await {
        Ok(()) => {}
        Err(e) if outcome.is_ok() => return Err(e),
        Err(e) => warn!("Cleanup removal failed: {}", e),
    }

    outcome
}

async fn drive(container: &mut Container, config: &WorkflowConfig) -> Result<()> {
    container.start().await?;

    container
        .exec(
            vec!["mkdir", "-p", config.workdir.as_str()],
            config.deadline,
        )
        .await?;

    for script in &config.scripts {
        container.copy_into(script, &config.workdir).await?;

        let target = script_target(&config.workdir, script).ok_or_else(|| {
            SandboxError::Transfer {
                id: container.id().to_string(),
                path: script.clone(),
                reason: "script path has no file name".to_string(),
            }
        })?;

        info!("Running script {}", target);
        container
            .exec(
                vec![config.shell.as_str(), target.as_str()],
                config.deadline,
            )
            .await?;
    }

    Ok(())
}

/// In-container path of a copied script: workdir joined with the script's
/// base name.
fn script_target(workdir: &str, script: &Path) -> Option<String> {
    let name = script.file_name()?.to_str()?;
    Some(format!("{}/{}", workdir.trim_end_matches('/'), name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_target() {
        assert_eq!(
            script_target("/app", Path::new("./scripts/build.sh")),
            Some("/app/build.sh".to_string())
        );
        assert_eq!(
            script_target("/app/", Path::new("helper.sh")),
            Some("/app/helper.sh".to_string())
        );
        assert_eq!(script_target("/app", Path::new("..")), None);
    }

    #[test]
    fn test_default_config() {
        let config = WorkflowConfig::default();
        assert_eq!(config.workdir, "/app");
        assert_eq!(config.shell, "bash");
        assert!(config.deadline.is_none());
        assert!(config.scripts.is_empty());
    }
}
