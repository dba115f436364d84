//! Command execution inside a running container.
//!
//! One exec session per command: created with combined stdout/stderr
//! attachment, started attached (the hijacked raw stream), then drained
//! through the shared completion primitive. The call returns when the
//! output stream ends — completion is end-of-stream, not exit status.

use crate::container::{Result, SandboxError, stream};
use bollard::Docker;
use bollard::exec::{CreateExecOptions, StartExecResults};
use std::time::Duration;
use tracing::debug;

pub(crate) async fn run<F>(
    docker: &Docker,
    id: &str,
    command: Vec<String>,
    mut on_chunk: F,
    deadline: Option<Duration>,
) -> Result<()>
where
    F: FnMut(&[u8]),
{
    debug!("Executing command in container {}: {:?}", id, command);

    let exec = docker
        .create_exec(
            id,
            CreateExecOptions {
                cmd: Some(command.clone()),
                attach_stdout: Some(true),
                attach_stderr: Some(true),
                ..Default::default()
            },
        )
        .await
        .map_err(|e| SandboxError::Exec {
            id: id.to_string(),
            reason: format!("could not create exec session for {:?}: {}", command, e),
        })?;

    let started = docker
        .start_exec(&exec.id, None)
        .await
        .map_err(|e| SandboxError::Exec {
            id: id.to_string(),
            reason: format!("could not start exec session for {:?}: {}", command, e),
        })?;

    match started {
        StartExecResults::Attached { output, .. } => {
            stream::await_end(output, |log| on_chunk(&log.into_bytes()), deadline)
                .await
                .map_err(|e| match e {
                    stream::WaitError::Stream(e) => SandboxError::Stream {
                        id: id.to_string(),
                        reason: e.to_string(),
                    },
                    stream::WaitError::DeadlineExceeded(after) => SandboxError::Deadline {
                        id: id.to_string(),
                        operation: "exec",
                        after,
                    },
                })?;
        }
        StartExecResults::Detached => {
            return Err(SandboxError::Exec {
                id: id.to_string(),
                reason: "unexpected detached exec session".to_string(),
            });
        }
    }

    // Completion is stream-end; the exit code is informational only.
    if let Ok(inspect) = docker.inspect_exec(&exec.id).await {
        debug!("Command {:?} finished with exit code {:?}", command, inspect.exit_code);
    }

    Ok(())
}
