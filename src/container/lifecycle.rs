//! Container handle and lifecycle state machine.
//!
//! A [`Container`] moves through `Created → Running → Stopped → Removed`,
//! with the interrupt transition `Running → Stopped` possible at any time.
//! `start` arms an interrupt watcher before issuing the start call and then
//! opens the follow-mode combined log stream; the watcher stays armed until
//! the container reaches `Removed`, and disarming joins any in-flight
//! forced stop so cleanup settles before the process exits.

use crate::container::{Result, SandboxError, exec, stream, transfer};
use bollard::Docker;
use bollard::container::{
    LogOutput, LogsOptions, RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
};
use std::path::Path;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Grace period for orderly stops, in seconds. Interrupts use zero.
const STOP_TIMEOUT_SECS: i64 = 10;

/// Lifecycle state of the one container an invocation owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    /// Created but not yet started
    Created,
    /// Entrypoint running, accepting exec/copy operations
    Running,
    /// Stopped, not yet removed
    Stopped,
    /// Removed from the runtime
    Removed,
}

/// Handle to one container, owned exclusively by the invocation that
/// created it.
pub struct Container {
    docker: Docker,
    id: String,
    name: String,
    state: ContainerState,
    interrupt: CancellationToken,
    watcher: Option<InterruptWatcher>,
    log_pump: Option<JoinHandle<()>>,
}

impl Container {
    pub(crate) fn new(docker: Docker, id: String, name: String) -> Self {
        Self {
            docker,
            id,
            name,
            state: ContainerState::Created,
            interrupt: CancellationToken::new(),
            watcher: None,
            log_pump: None,
        }
    }

    /// Runtime-side container identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Generated container name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ContainerState {
        self.state
    }

    fn short_id(&self) -> &str {
        self.id.get(..12).unwrap_or(&self.id)
    }

    /// Requests container termination, exactly as an interrupt signal
    /// would. Safe in any state: before `start` there is nothing to stop
    /// and the request is remembered, so a container started afterwards is
    /// force-stopped immediately.
    pub fn interrupt(&self) {
        self.interrupt.cancel();
    }

    /// Starts the container and echoes its combined log stream to stdout.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::Start`] if the container was already started
    /// or the runtime rejects the start call.
    pub async fn start(&mut self) -> Result<()> {
        self.start_with(echo_chunk).await
    }

    /// Starts the container, surfacing each log chunk through `on_chunk`.
    ///
    /// The interrupt watcher is armed before the start call is issued, so a
    /// signal received at any later point force-stops the container. The
    /// log stream is opened in follow mode and pumped on a background task,
    /// concurrently with every subsequent exec/copy operation; its chunks
    /// arrive in emission order and may interleave with exec output.
    pub async fn start_with<F>(&mut self, on_chunk: F) -> Result<()>
    where
        F: FnMut(&[u8]) + Send + 'static,
    {
        if self.state != ContainerState::Created {
            return Err(SandboxError::Start {
                id: self.id.clone(),
                reason: "container already started".to_string(),
            });
        }

        self.watcher = Some(InterruptWatcher::arm(
            self.docker.clone(),
            self.id.clone(),
            self.interrupt.clone(),
        ));

        self.docker
            .start_container(&self.id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| SandboxError::Start {
                id: self.id.clone(),
                reason: e.to_string(),
            })?;

        let logs = self.docker.logs(
            &self.id,
            Some(LogsOptions::<String> {
                follow: true,
                stdout: true,
                stderr: true,
                ..Default::default()
            }),
        );

        let short_id = self.short_id().to_string();
        let mut on_chunk = on_chunk;
        self.log_pump = Some(tokio::spawn(async move {
            let outcome = stream::await_end(
                logs,
                |chunk: LogOutput| on_chunk(&chunk.into_bytes()),
                None,
            )
            .await;
            if let Err(stream::WaitError::Stream(e)) = outcome {
                debug!("Log stream of container {} closed: {}", short_id, e);
            }
        }));

        self.state = ContainerState::Running;
        info!("Started container: {}", self.name);
        Ok(())
    }

    /// Executes `command` inside the running container, echoing its
    /// combined output to stdout, and returns once the output stream ends.
    /// `deadline` bounds the wait; `None` waits indefinitely.
    pub async fn exec<I, S>(&self, command: I, deadline: Option<Duration>) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exec_with(command, echo_chunk, deadline).await
    }

    /// Executes `command`, surfacing each output chunk through `on_chunk`.
    pub async fn exec_with<I, S, F>(
        &self,
        command: I,
        on_chunk: F,
        deadline: Option<Duration>,
    ) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnMut(&[u8]),
    {
        let command: Vec<String> = command.into_iter().map(Into::into).collect();
        exec::run(&self.docker, &self.id, command, on_chunk, deadline).await
    }

    /// Streams a local file into `dest_path` inside the running container.
    pub async fn copy_into(&self, local_path: impl AsRef<Path>, dest_path: &str) -> Result<()> {
        transfer::copy_into(&self.docker, &self.id, local_path.as_ref(), dest_path).await
    }

    /// Stops the container. An already-stopped container is success, not
    /// failure; a never-started one stops trivially.
    pub async fn stop(&mut self) -> Result<()> {
        if self.state == ContainerState::Removed {
            return Ok(());
        }

        debug!("Stopping container: {}", self.short_id());

        match self
            .docker
            .stop_container(
                &self.id,
                Some(StopContainerOptions {
                    t: STOP_TIMEOUT_SECS,
                }),
            )
            .await
        {
            Ok(()) => {}
            Err(e) if already_terminal(&e) => {
                debug!("Container {} already stopped", self.short_id());
            }
            Err(e) => {
                return Err(SandboxError::Teardown {
                    id: self.id.clone(),
                    reason: e.to_string(),
                });
            }
        }

        // The follow-mode stream ends once the container stops.
        if let Some(pump) = self.log_pump.take() {
            let _ = pump.await;
        }

        self.state = ContainerState::Stopped;
        info!("Stopped container: {}", self.name);
        Ok(())
    }

    /// Removes the container and disarms the interrupt watcher, joining an
    /// in-flight forced stop first. Safe to call repeatedly.
    pub async fn remove(&mut self) -> Result<()> {
        if self.state == ContainerState::Removed {
            return Ok(());
        }

        debug!("Removing container: {}", self.short_id());

        match self
            .docker
            .remove_container(
                &self.id,
                Some(RemoveContainerOptions {
                    force: true,
                    v: true,
                    ..Default::default()
                }),
            )
            .await
        {
            Ok(()) => {}
            Err(e) if already_terminal(&e) => {
                debug!("Container {} already removed", self.short_id());
            }
            Err(e) => {
                return Err(SandboxError::Teardown {
                    id: self.id.clone(),
                    reason: e.to_string(),
                });
            }
        }

        if let Some(pump) = self.log_pump.take() {
            let _ = pump.await;
        }
        if let Some(watcher) = self.watcher.take() {
            watcher.disarm().await;
        }

        self.state = ContainerState::Removed;
        info!("Removed container: {}", self.name);
        Ok(())
    }
}

/// Background task bridging the process interrupt signal to a forced stop
/// of the one container this invocation owns.
struct InterruptWatcher {
    disarm: CancellationToken,
    task: JoinHandle<()>,
}

impl InterruptWatcher {
    fn arm(docker: Docker, id: String, interrupt: CancellationToken) -> Self {
        let disarm = CancellationToken::new();
        let task = tokio::spawn({
            let disarm = disarm.clone();
            async move {
                tokio::select! {
                    _ = disarm.cancelled() => return,
                    _ = interrupt.cancelled() => {}
                    signal = tokio::signal::ctrl_c() => {
                        if signal.is_err() {
                            return;
                        }
                    }
                }

                warn!("Interrupt received, force-stopping container {}", id);
                match docker
                    .stop_container(&id, Some(StopContainerOptions { t: 0 }))
                    .await
                {
                    Ok(()) => info!("Force-stopped container {}", id),
                    Err(e) if already_terminal(&e) => {}
                    Err(e) => warn!("Forced stop of container {} failed: {}", id, e),
                }
            }
        });

        Self { disarm, task }
    }

    /// Disarms the watcher. Joins the task so an in-flight forced stop
    /// settles before teardown completes.
    async fn disarm(self) {
        self.disarm.cancel();
        let _ = self.task.await;
    }
}

/// "Already stopped" / "no such container" responses count as success for
/// terminal operations.
fn already_terminal(e: &bollard::errors::Error) -> bool {
    matches!(
        e,
        bollard::errors::Error::DockerResponseServerError {
            status_code: 304 | 404,
            ..
        }
    )
}

fn echo_chunk(chunk: &[u8]) {
    use std::io::Write;
    let mut stdout = std::io::stdout();
    let _ = stdout.write_all(chunk);
    let _ = stdout.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lazy_docker() -> Option<Docker> {
        // Builds a client without touching the daemon; requests would fail
        // later if no runtime is present, which these tests never issue.
        Docker::connect_with_local_defaults().ok()
    }

    #[tokio::test]
    async fn interrupt_before_start_is_harmless() {
        let Some(docker) = lazy_docker() else {
            return;
        };
        let container = Container::new(docker, "0123456789abcdef".to_string(), "t".to_string());

        container.interrupt();
        container.interrupt();

        assert_eq!(container.state(), ContainerState::Created);
    }

    #[tokio::test]
    async fn handle_exposes_identity() {
        let Some(docker) = lazy_docker() else {
            return;
        };
        let container = Container::new(
            docker,
            "0123456789abcdef".to_string(),
            "shellbox-test".to_string(),
        );

        assert_eq!(container.id(), "0123456789abcdef");
        assert_eq!(container.name(), "shellbox-test");
        assert_eq!(container.short_id(), "0123456789ab");
    }
}
