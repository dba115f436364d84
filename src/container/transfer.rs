//! File injection into a running container.
//!
//! Streams one local file into a destination directory inside the
//! container via the runtime's archive-extraction endpoint. The local file
//! is checked before any runtime capability is touched, so a missing file
//! produces no side effect at all.

use crate::archive::ArchivePayload;
use crate::container::{Result, SandboxError};
use bollard::Docker;
use std::path::Path;
use tracing::{debug, info};

pub(crate) async fn copy_into(
    docker: &Docker,
    id: &str,
    local_path: &Path,
    dest_path: &str,
) -> Result<()> {
    if !local_path.is_file() {
        return Err(SandboxError::Transfer {
            id: id.to_string(),
            path: local_path.to_path_buf(),
            reason: "local file does not exist".to_string(),
        });
    }

    debug!(
        "Copying {} into container {} at {}",
        local_path.display(),
        id,
        dest_path
    );

    let payload =
        ArchivePayload::from_file(local_path)
            .await
            .map_err(|e| SandboxError::Transfer {
                id: id.to_string(),
                path: local_path.to_path_buf(),
                reason: e.to_string(),
            })?;

    let options = bollard::query_parameters::UploadToContainerOptionsBuilder::default()
        .path(dest_path)
        .build();

    let body = bollard::body_try_stream(payload.into_stream());

    docker
        .upload_to_container(id, Some(options), body)
        .await
        .map_err(|e| SandboxError::Transfer {
            id: id.to_string(),
            path: local_path.to_path_buf(),
            reason: e.to_string(),
        })?;

    info!(
        "Copied {} into container {} at {}",
        local_path.display(),
        id,
        dest_path
    );
    Ok(())
}
