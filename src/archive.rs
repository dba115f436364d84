//! Single-file tar payloads for container injection.
//!
//! The container runtime's archive-extraction endpoint consumes a tar
//! stream and unpacks it under a destination directory. This module builds
//! that payload for exactly one local file: an uncompressed ustar archive
//! whose only entry is named after the file's base name, so the destination
//! path inside the container is controlled entirely by the caller.
//!
//! The payload is lazy. The header block is computed up front; file
//! contents are read in chunks while the upload is in flight, followed by
//! zero padding and the end-of-archive blocks. Large files are never fully
//! buffered in memory.

use bytes::Bytes;
use futures::{Stream, StreamExt, stream};
use std::io;
use std::path::Path;
use tokio::fs;
use tokio_util::io::ReaderStream;
use tracing::debug;

/// Tar block size; entry data is zero-padded to a multiple of this.
const BLOCK_SIZE: u64 = 512;

/// Read granularity for streaming file contents.
const CHUNK_SIZE: usize = 8 * 1024;

/// A lazy, single-entry, uncompressed tar byte stream.
pub struct ArchivePayload {
    inner: std::pin::Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send + 'static>>,
}

impl ArchivePayload {
    /// Builds the payload for one local file. The entry is named
    /// `basename(path)`; the parent directory never appears in the archive.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` does not exist, is not a regular file, or
    /// cannot be opened.
    pub async fn from_file(path: &Path) -> io::Result<Self> {
        let metadata = fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }

        let name = path.file_name().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} has no file name", path.display()),
            )
        })?;

        let size = metadata.len();
        let header = entry_header(name.as_ref(), size, &metadata)?;
        let file = fs::File::open(path).await?;

        debug!(
            "Built archive payload for {} ({} bytes)",
            path.display(),
            size
        );

        let contents = ReaderStream::with_capacity(file, CHUNK_SIZE);
        let tail = stream::once(async move { Ok(trailer(size)) });
        let combined = stream::once(async move { Ok(header) })
            .chain(contents)
            .chain(tail);

        Ok(Self {
            inner: Box::pin(combined),
        })
    }

    /// Consumes the payload, yielding the archive bytes chunk by chunk.
    pub fn into_stream(self) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
        self.inner
    }

    /// Collects the whole archive into memory. Test helper for small files.
    #[cfg(test)]
    pub async fn collect(self) -> io::Result<Vec<u8>> {
        use futures::TryStreamExt;
        let chunks: Vec<Bytes> = self.inner.try_collect().await?;
        Ok(chunks.concat())
    }
}

/// Serializes the 512-byte ustar header for the single entry.
fn entry_header(name: &Path, size: u64, metadata: &std::fs::Metadata) -> io::Result<Bytes> {
    let mut header = tar::Header::new_ustar();
    header.set_path(name)?;
    header.set_size(size);
    header.set_entry_type(tar::EntryType::Regular);
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        header.set_mode(metadata.permissions().mode());
    }
    #[cfg(not(unix))]
    header.set_mode(0o644);
    if let Ok(modified) = metadata.modified() {
        if let Ok(mtime) = modified.duration_since(std::time::UNIX_EPOCH) {
            header.set_mtime(mtime.as_secs());
        }
    }
    header.set_cksum();
    Ok(Bytes::copy_from_slice(header.as_bytes()))
}

/// Zero padding up to the block boundary plus the two end-of-archive blocks.
fn trailer(size: u64) -> Bytes {
    let padding = (BLOCK_SIZE - size % BLOCK_SIZE) % BLOCK_SIZE;
    Bytes::from(vec![0u8; (padding + 2 * BLOCK_SIZE) as usize])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    async fn payload_bytes(path: &Path) -> Vec<u8> {
        ArchivePayload::from_file(path)
            .await
            .expect("payload")
            .collect()
            .await
            .expect("collect")
    }

    #[tokio::test]
    async fn entry_is_named_after_base_name() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("build.sh");
        std::fs::write(&script, "#!/bin/sh\necho hello\n").unwrap();

        let bytes = payload_bytes(&script).await;

        let mut archive = tar::Archive::new(bytes.as_slice());
        let entries: Vec<_> = archive.entries().unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].path().unwrap().to_str().unwrap(),
            "build.sh",
            "entry must not carry the parent directory"
        );
    }

    #[tokio::test]
    async fn contents_round_trip_through_tar() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("run.sh");
        let body = "echo one\necho two\n";
        std::fs::write(&script, body).unwrap();

        let bytes = payload_bytes(&script).await;

        let mut archive = tar::Archive::new(bytes.as_slice());
        let mut entry = archive.entries().unwrap().next().unwrap().unwrap();
        let mut unpacked = String::new();
        entry.read_to_string(&mut unpacked).unwrap();
        assert_eq!(unpacked, body);
    }

    #[tokio::test]
    async fn archive_is_block_aligned() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("data.bin");
        // Deliberately not a multiple of the block size.
        std::fs::write(&file, vec![0xABu8; 700]).unwrap();

        let bytes = payload_bytes(&file).await;

        assert_eq!(bytes.len() as u64 % BLOCK_SIZE, 0);
        // header + two data blocks + end-of-archive marker
        assert_eq!(bytes.len() as u64, BLOCK_SIZE * 5);
    }

    #[tokio::test]
    async fn missing_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.sh");

        let result = ArchivePayload::from_file(&missing).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();

        let result = ArchivePayload::from_file(dir.path()).await;
        assert_eq!(
            result.err().map(|e| e.kind()),
            Some(io::ErrorKind::InvalidInput)
        );
    }
}
