//! Request-scoped transient storage for uploaded documents.
//!
//! Every upload is written under a freshly generated UUID name inside the upload directory, so
//! concurrent requests never share a path. The [`TransientDocument`] guard owns that path and
//! removes the file when dropped, which covers success, every error return, and a handler
//! future dropped mid-flight.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use uuid::Uuid;

/// Directory that holds in-flight uploads.
#[derive(Debug, Clone)]
pub struct TransientStore {
    root: PathBuf,
}

impl TransientStore {
    /// Use `root` for uploads, creating it when missing.
    pub async fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Upload directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create an empty transient file for an upload named `original_filename`.
    ///
    /// The guard is created before the file so a failed create or write still cleans up.
    pub async fn create(&self, original_filename: &str) -> io::Result<(TransientDocument, File)> {
        let document = TransientDocument {
            path: self.root.join(format!("upload-{}.pdf", Uuid::new_v4())),
            original_filename: original_filename.to_string(),
            size_bytes: 0,
        };
        let file = File::create(&document.path).await?;
        tracing::debug!(
            path = %document.path.display(),
            original = original_filename,
            "Created transient upload"
        );
        Ok((document, file))
    }
}

/// An uploaded document owned by exactly one request.
#[derive(Debug)]
pub struct TransientDocument {
    path: PathBuf,
    original_filename: String,
    size_bytes: u64,
}

impl TransientDocument {
    /// Generated storage location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name the client uploaded the file under.
    pub fn original_filename(&self) -> &str {
        &self.original_filename
    }

    /// Bytes written so far.
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Account for `len` more bytes written to the file.
    pub fn record_written(&mut self, len: usize) {
        self.size_bytes += len as u64;
    }
}

impl Drop for TransientDocument {
    fn drop(&mut self) {
        // Drop cannot await; a single unlink is cheap enough to run inline on the worker.
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed transient upload"),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => tracing::warn!(
                path = %self.path.display(),
                error = %error,
                "Failed to remove transient upload"
            ),
        }
    }
}
