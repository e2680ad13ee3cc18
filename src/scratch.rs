//! Request-scoped scratch files.
//!
//! A [`ScratchFile`] owns a uniquely named path and removes it when dropped,
//! so every exit path of a request releases it exactly once.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{error, info};
use uuid::Uuid;

use crate::models::EXTENSION;

/// A uniquely named file deleted on drop.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    /// Reserve a fresh path inside `dir`, creating the directory if needed.
    ///
    /// The file itself is not created; the name never depends on user input.
    pub fn reserve<P: AsRef<Path>>(dir: P) -> io::Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let path = dir.join(format!("song_{}.{}", Uuid::new_v4().simple(), EXTENSION));
        info!("Temporary file path: {}", path.display());

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create (or truncate) the file for writing.
    pub async fn create(&self) -> io::Result<tokio::fs::File> {
        tokio::fs::File::create(&self.path).await
    }

    /// Open the file for reading.
    pub async fn open(&self) -> io::Result<tokio::fs::File> {
        tokio::fs::File::open(&self.path).await
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => info!("Temporary file {} deleted successfully.", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => error!("Error removing temporary file {}: {}", self.path.display(), e),
        }
    }
}
