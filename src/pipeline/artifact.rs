//! Local artifacts — fetched documents materialized into temporary files.
//!
//! **Core invariant: at most one live artifact per store.** Installing a new
//! artifact releases the one it replaces, and a release happens exactly
//! once no matter how many handles point at the artifact.

use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tempfile::TempPath;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ArtifactError;

/// Fragment appended to preview sources to hide viewer chrome.
const PREVIEW_FRAGMENT: &str = "toolbar=0&navpanes=0";

struct LocalArtifact {
    id: Uuid,
    source_url: Option<String>,
    len: usize,
    created_at: DateTime<Utc>,
    path: PathBuf,
    file: Mutex<Option<TempPath>>,
    live: Arc<AtomicUsize>,
}

impl LocalArtifact {
    /// Delete the backing file. Returns `false` if it was already gone.
    fn release(&self) -> bool {
        let taken = lock(&self.file).take();
        let Some(temp_path) = taken else {
            return false;
        };
        self.live.fetch_sub(1, Ordering::SeqCst);
        if let Err(e) = temp_path.close() {
            warn!(artifact = %self.id, "Failed to remove artifact file: {}", e);
        }
        debug!(artifact = %self.id, "Artifact released");
        true
    }

    fn is_released(&self) -> bool {
        lock(&self.file).is_none()
    }
}

impl Drop for LocalArtifact {
    fn drop(&mut self) {
        self.release();
    }
}

/// Shared handle to a materialized document.
///
/// Cloning is cheap. Once the artifact is released every clone refuses to
/// hand out its contents.
#[derive(Clone)]
pub struct ArtifactHandle {
    inner: Arc<LocalArtifact>,
}

impl ArtifactHandle {
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Byte length of the document.
    pub fn len(&self) -> usize {
        self.inner.len
    }

    pub fn is_empty(&self) -> bool {
        self.inner.len == 0
    }

    /// Remote locator the bytes were fetched from, if any.
    pub fn source_url(&self) -> Option<&str> {
        self.inner.source_url.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }

    pub fn is_released(&self) -> bool {
        self.inner.is_released()
    }

    /// Release the backing file now. Idempotent.
    pub fn release(&self) -> bool {
        self.inner.release()
    }

    /// Local path of the backing file.
    pub fn path(&self) -> Result<&Path, ArtifactError> {
        self.ensure_live()?;
        Ok(&self.inner.path)
    }

    /// `file://` URL suitable for an embedded viewer.
    pub fn preview_source(&self) -> Result<String, ArtifactError> {
        let path = self.path()?;
        let mut url = reqwest::Url::from_file_path(path).map_err(|_| {
            ArtifactError::Io(std::io::Error::other(format!(
                "artifact path is not absolute: {}",
                path.display()
            )))
        })?;
        url.set_fragment(Some(PREVIEW_FRAGMENT));
        Ok(url.to_string())
    }

    /// Read the whole document.
    pub async fn read(&self) -> Result<Vec<u8>, ArtifactError> {
        let path = self.path()?;
        Ok(tokio::fs::read(path).await?)
    }

    /// Copy the document into `dir` under `file_name`.
    pub async fn save_as(&self, dir: &Path, file_name: &str) -> Result<PathBuf, ArtifactError> {
        let source = self.path()?;
        tokio::fs::create_dir_all(dir).await?;
        let dest = dir.join(file_name);
        tokio::fs::copy(source, &dest).await?;
        Ok(dest)
    }

    fn ensure_live(&self) -> Result<(), ArtifactError> {
        if self.is_released() {
            return Err(ArtifactError::Released { id: self.inner.id });
        }
        Ok(())
    }
}

impl std::fmt::Debug for ArtifactHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactHandle")
            .field("id", &self.inner.id)
            .field("len", &self.inner.len)
            .field("source_url", &self.inner.source_url)
            .field("released", &self.is_released())
            .finish()
    }
}

/// Materializes documents and owns the single current-artifact slot.
pub struct ArtifactStore {
    dir: Option<PathBuf>,
    live: Arc<AtomicUsize>,
    current: Mutex<Option<ArtifactHandle>>,
}

impl ArtifactStore {
    /// Create a store writing into `dir`, or the system temp dir.
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self {
            dir,
            live: Arc::new(AtomicUsize::new(0)),
            current: Mutex::new(None),
        }
    }

    /// Write `bytes` to a fresh temporary file.
    ///
    /// The new artifact is not installed; call [`ArtifactStore::install`]
    /// once it is confirmed valid.
    pub async fn materialize(
        &self,
        bytes: Vec<u8>,
        source_url: Option<String>,
    ) -> Result<ArtifactHandle, ArtifactError> {
        if bytes.is_empty() {
            return Err(ArtifactError::Empty);
        }
        let len = bytes.len();
        let dir = self.dir.clone().unwrap_or_else(std::env::temp_dir);

        let temp_path = tokio::task::spawn_blocking(move || -> std::io::Result<TempPath> {
            std::fs::create_dir_all(&dir)?;
            let dir = std::fs::canonicalize(&dir)?;
            let mut file = tempfile::Builder::new()
                .prefix("cronograma-")
                .suffix(".pdf")
                .tempfile_in(&dir)?;
            file.write_all(&bytes)?;
            file.as_file().sync_all()?;
            Ok(file.into_temp_path())
        })
        .await
        .map_err(std::io::Error::other)??;

        self.live.fetch_add(1, Ordering::SeqCst);
        let artifact = LocalArtifact {
            id: Uuid::new_v4(),
            source_url,
            len,
            created_at: Utc::now(),
            path: temp_path.to_path_buf(),
            file: Mutex::new(Some(temp_path)),
            live: Arc::clone(&self.live),
        };
        debug!(artifact = %artifact.id, bytes = len, path = %artifact.path.display(), "Artifact materialized");

        Ok(ArtifactHandle {
            inner: Arc::new(artifact),
        })
    }

    /// Make `handle` the current artifact, then release the one it replaces.
    pub fn install(&self, handle: ArtifactHandle) {
        let previous = lock(&self.current).replace(handle);
        if let Some(previous) = previous {
            previous.release();
        }
    }

    pub fn current(&self) -> Option<ArtifactHandle> {
        lock(&self.current).clone()
    }

    /// Release and forget the current artifact.
    pub fn clear(&self) {
        if let Some(previous) = lock(&self.current).take() {
            previous.release();
        }
    }

    /// Number of artifacts whose backing file still exists.
    pub fn live_count(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl Drop for ArtifactStore {
    fn drop(&mut self) {
        self.clear();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
