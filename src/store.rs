//! The public content store and backend selection.
//!
//! [`build_backend`] is the mode selector: it is called once at process
//! start and pins the process to one backend. [`ContentStore`] wraps that
//! backend and applies the error policy callers rely on:
//!
//! | Operation | On failure |
//! |-----------|------------|
//! | [`list_tree`](ContentStore::list_tree) | logs the cause, returns an empty tree |
//! | [`read_file`](ContentStore::read_file) | returns the [`StoreError`] |
//! | [`write_file`](ContentStore::write_file) | returns the [`StoreError`] |
//! | [`delete_file`](ContentStore::delete_file) | returns the [`StoreError`] |
//!
//! Nothing is retried.
//!
//! # Example
//!
//! ```rust,no_run
//! use brain_store::config::StoreConfig;
//! use brain_store::store::ContentStore;
//!
//! # async fn example() -> brain_store::error::Result<()> {
//! let store = ContentStore::from_config(&StoreConfig::default())?;
//! for node in store.list_tree().await {
//!     println!("{}", node.path);
//! }
//! let doc = store.read_file("inbox/today.md").await?;
//! println!("{}", doc.body);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use tracing::{info, warn};

use crate::backend::local::LocalBackend;
use crate::backend::remote::{RemoteBackend, RemoteTarget};
use crate::backend::{Mode, NoteBackend};
use crate::config::StoreConfig;
use crate::error::Result;
use crate::models::{DeleteResult, Document, FileNode, WriteResult};

/// Remote when a token, owner, and repo are all configured; local otherwise.
pub fn select_mode(config: &StoreConfig) -> Mode {
    match RemoteTarget::from_config(&config.remote) {
        Some(_) => Mode::Remote,
        None => Mode::Local,
    }
}

/// Construct the backend chosen by [`select_mode`].
pub fn build_backend(config: &StoreConfig) -> Result<Arc<dyn NoteBackend>> {
    match RemoteTarget::from_config(&config.remote) {
        Some(target) => {
            info!(
                owner = %target.owner,
                repo = %target.repo,
                branch = %config.remote.branch,
                allow_writes = config.remote.allow_writes,
                "note store: remote mode"
            );
            Ok(Arc::new(RemoteBackend::new(&config.remote, target)?))
        }
        None => {
            info!(root = %config.local.root.display(), "note store: local mode");
            Ok(Arc::new(LocalBackend::new(&config.local)))
        }
    }
}

/// Read/write access to the note tree through the selected backend.
///
/// Cheap to clone; all clones share the same backend.
#[derive(Clone)]
pub struct ContentStore {
    backend: Arc<dyn NoteBackend>,
}

impl ContentStore {
    /// Wrap an already-constructed backend.
    pub fn new(backend: Arc<dyn NoteBackend>) -> Self {
        Self { backend }
    }

    /// Select and construct the backend from configuration.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        Ok(Self::new(build_backend(config)?))
    }

    pub fn mode(&self) -> Mode {
        self.backend.mode()
    }

    /// The whole note tree from the store root.
    pub async fn list_tree(&self) -> Vec<FileNode> {
        self.list_tree_at("").await
    }

    /// The subtree under `path`. Failures are logged and yield an empty tree.
    pub async fn list_tree_at(&self, path: &str) -> Vec<FileNode> {
        match self.backend.list_tree(path).await {
            Ok(nodes) => nodes,
            Err(e) => {
                warn!(
                    mode = %self.mode(),
                    path = %path,
                    error_kind = e.kind(),
                    error = %e,
                    "note store: listing failed, returning empty tree"
                );
                Vec::new()
            }
        }
    }

    pub async fn read_file(&self, path: &str) -> Result<Document> {
        self.backend.read_file(path).await
    }

    /// Create or overwrite `path` with `text` as-is.
    pub async fn write_file(&self, path: &str, text: &str) -> Result<WriteResult> {
        self.backend.write_file(path, text, None).await
    }

    /// Write using the revision token from a prior [`read_file`](Self::read_file).
    pub async fn write_file_with_revision(
        &self,
        path: &str,
        text: &str,
        revision: &str,
    ) -> Result<WriteResult> {
        self.backend.write_file(path, text, Some(revision)).await
    }

    pub async fn delete_file(&self, path: &str) -> Result<DeleteResult> {
        self.backend.delete_file(path, None).await
    }

    pub async fn delete_file_with_revision(
        &self,
        path: &str,
        revision: &str,
    ) -> Result<DeleteResult> {
        self.backend.delete_file(path, Some(revision)).await
    }
}
