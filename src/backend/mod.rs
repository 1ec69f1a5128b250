//! Storage backends for the note store.
//!
//! The [`NoteBackend`] trait defines the four content operations. Two
//! implementations exist and exactly one is active per process:
//!
//! | Backend | Module | Source of truth |
//! |---------|--------|-----------------|
//! | Remote | [`remote`] | A GitHub-compatible contents API, one repo + branch |
//! | Local | [`local`] | A directory on the local filesystem |
//!
//! Backends are strict: every failure is returned as a
//! [`StoreError`](crate::error::StoreError). Policy such as degrading a
//! failed listing to an empty tree lives in
//! [`ContentStore`](crate::store::ContentStore).

pub mod local;
pub mod remote;

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

use crate::error::Result;
use crate::models::{DeleteResult, Document, FileNode, WriteResult};

/// Which backend the process is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Remote,
    Local,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Remote => write!(f, "remote"),
            Mode::Local => write!(f, "local"),
        }
    }
}

/// Abstract content backend.
///
/// All paths are relative to the store root and use `/` separators. The
/// empty path names the root itself and is only meaningful for
/// [`list_tree`](NoteBackend::list_tree).
#[async_trait]
pub trait NoteBackend: Send + Sync {
    fn mode(&self) -> Mode;

    /// List the whole subtree under `path`, sorted at every level.
    async fn list_tree(&self, path: &str) -> Result<Vec<FileNode>>;

    /// Fetch one file and split its front-matter.
    async fn read_file(&self, path: &str) -> Result<Document>;

    /// Create or overwrite a file with `text` as-is.
    ///
    /// `revision` is the token from a prior read; backends that do not
    /// track revisions ignore it.
    async fn write_file(
        &self,
        path: &str,
        text: &str,
        revision: Option<&str>,
    ) -> Result<WriteResult>;

    /// Remove a file.
    async fn delete_file(&self, path: &str, revision: Option<&str>) -> Result<DeleteResult>;
}
