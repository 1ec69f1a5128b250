//! Core data models returned by the note store.
//!
//! These types describe the note hierarchy ([`FileNode`]), the materialized
//! content of one note ([`Document`]), and the outcomes of mutating calls.
//! All of them are built fresh on every call; nothing is cached.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Front-matter metadata: string keys mapped to structured values.
pub type Metadata = BTreeMap<String, MetaValue>;

/// A single front-matter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<MetaValue>),
    Map(Metadata),
}

impl MetaValue {
    /// Returns the string payload, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        MetaValue::String(s.to_string())
    }
}

/// Whether a [`FileNode`] is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Directory,
}

/// One entry in the note hierarchy.
///
/// `path` is relative to the store root with `/` separators, and a child's
/// path is always `parent.path + "/" + child.name`. `children` is `Some` only
/// for directories, already sorted directories-first then by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileNode {
    pub name: String,
    pub path: String,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FileNode>>,
}

impl FileNode {
    /// Create a file node.
    pub fn file(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: NodeKind::File,
            children: None,
        }
    }

    /// Create a directory node with the given (already sorted) children.
    pub fn directory(
        name: impl Into<String>,
        path: impl Into<String>,
        children: Vec<FileNode>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: NodeKind::Directory,
            children: Some(children),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    /// Children of a directory, or an empty slice for files.
    pub fn children(&self) -> &[FileNode] {
        self.children.as_deref().unwrap_or(&[])
    }
}

/// The materialized content of one note.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    /// Note text with the front-matter block removed.
    pub body: String,
    /// Parsed front-matter; empty when the note has none.
    pub metadata: Metadata,
    /// RFC 3339 timestamp. See the backend docs for what it measures.
    pub modified_at: String,
    /// Opaque token required to update or delete this note remotely.
    /// Always `None` for the local backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision_token: Option<String>,
}

/// Outcome of a successful write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteResult {
    pub path: String,
    /// `true` when no file existed at `path` before the write.
    pub created: bool,
    /// New revision token after the write (remote backend only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision_token: Option<String>,
}

/// Outcome of a successful delete.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteResult {
    pub path: String,
}
