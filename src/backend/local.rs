//! Local filesystem backend.
//!
//! Serves notes from a directory on disk. Every relative path is normalized
//! against the configured root and rejected if it would resolve outside it,
//! either lexically (`..` past the root) or through a symlink.
//!
//! Tree walks run on a blocking thread via `walkdir`; reads and writes use
//! `tokio::fs` so a slow disk never stalls other requests.
//!
//! # Configuration
//!
//! ```toml
//! [store.local]
//! root = "../brain"
//! follow_symlinks = false
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

use crate::backend::{Mode, NoteBackend};
use crate::config::LocalConfig;
use crate::error::{Result, StoreError};
use crate::frontmatter;
use crate::models::{DeleteResult, Document, FileNode, WriteResult};
use crate::tree::{is_hidden, is_markdown, join, sort_nodes};

/// A note store rooted at a local directory.
pub struct LocalBackend {
    root: PathBuf,
    follow_symlinks: bool,
}

/// A normalized path: its segments joined with `/`, and the absolute
/// location under the root.
struct Resolved {
    rel: String,
    full: PathBuf,
}

impl LocalBackend {
    pub fn new(config: &LocalConfig) -> Self {
        Self {
            root: config.root.clone(),
            follow_symlinks: config.follow_symlinks,
        }
    }

    /// Normalize `path` and confirm it stays inside the root.
    async fn resolve(&self, path: &str) -> Result<Resolved> {
        let segments = normalize(path)?;
        let full = segments.iter().fold(self.root.clone(), |p, s| p.join(s));
        let rel = segments.join("/");
        self.check_contained(&rel, &full).await?;
        Ok(Resolved { rel, full })
    }

    /// Like [`resolve`](Self::resolve), but the root itself is not allowed.
    async fn resolve_file(&self, path: &str) -> Result<Resolved> {
        let resolved = self.resolve(path).await?;
        if resolved.rel.is_empty() {
            return Err(StoreError::InvalidPath("path must not be empty".to_string()));
        }
        Ok(resolved)
    }

    /// Canonicalize the nearest existing ancestor of `full` and require it
    /// to sit under the canonical root, so symlinks cannot escape.
    async fn check_contained(&self, rel: &str, full: &Path) -> Result<()> {
        let Ok(canon_root) = fs::canonicalize(&self.root).await else {
            // No root yet, so nothing under it can point elsewhere.
            return Ok(());
        };

        let mut existing = full.to_path_buf();
        loop {
            if let Ok(canon) = fs::canonicalize(&existing).await {
                if canon.starts_with(&canon_root) {
                    return Ok(());
                }
                return Err(StoreError::InvalidPath(format!(
                    "{} resolves outside the store root",
                    rel
                )));
            }
            if !existing.pop() {
                return Ok(());
            }
        }
    }
}

#[async_trait]
impl NoteBackend for LocalBackend {
    fn mode(&self) -> Mode {
        Mode::Local
    }

    async fn list_tree(&self, path: &str) -> Result<Vec<FileNode>> {
        let Resolved { rel, full } = self.resolve(path).await?;
        if rel.split('/').any(is_hidden) {
            return Err(StoreError::NotFound(format!("{} is hidden", rel)));
        }
        let meta = fs::metadata(&full)
            .await
            .map_err(|e| not_found_or_io(e, &rel))?;
        if !meta.is_dir() {
            return Err(StoreError::NotFound(format!("{} is not a directory", rel)));
        }

        debug!(root = %self.root.display(), path = %rel, "local: list_tree");
        let walk = Walk {
            follow_symlinks: self.follow_symlinks,
            canon_root: fs::canonicalize(&self.root).await?,
        };
        tokio::task::spawn_blocking(move || walk_tree(&full, &rel, &walk))
            .await
            .map_err(|e| StoreError::Io(io::Error::other(e)))?
    }

    async fn read_file(&self, path: &str) -> Result<Document> {
        let Resolved { rel, full } = self.resolve_file(path).await?;
        let meta = fs::metadata(&full)
            .await
            .map_err(|e| not_found_or_io(e, &rel))?;
        if meta.is_dir() {
            return Err(StoreError::NotFound(format!("{} is a directory", rel)));
        }

        let bytes = fs::read(&full).await.map_err(|e| not_found_or_io(e, &rel))?;
        let raw = String::from_utf8(bytes).map_err(|_| StoreError::InvalidContent(rel.clone()))?;
        let (metadata, body) = frontmatter::parse(&raw);

        let modified: DateTime<Utc> = meta
            .modified()
            .map(DateTime::from)
            .unwrap_or_else(|_| Utc::now());

        debug!(path = %rel, size = raw.len(), "local: read_file");
        Ok(Document {
            body: body.to_string(),
            metadata,
            modified_at: modified.to_rfc3339(),
            revision_token: None,
        })
    }

    async fn write_file(
        &self,
        path: &str,
        text: &str,
        _revision: Option<&str>,
    ) -> Result<WriteResult> {
        let Resolved { rel, full } = self.resolve_file(path).await?;

        let created = match fs::metadata(&full).await {
            Ok(m) if m.is_dir() => {
                return Err(StoreError::InvalidPath(format!("{} is a directory", rel)));
            }
            Ok(_) => false,
            Err(e) if e.kind() == io::ErrorKind::NotFound => true,
            Err(e) => return Err(StoreError::Io(e)),
        };

        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&full, text).await?;

        debug!(path = %rel, size = text.len(), created, "local: write_file");
        Ok(WriteResult {
            path: rel,
            created,
            revision_token: None,
        })
    }

    async fn delete_file(&self, path: &str, _revision: Option<&str>) -> Result<DeleteResult> {
        let Resolved { rel, full } = self.resolve_file(path).await?;
        let meta = fs::metadata(&full)
            .await
            .map_err(|e| not_found_or_io(e, &rel))?;
        if meta.is_dir() {
            return Err(StoreError::NotFound(format!("{} is a directory", rel)));
        }

        fs::remove_file(&full)
            .await
            .map_err(|e| not_found_or_io(e, &rel))?;

        debug!(path = %rel, "local: delete_file");
        Ok(DeleteResult { path: rel })
    }
}

/// Split a relative path into clean segments.
///
/// `.` and empty segments are dropped and `..` pops the previous segment.
/// Popping past the root, or any segment that is not a plain name (such as
/// a Windows drive prefix), is an [`StoreError::InvalidPath`].
fn normalize(path: &str) -> Result<Vec<String>> {
    let mut segments: Vec<String> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                if segments.pop().is_none() {
                    return Err(StoreError::InvalidPath(format!(
                        "{} escapes the store root",
                        path
                    )));
                }
            }
            name => {
                let mut components = Path::new(name).components();
                match (components.next(), components.next()) {
                    (Some(Component::Normal(_)), None) => segments.push(name.to_string()),
                    _ => {
                        return Err(StoreError::InvalidPath(format!(
                            "invalid path segment '{}' in {}",
                            name, path
                        )));
                    }
                }
            }
        }
    }

    Ok(segments)
}

/// One directory being assembled during the walk.
struct Frame {
    name: String,
    path: String,
    depth: usize,
    children: Vec<FileNode>,
}

/// Walk settings fixed for one listing.
struct Walk {
    follow_symlinks: bool,
    /// Symlinked entries must resolve under this path to be listed.
    canon_root: PathBuf,
}

impl Walk {
    fn admits(&self, entry: &walkdir::DirEntry) -> bool {
        if is_hidden(&entry.file_name().to_string_lossy()) {
            return false;
        }
        if !entry.path_is_symlink() {
            return true;
        }
        std::fs::canonicalize(entry.path())
            .map(|target| target.starts_with(&self.canon_root))
            .unwrap_or(false)
    }
}

/// Walk `start` depth-first and assemble the sorted node tree.
///
/// Hidden entries and symlinks leading out of the root are pruned before
/// descent. Node paths are built from `rel`, the root-relative path of
/// `start`.
fn walk_tree(start: &Path, rel: &str, walk: &Walk) -> Result<Vec<FileNode>> {
    let mut frames = vec![Frame {
        name: String::new(),
        path: rel.to_string(),
        depth: 0,
        children: Vec::new(),
    }];

    let walker = WalkDir::new(start)
        .follow_links(walk.follow_symlinks)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| walk.admits(e));

    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        let depth = entry.depth();

        while frames.last().is_some_and(|f| f.depth >= depth) {
            close_frame(&mut frames);
        }

        let name = entry.file_name().to_string_lossy().to_string();
        let Some(parent) = frames.last_mut() else {
            break;
        };
        let path = join(&parent.path, &name);

        if entry.file_type().is_dir() {
            frames.push(Frame {
                name,
                path,
                depth,
                children: Vec::new(),
            });
        } else if entry.file_type().is_file() && is_markdown(&name) {
            parent.children.push(FileNode::file(name, path));
        }
    }

    while frames.len() > 1 {
        close_frame(&mut frames);
    }

    let mut nodes = frames.pop().map(|f| f.children).unwrap_or_default();
    sort_nodes(&mut nodes);
    Ok(nodes)
}

/// Pop the innermost directory and attach it to its parent.
fn close_frame(frames: &mut Vec<Frame>) {
    if frames.len() < 2 {
        return;
    }
    if let Some(mut frame) = frames.pop() {
        sort_nodes(&mut frame.children);
        let node = FileNode::directory(frame.name, frame.path, frame.children);
        if let Some(parent) = frames.last_mut() {
            parent.children.push(node);
        }
    }
}

fn not_found_or_io(e: io::Error, rel: &str) -> StoreError {
    if e.kind() == io::ErrorKind::NotFound {
        StoreError::NotFound(rel.to_string())
    } else {
        StoreError::Io(e)
    }
}
