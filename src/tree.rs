//! Helpers shared by both backends when building the note tree.

use std::cmp::Ordering;

use crate::models::FileNode;

/// Entries whose name starts with `.` are invisible to the store.
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Only markdown files appear as file nodes.
pub fn is_markdown(name: &str) -> bool {
    name.ends_with(".md")
}

/// Join a root-relative parent path and an entry name with `/`.
///
/// The root has an empty path, so top-level entries get `path == name`.
pub fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Sort one level of the tree: directories first, then by name.
///
/// Names compare case-insensitively; exact byte order breaks ties so the
/// result is deterministic.
pub fn sort_nodes(nodes: &mut [FileNode]) {
    nodes.sort_by(compare_nodes);
}

fn compare_nodes(a: &FileNode, b: &FileNode) -> Ordering {
    b.is_dir()
        .cmp(&a.is_dir())
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
}
