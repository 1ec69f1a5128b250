//! Integration tests for the local backend through [`ContentStore`].
//!
//! Each test builds a throwaway notes directory and drives the public store
//! API against it.

use brain_store::backend::Mode;
use brain_store::config::StoreConfig;
use brain_store::models::{FileNode, MetaValue};
use brain_store::store::ContentStore;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn local_store(root: &Path) -> ContentStore {
    let mut config = StoreConfig::default();
    config.local.root = root.to_path_buf();
    ContentStore::from_config(&config).unwrap()
}

fn following_store(root: &Path) -> ContentStore {
    let mut config = StoreConfig::default();
    config.local.root = root.to_path_buf();
    config.local.follow_symlinks = true;
    ContentStore::from_config(&config).unwrap()
}

fn setup_notes() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    fs::create_dir_all(root.join("notes/sub")).unwrap();
    fs::write(root.join("notes/a.md"), "# A\n").unwrap();
    fs::write(root.join("notes/.hidden.md"), "secret").unwrap();
    fs::write(root.join("notes/sub/b.md"), "# B\n").unwrap();
    fs::write(root.join("notes/sub/readme.txt"), "plain").unwrap();
    tmp
}

fn names(nodes: &[FileNode]) -> Vec<&str> {
    nodes.iter().map(|n| n.name.as_str()).collect()
}

fn all_paths(nodes: &[FileNode], out: &mut Vec<String>) {
    for node in nodes {
        out.push(node.path.clone());
        all_paths(node.children(), out);
    }
}

// ─── Tree ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_tree_filters_and_orders() {
    let tmp = setup_notes();
    let store = local_store(tmp.path());
    assert_eq!(store.mode(), Mode::Local);

    let tree = store.list_tree().await;
    assert_eq!(names(&tree), vec!["notes"]);

    let notes = &tree[0];
    assert!(notes.is_dir());
    assert_eq!(names(notes.children()), vec!["sub", "a.md"]);

    let sub = &notes.children()[0];
    assert_eq!(sub.path, "notes/sub");
    assert_eq!(names(sub.children()), vec!["b.md"]);
    assert_eq!(sub.children()[0].path, "notes/sub/b.md");

    let mut paths = Vec::new();
    all_paths(&tree, &mut paths);
    assert!(!paths.iter().any(|p| p.contains(".hidden")));
    assert!(!paths.iter().any(|p| p.ends_with(".txt")));
}

#[tokio::test]
async fn test_tree_child_paths_extend_parent() {
    let tmp = setup_notes();
    fs::create_dir_all(tmp.path().join("journal/2024")).unwrap();
    fs::write(tmp.path().join("journal/2024/jan.md"), "x").unwrap();

    fn check(nodes: &[FileNode], parent: &str) {
        for node in nodes {
            let expected = if parent.is_empty() {
                node.name.clone()
            } else {
                format!("{}/{}", parent, node.name)
            };
            assert_eq!(node.path, expected);
            check(node.children(), &node.path);
        }
    }

    let store = local_store(tmp.path());
    check(&store.list_tree().await, "");
}

#[tokio::test]
async fn test_tree_keeps_empty_directories() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("empty")).unwrap();
    fs::create_dir_all(tmp.path().join("only-text")).unwrap();
    fs::write(tmp.path().join("only-text/notes.txt"), "x").unwrap();

    let store = local_store(tmp.path());
    let tree = store.list_tree().await;
    assert_eq!(names(&tree), vec!["empty", "only-text"]);
    assert!(tree.iter().all(|n| n.is_dir() && n.children().is_empty()));
}

#[tokio::test]
async fn test_tree_skips_hidden_directories() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join(".git/objects")).unwrap();
    fs::write(tmp.path().join(".git/HEAD.md"), "x").unwrap();
    fs::write(tmp.path().join("visible.md"), "x").unwrap();

    let store = local_store(tmp.path());
    assert_eq!(names(&store.list_tree().await), vec!["visible.md"]);
}

#[tokio::test]
async fn test_tree_directories_before_files_case_insensitive() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("beta.md"), "x").unwrap();
    fs::write(tmp.path().join("Alpha.md"), "x").unwrap();
    fs::create_dir_all(tmp.path().join("zeta")).unwrap();
    fs::create_dir_all(tmp.path().join("Delta")).unwrap();

    let store = local_store(tmp.path());
    assert_eq!(
        names(&store.list_tree().await),
        vec!["Delta", "zeta", "Alpha.md", "beta.md"]
    );
}

#[tokio::test]
async fn test_tree_subtree_listing() {
    let tmp = setup_notes();
    let store = local_store(tmp.path());

    let sub = store.list_tree_at("notes/sub").await;
    assert_eq!(names(&sub), vec!["b.md"]);
    assert_eq!(sub[0].path, "notes/sub/b.md");
}

#[tokio::test]
async fn test_hidden_start_path_degrades_to_empty() {
    let tmp = setup_notes();
    fs::create_dir_all(tmp.path().join(".private")).unwrap();
    fs::write(tmp.path().join(".private/diary.md"), "dear diary").unwrap();
    fs::create_dir_all(tmp.path().join("notes/.drafts")).unwrap();
    fs::write(tmp.path().join("notes/.drafts/wip.md"), "x").unwrap();

    let store = local_store(tmp.path());
    assert!(store.list_tree_at(".private").await.is_empty());
    assert!(store.list_tree_at("/.private/").await.is_empty());
    assert!(store.list_tree_at("notes/.drafts").await.is_empty());
    assert_eq!(names(&store.list_tree().await), vec!["notes"]);
}

#[tokio::test]
async fn test_tree_missing_root_degrades_to_empty() {
    let tmp = TempDir::new().unwrap();
    let store = local_store(&tmp.path().join("does-not-exist"));
    assert!(store.list_tree().await.is_empty());
}

#[tokio::test]
async fn test_tree_traversal_degrades_to_empty() {
    let tmp = setup_notes();
    let store = local_store(&tmp.path().join("notes"));
    assert!(store.list_tree_at("../").await.is_empty());
}

// ─── Read / write ───────────────────────────────────────────────────

#[tokio::test]
async fn test_read_splits_frontmatter() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("foo.md"), "---\ntitle: Foo\n---\nHello world").unwrap();

    let store = local_store(tmp.path());
    let doc = store.read_file("foo.md").await.unwrap();
    assert_eq!(doc.body, "Hello world");
    assert_eq!(doc.metadata.len(), 1);
    assert_eq!(doc.metadata["title"], MetaValue::from("Foo"));
    assert!(doc.revision_token.is_none());
    assert!(chrono::DateTime::parse_from_rfc3339(&doc.modified_at).is_ok());
}

#[tokio::test]
async fn test_read_without_frontmatter_returns_text_unchanged() {
    let tmp = TempDir::new().unwrap();
    let text = "# Title\n\n---\nnot front-matter\n---\n";
    fs::write(tmp.path().join("plain.md"), text).unwrap();

    let store = local_store(tmp.path());
    let doc = store.read_file("plain.md").await.unwrap();
    assert!(doc.metadata.is_empty());
    assert_eq!(doc.body, text);
}

#[tokio::test]
async fn test_read_unclosed_frontmatter_is_body() {
    let tmp = TempDir::new().unwrap();
    let text = "---\ntitle: Foo\nno closing fence";
    fs::write(tmp.path().join("open.md"), text).unwrap();

    let store = local_store(tmp.path());
    let doc = store.read_file("open.md").await.unwrap();
    assert!(doc.metadata.is_empty());
    assert_eq!(doc.body, text);
}

#[tokio::test]
async fn test_write_then_read_round_trip() {
    let tmp = TempDir::new().unwrap();
    let store = local_store(tmp.path());
    let text = "---\ntags:\n- rust\n- notes\n---\nBody text\n";

    let result = store.write_file("inbox/new/today.md", text).await.unwrap();
    assert_eq!(result.path, "inbox/new/today.md");
    assert!(result.created);

    let raw = fs::read_to_string(tmp.path().join("inbox/new/today.md")).unwrap();
    assert_eq!(raw, text);

    let doc = store.read_file("inbox/new/today.md").await.unwrap();
    assert_eq!(doc.body, "Body text\n");
    assert_eq!(
        doc.metadata["tags"],
        MetaValue::List(vec![MetaValue::from("rust"), MetaValue::from("notes")])
    );

    let again = store.write_file("inbox/new/today.md", "replaced").await.unwrap();
    assert!(!again.created);
    assert_eq!(store.read_file("inbox/new/today.md").await.unwrap().body, "replaced");
}

#[tokio::test]
async fn test_write_creates_missing_root() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("brain");
    let store = local_store(&root);

    store.write_file("first.md", "hello").await.unwrap();
    assert!(root.join("first.md").is_file());
    assert_eq!(names(&store.list_tree().await), vec!["first.md"]);
}

#[tokio::test]
async fn test_read_missing_is_not_found() {
    let tmp = setup_notes();
    let store = local_store(tmp.path());
    let err = store.read_file("notes/nope.md").await.unwrap_err();
    assert_eq!(err.kind(), "not_found");
}

#[tokio::test]
async fn test_read_directory_is_not_found() {
    let tmp = setup_notes();
    let store = local_store(tmp.path());
    let err = store.read_file("notes/sub").await.unwrap_err();
    assert_eq!(err.kind(), "not_found");
}

#[tokio::test]
async fn test_read_non_utf8_is_invalid_content() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("bin.md"), [0xff, 0xfe, 0x00, 0x80]).unwrap();

    let store = local_store(tmp.path());
    let err = store.read_file("bin.md").await.unwrap_err();
    assert_eq!(err.kind(), "invalid_content");
}

#[tokio::test]
async fn test_write_over_directory_is_invalid_path() {
    let tmp = setup_notes();
    let store = local_store(tmp.path());
    let err = store.write_file("notes/sub", "x").await.unwrap_err();
    assert_eq!(err.kind(), "invalid_path");
}

// ─── Path safety ────────────────────────────────────────────────────

#[tokio::test]
async fn test_traversal_is_invalid_path() {
    let tmp = setup_notes();
    fs::write(tmp.path().join("outside.md"), "secret").unwrap();
    let store = local_store(&tmp.path().join("notes"));

    for path in ["../outside.md", "sub/../../outside.md", "../../etc/passwd"] {
        let err = store.read_file(path).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_path", "read {}", path);

        let err = store.write_file(path, "x").await.unwrap_err();
        assert_eq!(err.kind(), "invalid_path", "write {}", path);

        let err = store.delete_file(path).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_path", "delete {}", path);
    }
    assert_eq!(fs::read_to_string(tmp.path().join("outside.md")).unwrap(), "secret");
}

#[tokio::test]
async fn test_empty_path_is_invalid_path() {
    let tmp = setup_notes();
    let store = local_store(tmp.path());
    for path in ["", "/", "."] {
        assert_eq!(store.read_file(path).await.unwrap_err().kind(), "invalid_path");
        assert_eq!(store.write_file(path, "x").await.unwrap_err().kind(), "invalid_path");
        assert_eq!(store.delete_file(path).await.unwrap_err().kind(), "invalid_path");
    }
}

#[tokio::test]
async fn test_leading_slash_stays_under_root() {
    let tmp = setup_notes();
    let store = local_store(tmp.path());
    let doc = store.read_file("/notes/a.md").await.unwrap();
    assert_eq!(doc.body, "# A\n");
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlink_escape_is_invalid_path() {
    let outside = TempDir::new().unwrap();
    fs::write(outside.path().join("secret.md"), "secret").unwrap();

    let tmp = TempDir::new().unwrap();
    std::os::unix::fs::symlink(outside.path(), tmp.path().join("link")).unwrap();

    let store = local_store(tmp.path());
    let err = store.read_file("link/secret.md").await.unwrap_err();
    assert_eq!(err.kind(), "invalid_path");

    let err = store.write_file("link/planted.md", "x").await.unwrap_err();
    assert_eq!(err.kind(), "invalid_path");
    assert!(!outside.path().join("planted.md").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_followed_symlink_outside_root_is_not_listed() {
    let outside = TempDir::new().unwrap();
    fs::write(outside.path().join("secret-plan.md"), "secret").unwrap();

    let tmp = setup_notes();
    std::os::unix::fs::symlink(outside.path(), tmp.path().join("link")).unwrap();
    std::os::unix::fs::symlink(tmp.path().join("notes/sub"), tmp.path().join("alias")).unwrap();

    let store = following_store(tmp.path());
    let tree = store.list_tree().await;
    assert_eq!(names(&tree), vec!["alias", "notes"]);
    assert_eq!(names(tree[0].children()), vec!["b.md"]);

    let mut paths = Vec::new();
    all_paths(&tree, &mut paths);
    assert!(!paths.iter().any(|p| p.starts_with("link")));
    for path in paths.iter().filter(|p| p.ends_with(".md")) {
        assert!(store.read_file(path).await.is_ok(), "unreadable {}", path);
    }
}

// ─── Delete ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_delete_missing_is_not_found() {
    let tmp = setup_notes();
    let store = local_store(tmp.path());
    let err = store.delete_file("notes/missing.md").await.unwrap_err();
    assert_eq!(err.kind(), "not_found");
}

#[tokio::test]
async fn test_delete_removes_file() {
    let tmp = setup_notes();
    let store = local_store(tmp.path());

    let result = store.delete_file("notes/a.md").await.unwrap();
    assert_eq!(result.path, "notes/a.md");
    assert!(!tmp.path().join("notes/a.md").exists());

    let tree = store.list_tree().await;
    assert_eq!(names(tree[0].children()), vec!["sub"]);
}

#[tokio::test]
async fn test_delete_directory_is_not_found() {
    let tmp = setup_notes();
    let store = local_store(tmp.path());
    let err = store.delete_file("notes/sub").await.unwrap_err();
    assert_eq!(err.kind(), "not_found");
    assert!(tmp.path().join("notes/sub/b.md").exists());
}
