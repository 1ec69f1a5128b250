//! Remote backend over a GitHub-compatible contents API.
//!
//! Notes live in one repository and branch. The backend walks directories
//! with `GET /repos/{owner}/{repo}/contents/{path}` and fetches file blobs
//! from the same endpoint, decoding their base64 payload.
//!
//! # Configuration
//!
//! ```toml
//! [store.remote]
//! owner = "acme"
//! repo = "brain"
//! branch = "main"
//! # api_base = "https://github.example.com/api/v3"   # GitHub Enterprise
//! timeout_secs = 30
//! max_concurrency = 8
//! allow_writes = false
//! ```
//!
//! The bearer credential is read from `GITHUB_TOKEN`.
//!
//! # Limits
//!
//! At most `max_concurrency` requests are in flight at once across the
//! whole backend. The contents API returns at most 1,000 entries per
//! directory; larger directories are listed truncated and logged. Files
//! over 1 MB carry no inline content and are fetched with the raw media
//! type instead.
//!
//! # Writes
//!
//! With `allow_writes = false` (the default) [`write_file`] and
//! [`delete_file`] return [`StoreError::Unsupported`] without touching the
//! network. When enabled, an update requires the revision token (the blob
//! SHA) from a prior read; writing without one over an existing file is a
//! [`StoreError::Conflict`].
//!
//! [`write_file`]: NoteBackend::write_file
//! [`delete_file`]: NoteBackend::delete_file

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use reqwest::{header, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::backend::{Mode, NoteBackend};
use crate::config::RemoteConfig;
use crate::error::{Result, StoreError};
use crate::frontmatter;
use crate::models::{DeleteResult, Document, FileNode, WriteResult};
use crate::tree::{is_hidden, is_markdown, join, sort_nodes};

const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw+json";

/// Directory listings stop at this many entries.
const LISTING_LIMIT: usize = 1000;

/// Repository coordinates and credential for the remote backend.
///
/// Only constructible when all three values are present, which is the
/// condition for selecting remote mode.
#[derive(Debug, Clone)]
pub struct RemoteTarget {
    pub owner: String,
    pub repo: String,
    pub token: String,
}

impl RemoteTarget {
    /// Returns `Some` only when token, owner, and repo are all non-empty.
    pub fn from_config(config: &RemoteConfig) -> Option<Self> {
        let present = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };
        Some(Self {
            owner: present(&config.owner)?,
            repo: present(&config.repo)?,
            token: present(&config.token)?,
        })
    }
}

/// A note store backed by one repository branch.
pub struct RemoteBackend {
    client: reqwest::Client,
    api_base: String,
    target: RemoteTarget,
    branch: String,
    allow_writes: bool,
    limiter: Arc<Semaphore>,
}

/// Body of a contents API `GET`: a directory listing or a single file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Directory(Vec<ContentEntry>),
    File(ContentEntry),
}

#[derive(Debug, Deserialize)]
struct ContentEntry {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    sha: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    size: Option<u64>,
}

#[derive(Serialize)]
struct PutContentsRequest<'a> {
    message: String,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Serialize)]
struct DeleteContentsRequest<'a> {
    message: String,
    sha: &'a str,
    branch: &'a str,
}

#[derive(Deserialize)]
struct PutContentsResponse {
    #[serde(default)]
    content: Option<ContentEntry>,
}

impl RemoteBackend {
    pub fn new(config: &RemoteConfig, target: RemoteTarget) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("brain-store/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            target,
            branch: config.branch.clone(),
            allow_writes: config.allow_writes,
            limiter: Arc::new(Semaphore::new(config.max_concurrency.max(1))),
        })
    }

    fn contents_url(&self, rel: &str) -> String {
        let mut url = format!(
            "{}/repos/{}/{}/contents",
            self.api_base,
            encode_segment(&self.target.owner),
            encode_segment(&self.target.repo)
        );
        for segment in rel.split('/').filter(|s| !s.is_empty()) {
            url.push('/');
            url.push_str(&encode_segment(segment));
        }
        url
    }

    fn request(&self, method: Method, rel: &str) -> RequestBuilder {
        self.request_as(method, rel, JSON_MEDIA_TYPE)
    }

    fn request_as(&self, method: Method, rel: &str, media_type: &str) -> RequestBuilder {
        self.client
            .request(method, self.contents_url(rel))
            .bearer_auth(&self.target.token)
            .header(header::ACCEPT, media_type)
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    /// Send under the backend-wide concurrency limit.
    async fn send(&self, req: RequestBuilder, rel: &str) -> Result<Response> {
        let _permit = self.limiter.acquire().await.map_err(|e| {
            StoreError::BackendUnavailable(format!("request for '{}': {}", rel, e))
        })?;
        req.send().await.map_err(|e| unavailable(rel, e))
    }

    async fn get_contents(&self, rel: &str) -> Result<ContentsResponse> {
        let req = self
            .request(Method::GET, rel)
            .query(&[("ref", self.branch.as_str())]);
        let resp = check_status(self.send(req, rel).await?, rel).await?;
        resp.json::<ContentsResponse>().await.map_err(|e| malformed(rel, e))
    }

    /// Fetch file bytes directly, for files too large to inline.
    async fn get_raw(&self, rel: &str) -> Result<Vec<u8>> {
        let req = self
            .request_as(Method::GET, rel, RAW_MEDIA_TYPE)
            .query(&[("ref", self.branch.as_str())]);
        let resp = check_status(self.send(req, rel).await?, rel).await?;
        let bytes = resp.bytes().await.map_err(|e| malformed(rel, e))?;
        Ok(bytes.to_vec())
    }

    /// List one directory and recurse into its subdirectories concurrently.
    /// Any failure aborts the whole subtree.
    fn list_dir(&self, rel: String) -> BoxFuture<'_, Result<Vec<FileNode>>> {
        async move {
            debug!(path = %rel, "remote: list directory");
            let entries = match self.get_contents(&rel).await? {
                ContentsResponse::Directory(entries) => entries,
                ContentsResponse::File(_) => {
                    return Err(StoreError::NotFound(format!("{} is not a directory", rel)));
                }
            };
            if entries.len() >= LISTING_LIMIT {
                warn!(
                    path = %rel,
                    entries = entries.len(),
                    "remote: directory listing hit the contents API limit, tree may be truncated"
                );
            }

            let mut dirs = Vec::new();
            let mut files = Vec::new();
            for entry in entries {
                if is_hidden(&entry.name) {
                    continue;
                }
                let path = join(&rel, &entry.name);
                match entry.kind.as_str() {
                    "dir" => dirs.push((entry.name, path)),
                    "file" if is_markdown(&entry.name) => {
                        files.push(FileNode::file(entry.name, path));
                    }
                    _ => {}
                }
            }

            let subtrees =
                try_join_all(dirs.iter().map(|(_, path)| self.list_dir(path.clone()))).await?;

            let mut nodes: Vec<FileNode> = dirs
                .into_iter()
                .zip(subtrees)
                .map(|((name, path), children)| FileNode::directory(name, path, children))
                .collect();
            nodes.extend(files);
            sort_nodes(&mut nodes);
            Ok(nodes)
        }
        .boxed()
    }

    fn require_writes(&self, action: &str, rel: &str) -> Result<()> {
        if self.allow_writes {
            Ok(())
        } else {
            Err(StoreError::Unsupported(format!(
                "{} '{}' is not supported by the remote backend",
                action, rel
            )))
        }
    }
}

#[async_trait]
impl NoteBackend for RemoteBackend {
    fn mode(&self) -> Mode {
        Mode::Remote
    }

    async fn list_tree(&self, path: &str) -> Result<Vec<FileNode>> {
        let rel = normalize(path)?;
        if rel.split('/').any(is_hidden) {
            return Err(StoreError::NotFound(format!("{} is hidden", rel)));
        }
        self.list_dir(rel).await
    }

    async fn read_file(&self, path: &str) -> Result<Document> {
        let rel = normalize_file(path)?;
        let entry = match self.get_contents(&rel).await? {
            ContentsResponse::File(entry) if entry.kind == "file" => entry,
            _ => return Err(StoreError::NotFound(format!("{} is not a file", rel))),
        };

        let inline = match entry.encoding.as_deref() {
            None | Some("base64") => entry
                .content
                .as_deref()
                .filter(|c| !c.is_empty() || entry.size == Some(0)),
            Some("none") => None,
            Some(other) => {
                return Err(StoreError::BackendUnavailable(format!(
                    "unsupported content encoding '{}' for '{}'",
                    other, rel
                )));
            }
        };
        let bytes = match inline {
            Some(content) => decode_base64(content).map_err(|e| {
                StoreError::BackendUnavailable(format!(
                    "invalid base64 content for '{}': {}",
                    rel, e
                ))
            })?,
            // Over 1 MB: no inline payload.
            None => self.get_raw(&rel).await?,
        };
        let raw = String::from_utf8(bytes).map_err(|_| StoreError::InvalidContent(rel.clone()))?;
        let (metadata, body) = frontmatter::parse(&raw);

        debug!(path = %rel, size = raw.len(), "remote: read_file");
        Ok(Document {
            body: body.to_string(),
            metadata,
            modified_at: Utc::now().to_rfc3339(),
            revision_token: entry.sha,
        })
    }

    async fn write_file(
        &self,
        path: &str,
        text: &str,
        revision: Option<&str>,
    ) -> Result<WriteResult> {
        let rel = normalize_file(path)?;
        self.require_writes("writing", &rel)?;

        if revision.is_none() {
            match self.get_contents(&rel).await {
                Ok(ContentsResponse::File(_)) => {
                    return Err(StoreError::Conflict(format!(
                        "{} already exists; its revision token is required to update it",
                        rel
                    )));
                }
                Ok(ContentsResponse::Directory(_)) => {
                    return Err(StoreError::InvalidPath(format!("{} is a directory", rel)));
                }
                Err(StoreError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }

        let message = match revision {
            Some(_) => format!("Update {}", rel),
            None => format!("Create {}", rel),
        };
        let body = PutContentsRequest {
            message,
            content: STANDARD.encode(text),
            branch: &self.branch,
            sha: revision,
        };

        let req = self.request(Method::PUT, &rel).json(&body);
        let resp = check_write_status(self.send(req, &rel).await?, &rel).await?;
        let created = resp.status() == StatusCode::CREATED;
        let out: PutContentsResponse = resp.json().await.map_err(|e| malformed(&rel, e))?;

        debug!(path = %rel, created, "remote: write_file");
        Ok(WriteResult {
            path: rel,
            created,
            revision_token: out.content.and_then(|c| c.sha),
        })
    }

    async fn delete_file(&self, path: &str, revision: Option<&str>) -> Result<DeleteResult> {
        let rel = normalize_file(path)?;
        self.require_writes("deleting", &rel)?;

        let sha = revision.ok_or_else(|| {
            StoreError::Conflict(format!("deleting {} requires its current revision token", rel))
        })?;
        let body = DeleteContentsRequest {
            message: format!("Delete {}", rel),
            sha,
            branch: &self.branch,
        };

        let req = self.request(Method::DELETE, &rel).json(&body);
        check_write_status(self.send(req, &rel).await?, &rel).await?;

        debug!(path = %rel, "remote: delete_file");
        Ok(DeleteResult { path: rel })
    }
}

/// Strip surrounding slashes and empty segments. `.` and `..` are rejected
/// so a path can never address another API endpoint.
fn normalize(path: &str) -> Result<String> {
    let mut segments = Vec::new();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if segment == "." || segment == ".." {
            return Err(StoreError::InvalidPath(format!(
                "relative segment '{}' in {}",
                segment, path
            )));
        }
        segments.push(segment);
    }
    Ok(segments.join("/"))
}

fn normalize_file(path: &str) -> Result<String> {
    let rel = normalize(path)?;
    if rel.is_empty() {
        return Err(StoreError::InvalidPath("path must not be empty".to_string()));
    }
    Ok(rel)
}

async fn check_status(resp: Response, rel: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(StoreError::NotFound(rel.to_string()));
    }
    let body = resp.text().await.unwrap_or_default();
    Err(StoreError::BackendUnavailable(format!(
        "contents API returned HTTP {} for '{}': {}",
        status,
        rel,
        body.chars().take(300).collect::<String>()
    )))
}

/// Like [`check_status`], but 409 and 422 mean the revision token was
/// missing or stale.
async fn check_write_status(resp: Response, rel: &str) -> Result<Response> {
    match resp.status() {
        StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => Err(StoreError::Conflict(
            format!("revision token for {} is missing or stale", rel),
        )),
        _ => check_status(resp, rel).await,
    }
}

fn unavailable(rel: &str, e: reqwest::Error) -> StoreError {
    StoreError::BackendUnavailable(format!("request for '{}' failed: {}", rel, e))
}

fn malformed(rel: &str, e: reqwest::Error) -> StoreError {
    StoreError::BackendUnavailable(format!("malformed response for '{}': {}", rel, e))
}

/// The contents API wraps base64 payloads at 60 columns.
fn decode_base64(content: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD.decode(compact)
}

/// Percent-encode one URL path segment per RFC 3986.
///
/// Encodes all characters except unreserved characters:
/// `A-Z a-z 0-9 - _ . ~`
fn encode_segment(s: &str) -> String {
    let mut result = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    result
}
