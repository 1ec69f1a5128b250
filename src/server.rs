//! HTTP route handlers over the note store.
//!
//! The handlers are thin: they parse the request, call one
//! [`ContentStore`] operation, and shape the response. All status mapping
//! happens here; the store only reports error kinds.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (version and mode) |
//! | `GET`  | `/api/tree` | Full note tree (`?path=` for a subtree) |
//! | `GET`  | `/api/notes/{*path}` | Read one note |
//! | `PUT`  | `/api/notes/{*path}` | Create or overwrite a note |
//! | `DELETE` | `/api/notes/{*path}` | Delete a note (`?revision=` for remote) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "Not found: inbox/x.md" } }
//! ```
//!
//! | Code | Status |
//! |------|--------|
//! | `invalid_path` | 400 |
//! | `not_found` | 404 |
//! | `conflict` | 409 |
//! | `invalid_content` | 422 |
//! | `io` | 500 |
//! | `unsupported` | 501 |
//! | `backend_unavailable` | 502 |

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::backend::Mode;
use crate::config::Config;
use crate::error::StoreError;
use crate::frontmatter;
use crate::models::{DeleteResult, Document, FileNode, Metadata, WriteResult};
use crate::store::ContentStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    store: ContentStore,
}

/// Build the router over `store`.
pub fn router(store: ContentStore) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/tree", get(handle_tree))
        .route(
            "/api/notes/{*path}",
            get(handle_read).put(handle_write).delete(handle_delete),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState { store })
}

/// Bind to `[server].bind` and serve until the process exits.
pub async fn run_server(config: &Config, store: ContentStore) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let mode = store.mode();
    let app = router(store);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(bind = %bind_addr, mode = %mode, "note server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Converts a [`StoreError`] into an HTTP response.
struct AppError(StoreError);

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError(e)
    }
}

fn status_for(err: &StoreError) -> StatusCode {
    match err {
        StoreError::InvalidPath(_) => StatusCode::BAD_REQUEST,
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Conflict(_) => StatusCode::CONFLICT,
        StoreError::InvalidContent(_) => StatusCode::UNPROCESSABLE_ENTITY,
        StoreError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        StoreError::Unsupported(_) => StatusCode::NOT_IMPLEMENTED,
        StoreError::BackendUnavailable(_) => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.0.kind().to_string(),
                message: self.0.to_string(),
            },
        };
        (status_for(&self.0), Json(body)).into_response()
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    mode: Mode,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        mode: state.store.mode(),
    })
}

// ============ GET /api/tree ============

#[derive(Deserialize)]
struct TreeQuery {
    #[serde(default)]
    path: Option<String>,
}

#[derive(Serialize)]
struct TreeResponse {
    nodes: Vec<FileNode>,
}

/// Always 200: a broken backend renders as an empty tree.
async fn handle_tree(
    State(state): State<AppState>,
    Query(query): Query<TreeQuery>,
) -> Json<TreeResponse> {
    let nodes = state
        .store
        .list_tree_at(query.path.as_deref().unwrap_or(""))
        .await;
    Json(TreeResponse { nodes })
}

// ============ /api/notes/{*path} ============

async fn handle_read(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Json<Document>, AppError> {
    Ok(Json(state.store.read_file(&path).await?))
}

/// Request body for `PUT /api/notes/{*path}`.
#[derive(Deserialize)]
struct WriteRequest {
    /// Note body. Written as-is when `metadata` is empty.
    content: String,
    /// Rendered into a front-matter block ahead of `content`.
    #[serde(default)]
    metadata: Metadata,
    /// Revision token from a prior read; required for remote updates.
    #[serde(default)]
    revision: Option<String>,
}

async fn handle_write(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Json(req): Json<WriteRequest>,
) -> Result<Json<WriteResult>, AppError> {
    let text = frontmatter::render(&req.metadata, &req.content);
    let result = match req.revision.as_deref() {
        Some(rev) => state.store.write_file_with_revision(&path, &text, rev).await?,
        None => state.store.write_file(&path, &text).await?,
    };
    Ok(Json(result))
}

#[derive(Deserialize)]
struct DeleteQuery {
    #[serde(default)]
    revision: Option<String>,
}

async fn handle_delete(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<DeleteResult>, AppError> {
    let result = match query.revision.as_deref() {
        Some(rev) => state.store.delete_file_with_revision(&path, rev).await?,
        None => state.store.delete_file(&path).await?,
    };
    Ok(Json(result))
}
