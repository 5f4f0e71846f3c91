use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use bytes::Bytes;
use dlk_pack::ArrayArchive;
use dlk_protocol::{
    archive_to_object, object_to_archive, CalcRequest, CalcResponse, ObjectListResponse,
    ObjectMetadata, OverwriteQuery, PathRequest, ProtocolError, RenameRequest, StatusResponse,
    ARCHIVE_CONTENT_TYPE,
};
use dlk_store::{StoreResult, WorkspaceBackend};
use tracing::debug;

use crate::auth::AuthProvider;
use crate::error::{ServerError, ServerResult};

/// Shared state of the web API handlers.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn WorkspaceBackend>,
    pub auth: Arc<dyn AuthProvider>,
}

impl AppState {
    pub fn new(backend: Arc<dyn WorkspaceBackend>, auth: Arc<dyn AuthProvider>) -> Self {
        Self { backend, auth }
    }

    /// Run a backend operation on the blocking pool.
    async fn run<T, F>(&self, op: F) -> ServerResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn WorkspaceBackend) -> StoreResult<T> + Send + 'static,
    {
        let backend = Arc::clone(&self.backend);
        let result = tokio::task::spawn_blocking(move || op(backend.as_ref()))
            .await
            .map_err(|e| ServerError::Internal(format!("backend task failed: {e}")))?;
        Ok(result?)
    }
}

pub async fn status(State(state): State<AppState>) -> ServerResult<Json<StatusResponse>> {
    let count = state.run(|b| b.list().map(|names| names.len())).await?;
    Ok(Json(StatusResponse::ok(count)))
}

/// Entries that vanish between listing and fetching are left out.
pub async fn list_objects(State(state): State<AppState>) -> ServerResult<Json<ObjectListResponse>> {
    let objects = state
        .run(|b| {
            let mut objects = Vec::new();
            for name in b.list()? {
                match b.get(&name) {
                    Ok(object) => objects.push(ObjectMetadata::describe(&name, &object)),
                    Err(e) if e.is_not_found() => continue,
                    Err(e) => return Err(e),
                }
            }
            Ok(objects)
        })
        .await?;
    Ok(Json(ObjectListResponse { objects }))
}

pub async fn object_metadata(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ServerResult<Json<ObjectMetadata>> {
    let metadata = state
        .run(move |b| b.get(&name).map(|o| ObjectMetadata::describe(&name, &o)))
        .await?;
    Ok(Json(metadata))
}

pub async fn get_object_data(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ServerResult<impl IntoResponse> {
    let (name, object) = state
        .run(move |b| b.get(&name).map(|o| (name, o)))
        .await?;
    let archive = object_to_archive(&name, &object)?;
    Ok(([(header::CONTENT_TYPE, ARCHIVE_CONTENT_TYPE)], archive.to_bytes()))
}

pub async fn put_object_data(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<OverwriteQuery>,
    body: Bytes,
) -> ServerResult<StatusCode> {
    let archive = ArrayArchive::from_bytes(&body).map_err(ProtocolError::from)?;
    let object = archive_to_object(&name, &archive)?;
    debug!(name = %name, kind = %object.kind(), overwrite = query.overwrite, "storing object");
    state
        .run(move |b| b.add(&name, object, query.overwrite))
        .await?;
    Ok(StatusCode::CREATED)
}

pub async fn delete_object(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ServerResult<StatusCode> {
    state.run(move |b| b.remove(&name)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn rename_object(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<RenameRequest>,
) -> ServerResult<StatusCode> {
    state
        .run(move |b| b.rename(&name, &request.new_name))
        .await?;
    Ok(StatusCode::OK)
}

pub async fn clear(State(state): State<AppState>) -> ServerResult<StatusCode> {
    state.run(|b| b.clear()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn save_workspace(
    State(state): State<AppState>,
    Json(request): Json<PathRequest>,
) -> ServerResult<StatusCode> {
    let path = PathBuf::from(request.path);
    state.run(move |b| b.save(&path)).await?;
    Ok(StatusCode::OK)
}

pub async fn load_workspace(
    State(state): State<AppState>,
    Json(request): Json<PathRequest>,
) -> ServerResult<StatusCode> {
    let path = PathBuf::from(request.path);
    state.run(move |b| b.load(&path)).await?;
    Ok(StatusCode::OK)
}

pub async fn calc(
    State(state): State<AppState>,
    Json(request): Json<CalcRequest>,
) -> ServerResult<Json<CalcResponse>> {
    let result = state
        .run(move |b| b.calc(&request.name, request.params.as_ref()))
        .await?;
    Ok(Json(CalcResponse { result }))
}
