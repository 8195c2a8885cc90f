use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_macros::debug_handler;
use utoipa::OpenApi;

use std::sync::Arc;

use crate::{
    dto::{
        CountResponse, CreateNoteRequest, NotePageResponse, NoteResponse, PageQuery, SearchQuery,
        UpdateNoteRequest,
    },
    error::StoreError,
    service::NoteStore,
};

/// Shared state of the REST handlers.
pub struct ApiState {
    pub store: NoteStore,
    pub default_page_size: u32,
}

impl ApiState {
    pub const fn new(store: NoteStore, default_page_size: u32) -> Self {
        Self {
            store,
            default_page_size,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        create_note,
        update_note,
        delete_note,
        get_one_note,
        list_notes,
        search_notes,
        count_notes
    ),
    components(schemas(
        NoteResponse,
        CreateNoteRequest,
        UpdateNoteRequest,
        NotePageResponse,
        CountResponse
    )),
    tags(
        (name = "notes", description = "Notes management API")
    )
)]
pub struct ApiDoc;

fn error_response(action: &str, e: &StoreError) -> Response {
    match e {
        StoreError::Validation(reason) => {
            (StatusCode::BAD_REQUEST, reason.to_string()).into_response()
        }
        StoreError::Backend(cause) => {
            tracing::error!("failed to {action}: {cause}");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to {action}")).into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/notes",
    request_body = CreateNoteRequest,
    responses(
        (status = 201, description = "Note created successfully", body = NoteResponse),
        (status = 400, description = "Empty title or text"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn create_note(
    State(state): State<Arc<ApiState>>,
    Json(payload): Json<CreateNoteRequest>,
) -> Response {
    match state.store.create(payload.into()).await {
        Ok(note) => (StatusCode::CREATED, Json(NoteResponse::from(note))).into_response(),
        Err(e) => error_response("create note", &e),
    }
}

#[utoipa::path(
    put,
    path = "/notes/{id}",
    params(
        ("id" = i64, Path, description = "Note ID")
    ),
    request_body = UpdateNoteRequest,
    responses(
        (status = 204, description = "Update applied, or no note with this ID"),
        (status = 400, description = "Empty title or text"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn update_note(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateNoteRequest>,
) -> Response {
    match state.store.update(id, payload.into()).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response("update note", &e),
    }
}

#[utoipa::path(
    delete,
    path = "/notes/{id}",
    params(
        ("id" = i64, Path, description = "Note ID")
    ),
    responses(
        (status = 204, description = "Note deleted, or no note with this ID"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn delete_note(State(state): State<Arc<ApiState>>, Path(id): Path<i64>) -> Response {
    match state.store.delete(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response("delete note", &e),
    }
}

#[utoipa::path(
    get,
    path = "/notes/{id}",
    params(
        ("id" = i64, Path, description = "Note ID")
    ),
    responses(
        (status = 200, description = "Note found", body = NoteResponse),
        (status = 404, description = "Note not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn get_one_note(State(state): State<Arc<ApiState>>, Path(id): Path<i64>) -> Response {
    match state.store.get_by_id(id).await {
        Ok(Some(note)) => (StatusCode::OK, Json(NoteResponse::from(note))).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Note not found").into_response(),
        Err(e) => error_response("get note", &e),
    }
}

#[utoipa::path(
    get,
    path = "/notes",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of notes, newest first", body = NotePageResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn list_notes(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<PageQuery>,
) -> Response {
    let page = query.page.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(state.default_page_size).max(1);

    let notes = match state.store.list_page(page, page_size).await {
        Ok(notes) => notes,
        Err(e) => return error_response("list notes", &e),
    };

    let total_count = match state.store.count().await {
        Ok(count) => count,
        Err(e) => return error_response("count notes", &e),
    };

    let body = NotePageResponse {
        notes: notes.into_iter().map(NoteResponse::from).collect(),
        page,
        page_size,
        total_count,
        total_pages: total_count.div_ceil(u64::from(page_size)),
    };

    (StatusCode::OK, Json(body)).into_response()
}

#[utoipa::path(
    get,
    path = "/notes/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching notes, newest first", body = Vec<NoteResponse>),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn search_notes(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<SearchQuery>,
) -> Response {
    let term = query.term.unwrap_or_default();

    match state.store.search(&term).await {
        Ok(notes) => {
            let notes: Vec<NoteResponse> = notes.into_iter().map(NoteResponse::from).collect();
            (StatusCode::OK, Json(notes)).into_response()
        }
        Err(e) => error_response("search notes", &e),
    }
}

#[utoipa::path(
    get,
    path = "/notes/count",
    responses(
        (status = 200, description = "Number of stored notes", body = CountResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn count_notes(State(state): State<Arc<ApiState>>) -> Response {
    match state.store.count().await {
        Ok(count) => (StatusCode::OK, Json(CountResponse { count })).into_response(),
        Err(e) => error_response("count notes", &e),
    }
}
