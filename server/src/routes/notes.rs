//! Note collection routes.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use noteline_engine::Note;

use crate::error::Result;
use crate::handlers::{
    handle_create, handle_delete, handle_get, handle_list, handle_put, DeleteResponse, NoteInput,
};
use crate::AppState;

/// Create note routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/notes", get(list_handler).post(create_handler))
        .route(
            "/api/notes/{id}",
            get(get_handler).put(put_handler).delete(delete_handler),
        )
}

/// GET /api/notes - All notes, newest first.
async fn list_handler(State(state): State<AppState>) -> Json<Vec<Note>> {
    Json(handle_list(&state.repo))
}

/// POST /api/notes - Create a note with a client-chosen id.
async fn create_handler(
    State(state): State<AppState>,
    Json(input): Json<NoteInput>,
) -> Result<Json<Note>> {
    Ok(Json(handle_create(&state.repo, input)?))
}

/// GET /api/notes/{id} - One note.
async fn get_handler(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Note>> {
    Ok(Json(handle_get(&state.repo, &id)?))
}

/// PUT /api/notes/{id} - Create or replace a note.
async fn put_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<NoteInput>,
) -> Result<Json<Note>> {
    Ok(Json(handle_put(&state.repo, &id, input)?))
}

/// DELETE /api/notes/{id} - Remove a note.
async fn delete_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>> {
    Ok(Json(handle_delete(&state.repo, &id)?))
}
