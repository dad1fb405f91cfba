//! Noteline Server - reference remote store for offline-first note clients.
//!
//! Serves a REST note collection at `/api/notes`. Clients push local edits
//! with `PUT /api/notes/{id}` and pull the full list with `GET /api/notes`.

pub mod config;
pub mod error;
pub mod handlers;
pub mod repo;
pub mod routes;

use crate::repo::NoteRepository;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone, Default)]
pub struct AppState {
    pub repo: Arc<NoteRepository>,
}

impl AppState {
    pub fn new(repo: Arc<NoteRepository>) -> Self {
        Self { repo }
    }
}

/// Build the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
