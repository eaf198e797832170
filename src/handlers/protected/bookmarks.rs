// handlers/protected/bookmarks.rs - JSON bookmark API and SSE change relay

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Extension, Json,
};
use futures::{Stream, StreamExt};
use uuid::Uuid;

use super::BookmarkForm;
use crate::error::ApiError;
use crate::feed::ChangeMessage;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::models::{Bookmark, NewBookmark};
use crate::state::AppState;

/// GET /api/bookmarks
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Vec<Bookmark>> {
    let rows = state.store.list(&auth.context).await?;
    Ok(ApiResponse::success(rows))
}

/// POST /api/bookmarks - 201 with the created row, 400 on invalid input.
/// Validation happens before any backend call.
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<BookmarkForm>,
) -> ApiResult<Bookmark> {
    let new = NewBookmark::parse(&body.title, &body.url)?;
    let created = state.store.insert(&auth.context, &new).await?;
    tracing::info!(id = %created.id, "bookmark added");
    Ok(ApiResponse::created(created))
}

/// DELETE /api/bookmarks/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.store.delete(&auth.context, id).await?;
    Ok(ApiResponse::no_content())
}

/**
 * GET /api/bookmarks/events - Server-sent change relay
 *
 * Opens one feed subscription for the caller and forwards each change as
 * an SSE event named after its kind:
 *
 * ```text
 * event: INSERT
 * data: {"eventType":"INSERT","new":{...},"old":{}}
 * ```
 *
 * The subscription is dropped, and the channel closed, when the client
 * disconnects.
 */
pub async fn events(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let subscription = state.feed.subscribe(&auth.context).await?;
    tracing::debug!(user_id = %auth.user_id, "change feed attached");

    let stream = subscription.into_stream().map(|change| {
        Event::default()
            .event(change.event_type().as_str())
            .json_data(ChangeMessage::from(&change))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
