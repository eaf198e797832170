// handlers/protected/dashboard.rs - Server-rendered dashboard and form posts

use axum::{
    extract::{Path, Query, State},
    response::{Html, Response},
    Extension, Form,
};
use serde::Deserialize;
use url::form_urlencoded;
use uuid::Uuid;

use super::BookmarkForm;
use crate::dashboard::Dashboard;
use crate::handlers::DASHBOARD_PATH;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::found;
use crate::models::{NewBookmark, ValidationError};
use crate::state::AppState;
use crate::views;

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub error: Option<String>,
}

/// GET /dashboard - Render the current user's bookmarks, newest first.
/// A failed fetch renders an empty list.
pub async fn page(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<DashboardQuery>,
) -> Html<String> {
    let mut dashboard = Dashboard::loading();
    match state.store.list(&auth.context).await {
        Ok(rows) => dashboard.load(rows),
        Err(e) => {
            tracing::error!(error = %e, "Error fetching bookmarks");
            dashboard.mark_loaded();
        }
    }

    Html(views::dashboard_page(
        auth.email.as_deref(),
        dashboard.bookmarks(),
        query.error.as_deref(),
    ))
}

/**
 * POST /dashboard/bookmarks - Add a bookmark from the dashboard form
 *
 * - empty title or url → no backend call, 302 /dashboard
 * - malformed url      → no backend call, 302 /dashboard?error=...
 * - otherwise          → one insert; failures are logged, 302 /dashboard
 *
 * The browser learns about the new row from the change feed or the reload.
 */
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Form(form): Form<BookmarkForm>,
) -> Response {
    let new = match NewBookmark::parse(&form.title, &form.url) {
        Ok(new) => new,
        Err(ValidationError::MissingTitle | ValidationError::MissingUrl) => {
            return found(DASHBOARD_PATH);
        }
        Err(e) => return found(&dashboard_error(&e.to_string())),
    };

    match state.store.insert(&auth.context, &new).await {
        Ok(bookmark) => tracing::info!(id = %bookmark.id, "bookmark added"),
        Err(e) => tracing::error!(error = %e, "Error adding bookmark"),
    }
    found(DASHBOARD_PATH)
}

/// POST /dashboard/bookmarks/:id/delete
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Response {
    if let Err(e) = state.store.delete(&auth.context, id).await {
        tracing::error!(error = %e, %id, "Error deleting bookmark");
    }
    found(DASHBOARD_PATH)
}

fn dashboard_error(message: &str) -> String {
    let encoded = form_urlencoded::Serializer::new(String::new())
        .append_pair("error", message)
        .finish();
    format!("{}?{}", DASHBOARD_PATH, encoded)
}
