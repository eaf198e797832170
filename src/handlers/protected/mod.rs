// handlers/protected/mod.rs - Protected handlers (session required)
//
// Every route here sits behind `session_middleware`, which places an
// `AuthUser` in the request extensions.
//
// /dashboard/*      → server-rendered pages and form posts (302 on completion)
// /api/bookmarks/*  → JSON envelope and the SSE change relay
pub mod bookmarks;
pub mod dashboard;

use serde::Deserialize;

/// Form and JSON body for a new bookmark. Missing fields read as empty so
/// validation, not deserialization, decides the outcome.
#[derive(Debug, Default, Deserialize)]
pub struct BookmarkForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
}
