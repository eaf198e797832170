//! Bookmark data access against the hosted table store.

pub mod rest;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Bookmark, NewBookmark};
use crate::session::SessionContext;

pub use rest::RestBookmarkStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Table store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Table store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Table store returned no row for insert")]
    EmptyInsert,
}

/// Every call is scoped by the caller's [`SessionContext`]. Failures are
/// returned once; nothing here retries.
#[async_trait]
pub trait BookmarkStore: Send + Sync {
    /// Rows owned by the current user, newest first.
    async fn list(&self, ctx: &SessionContext) -> Result<Vec<Bookmark>, StoreError>;

    async fn insert(&self, ctx: &SessionContext, bookmark: &NewBookmark) -> Result<Bookmark, StoreError>;

    /// Removes the row with `id` if the current user owns it.
    async fn delete(&self, ctx: &SessionContext, id: Uuid) -> Result<(), StoreError>;
}
