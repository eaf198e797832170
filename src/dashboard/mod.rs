//! Dashboard view model: the bookmark list plus the reducer that keeps it
//! in step with local mutations and change-feed events.

pub mod session;

use uuid::Uuid;

use crate::feed::ChangeEvent;
use crate::models::Bookmark;

pub use session::{DashboardError, DashboardSession, Liveness, MountOutcome};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dashboard {
    loading: bool,
    bookmarks: Vec<Bookmark>,
}

impl Dashboard {
    pub fn loading() -> Self {
        Self {
            loading: true,
            bookmarks: Vec::new(),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.bookmarks.iter().any(|b| b.id == id)
    }

    /// Replaces the list with a fresh fetch and clears the loading flag.
    pub fn load(&mut self, bookmarks: Vec<Bookmark>) {
        self.bookmarks = bookmarks;
        self.loading = false;
    }

    pub fn mark_loaded(&mut self) {
        self.loading = false;
    }

    /// Applies one change. Inserts of a known id and deletes of an unknown
    /// id are no-ops, so a local mutation and its feed echo apply once.
    /// Returns whether the list changed.
    pub fn apply(&mut self, event: &ChangeEvent) -> bool {
        match event {
            ChangeEvent::Insert(bookmark) => {
                if self.contains(bookmark.id) {
                    return false;
                }
                self.bookmarks.insert(0, bookmark.clone());
                true
            }
            ChangeEvent::Update(bookmark) => {
                match self.bookmarks.iter_mut().find(|b| b.id == bookmark.id) {
                    Some(existing) if existing != bookmark => {
                        *existing = bookmark.clone();
                        true
                    }
                    _ => false,
                }
            }
            ChangeEvent::Delete { id } => {
                let before = self.bookmarks.len();
                self.bookmarks.retain(|b| b.id != *id);
                self.bookmarks.len() != before
            }
        }
    }

    /// Local counterpart of a confirmed insert.
    pub fn record_insert(&mut self, bookmark: Bookmark) -> bool {
        self.apply(&ChangeEvent::Insert(bookmark))
    }

    /// Local counterpart of a confirmed delete.
    pub fn record_delete(&mut self, id: Uuid) -> bool {
        self.apply(&ChangeEvent::Delete { id })
    }
}
