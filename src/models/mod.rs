pub mod bookmark;

pub use bookmark::{display_host, Bookmark, BookmarkInsert, NewBookmark, ValidationError};
