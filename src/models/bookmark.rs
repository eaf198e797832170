use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;
use uuid::Uuid;

/// A saved link, shaped like a row of the `bookmarks` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Bookmark {
    /// Hostname shown next to the title. Falls back to the raw url when it
    /// does not parse, since stored rows are never re-validated.
    pub fn display_host(&self) -> String {
        display_host(&self.url)
    }

    /// Rows written by other clients are not validated, so only http(s)
    /// URLs may become links.
    pub fn is_web_link(&self) -> bool {
        Url::parse(&self.url).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
    }
}

pub fn display_host(raw: &str) -> String {
    match Url::parse(raw).ok().and_then(|u| u.host_str().map(str::to_string)) {
        Some(host) => host.strip_prefix("www.").map(str::to_string).unwrap_or(host),
        None => raw.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Title is required")]
    MissingTitle,

    #[error("URL is required")]
    MissingUrl,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ValidationError {
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingTitle => "title",
            ValidationError::MissingUrl | ValidationError::InvalidUrl(_) => "url",
        }
    }
}

/// Validated insert payload. Construct through [`NewBookmark::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewBookmark {
    title: String,
    url: String,
}

impl NewBookmark {
    pub fn parse(title: &str, url: &str) -> Result<Self, ValidationError> {
        let title = title.trim();
        let url = url.trim();

        if title.is_empty() {
            return Err(ValidationError::MissingTitle);
        }
        if url.is_empty() {
            return Err(ValidationError::MissingUrl);
        }

        let parsed = Url::parse(url).map_err(|e| ValidationError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(ValidationError::InvalidUrl(format!(
                "unsupported url '{}'",
                url
            )));
        }

        Ok(Self {
            title: title.to_string(),
            url: url.to_string(),
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Row body sent to the table store on insert.
#[derive(Debug, Serialize)]
pub struct BookmarkInsert<'a> {
    pub title: &'a str,
    pub url: &'a str,
    pub user_id: Uuid,
}
