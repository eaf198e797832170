use std::sync::Arc;

use crate::config::AppConfig;
use crate::feed::{ChangeFeed, RealtimeFeed};
use crate::identity::{IdentityProvider, SupabaseAuth};
use crate::session::SessionCookies;
use crate::store::{BookmarkStore, RestBookmarkStore};

/// Shared handler state. Every collaborator sits behind a trait object so
/// the router can run against any backend.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub cookies: SessionCookies,
    pub identity: Arc<dyn IdentityProvider>,
    pub store: Arc<dyn BookmarkStore>,
    pub feed: Arc<dyn ChangeFeed>,
}

impl AppState {
    /// Wires the hosted backend clients around one shared HTTP client.
    pub fn new(config: AppConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.backend.http_timeout())
            .user_agent(concat!("smart-bookmarks/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let identity = Arc::new(SupabaseAuth::new(config.backend.clone(), http.clone()));
        let store = Arc::new(RestBookmarkStore::new(config.backend.clone(), http));
        let feed = Arc::new(RealtimeFeed::new(config.backend.clone()));

        Ok(Self::with_backends(config, identity, store, feed))
    }

    pub fn with_backends(
        config: AppConfig,
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn BookmarkStore>,
        feed: Arc<dyn ChangeFeed>,
    ) -> Self {
        let cookies = SessionCookies::new(
            &config.backend.project_ref(),
            config.security.secure_cookies,
        );

        Self {
            config: Arc::new(config),
            cookies,
            identity,
            store,
            feed,
        }
    }
}
