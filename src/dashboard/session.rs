use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use super::Dashboard;
use crate::feed::{ChangeEvent, ChangeFeed, Subscription};
use crate::identity::IdentityProvider;
use crate::models::{Bookmark, NewBookmark, ValidationError};
use crate::session::{Session, SessionBootstrap, SessionContext, StoredTokens};
use crate::store::{BookmarkStore, StoreError};

pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Dashboard is no longer mounted")]
    Unmounted,
}

/// Shared flag that goes false once the dashboard is unmounted. Results that
/// arrive after that point are dropped instead of applied.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn unmount(&self) {
        self.0.store(false, Ordering::Release);
    }
}

pub enum MountOutcome {
    Ready(DashboardSession),
    Redirect(&'static str),
}

/// One mounted dashboard: session, list state and optional live feed.
pub struct DashboardSession {
    session: Session,
    ctx: SessionContext,
    store: Arc<dyn BookmarkStore>,
    dashboard: Dashboard,
    subscription: Option<Subscription>,
    liveness: Liveness,
}

impl DashboardSession {
    /// Resolves the session and loads the list without opening a feed.
    pub async fn load(
        identity: &dyn IdentityProvider,
        store: Arc<dyn BookmarkStore>,
        stored: StoredTokens,
        wait: Duration,
    ) -> MountOutcome {
        let bootstrap = SessionBootstrap::new().resolve(identity, stored, wait).await;
        let Some(session) = bootstrap.into_session() else {
            tracing::info!("no session, redirecting to login");
            return MountOutcome::Redirect(LOGIN_PATH);
        };

        let ctx = session.context();
        let mut mounted = Self {
            session,
            ctx,
            store,
            dashboard: Dashboard::loading(),
            subscription: None,
            liveness: Liveness::new(),
        };
        mounted.refresh().await;
        MountOutcome::Ready(mounted)
    }

    /// Full mount: bootstrap, fetch, then attach the change feed.
    pub async fn mount(
        identity: &dyn IdentityProvider,
        store: Arc<dyn BookmarkStore>,
        feed: &dyn ChangeFeed,
        stored: StoredTokens,
        wait: Duration,
    ) -> MountOutcome {
        match Self::load(identity, store, stored, wait).await {
            MountOutcome::Ready(mut mounted) => {
                mounted.attach(feed).await;
                MountOutcome::Ready(mounted)
            }
            redirect => redirect,
        }
    }

    pub async fn attach(&mut self, feed: &dyn ChangeFeed) -> bool {
        match feed.subscribe(&self.ctx).await {
            Ok(subscription) if self.liveness.is_alive() => {
                self.subscription = Some(subscription);
                true
            }
            Ok(_) => false,
            Err(e) => {
                tracing::error!(error = %e, "Error subscribing to bookmark changes");
                false
            }
        }
    }

    /// Re-fetches the list. A failed fetch leaves the current list in place.
    pub async fn refresh(&mut self) {
        let result = self.store.list(&self.ctx).await;
        if !self.liveness.is_alive() {
            return;
        }
        match result {
            Ok(rows) => self.dashboard.load(rows),
            Err(e) => {
                tracing::error!(error = %e, "Error fetching bookmarks");
                self.dashboard.mark_loaded();
            }
        }
    }

    /// Validates before any network call; the list only changes after the
    /// store confirms.
    pub async fn add(&mut self, title: &str, url: &str) -> Result<Bookmark, DashboardError> {
        let new = NewBookmark::parse(title, url)?;
        let created = self.store.insert(&self.ctx, &new).await?;
        if !self.liveness.is_alive() {
            return Err(DashboardError::Unmounted);
        }
        self.dashboard.record_insert(created.clone());
        Ok(created)
    }

    pub async fn remove(&mut self, id: Uuid) -> Result<(), DashboardError> {
        self.store.delete(&self.ctx, id).await?;
        if !self.liveness.is_alive() {
            return Err(DashboardError::Unmounted);
        }
        self.dashboard.record_delete(id);
        Ok(())
    }

    /// Waits for the next feed event and applies it. Returns `None` when no
    /// feed is attached, the feed has closed, or the dashboard was unmounted.
    pub async fn pump(&mut self) -> Option<ChangeEvent> {
        let event = self.subscription.as_mut()?.next().await;
        if !self.liveness.is_alive() {
            return None;
        }
        match event {
            Some(event) => {
                self.dashboard.apply(&event);
                Some(event)
            }
            None => {
                tracing::info!("change feed ended");
                self.subscription = None;
                None
            }
        }
    }

    pub fn unmount(&mut self) {
        self.liveness.unmount();
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }
}

impl Drop for DashboardSession {
    fn drop(&mut self) {
        self.unmount();
    }
}
