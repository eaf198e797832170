use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use uuid::Uuid;

use super::{BookmarkStore, StoreError};
use crate::config::BackendConfig;
use crate::models::{Bookmark, BookmarkInsert, NewBookmark};
use crate::session::SessionContext;

pub const BOOKMARKS_TABLE: &str = "bookmarks";

/// PostgREST-style client for the `bookmarks` resource.
#[derive(Debug, Clone)]
pub struct RestBookmarkStore {
    backend: BackendConfig,
    http: Client,
}

impl RestBookmarkStore {
    pub fn new(backend: BackendConfig, http: Client) -> Self {
        Self { backend, http }
    }

    fn table_url(&self) -> String {
        self.backend.endpoint(&format!("rest/v1/{}", BOOKMARKS_TABLE))
    }

    fn authorized(&self, request: RequestBuilder, ctx: &SessionContext) -> RequestBuilder {
        request
            .header("apikey", &self.backend.anon_key)
            .bearer_auth(ctx.access_token())
    }

    fn list_query(&self, ctx: &SessionContext) -> Vec<(&'static str, String)> {
        let mut query = vec![("select", "*".to_string())];
        if !self.backend.trust_row_level_security {
            query.push(("user_id", format!("eq.{}", ctx.user_id())));
        }
        query.push(("order", "created_at.desc".to_string()));
        query
    }
}

#[async_trait]
impl BookmarkStore for RestBookmarkStore {
    async fn list(&self, ctx: &SessionContext) -> Result<Vec<Bookmark>, StoreError> {
        let request = self.http.get(self.table_url()).query(&self.list_query(ctx));
        let response = self.authorized(request, ctx).send().await?;
        let rows = ensure_success(response).await?.json::<Vec<Bookmark>>().await?;

        tracing::debug!(user_id = %ctx.user_id(), count = rows.len(), "listed bookmarks");
        Ok(rows)
    }

    async fn insert(&self, ctx: &SessionContext, bookmark: &NewBookmark) -> Result<Bookmark, StoreError> {
        let row = BookmarkInsert {
            title: bookmark.title(),
            url: bookmark.url(),
            user_id: ctx.user_id(),
        };
        let request = self
            .http
            .post(self.table_url())
            .header("Prefer", "return=representation")
            .json(&[row]);
        let response = self.authorized(request, ctx).send().await?;
        let mut rows = ensure_success(response).await?.json::<Vec<Bookmark>>().await?;

        if rows.is_empty() {
            return Err(StoreError::EmptyInsert);
        }
        let created = rows.swap_remove(0);
        tracing::info!(user_id = %ctx.user_id(), bookmark_id = %created.id, "bookmark created");
        Ok(created)
    }

    async fn delete(&self, ctx: &SessionContext, id: Uuid) -> Result<(), StoreError> {
        let request = self
            .http
            .delete(self.table_url())
            .header("Prefer", "return=minimal")
            .query(&[
                ("id", format!("eq.{}", id)),
                ("user_id", format!("eq.{}", ctx.user_id())),
            ]);
        let response = self.authorized(request, ctx).send().await?;
        ensure_success(response).await?;

        tracing::info!(user_id = %ctx.user_id(), bookmark_id = %id, "bookmark deleted");
        Ok(())
    }
}

async fn ensure_success(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    Err(StoreError::Rejected {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(trust_rls: bool) -> RestBookmarkStore {
        let mut backend = BackendConfig::new("https://proj.supabase.co", "anon").unwrap();
        backend.trust_row_level_security = trust_rls;
        RestBookmarkStore::new(backend, Client::new())
    }

    #[test]
    fn test_list_query_filters_by_owner() {
        let user = Uuid::new_v4();
        let ctx = SessionContext::new("t", user);
        let query = store(false).list_query(&ctx);

        assert!(query.contains(&("user_id", format!("eq.{}", user))));
        assert_eq!(query.last(), Some(&("order", "created_at.desc".to_string())));
    }

    #[test]
    fn test_list_query_trusting_rls_has_no_owner_filter() {
        let ctx = SessionContext::new("t", Uuid::new_v4());
        let query = store(true).list_query(&ctx);
        assert!(query.iter().all(|(k, _)| *k != "user_id"));
    }

    #[test]
    fn test_table_url() {
        assert_eq!(store(false).table_url(), "https://proj.supabase.co/rest/v1/bookmarks");
    }
}
