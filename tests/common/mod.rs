#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use uuid::Uuid;

use smart_bookmarks::config::{AppConfig, BackendConfig};
use smart_bookmarks::feed::{ChangeEvent, ChangeFeed, FeedError, Subscription};
use smart_bookmarks::identity::{IdentityProvider, SupabaseAuth};
use smart_bookmarks::models::Bookmark;
use smart_bookmarks::session::{decode_claims, SessionContext};
use smart_bookmarks::store::{BookmarkStore, RestBookmarkStore};
use smart_bookmarks::{app, AppState};

/// Cookie names for a backend on 127.0.0.1 (project ref "127").
pub const ACCESS_COOKIE: &str = "sb-127-access-token";
pub const REFRESH_COOKIE: &str = "sb-127-refresh-token";
pub const VERIFIER_COOKIE: &str = "sb-127-code-verifier";

pub const ANON_KEY: &str = "test-anon-key";

pub fn email_for(user: Uuid) -> String {
    format!("{}@example.com", user.simple())
}

/// HS256 token with `sub`, `email` and an `exp` relative to now.
pub fn mint_token(user: Uuid, exp_offset_secs: i64) -> String {
    let claims = json!({
        "sub": user,
        "email": email_for(user),
        "role": "authenticated",
        "exp": Utc::now().timestamp() + exp_offset_secs,
    });
    encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test-secret"))
        .expect("failed to mint token")
}

// ---------------------------------------------------------------------------
// Mock hosted backend: /auth/v1 and /rest/v1/bookmarks
// ---------------------------------------------------------------------------

#[derive(Default)]
struct BackendData {
    rows: Vec<Bookmark>,
    codes: HashMap<String, Uuid>,
    refresh_tokens: HashMap<String, Uuid>,
    insert_calls: usize,
    refresh_calls: usize,
    logout_calls: usize,
}

#[derive(Clone)]
pub struct MockBackend {
    pub url: String,
    data: Arc<Mutex<BackendData>>,
    refresh_delay_ms: Arc<AtomicU64>,
}

impl MockBackend {
    pub async fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;

        let backend = Self {
            url: format!("http://127.0.0.1:{}", port),
            data: Arc::default(),
            refresh_delay_ms: Arc::default(),
        };

        let router = Router::new()
            .route("/auth/v1/token", post(token))
            .route("/auth/v1/logout", post(logout))
            .route(
                "/rest/v1/bookmarks",
                get(list_rows).post(insert_rows).delete(delete_rows),
            )
            .with_state(backend.clone());

        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(backend)
    }

    /// One-time authorization code for `user`.
    pub fn issue_code(&self, user: Uuid) -> String {
        let code = Uuid::new_v4().simple().to_string();
        self.data.lock().unwrap().codes.insert(code.clone(), user);
        code
    }

    pub fn issue_refresh_token(&self, user: Uuid) -> String {
        let token = format!("refresh-{}", Uuid::new_v4().simple());
        self.data.lock().unwrap().refresh_tokens.insert(token.clone(), user);
        token
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        self.refresh_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Inserts directly, bypassing the API.
    pub fn seed(&self, user: Uuid, title: &str, url: &str) -> Bookmark {
        let row = Bookmark {
            id: Uuid::new_v4(),
            title: title.to_string(),
            url: url.to_string(),
            user_id: user,
            created_at: Utc::now(),
        };
        self.data.lock().unwrap().rows.push(row.clone());
        row
    }

    pub fn rows_for(&self, user: Uuid) -> Vec<Bookmark> {
        let data = self.data.lock().unwrap();
        data.rows.iter().filter(|r| r.user_id == user).cloned().collect()
    }

    pub fn insert_calls(&self) -> usize {
        self.data.lock().unwrap().insert_calls
    }

    pub fn refresh_calls(&self) -> usize {
        self.data.lock().unwrap().refresh_calls
    }

    pub fn logout_calls(&self) -> usize {
        self.data.lock().unwrap().logout_calls
    }

    fn session_body(&self, user: Uuid) -> Response {
        let refresh_token = self.issue_refresh_token(user);
        Json(json!({
            "access_token": mint_token(user, 3600),
            "refresh_token": refresh_token,
            "token_type": "bearer",
            "expires_in": 3600,
        }))
        .into_response()
    }
}

fn invalid_grant(description: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "invalid_grant", "error_description": description })),
    )
        .into_response()
}

#[derive(Deserialize)]
struct GrantQuery {
    grant_type: String,
}

async fn token(
    State(backend): State<MockBackend>,
    Query(query): Query<GrantQuery>,
    Json(body): Json<Value>,
) -> Response {
    match query.grant_type.as_str() {
        "pkce" => {
            let code = body["auth_code"].as_str().unwrap_or_default();
            let verifier = body["code_verifier"].as_str().unwrap_or_default();
            let user = backend.data.lock().unwrap().codes.remove(code);
            match user {
                Some(user) if !verifier.is_empty() => backend.session_body(user),
                _ => invalid_grant("invalid flow state, no valid flow state found"),
            }
        }
        "refresh_token" => {
            let delay = backend.refresh_delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            let refresh_token = body["refresh_token"].as_str().unwrap_or_default();
            let user = {
                let mut data = backend.data.lock().unwrap();
                data.refresh_calls += 1;
                data.refresh_tokens.get(refresh_token).copied()
            };
            match user {
                Some(user) => backend.session_body(user),
                None => invalid_grant("Invalid Refresh Token: Refresh Token Not Found"),
            }
        }
        _ => invalid_grant("unsupported grant type"),
    }
}

async fn logout(State(backend): State<MockBackend>) -> StatusCode {
    backend.data.lock().unwrap().logout_calls += 1;
    StatusCode::NO_CONTENT
}

/// Row-level policy: the caller only ever sees rows whose `user_id` is the
/// token's subject.
fn caller(headers: &HeaderMap) -> Option<Uuid> {
    let token = headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?;
    decode_claims(token).ok().map(|claims| claims.sub)
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "message": "JWT expired" }))).into_response()
}

#[derive(Deserialize)]
struct RowFilter {
    id: Option<String>,
    user_id: Option<String>,
}

fn eq_filter(value: &Option<String>) -> Option<Uuid> {
    value.as_deref()?.strip_prefix("eq.")?.parse().ok()
}

async fn list_rows(
    State(backend): State<MockBackend>,
    headers: HeaderMap,
    Query(filter): Query<RowFilter>,
) -> Response {
    let Some(user) = caller(&headers) else {
        return unauthorized();
    };
    let owner = eq_filter(&filter.user_id);

    let data = backend.data.lock().unwrap();
    let mut rows: Vec<Bookmark> = data
        .rows
        .iter()
        .filter(|r| r.user_id == user && owner.map_or(true, |o| o == r.user_id))
        .cloned()
        .collect();
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Json(rows).into_response()
}

#[derive(Deserialize)]
struct InsertRow {
    title: String,
    url: String,
    user_id: Uuid,
}

async fn insert_rows(
    State(backend): State<MockBackend>,
    headers: HeaderMap,
    Json(body): Json<Vec<InsertRow>>,
) -> Response {
    let Some(user) = caller(&headers) else {
        return unauthorized();
    };
    if body.iter().any(|r| r.user_id != user) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "message": "new row violates row-level security policy" })),
        )
            .into_response();
    }

    let mut data = backend.data.lock().unwrap();
    data.insert_calls += 1;
    let created: Vec<Bookmark> = body
        .into_iter()
        .map(|r| Bookmark {
            id: Uuid::new_v4(),
            title: r.title,
            url: r.url,
            user_id: r.user_id,
            created_at: Utc::now(),
        })
        .collect();
    data.rows.extend(created.iter().cloned());
    (StatusCode::CREATED, Json(created)).into_response()
}

async fn delete_rows(
    State(backend): State<MockBackend>,
    headers: HeaderMap,
    Query(filter): Query<RowFilter>,
) -> Response {
    let Some(user) = caller(&headers) else {
        return unauthorized();
    };
    let Some(id) = eq_filter(&filter.id) else {
        return (StatusCode::BAD_REQUEST, Json(json!({ "message": "missing id filter" }))).into_response();
    };
    let owner = eq_filter(&filter.user_id);

    backend
        .data
        .lock()
        .unwrap()
        .rows
        .retain(|r| !(r.id == id && r.user_id == user && owner.map_or(true, |o| o == r.user_id)));
    StatusCode::NO_CONTENT.into_response()
}

// ---------------------------------------------------------------------------
// Scripted change feed
// ---------------------------------------------------------------------------

/// In-process feed. Every subscriber receives each pushed event.
#[derive(Clone, Default)]
pub struct ScriptedFeed {
    subscribers: Arc<Mutex<Vec<mpsc::Sender<ChangeEvent>>>>,
}

impl ScriptedFeed {
    pub fn push(&self, event: ChangeEvent) {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|tx| !tx.is_closed());
        for tx in subscribers.iter() {
            let _ = tx.try_send(event.clone());
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap()
            .iter()
            .filter(|tx| !tx.is_closed())
            .count()
    }

    pub async fn wait_for_subscribers(&self, count: usize, timeout: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.subscriber_count() < count {
            if tokio::time::Instant::now() > deadline {
                anyhow::bail!("expected {} subscribers, have {}", count, self.subscriber_count());
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        Ok(())
    }
}

#[async_trait]
impl ChangeFeed for ScriptedFeed {
    async fn subscribe(&self, _ctx: &SessionContext) -> Result<Subscription, FeedError> {
        let (tx, rx) = mpsc::channel(64);
        self.subscribers.lock().unwrap().push(tx);
        Ok(Subscription::from_receiver(rx))
    }
}

// ---------------------------------------------------------------------------
// App under test
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub base_url: String,
    pub backend: MockBackend,
    pub feed: ScriptedFeed,
    pub identity: Arc<dyn IdentityProvider>,
    pub store: Arc<dyn BookmarkStore>,
    pub config: AppConfig,
    /// Does not follow redirects, so `Location` can be asserted.
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(|_| {}).await
    }

    pub async fn spawn_with(configure: impl FnOnce(&mut AppConfig)) -> Result<Self> {
        let backend = MockBackend::spawn().await?;

        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut config = AppConfig::development(BackendConfig::new(&backend.url, ANON_KEY)?);
        configure(&mut config);

        let http = reqwest::Client::builder()
            .timeout(config.backend.http_timeout())
            .build()?;
        let identity: Arc<dyn IdentityProvider> =
            Arc::new(SupabaseAuth::new(config.backend.clone(), http.clone()));
        let store: Arc<dyn BookmarkStore> =
            Arc::new(RestBookmarkStore::new(config.backend.clone(), http));
        let feed = ScriptedFeed::default();

        let state = AppState::with_backends(
            config.clone(),
            identity.clone(),
            store.clone(),
            Arc::new(feed.clone()),
        );

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app(state)).await;
        });

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            base_url,
            backend,
            feed,
            identity,
            store,
            config,
            client,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Cookie header for a signed-in `user` with a fresh access token.
    pub fn session_cookie(&self, user: Uuid) -> String {
        let refresh = self.backend.issue_refresh_token(user);
        format!(
            "{}={}; {}={}",
            ACCESS_COOKIE,
            mint_token(user, 3600),
            REFRESH_COOKIE,
            refresh
        )
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

pub fn location(res: &reqwest::Response) -> Option<String> {
    res.headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub fn set_cookies(res: &reqwest::Response) -> Vec<String> {
    res.headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

/// Value of the `name` cookie set by the response, if any.
pub fn cookie_value(res: &reqwest::Response, name: &str) -> Option<String> {
    set_cookies(res).into_iter().find_map(|c| {
        let pair = c.split(';').next()?;
        let (key, value) = pair.split_once('=')?;
        (key.trim() == name).then(|| value.to_string())
    })
}

pub fn clears_cookie(res: &reqwest::Response, name: &str) -> bool {
    set_cookies(res)
        .iter()
        .any(|c| c.starts_with(&format!("{}=", name)) && c.contains("Max-Age=0"))
}
