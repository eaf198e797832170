// handlers/public/root.rs - GET /, GET /login, GET /health

use axum::{
    extract::{Query, State},
    response::{Html, Json, Response},
};
use serde::Deserialize;
use serde_json::{json, Value};
use url::form_urlencoded;

use crate::dashboard::session::LOGIN_PATH;
use crate::middleware::response::found;
use crate::state::AppState;
use crate::views;

#[derive(Debug, Deserialize)]
pub struct RootQuery {
    pub code: Option<String>,
    pub next: Option<String>,
}

/// GET / - Forwards a stray OAuth code to the callback, otherwise to login.
///
/// Some providers are configured with the site root as redirect target, so
/// the code can land here instead of on `/auth/callback`.
pub async fn root(Query(query): Query<RootQuery>) -> Response {
    match query.code.as_deref().filter(|c| !c.is_empty()) {
        Some(code) => {
            let mut params = form_urlencoded::Serializer::new(String::new());
            params.append_pair("code", code);
            if let Some(next) = query.next.as_deref() {
                params.append_pair("next", next);
            }
            found(&format!("/auth/callback?{}", params.finish()))
        }
        None => found(LOGIN_PATH),
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub error: Option<String>,
}

pub async fn login_page(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> Html<String> {
    let label = views::provider_label(&state.config.session.oauth_provider);
    Html(views::login_page(query.error.as_deref(), &label))
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now(),
        }
    }))
}
