// handlers/public/auth/callback.rs - GET /auth/callback handler

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use super::utils::{login_error, safe_next, AUTH_FAILED_ERROR, NO_CODE_ERROR};
use crate::middleware::response::found;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub next: Option<String>,
}

/**
 * GET /auth/callback - Complete the OAuth round trip
 *
 * Exchanges the one-time `code` for a session using the PKCE verifier that
 * `/auth/signin` stored, writes the session cookies and redirects to `next`.
 *
 * - no `code`         → 302 /login?error=No authentication code provided (no cookies)
 * - exchange rejected → 302 /login?error=Could not authenticate user
 * - success           → 302 `next` (same-origin paths only) or /dashboard
 *
 * The exchange is attempted once; failures are logged, never returned.
 */
pub async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let Some(code) = query.code.as_deref().filter(|c| !c.is_empty()) else {
        return found(&login_error(NO_CODE_ERROR));
    };

    let (jar, verifier) = state.cookies.take_verifier(jar);
    let Some(verifier) = verifier else {
        tracing::warn!("auth callback without a code verifier cookie");
        return (jar, found(&login_error(AUTH_FAILED_ERROR))).into_response();
    };

    match state.identity.exchange_code(code, &verifier).await {
        Ok(session) => {
            tracing::info!(user_id = %session.user.id, "signed in");
            let jar = state.cookies.write(jar, &session);
            let next = safe_next(query.next.as_deref());
            (jar, found(&next)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Error exchanging code for session");
            (jar, found(&login_error(AUTH_FAILED_ERROR))).into_response()
        }
    }
}
