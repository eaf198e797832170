// handlers/public/auth/signout.rs - POST /auth/signout handler

use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::dashboard::session::LOGIN_PATH;
use crate::middleware::response::found;
use crate::session::Session;
use crate::state::AppState;

/// POST /auth/signout - Revoke the session and clear cookies
///
/// The remote logout is best effort; cookies are cleared either way.
pub async fn signout(State(state): State<AppState>, jar: CookieJar) -> Response {
    let stored = state.cookies.read(&jar);

    if let Some(access_token) = stored.access_token {
        match Session::from_tokens(access_token, stored.refresh_token.unwrap_or_default()) {
            Ok(session) => {
                if let Err(e) = state.identity.sign_out(&session.context()).await {
                    tracing::warn!(error = %e, "remote sign out failed");
                }
            }
            Err(e) => tracing::warn!(error = %e, "ignoring unreadable access token on sign out"),
        }
    }

    (state.cookies.clear(jar), found(LOGIN_PATH)).into_response()
}
