// handlers/public/auth/signin.rs - GET /auth/signin handler

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use url::form_urlencoded;

use super::utils::{request_origin, safe_next};
use crate::identity::PkceVerifier;
use crate::middleware::response::found;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SigninQuery {
    pub next: Option<String>,
}

/// GET /auth/signin - Start the OAuth flow
///
/// Stores a fresh PKCE verifier in a short-lived cookie and redirects to the
/// provider's authorize URL. The callback lives on the origin the browser
/// used, unless `SITE_URL` pins it. `next` is carried through the callback URL.
pub async fn signin(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Query(query): Query<SigninQuery>,
) -> Response {
    let verifier = PkceVerifier::generate();

    let origin = request_origin(&state.config.server, &headers);
    let mut redirect_to = format!("{}/auth/callback", origin);
    if query.next.is_some() {
        let next = safe_next(query.next.as_deref());
        let encoded = form_urlencoded::Serializer::new(String::new())
            .append_pair("next", &next)
            .finish();
        redirect_to = format!("{}?{}", redirect_to, encoded);
    }

    let location = state.identity.authorize_url(
        &state.config.session.oauth_provider,
        &redirect_to,
        &verifier.challenge(),
    );

    let jar = state.cookies.write_verifier(jar, verifier.as_str());
    (jar, found(&location)).into_response()
}
