use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use crate::dashboard::session::LOGIN_PATH;
use crate::error::ApiError;
use crate::middleware::response::found;
use crate::session::{Session, SessionBootstrap, SessionContext};
use crate::state::AppState;

/// Authenticated user context resolved from the session cookies
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub context: SessionContext,
}

impl From<&Session> for AuthUser {
    fn from(session: &Session) -> Self {
        Self {
            user_id: session.user.id,
            email: session.user.email.clone(),
            context: session.context(),
        }
    }
}

/// Session middleware for protected routes.
///
/// Runs the bootstrap for the request. A refreshed session is written back
/// to the cookies. Without a session, pages redirect to the login screen and
/// `/api` routes answer 401.
pub async fn session_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let stored = state.cookies.read(&jar);
    let bootstrap = SessionBootstrap::new()
        .resolve(state.identity.as_ref(), stored, state.config.session_wait())
        .await;

    let refreshed = bootstrap.refreshed();
    let clear = bootstrap.clear_cookies();

    match bootstrap.into_session() {
        Some(session) => {
            let jar = if refreshed {
                state.cookies.write(jar, &session)
            } else {
                jar
            };
            request.extensions_mut().insert(AuthUser::from(&session));
            let response = next.run(request).await;
            (jar, response).into_response()
        }
        None => {
            let jar = if clear { state.cookies.clear(jar) } else { jar };
            if request.uri().path().starts_with("/api/") {
                (jar, ApiError::unauthorized("Authentication required")).into_response()
            } else {
                (jar, found(LOGIN_PATH)).into_response()
            }
        }
    }
}
