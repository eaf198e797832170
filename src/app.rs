use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{protected, public};
use crate::middleware::session_middleware;
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = cors_layer(
        &state.config.security.cors_origins,
        !state.config.is_production(),
    );

    Router::new()
        // Public
        .merge(public_routes())
        // Session required
        .merge(protected_routes(state.clone()))
        // Global middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    use public::{auth, root};

    Router::new()
        .route("/", get(root::root))
        .route("/login", get(root::login_page))
        .route("/health", get(root::health))
        .route("/auth/signin", get(auth::signin))
        .route("/auth/callback", get(auth::callback))
        .route("/auth/signout", post(auth::signout))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use protected::{bookmarks, dashboard};

    Router::new()
        // Server-rendered pages
        .route("/dashboard", get(dashboard::page))
        .route("/dashboard/bookmarks", post(dashboard::create))
        .route("/dashboard/bookmarks/:id/delete", post(dashboard::delete))
        // JSON API
        .route("/api/bookmarks", get(bookmarks::list).post(bookmarks::create))
        .route("/api/bookmarks/:id", axum::routing::delete(bookmarks::delete))
        .route("/api/bookmarks/events", get(bookmarks::events))
        .route_layer(from_fn_with_state(state, session_middleware))
}

/// With no origins configured, production allows no cross-origin callers
/// and every other environment is permissive.
fn cors_layer(origins: &[String], permissive_fallback: bool) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter(|o| !o.is_empty())
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() && permissive_fallback {
        CorsLayer::permissive()
    } else if allowed.is_empty() {
        CorsLayer::new()
    } else {
        CorsLayer::new().allow_origin(allowed)
    }
}
