// handlers/public/auth/mod.rs - OAuth round trip
//
// GET  /auth/signin   → PKCE verifier cookie, redirect to the provider
// GET  /auth/callback → code exchange, session cookies, redirect to `next`
// POST /auth/signout  → remote logout, cookies cleared
pub mod callback;
pub mod signin;
pub mod signout;
pub mod utils;

pub use callback::callback;
pub use signin::signin;
pub use signout::signout;
