// handlers/public/mod.rs - Public handlers (no session required)
//
// Sign-in pages, the OAuth round trip and liveness checks.
pub mod auth;
pub mod root;
