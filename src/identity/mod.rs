//! Identity exchange: OAuth authorize URL, code exchange, refresh and sign-out.

pub mod pkce;
pub mod supabase;

use async_trait::async_trait;
use thiserror::Error;

use crate::session::{Session, SessionContext, TokenError};

pub use pkce::{PkceChallenge, PkceVerifier};
pub use supabase::SupabaseAuth;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Identity request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Identity service rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Identity service returned an invalid session: {0}")]
    InvalidSession(#[from] TokenError),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL the browser is sent to for `provider` sign-in.
    fn authorize_url(&self, provider: &str, redirect_to: &str, challenge: &PkceChallenge) -> String;

    /// Trades an authorization code for a session. Called once per callback.
    async fn exchange_code(&self, code: &str, verifier: &str) -> Result<Session, IdentityError>;

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, IdentityError>;

    async fn sign_out(&self, ctx: &SessionContext) -> Result<(), IdentityError>;
}
