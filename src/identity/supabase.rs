use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use url::form_urlencoded;

use super::{IdentityError, IdentityProvider, PkceChallenge};
use crate::config::BackendConfig;
use crate::session::{Session, SessionContext};

/// Token endpoint response. Only the fields needed to rebuild a session.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: String,
}

/// Error bodies differ between endpoints; take whichever message is present.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
    }
}

/// Client for the hosted auth service (`/auth/v1`).
#[derive(Debug, Clone)]
pub struct SupabaseAuth {
    backend: BackendConfig,
    http: Client,
}

impl SupabaseAuth {
    pub fn new(backend: BackendConfig, http: Client) -> Self {
        Self { backend, http }
    }

    async fn token_grant(&self, grant_type: &str, body: serde_json::Value) -> Result<Session, IdentityError> {
        let response = self
            .http
            .post(self.backend.endpoint("auth/v1/token"))
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.backend.anon_key)
            .json(&body)
            .send()
            .await?;

        let token: TokenResponse = ensure_success(response).await?.json().await?;
        Ok(Session::from_tokens(token.access_token, token.refresh_token)?)
    }
}

#[async_trait]
impl IdentityProvider for SupabaseAuth {
    fn authorize_url(&self, provider: &str, redirect_to: &str, challenge: &PkceChallenge) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("provider", provider)
            .append_pair("redirect_to", redirect_to)
            .append_pair("code_challenge", challenge.as_str())
            .append_pair("code_challenge_method", challenge.method())
            .finish();
        format!("{}?{}", self.backend.endpoint("auth/v1/authorize"), query)
    }

    async fn exchange_code(&self, code: &str, verifier: &str) -> Result<Session, IdentityError> {
        self.token_grant("pkce", json!({ "auth_code": code, "code_verifier": verifier }))
            .await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, IdentityError> {
        self.token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    async fn sign_out(&self, ctx: &SessionContext) -> Result<(), IdentityError> {
        let response = self
            .http
            .post(self.backend.endpoint("auth/v1/logout"))
            .header("apikey", &self.backend.anon_key)
            .bearer_auth(ctx.access_token())
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}

async fn ensure_success(response: Response) -> Result<Response, IdentityError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or(text);

    Err(IdentityError::Rejected {
        status: status.as_u16(),
        message,
    })
}
