use std::time::Duration;

use super::{Session, StoredTokens};
use crate::identity::IdentityProvider;

/// Where a bootstrap currently stands. Starts in `Checking` and ends in
/// exactly one of the other two states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapState {
    Checking,
    Authenticated(Session),
    Unauthenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapPhase {
    Checking,
    Refreshing,
    Authenticated,
    Unauthenticated,
}

/// Resolves the session for one request (or one CLI invocation).
///
/// The stored tokens are the only source of truth. An expired access token
/// triggers a single refresh, and `wait` bounds that refresh. Nothing else
/// can move the state once it has settled.
#[derive(Debug)]
pub struct SessionBootstrap {
    state: BootstrapState,
    history: Vec<BootstrapPhase>,
    refreshed: bool,
    clear_cookies: bool,
}

impl Default for SessionBootstrap {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBootstrap {
    pub fn new() -> Self {
        Self {
            state: BootstrapState::Checking,
            history: vec![BootstrapPhase::Checking],
            refreshed: false,
            clear_cookies: false,
        }
    }

    pub async fn resolve(
        mut self,
        identity: &dyn IdentityProvider,
        stored: StoredTokens,
        wait: Duration,
    ) -> Self {
        if stored.is_empty() {
            tracing::debug!("no stored session");
            self.settle(None);
            return self;
        }

        let refresh_token = stored.refresh_token.unwrap_or_default();

        if let Some(access_token) = stored.access_token {
            match Session::from_tokens(access_token, refresh_token.clone()) {
                Ok(session) if !session.is_expired() => {
                    self.settle(Some(session));
                    return self;
                }
                Ok(_) => tracing::debug!("access token expired"),
                Err(e) => tracing::warn!(error = %e, "discarding unreadable access token"),
            }
        }

        if refresh_token.is_empty() {
            self.clear_cookies = true;
            self.settle(None);
            return self;
        }

        self.history.push(BootstrapPhase::Refreshing);
        match tokio::time::timeout(wait, identity.refresh_session(&refresh_token)).await {
            Ok(Ok(session)) => {
                tracing::debug!(user_id = %session.user.id, "session refreshed");
                self.refreshed = true;
                self.settle(Some(session));
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "session refresh failed");
                self.clear_cookies = true;
                self.settle(None);
            }
            Err(_) => {
                // Slow is not invalid: keep the tokens for the next attempt.
                tracing::warn!(wait_ms = wait.as_millis() as u64, "session refresh timed out");
                self.settle(None);
            }
        }
        self
    }

    fn settle(&mut self, session: Option<Session>) {
        match session {
            Some(session) => {
                self.state = BootstrapState::Authenticated(session);
                self.history.push(BootstrapPhase::Authenticated);
            }
            None => {
                self.state = BootstrapState::Unauthenticated;
                self.history.push(BootstrapPhase::Unauthenticated);
            }
        }
    }

    pub fn state(&self) -> &BootstrapState {
        &self.state
    }

    pub fn into_session(self) -> Option<Session> {
        match self.state {
            BootstrapState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn history(&self) -> &[BootstrapPhase] {
        &self.history
    }

    /// True when the session came from a refresh and must be written back.
    pub fn refreshed(&self) -> bool {
        self.refreshed
    }

    /// True when the stored tokens were rejected or unusable and should be
    /// removed. A refresh that merely timed out leaves them in place.
    pub fn clear_cookies(&self) -> bool {
        self.clear_cookies
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{IdentityError, PkceChallenge};
    use crate::session::{Claims, SessionContext};
    use async_trait::async_trait;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use uuid::Uuid;

    fn token(sub: Uuid, exp_offset: i64) -> String {
        let claims = Claims {
            sub,
            exp: Utc::now().timestamp() + exp_offset,
            email: None,
            role: None,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(b"s")).unwrap()
    }

    struct StubIdentity {
        user: Uuid,
        delay: Duration,
        fail: bool,
    }

    #[async_trait]
    impl IdentityProvider for StubIdentity {
        fn authorize_url(&self, _provider: &str, _redirect_to: &str, _challenge: &PkceChallenge) -> String {
            String::new()
        }

        async fn exchange_code(&self, _code: &str, _verifier: &str) -> Result<Session, IdentityError> {
            unreachable!("bootstrap never exchanges codes")
        }

        async fn refresh_session(&self, _refresh_token: &str) -> Result<Session, IdentityError> {
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(IdentityError::Rejected {
                    status: 400,
                    message: "invalid_grant".to_string(),
                });
            }
            Ok(Session::from_tokens(token(self.user, 3600), "rotated")?)
        }

        async fn sign_out(&self, _ctx: &SessionContext) -> Result<(), IdentityError> {
            Ok(())
        }
    }

    fn stub(delay_ms: u64, fail: bool) -> StubIdentity {
        StubIdentity {
            user: Uuid::new_v4(),
            delay: Duration::from_millis(delay_ms),
            fail,
        }
    }

    #[tokio::test]
    async fn test_no_tokens_is_unauthenticated() {
        let identity = stub(0, false);
        let boot = SessionBootstrap::new()
            .resolve(&identity, StoredTokens::default(), Duration::from_millis(100))
            .await;

        assert_eq!(boot.state(), &BootstrapState::Unauthenticated);
        assert!(!boot.clear_cookies());
        assert_eq!(boot.history(), &[BootstrapPhase::Checking, BootstrapPhase::Unauthenticated]);
    }

    #[tokio::test]
    async fn test_valid_access_token_skips_refresh() {
        let identity = stub(0, true);
        let user = Uuid::new_v4();
        let stored = StoredTokens {
            access_token: Some(token(user, 3600)),
            refresh_token: Some("r".to_string()),
        };
        let boot = SessionBootstrap::new()
            .resolve(&identity, stored, Duration::from_millis(100))
            .await;

        assert!(!boot.refreshed());
        assert_eq!(boot.into_session().map(|s| s.user.id), Some(user));
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed() {
        let identity = stub(0, false);
        let stored = StoredTokens {
            access_token: Some(token(Uuid::new_v4(), -60)),
            refresh_token: Some("r".to_string()),
        };
        let boot = SessionBootstrap::new()
            .resolve(&identity, stored, Duration::from_millis(500))
            .await;

        assert!(boot.refreshed());
        assert_eq!(
            boot.history(),
            &[BootstrapPhase::Checking, BootstrapPhase::Refreshing, BootstrapPhase::Authenticated]
        );
        let session = boot.into_session().unwrap();
        assert_eq!(session.user.id, identity.user);
        assert_eq!(session.refresh_token, "rotated");
    }

    #[tokio::test]
    async fn test_slow_refresh_times_out_and_keeps_tokens() {
        let identity = stub(2_000, false);
        let stored = StoredTokens {
            access_token: None,
            refresh_token: Some("r".to_string()),
        };
        let started = std::time::Instant::now();
        let boot = SessionBootstrap::new()
            .resolve(&identity, stored, Duration::from_millis(100))
            .await;

        assert!(started.elapsed() < Duration::from_millis(1_000));
        assert_eq!(boot.state(), &BootstrapState::Unauthenticated);
        assert!(!boot.clear_cookies());
        assert!(!boot.refreshed());
    }

    #[tokio::test]
    async fn test_rejected_refresh_clears_cookies() {
        let identity = stub(0, true);
        let stored = StoredTokens {
            access_token: Some("garbage".to_string()),
            refresh_token: Some("r".to_string()),
        };
        let boot = SessionBootstrap::new()
            .resolve(&identity, stored, Duration::from_millis(100))
            .await;

        assert_eq!(boot.state(), &BootstrapState::Unauthenticated);
        assert!(boot.clear_cookies());
    }

    #[tokio::test]
    async fn test_missing_refresh_token_clears_cookies() {
        let identity = stub(0, false);
        let stored = StoredTokens {
            access_token: Some(token(Uuid::new_v4(), -60)),
            refresh_token: None,
        };
        let boot = SessionBootstrap::new()
            .resolve(&identity, stored, Duration::from_millis(100))
            .await;

        assert_eq!(boot.state(), &BootstrapState::Unauthenticated);
        assert!(boot.clear_cookies());
    }
}
