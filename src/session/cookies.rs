use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use super::Session;

const SESSION_MAX_AGE: Duration = Duration::days(400);
const VERIFIER_MAX_AGE: Duration = Duration::minutes(10);

/// Raw token pair as found in the cookie jar, before any validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl StoredTokens {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

impl From<&Session> for StoredTokens {
    fn from(session: &Session) -> Self {
        Self {
            access_token: Some(session.access_token.clone()),
            refresh_token: Some(session.refresh_token.clone()).filter(|t| !t.is_empty()),
        }
    }
}

/// Reads and writes the session cookies. Names are namespaced by the
/// backend project so several deployments can share a browser.
#[derive(Debug, Clone)]
pub struct SessionCookies {
    access_name: String,
    refresh_name: String,
    verifier_name: String,
    secure: bool,
}

impl SessionCookies {
    pub fn new(project_ref: &str, secure: bool) -> Self {
        Self {
            access_name: format!("sb-{}-access-token", project_ref),
            refresh_name: format!("sb-{}-refresh-token", project_ref),
            verifier_name: format!("sb-{}-code-verifier", project_ref),
            secure,
        }
    }

    pub fn read(&self, jar: &CookieJar) -> StoredTokens {
        StoredTokens {
            access_token: non_empty(jar, &self.access_name),
            refresh_token: non_empty(jar, &self.refresh_name),
        }
    }

    pub fn write(&self, jar: CookieJar, session: &Session) -> CookieJar {
        let jar = jar.add(self.build(&self.access_name, session.access_token.clone(), SESSION_MAX_AGE));
        if session.refresh_token.is_empty() {
            return jar;
        }
        jar.add(self.build(&self.refresh_name, session.refresh_token.clone(), SESSION_MAX_AGE))
    }

    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        jar.add(self.removal(&self.access_name))
            .add(self.removal(&self.refresh_name))
    }

    pub fn write_verifier(&self, jar: CookieJar, verifier: &str) -> CookieJar {
        jar.add(self.build(&self.verifier_name, verifier.to_string(), VERIFIER_MAX_AGE))
    }

    /// Returns the stored PKCE verifier and schedules its removal.
    pub fn take_verifier(&self, jar: CookieJar) -> (CookieJar, Option<String>) {
        let verifier = non_empty(&jar, &self.verifier_name);
        let jar = match verifier {
            Some(_) => jar.add(self.removal(&self.verifier_name)),
            None => jar,
        };
        (jar, verifier)
    }

    fn build(&self, name: &str, value: String, max_age: Duration) -> Cookie<'static> {
        Cookie::build((name.to_string(), value))
            .path("/")
            .same_site(SameSite::Lax)
            .http_only(true)
            .secure(self.secure)
            .max_age(max_age)
            .build()
    }

    fn removal(&self, name: &str) -> Cookie<'static> {
        self.build(name, String::new(), Duration::ZERO)
    }
}

fn non_empty(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}
