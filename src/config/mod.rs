use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub backend: BackendConfig,
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Hosted backend endpoints. Both values are required at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub url: Url,
    pub anon_key: String,
    pub http_timeout_secs: u64,
    /// When true the bookmark list relies solely on the backend's row-level
    /// policy and sends no `user_id` filter.
    pub trust_row_level_security: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    /// Public origin used for OAuth callbacks. When unset the origin is
    /// taken from the incoming request.
    pub site_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub wait_ms: u64,
    pub oauth_provider: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub secure_cookies: bool,
    pub cors_origins: Vec<String>,
}

const MIN_SESSION_WAIT_MS: u64 = 100;
const MAX_SESSION_WAIT_MS: u64 = 10_000;

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        let backend = BackendConfig::from_env()?;

        // Set defaults based on environment, then override with specific env vars
        let config = match environment {
            Environment::Production => Self::production(backend),
            Environment::Staging => Self::staging(backend),
            Environment::Development => Self::development(backend),
        };
        Ok(config.with_env_overrides())
    }

    fn with_env_overrides(mut self) -> Self {
        // Backend overrides
        if let Ok(v) = env::var("BOOKMARKS_HTTP_TIMEOUT_SECS") {
            self.backend.http_timeout_secs = v.parse().unwrap_or(self.backend.http_timeout_secs);
        }
        if let Ok(v) = env::var("BOOKMARKS_TRUST_RLS") {
            self.backend.trust_row_level_security =
                v.parse().unwrap_or(self.backend.trust_row_level_security);
        }

        // Server overrides
        if let Some(port) = env::var("BOOKMARKS_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.server.port = port;
        }
        if let Ok(v) = env::var("SITE_URL") {
            let v = v.trim().trim_end_matches('/');
            self.server.site_url = (!v.is_empty()).then(|| v.to_string());
        }

        // Session overrides
        if let Ok(v) = env::var("BOOKMARKS_SESSION_WAIT_MS") {
            self.session.wait_ms = v.parse().unwrap_or(self.session.wait_ms);
        }
        self.session.wait_ms = self.session.wait_ms.clamp(MIN_SESSION_WAIT_MS, MAX_SESSION_WAIT_MS);
        if let Ok(v) = env::var("BOOKMARKS_OAUTH_PROVIDER") {
            self.session.oauth_provider = v;
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_SECURE_COOKIES") {
            self.security.secure_cookies = v.parse().unwrap_or(self.security.secure_cookies);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        self
    }

    pub fn development(backend: BackendConfig) -> Self {
        Self {
            environment: Environment::Development,
            backend,
            server: ServerConfig {
                port: 3000,
                site_url: None,
            },
            session: SessionConfig {
                wait_ms: 1000,
                oauth_provider: "google".to_string(),
            },
            security: SecurityConfig {
                secure_cookies: false,
                cors_origins: vec!["http://localhost:3000".to_string()],
            },
        }
    }

    pub fn staging(backend: BackendConfig) -> Self {
        Self {
            environment: Environment::Staging,
            backend,
            server: ServerConfig {
                port: 3000,
                site_url: None,
            },
            session: SessionConfig {
                wait_ms: 1000,
                oauth_provider: "google".to_string(),
            },
            security: SecurityConfig {
                secure_cookies: true,
                cors_origins: Vec::new(),
            },
        }
    }

    pub fn production(backend: BackendConfig) -> Self {
        Self {
            environment: Environment::Production,
            backend,
            server: ServerConfig {
                port: 3000,
                site_url: None,
            },
            session: SessionConfig {
                wait_ms: 500,
                oauth_provider: "google".to_string(),
            },
            security: SecurityConfig {
                secure_cookies: true,
                cors_origins: Vec::new(),
            },
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment, Environment::Production)
    }

    pub fn session_wait(&self) -> Duration {
        Duration::from_millis(self.session.wait_ms)
    }
}

impl BackendConfig {
    pub fn new(url: &str, anon_key: impl Into<String>) -> Result<Self, ConfigError> {
        let url = Url::parse(url).map_err(|e| ConfigError::Invalid {
            name: "SUPABASE_URL",
            reason: e.to_string(),
        })?;
        if url.host_str().is_none() {
            return Err(ConfigError::Invalid {
                name: "SUPABASE_URL",
                reason: "URL has no host".to_string(),
            });
        }
        let anon_key = anon_key.into();
        if anon_key.trim().is_empty() {
            return Err(ConfigError::Missing("SUPABASE_ANON_KEY"));
        }

        Ok(Self {
            url,
            anon_key,
            http_timeout_secs: 10,
            trust_row_level_security: false,
        })
    }

    fn from_env() -> Result<Self, ConfigError> {
        let url = non_empty_var("SUPABASE_URL")?;
        let anon_key = non_empty_var("SUPABASE_ANON_KEY")?;
        Self::new(&url, anon_key)
    }

    /// Joins a path onto the backend base URL, keeping any base path prefix.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// First label of the backend host, used to namespace cookies.
    pub fn project_ref(&self) -> String {
        self.url
            .host_str()
            .and_then(|host| host.split('.').next())
            .unwrap_or("local")
            .to_string()
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn non_empty_var(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(name)),
    }
}
