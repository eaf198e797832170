use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::{Session, StoredTokens};

const SESSION_FILE: &str = "session.json";

/// Token pair persisted between CLI invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionFile {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub email: Option<String>,
    pub saved_at: DateTime<Utc>,
}

impl SessionFile {
    pub fn from_session(session: &Session) -> Self {
        Self {
            access_token: Some(session.access_token.clone()),
            refresh_token: Some(session.refresh_token.clone()).filter(|t| !t.is_empty()),
            email: session.user.email.clone(),
            saved_at: Utc::now(),
        }
    }

    /// Refresh token only; the first command will mint an access token.
    pub fn from_refresh_token(refresh_token: &str) -> Self {
        Self {
            access_token: None,
            refresh_token: Some(refresh_token.to_string()),
            email: None,
            saved_at: Utc::now(),
        }
    }

    pub fn tokens(&self) -> StoredTokens {
        StoredTokens {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
        }
    }
}

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("BOOKMARKS_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("smart-bookmarks")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

pub fn load_session() -> anyhow::Result<Option<SessionFile>> {
    let session_file = get_config_dir()?.join(SESSION_FILE);

    if !session_file.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(session_file)?;
    let session: SessionFile = serde_json::from_str(&content)?;
    Ok(Some(session))
}

pub fn save_session(session: &SessionFile) -> anyhow::Result<()> {
    let session_file = get_config_dir()?.join(SESSION_FILE);

    let content = serde_json::to_string_pretty(session)?;
    fs::write(session_file, content)?;
    Ok(())
}

/// Returns true when a session file was present.
pub fn remove_session() -> anyhow::Result<bool> {
    let session_file = get_config_dir()?.join(SESSION_FILE);

    if !session_file.exists() {
        return Ok(false);
    }
    fs::remove_file(session_file)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_only_file_has_no_access_token() {
        let file = SessionFile::from_refresh_token("r-1");
        let tokens = file.tokens();
        assert_eq!(tokens.access_token, None);
        assert_eq!(tokens.refresh_token.as_deref(), Some("r-1"));
    }

    #[test]
    fn test_session_file_json_shape() {
        let file = SessionFile::from_refresh_token("r-1");
        let value = serde_json::to_value(&file).unwrap();
        assert_eq!(value["refresh_token"], "r-1");
        assert!(value["access_token"].is_null());
        assert!(value.get("saved_at").is_some());
    }
}
