pub mod auth;
pub mod bookmarks;

use crate::config::AppConfig;
use crate::state::AppState;

/// Backend clients built from the same environment the server reads.
pub(crate) fn connect() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env()?;
    Ok(AppState::new(config)?)
}

pub(crate) const NOT_SIGNED_IN: &str =
    "Not signed in. Run `bookmarks auth import <refresh-token>` first";
