use chrono::{TimeZone, Utc};
use clap::Subcommand;
use serde_json::json;

use super::{connect, NOT_SIGNED_IN};
use crate::cli::config::{load_session, remove_session, save_session, SessionFile};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::session::Session;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Start a session from a refresh token issued by the web app")]
    Import {
        #[arg(help = "Refresh token")]
        refresh_token: String,
    },

    #[command(about = "Show current session status")]
    Status,

    #[command(about = "Sign out and forget the stored session")]
    Logout,
}

pub async fn handle(cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Import { refresh_token } => import(&refresh_token, output_format).await,
        AuthCommands::Status => status(output_format),
        AuthCommands::Logout => logout(output_format).await,
    }
}

async fn import(refresh_token: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let state = connect()?;
    let session = state.identity.refresh_session(refresh_token.trim()).await?;
    save_session(&SessionFile::from_session(&session))?;

    output_success(
        &output_format,
        &format!("Signed in as {}", session.user.email.as_deref().unwrap_or("<no email>")),
        Some(json!({ "user_id": session.user.id, "email": session.user.email })),
    )
}

fn status(output_format: OutputFormat) -> anyhow::Result<()> {
    let file = load_session()?.ok_or_else(|| anyhow::anyhow!(NOT_SIGNED_IN))?;

    let Some(access_token) = file.access_token.clone() else {
        return output_success(
            &output_format,
            "Refresh token stored; the next command will start a session",
            Some(json!({ "authenticated": false })),
        );
    };

    let session = Session::from_tokens(access_token, file.refresh_token.clone().unwrap_or_default())?;
    let expires_at = Utc.timestamp_opt(session.expires_at, 0).single();
    let expired = session.is_expired();

    output_success(
        &output_format,
        &format!(
            "Session for {} {} at {}",
            session.user.email.as_deref().unwrap_or("<no email>"),
            if expired { "expired" } else { "expires" },
            expires_at.map(|t| t.to_rfc3339()).unwrap_or_else(|| session.expires_at.to_string()),
        ),
        Some(json!({
            "authenticated": !expired,
            "user_id": session.user.id,
            "email": session.user.email,
            "expires_at": expires_at,
        })),
    )
}

async fn logout(output_format: OutputFormat) -> anyhow::Result<()> {
    if let Some(file) = load_session()? {
        if let Some(access_token) = file.access_token {
            match Session::from_tokens(access_token, file.refresh_token.unwrap_or_default()) {
                Ok(session) => {
                    let state = connect()?;
                    if let Err(e) = state.identity.sign_out(&session.context()).await {
                        tracing::warn!(error = %e, "remote sign out failed");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "ignoring unreadable stored access token"),
            }
        }
    }

    let removed = remove_session()?;
    output_success(
        &output_format,
        if removed { "Signed out" } else { "No stored session" },
        Some(json!({ "removed": removed })),
    )
}
