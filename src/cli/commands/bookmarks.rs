use serde_json::json;
use uuid::Uuid;

use super::{connect, NOT_SIGNED_IN};
use crate::cli::config::{load_session, save_session, SessionFile};
use crate::cli::utils::{output_bookmarks, output_change, output_success};
use crate::cli::OutputFormat;
use crate::dashboard::session::{DashboardSession, MountOutcome};
use crate::models::NewBookmark;
use crate::state::AppState;

/// Bootstraps from the session file and fetches the list. With `live` the
/// change feed is attached as well. A refreshed session is written back.
async fn open(state: &AppState, live: bool) -> anyhow::Result<DashboardSession> {
    let file = load_session()?.ok_or_else(|| anyhow::anyhow!(NOT_SIGNED_IN))?;
    let stored = file.tokens();
    let wait = state.config.session_wait();

    let outcome = if live {
        DashboardSession::mount(
            state.identity.as_ref(),
            state.store.clone(),
            state.feed.as_ref(),
            stored,
            wait,
        )
        .await
    } else {
        DashboardSession::load(state.identity.as_ref(), state.store.clone(), stored, wait).await
    };

    match outcome {
        MountOutcome::Ready(mounted) => {
            if file.access_token.as_deref() != Some(mounted.session().access_token.as_str()) {
                save_session(&SessionFile::from_session(mounted.session()))?;
            }
            Ok(mounted)
        }
        MountOutcome::Redirect(_) => Err(anyhow::anyhow!(NOT_SIGNED_IN)),
    }
}

pub async fn list(output_format: OutputFormat) -> anyhow::Result<()> {
    let state = connect()?;
    let mounted = open(&state, false).await?;
    output_bookmarks(&output_format, mounted.dashboard().bookmarks())
}

pub async fn add(title: &str, url: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    // Reject bad input before touching the network
    NewBookmark::parse(title, url)?;

    let state = connect()?;
    let mut mounted = open(&state, false).await?;
    let created = mounted.add(title, url).await?;

    output_success(
        &output_format,
        &format!("Added {} ({})", created.title, created.display_host()),
        Some(json!({ "bookmark": created })),
    )
}

pub async fn delete(id: Uuid, output_format: OutputFormat) -> anyhow::Result<()> {
    let state = connect()?;
    let mut mounted = open(&state, false).await?;
    mounted.remove(id).await?;

    output_success(&output_format, &format!("Deleted {}", id), Some(json!({ "id": id })))
}

pub async fn watch(output_format: OutputFormat) -> anyhow::Result<()> {
    let state = connect()?;
    let mut mounted = open(&state, true).await?;
    output_bookmarks(&output_format, mounted.dashboard().bookmarks())?;

    if !mounted.is_subscribed() {
        anyhow::bail!("Could not subscribe to bookmark changes");
    }

    loop {
        tokio::select! {
            event = mounted.pump() => match event {
                Some(event) => output_change(&output_format, &event)?,
                None => {
                    tracing::info!("change feed closed");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    mounted.unmount();
    Ok(())
}
