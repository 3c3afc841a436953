//! `iz sessions …`: stored authentication records. Tokens are never printed.

use chrono::{DateTime, Utc};
use iz_config::{AuthMethod, SessionDocument};
use serde::Serialize;

use crate::cli::NameArgs;
use crate::client::CliResult;
use crate::context::CliContext;
use crate::output::format_age;
use crate::prompt::Prompt;

/// One entry of `iz sessions list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct SessionSummary {
    pub(crate) name: String,
    pub(crate) url: String,
    pub(crate) username: String,
    pub(crate) auth_method: AuthMethod,
    pub(crate) created_at: DateTime<Utc>,
}

pub(crate) fn session_summaries(sessions: &SessionDocument) -> Vec<SessionSummary> {
    sessions
        .sessions
        .iter()
        .map(|(name, session)| SessionSummary {
            name: name.clone(),
            url: session.url.clone(),
            username: session.username.clone(),
            auth_method: session.auth_method,
            created_at: session.created_at,
        })
        .collect()
}

pub(crate) fn handle_session_list(ctx: &CliContext) -> CliResult<()> {
    let summaries = session_summaries(&ctx.sessions.load()?);
    let renderer = ctx.renderer();
    if renderer.is_json() {
        return renderer.json(&summaries);
    }
    if summaries.is_empty() {
        println!("No sessions stored; run 'iz login <url> <username>'");
        return Ok(());
    }
    let now = Utc::now();
    let rows: Vec<Vec<String>> = summaries
        .into_iter()
        .map(|summary| {
            vec![
                summary.name,
                summary.url,
                summary.username,
                summary.auth_method.as_str().to_string(),
                format_age(summary.created_at, now),
            ]
        })
        .collect();
    renderer.table(&["NAME", "URL", "USERNAME", "METHOD", "AGE"], &rows);
    Ok(())
}

pub(crate) fn handle_session_delete(
    ctx: &CliContext,
    prompt: &mut dyn Prompt,
    args: &NameArgs,
) -> CliResult<()> {
    let (mut config, mut sessions) = ctx.documents()?;
    sessions.get_session(&args.name)?;
    if !ctx.force && !prompt.confirm(&format!("Delete session '{}'?", args.name))? {
        println!("Deletion cancelled");
        return Ok(());
    }

    sessions.remove_session(&args.name)?;
    ctx.sessions.save(&sessions)?;
    let unlinked = config.unlink_session(&args.name);
    if !unlinked.is_empty() {
        ctx.config.save(&config)?;
    }

    println!("Deleted session '{}'", args.name);
    for profile in unlinked {
        println!("Profile '{profile}' is no longer logged in");
    }
    Ok(())
}
