//! `iz login` and `iz logout`.

use iz_config::{ConfigError, Resolver};
use serde::Serialize;
use tracing::info;

use crate::cli::LoginArgs;
use crate::client::CliResult;
use crate::context::CliContext;
use crate::login::{LoginFlow, LoginOutcome, LoginRequest};
use crate::output::print_warnings;
use crate::prompt::Prompt;

impl From<LoginArgs> for LoginRequest {
    fn from(args: LoginArgs) -> Self {
        Self {
            first: args.first,
            second: args.second,
            password: args.password,
            session_name: args.name,
            oidc: args.oidc,
            token: args.token,
            no_browser: args.no_browser,
        }
    }
}

pub(crate) async fn handle_login(
    ctx: &CliContext,
    prompt: &mut dyn Prompt,
    args: LoginArgs,
) -> CliResult<()> {
    let outcome = LoginFlow::new(ctx, prompt).run(args.into()).await?;
    print_warnings(&outcome.warnings);

    let renderer = ctx.renderer();
    if renderer.is_json() {
        return renderer.json(&outcome);
    }
    for line in login_summary(&outcome) {
        println!("{line}");
    }
    Ok(())
}

fn login_summary(outcome: &LoginOutcome) -> Vec<String> {
    let mut lines = vec![format!(
        "Logged in to {} as {} ({}).",
        outcome.url,
        outcome.username,
        outcome.method.as_str()
    )];
    if outcome.profile_created {
        lines.push(format!("Created profile '{}'.", outcome.profile));
    }
    let active = if outcome.activated { " (now active)" } else { "" };
    lines.push(format!(
        "Session '{}' linked to profile '{}'{active}.",
        outcome.session, outcome.profile
    ));
    if !outcome.refreshed.is_empty() {
        lines.push(format!(
            "Refreshed sessions for the same user: {}.",
            outcome.refreshed.join(", ")
        ));
    }
    if let Some(removed) = &outcome.removed {
        lines.push(format!("Replaced session '{removed}'."));
    }
    lines
}

/// What `iz logout` removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct LogoutOutcome {
    pub(crate) profile: String,
    pub(crate) session: String,
    /// Every profile whose link to the session was cleared.
    pub(crate) unlinked: Vec<String>,
}

pub(crate) fn handle_logout(ctx: &CliContext) -> CliResult<()> {
    let outcome = logout(ctx)?;
    let renderer = ctx.renderer();
    if renderer.is_json() {
        return renderer.json(&outcome);
    }
    println!(
        "Logged out of profile '{}' (removed session '{}').",
        outcome.profile, outcome.session
    );
    Ok(())
}

fn logout(ctx: &CliContext) -> CliResult<LogoutOutcome> {
    let (mut config, mut sessions) = ctx.documents()?;
    let (profile, session) = {
        let resolver = Resolver::new(&config, &sessions, &ctx.env);
        let (name, profile) =
            resolver
                .selected_profile(&ctx.overrides)?
                .ok_or_else(|| ConfigError::Unresolved {
                    field: "profile",
                    hint: "run 'iz login <url> <username>' or pass --profile <name>".to_string(),
                })?;
        let session = profile
            .session
            .clone()
            .ok_or_else(|| ConfigError::Unresolved {
                field: "session",
                hint: format!("profile '{name}' is not logged in"),
            })?;
        (name.to_string(), session)
    };

    if sessions.sessions.remove(&session).is_some() {
        ctx.sessions.save(&sessions)?;
    }
    let unlinked = config.unlink_session(&session);
    ctx.config.save(&config)?;
    info!(profile = %profile, session = %session, "logged out");
    Ok(LogoutOutcome {
        profile,
        session,
        unlinked,
    })
}
