//! `iz profiles …`: named connection defaults.

use iz_config::{ConfigDocument, ConfigError, Profile, ProfileKey, Resolver, SessionDocument};
use serde::Serialize;
use tracing::info;

use crate::cli::{KeyArgs, KeyValueArgs, NameArgs, ProfileAddArgs, ProfileShowArgs};
use crate::client::{CliError, CliResult};
use crate::context::CliContext;
use crate::output::{mask, or_dash};
use crate::prompt::Prompt;

/// One entry of `iz profiles list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ProfileSummary {
    pub(crate) name: String,
    pub(crate) active: bool,
    pub(crate) url: Option<String>,
    pub(crate) username: Option<String>,
    pub(crate) tenant: Option<String>,
    pub(crate) project: Option<String>,
    pub(crate) session: Option<String>,
}

pub(crate) fn profile_summaries(
    config: &ConfigDocument,
    sessions: &SessionDocument,
) -> Vec<ProfileSummary> {
    let active = config.active_profile_name();
    config
        .list_profiles()
        .map(|(name, profile)| ProfileSummary {
            name: name.to_string(),
            active: active == Some(name),
            url: profile.effective_url(sessions),
            username: profile.username.clone(),
            tenant: profile.tenant.clone(),
            project: profile.project.clone(),
            session: profile.session.clone(),
        })
        .collect()
}

pub(crate) fn handle_profile_list(ctx: &CliContext) -> CliResult<()> {
    let (config, sessions) = ctx.documents()?;
    let summaries = profile_summaries(&config, &sessions);
    let renderer = ctx.renderer();
    if renderer.is_json() {
        return renderer.json(&summaries);
    }
    if summaries.is_empty() {
        println!("No profiles yet; run 'iz login <url> <username>' or 'iz profiles add <name>'");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = summaries
        .iter()
        .map(|summary| {
            vec![
                if summary.active { "*" } else { "" }.to_string(),
                summary.name.clone(),
                or_dash(summary.url.as_deref()),
                or_dash(summary.tenant.as_deref()),
                or_dash(summary.project.as_deref()),
                or_dash(summary.session.as_deref()),
            ]
        })
        .collect();
    renderer.table(&["", "NAME", "URL", "TENANT", "PROJECT", "SESSION"], &rows);
    Ok(())
}

pub(crate) fn handle_profile_current(ctx: &CliContext) -> CliResult<()> {
    let name = ctx.config.active_profile_name()?.ok_or_else(no_active_profile)?;
    println!("{name}");
    Ok(())
}

pub(crate) fn handle_profile_show(ctx: &CliContext, args: &ProfileShowArgs) -> CliResult<()> {
    let (config, sessions) = ctx.documents()?;
    let name = match &args.name {
        Some(name) => name.clone(),
        None => selected_profile_name(ctx, &config, &sessions)?,
    };
    let profile = config.get_profile(&name)?;
    let fields = profile_fields(&name, profile, &sessions, args.show_secrets);

    let renderer = ctx.renderer();
    if renderer.is_json() {
        let map: serde_json::Map<String, serde_json::Value> = fields
            .into_iter()
            .map(|(key, value)| (key.to_string(), value.map_or(serde_json::Value::Null, Into::into)))
            .collect();
        return renderer.json(&map);
    }
    let rows: Vec<(&str, String)> = fields
        .into_iter()
        .map(|(key, value)| (key, or_dash(value.as_deref())))
        .collect();
    renderer.fields(&rows);
    Ok(())
}

fn profile_fields(
    name: &str,
    profile: &Profile,
    sessions: &SessionDocument,
    show_secrets: bool,
) -> Vec<(&'static str, Option<String>)> {
    let mut fields = vec![
        ("name", Some(name.to_string())),
        ("url", profile.effective_url(sessions)),
    ];
    fields.extend(ProfileKey::ALL.into_iter().map(|key| {
        let value = profile.get(key).map(|value| {
            if key.is_secret() {
                mask(value, show_secrets)
            } else {
                value.to_string()
            }
        });
        (key.as_str(), value)
    }));
    fields
}

pub(crate) fn handle_profile_add(ctx: &CliContext, args: &ProfileAddArgs) -> CliResult<()> {
    let profile = profile_from_flags(ctx, args)?;
    let activated = ctx.config.add_profile(&args.name, profile, args.activate)?;
    info!(profile = %args.name, activated, "profile created");
    if activated {
        println!("Created profile '{}' (now active)", args.name);
    } else {
        println!("Created profile '{}'", args.name);
    }
    Ok(())
}

fn profile_from_flags(ctx: &CliContext, args: &ProfileAddArgs) -> CliResult<Profile> {
    let mut profile = Profile::default();
    let values = [
        (ProfileKey::BaseUrl, ctx.overrides.base_url.as_deref()),
        (ProfileKey::Tenant, ctx.overrides.tenant.as_deref()),
        (ProfileKey::Project, ctx.overrides.project.as_deref()),
        (ProfileKey::ClientId, args.client_id.as_deref()),
        (ProfileKey::ClientSecret, args.client_secret.as_deref()),
    ];
    for (key, value) in values {
        if let Some(value) = value {
            profile.set(key, value)?;
        }
    }
    Ok(profile)
}

pub(crate) fn handle_profile_use(ctx: &CliContext, args: &NameArgs) -> CliResult<()> {
    ctx.config.set_active_profile(&args.name)?;
    println!("Switched to profile '{}'", args.name);
    Ok(())
}

pub(crate) fn handle_profile_set(ctx: &CliContext, args: &KeyValueArgs) -> CliResult<()> {
    let key = ProfileKey::parse(&args.key)?;
    let (mut config, sessions) = ctx.documents()?;
    let name = selected_profile_name(ctx, &config, &sessions)?;
    if key == ProfileKey::Session {
        sessions.get_session(args.value.trim())?;
    }
    config.get_profile_mut(&name)?.set(key, &args.value)?;
    ctx.config.save(&config)?;
    println!("Set {key} on profile '{name}'");
    Ok(())
}

pub(crate) fn handle_profile_unset(ctx: &CliContext, args: &KeyArgs) -> CliResult<()> {
    let key = ProfileKey::parse(&args.key)?;
    let (mut config, sessions) = ctx.documents()?;
    let name = selected_profile_name(ctx, &config, &sessions)?;
    config.get_profile_mut(&name)?.unset(key);
    ctx.config.save(&config)?;
    println!("Removed {key} from profile '{name}'");
    Ok(())
}

pub(crate) fn handle_profile_delete(
    ctx: &CliContext,
    prompt: &mut dyn Prompt,
    args: &NameArgs,
) -> CliResult<()> {
    let mut config = ctx.config.load()?;
    config.get_profile(&args.name)?;
    if !ctx.force && !prompt.confirm(&format!("Delete profile '{}'?", args.name))? {
        println!("Deletion cancelled");
        return Ok(());
    }
    config.remove_profile(&args.name)?;
    ctx.config.save(&config)?;
    println!("Deleted profile '{}'", args.name);
    Ok(())
}

/// `--profile`, then `IZ_PROFILE`, then the active profile.
fn selected_profile_name(
    ctx: &CliContext,
    config: &ConfigDocument,
    sessions: &SessionDocument,
) -> CliResult<String> {
    Resolver::new(config, sessions, &ctx.env)
        .selected_profile(&ctx.overrides)?
        .map(|(name, _)| name.to_string())
        .ok_or_else(no_active_profile)
}

fn no_active_profile() -> CliError {
    ConfigError::Unresolved {
        field: "profile",
        hint: "run 'iz profiles use <name>' or pass --profile <name>".to_string(),
    }
    .into()
}
