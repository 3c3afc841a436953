//! `iz config …`: global settings in the config file.

use iz_config::{EffectiveSettings, ResolvedConfig, Setting, SettingKey, Source};
use serde::Serialize;
use serde_json::json;

use crate::cli::{ConfigInitArgs, KeyArgs, KeyValueArgs, ShowSecretsArgs};
use crate::client::CliResult;
use crate::context::CliContext;
use crate::output::mask;
use crate::prompt::Prompt;

/// One line of `iz config list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ConfigRow {
    pub(crate) key: String,
    pub(crate) value: String,
    pub(crate) source: Source,
}

pub(crate) fn handle_config_init(ctx: &CliContext, args: &ConfigInitArgs) -> CliResult<()> {
    ctx.config.init(args.defaults)?;
    println!("Created {}", ctx.config.path()?.display());
    Ok(())
}

pub(crate) fn handle_config_path(ctx: &CliContext) -> CliResult<()> {
    let config = ctx.config.path()?;
    let sessions = ctx.sessions.path()?;
    let renderer = ctx.renderer();
    if renderer.is_json() {
        return renderer.json(&json!({
            "config": config.display().to_string(),
            "sessions": sessions.display().to_string(),
        }));
    }
    renderer.fields(&[
        ("config", config.display().to_string()),
        ("sessions", sessions.display().to_string()),
    ]);
    Ok(())
}

pub(crate) fn handle_config_set(ctx: &CliContext, args: &KeyValueArgs) -> CliResult<()> {
    let key = ctx.config.set(&args.key, &args.value)?;
    let stored = ctx.config.load()?.setting(key).unwrap_or_default();
    println!("{key} = {stored}");
    Ok(())
}

pub(crate) fn handle_config_get(ctx: &CliContext, args: &KeyArgs) -> CliResult<()> {
    let lookup = ctx.config.get(&args.key, &ctx.env)?;
    let renderer = ctx.renderer();
    if renderer.is_json() {
        let (value, source) = lookup.value.clone().unzip();
        return renderer.json(&json!({
            "key": lookup.key.as_str(),
            "value": value,
            "source": source,
        }));
    }
    println!("{lookup}");
    Ok(())
}

pub(crate) fn handle_config_unset(ctx: &CliContext, args: &KeyArgs) -> CliResult<()> {
    let key = ctx.config.unset(&args.key)?;
    println!("Removed {key} from the config file");
    Ok(())
}

pub(crate) fn handle_config_list(ctx: &CliContext, args: &ShowSecretsArgs) -> CliResult<()> {
    let settings = ctx.settings()?;
    let resolved = ctx.resolve()?;
    let rows = config_rows(&settings, &resolved, args.show_secrets);

    let renderer = ctx.renderer();
    if renderer.is_json() {
        return renderer.json(&rows);
    }
    let table: Vec<Vec<String>> = rows
        .into_iter()
        .map(|row| vec![row.key, row.value, row.source.to_string()])
        .collect();
    renderer.table(&["KEY", "VALUE", "SOURCE"], &table);
    Ok(())
}

pub(crate) fn handle_config_validate(ctx: &CliContext) -> CliResult<()> {
    ctx.config.validate()?;
    println!("Configuration at {} is valid", ctx.config.path()?.display());
    Ok(())
}

pub(crate) fn handle_config_reset(ctx: &CliContext, prompt: &mut dyn Prompt) -> CliResult<()> {
    if !ctx.force && !prompt.confirm("Reset global settings to their defaults?")? {
        println!("Reset cancelled");
        return Ok(());
    }
    ctx.config.reset()?;
    println!("Global settings restored to defaults; profiles were kept");
    Ok(())
}

/// Effective global settings followed by the resolved connection fields.
pub(crate) fn config_rows(
    settings: &EffectiveSettings,
    resolved: &ResolvedConfig,
    show_secrets: bool,
) -> Vec<ConfigRow> {
    let mut rows: Vec<ConfigRow> = SettingKey::ALL
        .into_iter()
        .map(|key| {
            let (value, source) = settings.describe(key);
            ConfigRow {
                key: key.as_str().to_string(),
                value,
                source,
            }
        })
        .collect();

    if let Some(name) = &resolved.profile_name {
        rows.push(ConfigRow {
            key: "profile".to_string(),
            value: name.clone(),
            source: Source::File,
        });
    }
    if let Some(name) = &resolved.session_name {
        rows.push(ConfigRow {
            key: "session".to_string(),
            value: name.clone(),
            source: Source::Profile,
        });
    }

    let fields: [(&str, &Option<Setting<String>>, bool); 9] = [
        ("base-url", &resolved.base_url, false),
        ("username", &resolved.username, false),
        ("tenant", &resolved.tenant, false),
        ("project", &resolved.project, false),
        ("client-id", &resolved.client_id, false),
        ("client-secret", &resolved.client_secret, true),
        ("jwt-token", &resolved.jwt_token, true),
        ("personal-access-token", &resolved.personal_access_token, true),
        (
            "personal-access-token-username",
            &resolved.personal_access_token_username,
            false,
        ),
    ];
    rows.extend(fields.into_iter().filter_map(|(key, setting, secret)| {
        setting.as_ref().map(|setting| ConfigRow {
            key: key.to_string(),
            value: if secret {
                mask(&setting.value, show_secrets)
            } else {
                setting.value.clone()
            },
            source: setting.source,
        })
    }));
    rows
}
