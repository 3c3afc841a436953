//! Argument parsing and command dispatch.

use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use iz_config::validate::parse_timeout;
use iz_config::{ColorMode, Environment, OsPaths, OutputFormat, Overrides, PathProvider};
use iz_telemetry::{ENV_LOG_FORMAT, LoggingConfig, init_logging};
use tracing::debug;

use crate::client::CliResult;
use crate::commands::config::{
    handle_config_get, handle_config_init, handle_config_list, handle_config_path,
    handle_config_reset, handle_config_set, handle_config_unset, handle_config_validate,
};
use crate::commands::health::handle_health;
use crate::commands::login::{handle_login, handle_logout};
use crate::commands::profiles::{
    handle_profile_add, handle_profile_current, handle_profile_delete, handle_profile_list,
    handle_profile_set, handle_profile_show, handle_profile_unset, handle_profile_use,
};
use crate::commands::sessions::{handle_session_delete, handle_session_list};
use crate::context::CliContext;
use crate::prompt::{LinePrompt, Prompt};

/// Parses CLI arguments, executes the requested command and reports errors.
/// Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let env = Environment::capture();
    let paths: Arc<dyn PathProvider> = Arc::new(OsPaths::from_env(&env));
    let overrides = Overrides::from(&cli.global);
    let ctx = CliContext::new(&paths, env, overrides, cli.global.force);
    init_cli_logging(&ctx);

    let mut prompt = LinePrompt::stdin();
    match dispatch(cli.command, &ctx, &mut prompt).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

/// `--verbose` wins; otherwise the `verbose` setting from the file applies.
/// An unreadable config file only means the default level is used.
fn init_cli_logging(ctx: &CliContext) {
    let verbose = ctx.settings().map_or_else(
        |_| ctx.overrides.verbose.unwrap_or(false),
        |settings| settings.verbose.value,
    );
    let config = LoggingConfig::for_cli(verbose, ctx.env.get(ENV_LOG_FORMAT));
    match init_logging(&config) {
        Ok(installed) => debug!(installed, verbose, "logging initialised"),
        Err(err) => eprintln!("warning: failed to initialise logging: {err:#}"),
    }
}

async fn dispatch(command: Command, ctx: &CliContext, prompt: &mut dyn Prompt) -> CliResult<()> {
    match command {
        Command::Login(args) => handle_login(ctx, prompt, args).await,
        Command::Logout => handle_logout(ctx),
        Command::Config(config) => match config {
            ConfigCommand::Init(args) => handle_config_init(ctx, &args),
            ConfigCommand::Path => handle_config_path(ctx),
            ConfigCommand::Set(args) => handle_config_set(ctx, &args),
            ConfigCommand::Get(args) => handle_config_get(ctx, &args),
            ConfigCommand::Unset(args) => handle_config_unset(ctx, &args),
            ConfigCommand::List(args) => handle_config_list(ctx, &args),
            ConfigCommand::Validate => handle_config_validate(ctx),
            ConfigCommand::Reset => handle_config_reset(ctx, prompt),
        },
        Command::Profiles(profiles) => match profiles {
            ProfilesCommand::List => handle_profile_list(ctx),
            ProfilesCommand::Current => handle_profile_current(ctx),
            ProfilesCommand::Show(args) => handle_profile_show(ctx, &args),
            ProfilesCommand::Add(args) => handle_profile_add(ctx, &args),
            ProfilesCommand::Use(args) => handle_profile_use(ctx, &args),
            ProfilesCommand::Set(args) => handle_profile_set(ctx, &args),
            ProfilesCommand::Unset(args) => handle_profile_unset(ctx, &args),
            ProfilesCommand::Delete(args) => handle_profile_delete(ctx, prompt, &args),
        },
        Command::Sessions(sessions) => match sessions {
            SessionsCommand::List => handle_session_list(ctx),
            SessionsCommand::Delete(args) => handle_session_delete(ctx, prompt, &args),
        },
        Command::Health => handle_health(ctx).await,
    }
}

#[derive(Parser)]
#[command(
    name = "iz",
    version,
    about = "Command-line client for the Izanami feature-flag service"
)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) global: GlobalArgs,
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// Flags accepted by every command. Environment fallbacks are applied by the
/// resolver, not by clap, so sources can be reported.
#[derive(Args, Debug, Default)]
pub(crate) struct GlobalArgs {
    #[arg(long, global = true, value_name = "URL", help = "Izanami server URL")]
    pub(crate) url: Option<String>,
    #[arg(long, global = true, help = "Tenant to operate on")]
    pub(crate) tenant: Option<String>,
    #[arg(long, global = true, help = "Project to operate on")]
    pub(crate) project: Option<String>,
    #[arg(long, global = true, help = "Admin JWT, overriding any stored session")]
    pub(crate) jwt_token: Option<String>,
    #[arg(long, global = true, help = "Personal access token for admin calls")]
    pub(crate) personal_access_token: Option<String>,
    #[arg(long, global = true, help = "Owner of the personal access token")]
    pub(crate) personal_access_token_username: Option<String>,
    #[arg(long, global = true, help = "Profile to use instead of the active one")]
    pub(crate) profile: Option<String>,
    #[arg(
        short = 'o',
        long,
        global = true,
        value_parser = parse_output,
        help = "Output format: table or json"
    )]
    pub(crate) output: Option<OutputFormat>,
    #[arg(long, global = true, value_parser = parse_color, help = "Colour: auto, always or never")]
    pub(crate) color: Option<ColorMode>,
    #[arg(short, long, global = true, help = "Enable debug logging")]
    pub(crate) verbose: bool,
    #[arg(short, long, global = true, help = "Skip confirmation prompts")]
    pub(crate) force: bool,
    #[arg(long, global = true, value_parser = parse_timeout_secs, help = "HTTP timeout in seconds")]
    pub(crate) timeout: Option<u64>,
}

impl From<&GlobalArgs> for Overrides {
    fn from(args: &GlobalArgs) -> Self {
        Self {
            profile: args.profile.clone(),
            base_url: args.url.clone(),
            tenant: args.tenant.clone(),
            project: args.project.clone(),
            jwt_token: args.jwt_token.clone(),
            personal_access_token: args.personal_access_token.clone(),
            personal_access_token_username: args.personal_access_token_username.clone(),
            client_id: None,
            client_secret: None,
            timeout: args.timeout,
            output_format: args.output,
            verbose: args.verbose.then_some(true),
            color: args.color,
        }
    }
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Authenticate and store a session
    Login(LoginArgs),
    /// Remove the session linked to the current profile
    Logout,
    /// Manage global settings
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Manage connection profiles
    #[command(subcommand)]
    Profiles(ProfilesCommand),
    /// Manage stored sessions
    #[command(subcommand)]
    Sessions(SessionsCommand),
    /// Check that the server answers
    Health,
}

#[derive(Args, Debug, Default)]
pub(crate) struct LoginArgs {
    #[arg(value_name = "URL_OR_USERNAME")]
    pub(crate) first: Option<String>,
    #[arg(value_name = "USERNAME")]
    pub(crate) second: Option<String>,
    #[arg(long, help = "Password (prompted when omitted)")]
    pub(crate) password: Option<String>,
    #[arg(long, help = "Session name instead of <profile>-<user>-session")]
    pub(crate) name: Option<String>,
    #[arg(long, help = "Log in through the identity provider")]
    pub(crate) oidc: bool,
    #[arg(long, help = "OIDC token obtained beforehand; implies --oidc")]
    pub(crate) token: Option<String>,
    #[arg(long, help = "Print the OIDC URL instead of opening a browser")]
    pub(crate) no_browser: bool,
}

#[derive(Subcommand)]
pub(crate) enum ConfigCommand {
    /// Create the config file
    Init(ConfigInitArgs),
    /// Print the config and session file locations
    Path,
    /// Set a global setting
    Set(KeyValueArgs),
    /// Show a global setting and where it comes from
    Get(KeyArgs),
    /// Remove a global setting from the file
    Unset(KeyArgs),
    /// Show effective settings and the current profile
    List(ShowSecretsArgs),
    /// Check the config file for invalid values
    Validate,
    /// Restore default global settings
    Reset,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ConfigInitArgs {
    #[arg(long, help = "Populate the file with the default settings")]
    pub(crate) defaults: bool,
}

#[derive(Args, Debug)]
pub(crate) struct KeyValueArgs {
    pub(crate) key: String,
    pub(crate) value: String,
}

#[derive(Args, Debug)]
pub(crate) struct KeyArgs {
    pub(crate) key: String,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ShowSecretsArgs {
    #[arg(long, help = "Print secrets instead of masking them")]
    pub(crate) show_secrets: bool,
}

#[derive(Subcommand)]
pub(crate) enum ProfilesCommand {
    /// List profiles
    List,
    /// Print the active profile name
    Current,
    /// Show one profile
    Show(ProfileShowArgs),
    /// Create a profile from --url, --tenant and --project
    Add(ProfileAddArgs),
    /// Make a profile active
    Use(NameArgs),
    /// Set a key on the current profile
    Set(KeyValueArgs),
    /// Remove a key from the current profile
    Unset(KeyArgs),
    /// Delete a profile
    Delete(NameArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ProfileShowArgs {
    pub(crate) name: Option<String>,
    #[arg(long, help = "Print secrets instead of masking them")]
    pub(crate) show_secrets: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ProfileAddArgs {
    pub(crate) name: String,
    #[arg(long, help = "Client id for feature checks")]
    pub(crate) client_id: Option<String>,
    #[arg(long, help = "Client secret for feature checks")]
    pub(crate) client_secret: Option<String>,
    #[arg(long, help = "Make the new profile active")]
    pub(crate) activate: bool,
}

#[derive(Args, Debug)]
pub(crate) struct NameArgs {
    pub(crate) name: String,
}

#[derive(Subcommand)]
pub(crate) enum SessionsCommand {
    /// List stored sessions without their tokens
    List,
    /// Delete a session and unlink it from profiles
    Delete(NameArgs),
}

fn parse_output(input: &str) -> Result<OutputFormat, String> {
    input.parse().map_err(|err| format!("{err}"))
}

fn parse_color(input: &str) -> Result<ColorMode, String> {
    input.parse().map_err(|err| format!("{err}"))
}

fn parse_timeout_secs(input: &str) -> Result<u64, String> {
    parse_timeout(input).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("arguments should parse")
    }

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn login_accepts_positional_target_and_flags() {
        let cli = parse(&["iz", "login", "https://x.example", "u", "--password", "p"]);
        let Command::Login(args) = cli.command else {
            panic!("expected login");
        };
        assert_eq!(args.first.as_deref(), Some("https://x.example"));
        assert_eq!(args.second.as_deref(), Some("u"));
        assert_eq!(args.password.as_deref(), Some("p"));
        assert!(!args.oidc);
    }

    #[test]
    fn global_flags_follow_subcommands_into_overrides() {
        let cli = parse(&[
            "iz", "profiles", "list", "--tenant", "acme", "-o", "json", "--timeout", "5", "-v",
        ]);
        assert!(matches!(cli.command, Command::Profiles(ProfilesCommand::List)));
        let overrides = Overrides::from(&cli.global);
        assert_eq!(overrides.tenant.as_deref(), Some("acme"));
        assert_eq!(overrides.output_format, Some(OutputFormat::Json));
        assert_eq!(overrides.timeout, Some(5));
        assert_eq!(overrides.verbose, Some(true));
        assert_eq!(overrides.color, None);
    }

    #[test]
    fn invalid_global_values_are_rejected_by_the_parser() {
        assert!(Cli::try_parse_from(["iz", "health", "--output", "xml"]).is_err());
        assert!(Cli::try_parse_from(["iz", "health", "--color", "rainbow"]).is_err());
        assert!(Cli::try_parse_from(["iz", "health", "--timeout", "0"]).is_err());
    }

    #[test]
    fn profiles_add_reuses_global_connection_flags() {
        let cli = parse(&[
            "iz",
            "profiles",
            "add",
            "staging",
            "--url",
            "https://staging.example",
            "--client-id",
            "cid",
            "--activate",
        ]);
        let Command::Profiles(ProfilesCommand::Add(args)) = cli.command else {
            panic!("expected profiles add");
        };
        assert_eq!(args.name, "staging");
        assert_eq!(args.client_id.as_deref(), Some("cid"));
        assert!(args.activate);
        assert_eq!(cli.global.url.as_deref(), Some("https://staging.example"));
    }

    #[test]
    fn config_subcommands_parse() {
        let cli = parse(&["iz", "config", "set", "timeout", "45"]);
        let Command::Config(ConfigCommand::Set(args)) = cli.command else {
            panic!("expected config set");
        };
        assert_eq!((args.key.as_str(), args.value.as_str()), ("timeout", "45"));

        let cli = parse(&["iz", "config", "reset", "-f"]);
        assert!(cli.global.force);
        assert!(matches!(cli.command, Command::Config(ConfigCommand::Reset)));
    }
}
