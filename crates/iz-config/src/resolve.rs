//! Per-invocation resolution of connection settings and credentials.
//!
//! Each field is taken from the first source that supplies it, in order:
//! command-line flag, field-specific environment variable, the selected
//! profile, the profile's linked session (URL, username and token only), and
//! finally a built-in default. Resolution never writes to disk.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::defaults::{DEFAULT_COLOR, DEFAULT_OUTPUT_FORMAT, DEFAULT_TIMEOUT_SECS, DEFAULT_VERBOSE};
use crate::error::{ConfigError, ConfigResult};
use crate::model::{ConfigDocument, Profile, Session, SessionDocument};
use crate::validate::{ColorMode, OutputFormat, SettingKey, check_timeout, normalize_url, parse_timeout};

/// Server base URL.
pub const ENV_BASE_URL: &str = "IZ_BASE_URL";
/// Tenant.
pub const ENV_TENANT: &str = "IZ_TENANT";
/// Project.
pub const ENV_PROJECT: &str = "IZ_PROJECT";
/// Admin JWT.
pub const ENV_JWT_TOKEN: &str = "IZ_JWT_TOKEN";
/// Personal access token.
pub const ENV_PERSONAL_ACCESS_TOKEN: &str = "IZ_PERSONAL_ACCESS_TOKEN";
/// Owner of the personal access token.
pub const ENV_PERSONAL_ACCESS_TOKEN_USERNAME: &str = "IZ_PERSONAL_ACCESS_TOKEN_USERNAME";
/// Client id for feature checks.
pub const ENV_CLIENT_ID: &str = "IZ_CLIENT_ID";
/// Client secret for feature checks.
pub const ENV_CLIENT_SECRET: &str = "IZ_CLIENT_SECRET";
/// Request timeout in seconds.
pub const ENV_TIMEOUT: &str = "IZ_TIMEOUT";
/// Output format.
pub const ENV_OUTPUT_FORMAT: &str = "IZ_OUTPUT_FORMAT";
/// Profile to resolve instead of the active one.
pub const ENV_PROFILE: &str = "IZ_PROFILE";

const ENV_PREFIX: &str = "IZ_";

/// Snapshot of the `IZ_*` environment taken once per invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// Capture every `IZ_*` variable from the process environment.
    #[must_use]
    pub fn capture() -> Self {
        Self::from_pairs(std::env::vars().filter(|(name, _)| name.starts_with(ENV_PREFIX)))
    }

    /// Build a snapshot from explicit pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }

    /// Trimmed value of a variable; blank values count as unset.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }
}

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Command-line flag.
    Flag,
    /// Environment variable.
    Env,
    /// Selected profile.
    Profile,
    /// Session linked to the selected profile.
    Session,
    /// Global setting in the config document.
    File,
    /// Built-in default.
    Default,
}

impl Source {
    /// Lowercase label used in command output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Env => "env",
            Self::Profile => "profile",
            Self::Session => "session",
            Self::File => "file",
            Self::Default => "default",
        }
    }
}

impl Display for Source {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// A resolved value and its origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Setting<T> {
    /// The value.
    pub value: T,
    /// Where it came from.
    pub source: Source,
}

impl<T> Setting<T> {
    /// Pair a value with its source.
    pub const fn new(value: T, source: Source) -> Self {
        Self { value, source }
    }
}

/// Values supplied on the command line for this invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    /// Profile to resolve instead of the active one.
    pub profile: Option<String>,
    /// `--url`.
    pub base_url: Option<String>,
    /// `--tenant`.
    pub tenant: Option<String>,
    /// `--project`.
    pub project: Option<String>,
    /// `--jwt-token`.
    pub jwt_token: Option<String>,
    /// `--personal-access-token`.
    pub personal_access_token: Option<String>,
    /// `--personal-access-token-username`.
    pub personal_access_token_username: Option<String>,
    /// `--client-id`.
    pub client_id: Option<String>,
    /// `--client-secret`.
    pub client_secret: Option<String>,
    /// `--timeout`.
    pub timeout: Option<u64>,
    /// `--output`.
    pub output_format: Option<OutputFormat>,
    /// `--verbose`; only an explicit flag is recorded.
    pub verbose: Option<bool>,
    /// `--color`.
    pub color: Option<ColorMode>,
}

/// Global settings after folding flags, environment, file and defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveSettings {
    /// Request timeout in seconds.
    pub timeout: Setting<u64>,
    /// Renderer.
    pub output_format: Setting<OutputFormat>,
    /// Debug logging.
    pub verbose: Setting<bool>,
    /// Colour policy.
    pub color: Setting<ColorMode>,
}

impl EffectiveSettings {
    /// Request timeout as a duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.value)
    }

    /// Display value and source for one key.
    #[must_use]
    pub fn describe(&self, key: SettingKey) -> (String, Source) {
        match key {
            SettingKey::Timeout => (self.timeout.value.to_string(), self.timeout.source),
            SettingKey::OutputFormat => (
                self.output_format.value.as_str().to_string(),
                self.output_format.source,
            ),
            SettingKey::Verbose => (self.verbose.value.to_string(), self.verbose.source),
            SettingKey::Color => (self.color.value.as_str().to_string(), self.color.source),
        }
    }
}

/// Credential presented to admin endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminAuth {
    /// Bearer JWT from a flag, the environment or a stored session.
    Jwt(String),
    /// Personal access token and the user it belongs to.
    PersonalAccessToken {
        /// Token owner.
        username: String,
        /// Token value.
        token: String,
    },
}

/// Effective configuration for one command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Profile the values were drawn from, if any.
    pub profile_name: Option<String>,
    /// Session linked to that profile, if it resolved.
    pub session_name: Option<String>,
    /// Server URL.
    pub base_url: Option<Setting<String>>,
    /// Authenticated username.
    pub username: Option<Setting<String>>,
    /// Tenant.
    pub tenant: Option<Setting<String>>,
    /// Project.
    pub project: Option<Setting<String>>,
    /// Admin JWT.
    pub jwt_token: Option<Setting<String>>,
    /// Personal access token.
    pub personal_access_token: Option<Setting<String>>,
    /// Owner of the personal access token; falls back to the username.
    pub personal_access_token_username: Option<Setting<String>>,
    /// Client id for feature checks.
    pub client_id: Option<Setting<String>>,
    /// Client secret for feature checks.
    pub client_secret: Option<Setting<String>>,
    /// Global settings.
    pub settings: EffectiveSettings,
    /// Non-fatal notices raised while resolving.
    pub warnings: Vec<String>,
}

impl ResolvedConfig {
    /// Resolved server URL.
    #[must_use]
    pub fn base_url(&self) -> Option<&str> {
        value_of(self.base_url.as_ref())
    }

    /// Resolved username.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        value_of(self.username.as_ref())
    }

    /// Resolved tenant.
    #[must_use]
    pub fn tenant(&self) -> Option<&str> {
        value_of(self.tenant.as_ref())
    }

    /// Resolved project.
    #[must_use]
    pub fn project(&self) -> Option<&str> {
        value_of(self.project.as_ref())
    }

    /// Request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.settings.timeout()
    }

    /// Require a base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Unresolved`] naming the ways to supply one.
    pub fn validate(&self) -> ConfigResult<&str> {
        self.base_url().ok_or_else(|| ConfigError::Unresolved {
            field: "base URL",
            hint: format!(
                "pass --url <url>, set {ENV_BASE_URL}, or run 'iz login <url> <username>'"
            ),
        })
    }

    /// Require a tenant.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Unresolved`] naming the ways to supply one.
    pub fn validate_tenant(&self) -> ConfigResult<&str> {
        self.tenant().ok_or_else(|| ConfigError::Unresolved {
            field: "tenant",
            hint: format!(
                "pass --tenant <tenant>, set {ENV_TENANT}, or run 'iz profiles set tenant <tenant>'"
            ),
        })
    }

    /// Require admin credentials. An explicit JWT wins, then a complete
    /// personal access token pair, then the linked session's token.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingAdminAuth`] when neither is available.
    pub fn validate_admin_auth(&self) -> ConfigResult<AdminAuth> {
        let explicit_jwt = self
            .jwt_token
            .as_ref()
            .filter(|token| token.source != Source::Session);
        if let Some(token) = explicit_jwt {
            return Ok(AdminAuth::Jwt(token.value.clone()));
        }
        if let (Some(token), Some(username)) = (
            value_of(self.personal_access_token.as_ref()),
            value_of(self.personal_access_token_username.as_ref()),
        ) {
            return Ok(AdminAuth::PersonalAccessToken {
                username: username.to_string(),
                token: token.to_string(),
            });
        }
        value_of(self.jwt_token.as_ref())
            .map(|token| AdminAuth::Jwt(token.to_string()))
            .ok_or(ConfigError::MissingAdminAuth)
    }
}

/// Folds command-line overrides, the environment and stored documents into
/// a [`ResolvedConfig`].
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    config: &'a ConfigDocument,
    sessions: &'a SessionDocument,
    env: &'a Environment,
}

impl<'a> Resolver<'a> {
    /// Resolver over borrowed documents and environment.
    #[must_use]
    pub const fn new(
        config: &'a ConfigDocument,
        sessions: &'a SessionDocument,
        env: &'a Environment,
    ) -> Self {
        Self {
            config,
            sessions,
            env,
        }
    }

    /// Profile selected by `--profile`, then `IZ_PROFILE`, then the active
    /// marker.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ProfileNotFound`] when an explicitly named
    /// profile does not exist.
    pub fn selected_profile(
        &self,
        overrides: &Overrides,
    ) -> ConfigResult<Option<(&'a str, &'a Profile)>> {
        let requested = overrides
            .profile
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .or_else(|| self.env.get(ENV_PROFILE));
        match requested {
            Some(name) => self
                .config
                .profiles
                .get_key_value(name)
                .map(|(name, profile)| Some((name.as_str(), profile)))
                .ok_or_else(|| ConfigError::ProfileNotFound {
                    name: name.to_string(),
                }),
            None => Ok(self.config.active_profile()),
        }
    }

    /// Resolve every field for one invocation.
    ///
    /// # Errors
    ///
    /// Returns an error when a named profile is missing or a flag or
    /// environment value is malformed. Missing fields are not errors here;
    /// commands call the `validate*` helpers for what they need.
    pub fn resolve(&self, overrides: &Overrides) -> ConfigResult<ResolvedConfig> {
        let mut warnings = Vec::new();
        let selected = self.selected_profile(overrides)?;
        let profile = selected.map(|(_, profile)| profile);

        let session = profile.and_then(|profile| {
            let name = profile.session.as_deref()?;
            let found = self.sessions.sessions.get_key_value(name);
            if found.is_none() {
                warnings.push(format!(
                    "profile '{}' links to missing session '{name}'",
                    selected.map_or("", |(profile_name, _)| profile_name)
                ));
            }
            found.map(|(name, session)| (name.as_str(), session))
        });
        let linked = session.map(|(_, session)| session);

        let base_url = match pick(overrides.base_url.as_deref(), self.env.get(ENV_BASE_URL)) {
            Some((raw, source)) => Some(Setting::new(normalize_url(raw)?, source)),
            None => profile
                .and_then(|profile| profile.base_url.clone())
                .map(|url| Setting::new(url, Source::Profile))
                .or_else(|| linked.map(|session| Setting::new(session.url.clone(), Source::Session))),
        };

        let username = profile
            .and_then(|profile| profile.username.clone())
            .map(|name| Setting::new(name, Source::Profile))
            .or_else(|| linked.map(|session| Setting::new(session.username.clone(), Source::Session)));

        let tenant = layered(
            overrides.tenant.as_deref(),
            self.env.get(ENV_TENANT),
            profile.and_then(|profile| profile.tenant.as_deref()),
        );
        let project = layered(
            overrides.project.as_deref(),
            self.env.get(ENV_PROJECT),
            profile.and_then(|profile| profile.project.as_deref()),
        );
        let client_id = layered(
            overrides.client_id.as_deref(),
            self.env.get(ENV_CLIENT_ID),
            profile.and_then(|profile| profile.client_id.as_deref()),
        );
        let client_secret = layered(
            overrides.client_secret.as_deref(),
            self.env.get(ENV_CLIENT_SECRET),
            profile.and_then(|profile| profile.client_secret.as_deref()),
        );

        let jwt_token = session_token(
            pick(overrides.jwt_token.as_deref(), self.env.get(ENV_JWT_TOKEN)),
            linked,
        );
        let personal_access_token = pick(
            overrides.personal_access_token.as_deref(),
            self.env.get(ENV_PERSONAL_ACCESS_TOKEN),
        )
        .map(|(token, source)| Setting::new(token.to_string(), source));
        let personal_access_token_username = pick(
            overrides.personal_access_token_username.as_deref(),
            self.env.get(ENV_PERSONAL_ACCESS_TOKEN_USERNAME),
        )
        .map(|(name, source)| Setting::new(name.to_string(), source))
        .or_else(|| username.clone());

        if let Some((session_name, _)) = session {
            if overrides.jwt_token.is_some() {
                warnings.push(format!(
                    "--jwt-token overrides the token stored in session '{session_name}'"
                ));
            }
            if overrides.personal_access_token.is_some() && overrides.jwt_token.is_none() {
                warnings.push(format!(
                    "--personal-access-token overrides the token stored in session '{session_name}'"
                ));
            }
        }

        let resolved = ResolvedConfig {
            profile_name: selected.map(|(name, _)| name.to_string()),
            session_name: session.map(|(name, _)| name.to_string()),
            base_url,
            username,
            tenant,
            project,
            jwt_token,
            personal_access_token,
            personal_access_token_username,
            client_id,
            client_secret,
            settings: self.settings(overrides)?,
            warnings,
        };
        debug!(
            profile = resolved.profile_name.as_deref().unwrap_or("-"),
            session = resolved.session_name.as_deref().unwrap_or("-"),
            base_url_source = ?resolved.base_url.as_ref().map(|setting| setting.source),
            tenant_source = ?resolved.tenant.as_ref().map(|setting| setting.source),
            "configuration resolved"
        );
        Ok(resolved)
    }

    /// Resolve only the global settings.
    ///
    /// Malformed values in the file fall back to the default with a logged
    /// warning so `iz config validate` and `iz config set` stay usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for malformed flag or
    /// environment values.
    pub fn settings(&self, overrides: &Overrides) -> ConfigResult<EffectiveSettings> {
        let timeout = if let Some(secs) = overrides.timeout {
            Setting::new(check_timeout(secs)?, Source::Flag)
        } else if let Some(raw) = self.env.get(ENV_TIMEOUT) {
            Setting::new(parse_timeout(raw).map_err(|err| env_error(ENV_TIMEOUT, raw, err))?, Source::Env)
        } else {
            from_file(
                self.config.timeout_secs(),
                SettingKey::Timeout,
                DEFAULT_TIMEOUT_SECS,
            )
        };

        let output_format = if let Some(format) = overrides.output_format {
            Setting::new(format, Source::Flag)
        } else if let Some(raw) = self.env.get(ENV_OUTPUT_FORMAT) {
            Setting::new(
                raw.parse::<OutputFormat>()
                    .map_err(|err| env_error(ENV_OUTPUT_FORMAT, raw, err))?,
                Source::Env,
            )
        } else {
            from_file(
                self.config.output_format.as_deref().map(str::parse),
                SettingKey::OutputFormat,
                DEFAULT_OUTPUT_FORMAT,
            )
        };

        let verbose = match overrides.verbose {
            Some(flag) => Setting::new(flag, Source::Flag),
            None => from_file(self.config.verbose_flag(), SettingKey::Verbose, DEFAULT_VERBOSE),
        };

        let color = match overrides.color {
            Some(mode) => Setting::new(mode, Source::Flag),
            None => from_file(
                self.config.color.as_deref().map(str::parse),
                SettingKey::Color,
                DEFAULT_COLOR,
            ),
        };

        Ok(EffectiveSettings {
            timeout,
            output_format,
            verbose,
            color,
        })
    }
}

fn value_of(setting: Option<&Setting<String>>) -> Option<&str> {
    setting.map(|setting| setting.value.as_str())
}

fn pick<'v>(flag: Option<&'v str>, env: Option<&'v str>) -> Option<(&'v str, Source)> {
    flag.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| (value, Source::Flag))
        .or_else(|| env.map(|value| (value, Source::Env)))
}

fn layered(flag: Option<&str>, env: Option<&str>, profile: Option<&str>) -> Option<Setting<String>> {
    pick(flag, env)
        .or_else(|| profile.map(|value| (value, Source::Profile)))
        .map(|(value, source)| Setting::new(value.to_string(), source))
}

fn session_token(explicit: Option<(&str, Source)>, session: Option<&Session>) -> Option<Setting<String>> {
    explicit
        .map(|(token, source)| Setting::new(token.to_string(), source))
        .or_else(|| session.map(|session| Setting::new(session.token.clone(), Source::Session)))
}

fn from_file<T>(stored: Option<ConfigResult<T>>, key: SettingKey, default: T) -> Setting<T> {
    match stored {
        Some(Ok(value)) => Setting::new(value, Source::File),
        Some(Err(err)) => {
            warn!(key = key.as_str(), error = %err, "ignoring invalid stored setting");
            Setting::new(default, Source::Default)
        }
        None => Setting::new(default, Source::Default),
    }
}

fn env_error(var: &str, raw: &str, err: ConfigError) -> ConfigError {
    let reason = match err {
        ConfigError::InvalidValue { reason, .. } => reason,
        other => other.to_string(),
    };
    ConfigError::invalid_value(var, raw, reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AuthMethod;
    use chrono::Utc;

    fn session(url: &str, username: &str, token: &str) -> Session {
        Session {
            url: url.to_string(),
            username: username.to_string(),
            token: token.to_string(),
            created_at: Utc::now(),
            auth_method: AuthMethod::Password,
        }
    }

    fn documents() -> (ConfigDocument, SessionDocument) {
        let mut sessions = SessionDocument::default();
        sessions.add_session("prod-admin-session", session("https://iz.example", "admin", "jwt-1"));

        let mut config = ConfigDocument::default();
        config
            .add_profile(
                "prod",
                Profile {
                    tenant: Some("acme".to_string()),
                    session: Some("prod-admin-session".to_string()),
                    ..Profile::default()
                },
            )
            .expect("prod");
        config
            .add_profile(
                "staging",
                Profile {
                    base_url: Some("https://staging.example".to_string()),
                    username: Some("tester".to_string()),
                    ..Profile::default()
                },
            )
            .expect("staging");
        config.set_active_profile("prod").expect("activate");
        (config, sessions)
    }

    #[test]
    fn session_supplies_url_username_and_token() {
        let (config, sessions) = documents();
        let env = Environment::default();
        let resolved = Resolver::new(&config, &sessions, &env)
            .resolve(&Overrides::default())
            .expect("resolve");

        assert_eq!(resolved.profile_name.as_deref(), Some("prod"));
        assert_eq!(resolved.session_name.as_deref(), Some("prod-admin-session"));
        assert_eq!(
            resolved.base_url,
            Some(Setting::new("https://iz.example".to_string(), Source::Session))
        );
        assert_eq!(resolved.username(), Some("admin"));
        assert_eq!(resolved.tenant(), Some("acme"));
        assert_eq!(
            resolved.validate_admin_auth().expect("auth"),
            AdminAuth::Jwt("jwt-1".to_string())
        );
        assert!(resolved.warnings.is_empty());
    }

    #[test]
    fn tenant_precedence_flag_env_profile() {
        let (config, sessions) = documents();
        let env = Environment::from_pairs([(ENV_TENANT, "from-env")]);
        let resolver = Resolver::new(&config, &sessions, &env);

        let flagged = Overrides {
            tenant: Some("from-flag".to_string()),
            ..Overrides::default()
        };
        let resolved = resolver.resolve(&flagged).expect("resolve");
        assert_eq!(resolved.tenant(), Some("from-flag"));

        let resolved = resolver.resolve(&Overrides::default()).expect("resolve");
        assert_eq!(resolved.tenant(), Some("from-env"));

        let bare = Environment::default();
        let resolved = Resolver::new(&config, &sessions, &bare)
            .resolve(&Overrides::default())
            .expect("resolve");
        assert_eq!(
            resolved.tenant,
            Some(Setting::new("acme".to_string(), Source::Profile))
        );
    }

    #[test]
    fn profile_selection_honours_flag_then_env() {
        let (config, sessions) = documents();
        let env = Environment::from_pairs([(ENV_PROFILE, "staging")]);
        let resolver = Resolver::new(&config, &sessions, &env);

        let resolved = resolver.resolve(&Overrides::default()).expect("resolve");
        assert_eq!(resolved.profile_name.as_deref(), Some("staging"));
        assert_eq!(resolved.base_url(), Some("https://staging.example"));
        assert_eq!(resolved.session_name, None);

        let explicit = Overrides {
            profile: Some("prod".to_string()),
            ..Overrides::default()
        };
        let resolved = resolver.resolve(&explicit).expect("resolve");
        assert_eq!(resolved.profile_name.as_deref(), Some("prod"));

        let missing = Overrides {
            profile: Some("ghost".to_string()),
            ..Overrides::default()
        };
        assert!(matches!(
            resolver.resolve(&missing),
            Err(ConfigError::ProfileNotFound { .. })
        ));
    }

    #[test]
    fn flag_url_is_normalised_and_rejected_when_malformed() {
        let (config, sessions) = documents();
        let env = Environment::default();
        let resolver = Resolver::new(&config, &sessions, &env);

        let overrides = Overrides {
            base_url: Some("http://localhost:9000/".to_string()),
            ..Overrides::default()
        };
        let resolved = resolver.resolve(&overrides).expect("resolve");
        assert_eq!(
            resolved.base_url,
            Some(Setting::new("http://localhost:9000".to_string(), Source::Flag))
        );

        let overrides = Overrides {
            base_url: Some("localhost".to_string()),
            ..Overrides::default()
        };
        assert!(matches!(
            resolver.resolve(&overrides),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn explicit_credentials_override_session_with_warning() {
        let (config, sessions) = documents();
        let env = Environment::default();
        let resolver = Resolver::new(&config, &sessions, &env);

        let overrides = Overrides {
            personal_access_token: Some("pat".to_string()),
            ..Overrides::default()
        };
        let resolved = resolver.resolve(&overrides).expect("resolve");
        assert_eq!(
            resolved.validate_admin_auth().expect("auth"),
            AdminAuth::PersonalAccessToken {
                username: "admin".to_string(),
                token: "pat".to_string(),
            }
        );
        assert_eq!(resolved.warnings.len(), 1);

        let overrides = Overrides {
            jwt_token: Some("jwt-flag".to_string()),
            personal_access_token: Some("pat".to_string()),
            ..Overrides::default()
        };
        let resolved = resolver.resolve(&overrides).expect("resolve");
        assert_eq!(
            resolved.validate_admin_auth().expect("auth"),
            AdminAuth::Jwt("jwt-flag".to_string())
        );
        assert!(resolved.warnings[0].contains("--jwt-token"));
    }

    #[test]
    fn validation_helpers_name_the_missing_field() {
        let config = ConfigDocument::default();
        let sessions = SessionDocument::default();
        let env = Environment::default();
        let resolved = Resolver::new(&config, &sessions, &env)
            .resolve(&Overrides::default())
            .expect("resolve");

        let err = resolved.validate().expect_err("no url");
        assert!(err.to_string().contains("base URL"));
        assert!(err.to_string().contains("--url"));
        let err = resolved.validate_tenant().expect_err("no tenant");
        assert!(err.to_string().contains("--tenant"));
        assert!(matches!(
            resolved.validate_admin_auth(),
            Err(ConfigError::MissingAdminAuth)
        ));
    }

    #[test]
    fn settings_fold_flag_env_file_default() {
        let mut config = ConfigDocument {
            timeout: Some(serde_yaml::Value::from(60_u64)),
            verbose: Some(serde_yaml::Value::from("maybe")),
            color: Some("never".to_string()),
            ..ConfigDocument::default()
        };
        let env = Environment::from_pairs([(ENV_OUTPUT_FORMAT, "json")]);
        let sessions = SessionDocument::default();
        let overrides = Overrides {
            verbose: Some(true),
            ..Overrides::default()
        };

        let settings = Resolver::new(&config, &sessions, &env)
            .settings(&overrides)
            .expect("settings");
        assert_eq!(settings.timeout, Setting::new(60, Source::File));
        assert_eq!(settings.output_format, Setting::new(OutputFormat::Json, Source::Env));
        assert_eq!(settings.verbose, Setting::new(true, Source::Flag));
        assert_eq!(settings.color, Setting::new(ColorMode::Never, Source::File));

        config.timeout = Some(serde_yaml::Value::from(0_u64));
        let settings = Resolver::new(&config, &sessions, &Environment::default())
            .settings(&Overrides::default())
            .expect("settings");
        assert_eq!(settings.timeout, Setting::new(30, Source::Default));
        assert_eq!(settings.verbose, Setting::new(false, Source::Default));

        let bad_env = Environment::from_pairs([(ENV_TIMEOUT, "soon")]);
        let err = Resolver::new(&config, &sessions, &bad_env)
            .settings(&Overrides::default())
            .expect_err("bad env");
        assert!(err.to_string().contains(ENV_TIMEOUT));
    }

    #[test]
    fn environment_ignores_blank_values() {
        let env = Environment::from_pairs([(ENV_TENANT, "  "), (ENV_PROJECT, " web ")]);
        assert_eq!(env.get(ENV_TENANT), None);
        assert_eq!(env.get(ENV_PROJECT), Some("web"));
    }
}
