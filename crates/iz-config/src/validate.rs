//! Recognised keys and value parsing for global and profile settings.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::Serialize;
use url::Url;

use crate::error::{ConfigError, ConfigResult};

/// Smallest accepted request timeout in seconds.
pub const MIN_TIMEOUT_SECS: u64 = 1;
/// Largest accepted request timeout in seconds.
pub const MAX_TIMEOUT_SECS: u64 = 3600;

/// Keys stored at the top level of the config document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SettingKey {
    /// HTTP timeout in seconds.
    Timeout,
    /// Default renderer.
    OutputFormat,
    /// Debug logging toggle.
    Verbose,
    /// Colour policy.
    Color,
}

impl SettingKey {
    /// Every global key, in display order.
    pub const ALL: [Self; 4] = [Self::Timeout, Self::OutputFormat, Self::Verbose, Self::Color];

    /// Canonical key name as written in the document.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::OutputFormat => "output-format",
            Self::Verbose => "verbose",
            Self::Color => "color",
        }
    }

    /// Environment variable that overrides the key, if any.
    #[must_use]
    pub const fn env_var(self) -> Option<&'static str> {
        match self {
            Self::Timeout => Some(crate::resolve::ENV_TIMEOUT),
            Self::OutputFormat => Some(crate::resolve::ENV_OUTPUT_FORMAT),
            Self::Verbose | Self::Color => None,
        }
    }

    /// Parse a user supplied key.
    ///
    /// # Errors
    ///
    /// Profile keys are rejected with a redirect to the profile commands and
    /// anything else with the list of accepted keys.
    pub fn parse(raw: &str) -> ConfigResult<Self> {
        let key = normalize_key(raw);
        if let Some(found) = Self::ALL.into_iter().find(|k| k.as_str() == key) {
            return Ok(found);
        }
        if ProfileKey::ALL.iter().any(|k| k.as_str() == key) {
            return Err(ConfigError::ProfileScopedKey { key });
        }
        Err(ConfigError::UnknownKey {
            key: raw.to_string(),
            valid: join_keys(Self::ALL.iter().map(|k| k.as_str())),
        })
    }
}

impl Display for SettingKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Keys stored per profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProfileKey {
    /// Direct server URL.
    BaseUrl,
    /// Default tenant.
    Tenant,
    /// Default project.
    Project,
    /// Linked session name.
    Session,
    /// Username shown for the profile.
    Username,
    /// Client id for feature checks.
    ClientId,
    /// Client secret for feature checks.
    ClientSecret,
}

impl ProfileKey {
    /// Every profile key, in display order.
    pub const ALL: [Self; 7] = [
        Self::BaseUrl,
        Self::Tenant,
        Self::Project,
        Self::Session,
        Self::Username,
        Self::ClientId,
        Self::ClientSecret,
    ];

    /// Canonical key name as written in the document.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BaseUrl => "base-url",
            Self::Tenant => "tenant",
            Self::Project => "project",
            Self::Session => "session",
            Self::Username => "username",
            Self::ClientId => "client-id",
            Self::ClientSecret => "client-secret",
        }
    }

    /// Whether values of this key must be masked when displayed.
    #[must_use]
    pub const fn is_secret(self) -> bool {
        matches!(self, Self::ClientSecret)
    }

    /// Parse a user supplied key.
    ///
    /// # Errors
    ///
    /// Global keys are rejected with a redirect to `iz config set` and anything
    /// else with the list of accepted keys.
    pub fn parse(raw: &str) -> ConfigResult<Self> {
        let key = normalize_key(raw);
        if let Some(found) = Self::ALL.into_iter().find(|k| k.as_str() == key) {
            return Ok(found);
        }
        if SettingKey::ALL.iter().any(|k| k.as_str() == key) {
            return Err(ConfigError::GlobalScopedKey { key });
        }
        Err(ConfigError::UnknownKey {
            key: raw.to_string(),
            valid: join_keys(Self::ALL.iter().map(|k| k.as_str())),
        })
    }
}

impl Display for ProfileKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Renderer selection for structured command output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Aligned plain-text columns.
    #[default]
    Table,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Json => "json",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::invalid_value(
                SettingKey::OutputFormat.as_str(),
                value,
                "must be one of: table, json",
            )),
        }
    }
}

/// Colour policy for terminal output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Colour when attached to a terminal.
    #[default]
    Auto,
    /// Always colour.
    Always,
    /// Never colour.
    Never,
}

impl ColorMode {
    /// Canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Always => "always",
            Self::Never => "never",
        }
    }
}

impl FromStr for ColorMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "always" => Ok(Self::Always),
            "never" => Ok(Self::Never),
            _ => Err(ConfigError::invalid_value(
                SettingKey::Color.as_str(),
                value,
                "must be one of: auto, always, never",
            )),
        }
    }
}

/// Parse a timeout expressed in whole seconds.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] for non-numeric or out of range input.
pub fn parse_timeout(value: &str) -> ConfigResult<u64> {
    let secs = value.trim().parse::<u64>().map_err(|_| {
        ConfigError::invalid_value(
            SettingKey::Timeout.as_str(),
            value,
            "must be a whole number of seconds",
        )
    })?;
    check_timeout(secs)
}

pub(crate) fn check_timeout(secs: u64) -> ConfigResult<u64> {
    if (MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS).contains(&secs) {
        Ok(secs)
    } else {
        Err(ConfigError::invalid_value(
            SettingKey::Timeout.as_str(),
            secs.to_string(),
            format!("must be between {MIN_TIMEOUT_SECS} and {MAX_TIMEOUT_SECS}"),
        ))
    }
}

/// Parse a boolean flag value (`true/false`, `yes/no`, `1/0`, `on/off`).
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] for anything else.
pub fn parse_bool(key: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(ConfigError::invalid_value(key, value, "must be true or false")),
    }
}

/// Canonical string form of a server URL.
///
/// The URL must be absolute `http`/`https` with a host; a trailing `/` is
/// dropped so `https://h/` and `https://h` compare equal.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] when the input is not such a URL.
pub fn normalize_url(value: &str) -> ConfigResult<String> {
    let trimmed = value.trim();
    let parsed = Url::parse(trimmed).map_err(|err| {
        ConfigError::invalid_value(ProfileKey::BaseUrl.as_str(), value, err.to_string())
    })?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ConfigError::invalid_value(
            ProfileKey::BaseUrl.as_str(),
            value,
            "must be an absolute http(s) URL",
        ));
    }
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

/// Whether the input parses as an absolute `http`/`https` URL.
#[must_use]
pub fn looks_like_url(value: &str) -> bool {
    normalize_url(value).is_ok()
}

/// Compare two server URLs after normalisation.
#[must_use]
pub fn same_url(left: &str, right: &str) -> bool {
    match (normalize_url(left), normalize_url(right)) {
        (Ok(left), Ok(right)) => left == right,
        _ => left.trim().trim_end_matches('/') == right.trim().trim_end_matches('/'),
    }
}

/// Profile names are used in session names and file keys.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] for empty names or names containing
/// whitespace or path separators.
pub fn validate_profile_name(name: &str) -> ConfigResult<&str> {
    if name.is_empty() {
        return Err(ConfigError::invalid_value("profile", name, "must not be empty"));
    }
    if name
        .chars()
        .any(|ch| ch.is_whitespace() || ch == '/' || ch == '\\')
    {
        return Err(ConfigError::invalid_value(
            "profile",
            name,
            "must not contain whitespace or path separators",
        ));
    }
    Ok(name)
}

fn normalize_key(raw: &str) -> String {
    raw.trim().to_ascii_lowercase().replace('_', "-")
}

fn join_keys<'a>(keys: impl Iterator<Item = &'a str>) -> String {
    keys.collect::<Vec<_>>().join(", ")
}
