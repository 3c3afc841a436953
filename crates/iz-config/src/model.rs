//! Persisted documents: profiles, sessions and global settings.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::defaults::{DEFAULT_COLOR, DEFAULT_OUTPUT_FORMAT, DEFAULT_TIMEOUT_SECS, DEFAULT_VERBOSE};
use crate::error::{ConfigError, ConfigResult, Violation};
use crate::validate::{
    ColorMode, OutputFormat, ProfileKey, SettingKey, normalize_url, parse_bool, parse_timeout,
    same_url, validate_profile_name,
};

/// How a session was authenticated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// Username and password against the login endpoint.
    #[default]
    Password,
    /// Token obtained through the identity provider.
    Oidc,
}

impl AuthMethod {
    /// Canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::Oidc => "oidc",
        }
    }
}

/// Named authentication record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Server the token was issued by.
    pub url: String,
    /// Authenticated user.
    pub username: String,
    /// Bearer token.
    pub token: String,
    /// When the token was obtained.
    pub created_at: DateTime<Utc>,
    /// Sessions written before the field existed are password sessions.
    #[serde(default)]
    pub auth_method: AuthMethod,
}

impl Session {
    /// Whether the session belongs to the `(url, username)` identity.
    #[must_use]
    pub fn matches_identity(&self, url: &str, username: &str) -> bool {
        self.username == username && same_url(&self.url, url)
    }
}

/// Named bundle of connection defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Profile {
    /// Direct server URL; takes priority over the session URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Default tenant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
    /// Default project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    /// Name of the linked session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    /// Username of the linked identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Client id used by non-interactive feature checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Client secret used by non-interactive feature checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

impl Profile {
    /// The profile's own URL, else the URL of its linked session.
    #[must_use]
    pub fn effective_url(&self, sessions: &SessionDocument) -> Option<String> {
        if let Some(url) = &self.base_url {
            return Some(url.clone());
        }
        self.linked_session(sessions).map(|session| session.url.clone())
    }

    /// The linked session, when the reference resolves.
    #[must_use]
    pub fn linked_session<'a>(&self, sessions: &'a SessionDocument) -> Option<&'a Session> {
        self.session
            .as_deref()
            .and_then(|name| sessions.sessions.get(name))
    }

    /// Read a single key.
    #[must_use]
    pub fn get(&self, key: ProfileKey) -> Option<&str> {
        self.slot(key).as_deref()
    }

    /// Assign a single key, validating URLs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for malformed URLs or empty values.
    pub fn set(&mut self, key: ProfileKey, value: &str) -> ConfigResult<()> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::invalid_value(
                key.as_str(),
                value,
                "must not be empty (use unset to clear it)",
            ));
        }
        let stored = match key {
            ProfileKey::BaseUrl => normalize_url(trimmed)?,
            _ => trimmed.to_string(),
        };
        *self.slot_mut(key) = Some(stored);
        Ok(())
    }

    /// Clear a single key.
    pub fn unset(&mut self, key: ProfileKey) {
        *self.slot_mut(key) = None;
    }

    const fn slot(&self, key: ProfileKey) -> &Option<String> {
        match key {
            ProfileKey::BaseUrl => &self.base_url,
            ProfileKey::Tenant => &self.tenant,
            ProfileKey::Project => &self.project,
            ProfileKey::Session => &self.session,
            ProfileKey::Username => &self.username,
            ProfileKey::ClientId => &self.client_id,
            ProfileKey::ClientSecret => &self.client_secret,
        }
    }

    const fn slot_mut(&mut self, key: ProfileKey) -> &mut Option<String> {
        match key {
            ProfileKey::BaseUrl => &mut self.base_url,
            ProfileKey::Tenant => &mut self.tenant,
            ProfileKey::Project => &mut self.project,
            ProfileKey::Session => &mut self.session,
            ProfileKey::Username => &mut self.username,
            ProfileKey::ClientId => &mut self.client_id,
            ProfileKey::ClientSecret => &mut self.client_secret,
        }
    }
}

/// Persisted config document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConfigDocument {
    /// Name of the selected profile; empty when none is selected.
    #[serde(
        default,
        rename = "active_profile",
        skip_serializing_if = "String::is_empty"
    )]
    pub active_profile: String,
    /// HTTP timeout in seconds, kept as written so a value of the wrong
    /// type is reported by validation instead of failing the parse.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Value>,
    /// Default renderer, kept verbatim so validation can report bad values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,
    /// Debug logging toggle, kept as written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbose: Option<Value>,
    /// Colour policy, kept verbatim so validation can report bad values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Profiles keyed by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub profiles: BTreeMap<String, Profile>,
}

impl ConfigDocument {
    /// Document populated with the built-in global defaults.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut doc = Self::default();
        doc.apply_default_settings();
        doc
    }

    /// Overwrite every global setting with its default; profiles are kept.
    pub fn apply_default_settings(&mut self) {
        self.timeout = Some(Value::from(DEFAULT_TIMEOUT_SECS));
        self.output_format = Some(DEFAULT_OUTPUT_FORMAT.as_str().to_string());
        self.verbose = Some(Value::Bool(DEFAULT_VERBOSE));
        self.color = Some(DEFAULT_COLOR.as_str().to_string());
    }

    /// Value of a global setting as stored in the file.
    #[must_use]
    pub fn setting(&self, key: SettingKey) -> Option<String> {
        match key {
            SettingKey::Timeout => self.timeout.as_ref().map(scalar_text),
            SettingKey::OutputFormat => self.output_format.clone(),
            SettingKey::Verbose => self.verbose.as_ref().map(scalar_text),
            SettingKey::Color => self.color.clone(),
        }
    }

    /// Stored timeout, if any, checked against the accepted range.
    #[must_use]
    pub fn timeout_secs(&self) -> Option<ConfigResult<u64>> {
        self.timeout
            .as_ref()
            .map(|raw| parse_timeout(&scalar_text(raw)))
    }

    /// Stored verbose flag, if any.
    #[must_use]
    pub fn verbose_flag(&self) -> Option<ConfigResult<bool>> {
        self.verbose
            .as_ref()
            .map(|raw| parse_bool(SettingKey::Verbose.as_str(), &scalar_text(raw)))
    }

    /// Validate and store a global setting.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when the value is outside the
    /// allowed set for the key.
    pub fn set_setting(&mut self, key: SettingKey, value: &str) -> ConfigResult<()> {
        match key {
            SettingKey::Timeout => self.timeout = Some(Value::from(parse_timeout(value)?)),
            SettingKey::OutputFormat => {
                let format: OutputFormat = value.parse()?;
                self.output_format = Some(format.as_str().to_string());
            }
            SettingKey::Verbose => {
                self.verbose = Some(Value::Bool(parse_bool(key.as_str(), value)?));
            }
            SettingKey::Color => {
                let mode: ColorMode = value.parse()?;
                self.color = Some(mode.as_str().to_string());
            }
        }
        Ok(())
    }

    /// Remove a global setting from the file.
    pub fn unset_setting(&mut self, key: SettingKey) {
        match key {
            SettingKey::Timeout => self.timeout = None,
            SettingKey::OutputFormat => self.output_format = None,
            SettingKey::Verbose => self.verbose = None,
            SettingKey::Color => self.color = None,
        }
    }

    /// Check every global setting and profile, collecting all violations.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] listing each violation found.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut violations = Vec::new();

        if let Some(Err(err)) = self.timeout_secs() {
            let raw = self.setting(SettingKey::Timeout).unwrap_or_default();
            violations.push(violation(SettingKey::Timeout.as_str(), &raw, &err));
        }
        if let Some(format) = &self.output_format
            && let Err(err) = format.parse::<OutputFormat>()
        {
            violations.push(violation(SettingKey::OutputFormat.as_str(), format, &err));
        }
        if let Some(Err(err)) = self.verbose_flag() {
            let raw = self.setting(SettingKey::Verbose).unwrap_or_default();
            violations.push(violation(SettingKey::Verbose.as_str(), &raw, &err));
        }
        if let Some(color) = &self.color
            && let Err(err) = color.parse::<ColorMode>()
        {
            violations.push(violation(SettingKey::Color.as_str(), color, &err));
        }
        if !self.active_profile.is_empty() && !self.profiles.contains_key(&self.active_profile) {
            violations.push(Violation {
                key: "active_profile".to_string(),
                value: self.active_profile.clone(),
                reason: "does not match any profile".to_string(),
            });
        }
        for (name, profile) in &self.profiles {
            if let Err(err) = validate_profile_name(name) {
                violations.push(violation("profiles", name, &err));
            }
            if let Some(url) = &profile.base_url
                && let Err(err) = normalize_url(url)
            {
                violations.push(violation(&format!("profiles.{name}.base-url"), url, &err));
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid { violations })
        }
    }

    /// Profiles in name order.
    pub fn list_profiles(&self) -> impl Iterator<Item = (&str, &Profile)> {
        self.profiles
            .iter()
            .map(|(name, profile)| (name.as_str(), profile))
    }

    /// Look up a profile by name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ProfileNotFound`] when absent.
    pub fn get_profile(&self, name: &str) -> ConfigResult<&Profile> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound {
                name: name.to_string(),
            })
    }

    /// Mutable lookup of a profile by name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ProfileNotFound`] when absent.
    pub fn get_profile_mut(&mut self, name: &str) -> ConfigResult<&mut Profile> {
        self.profiles
            .get_mut(name)
            .ok_or_else(|| ConfigError::ProfileNotFound {
                name: name.to_string(),
            })
    }

    /// Insert or replace a profile.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for unusable names.
    pub fn add_profile(&mut self, name: &str, profile: Profile) -> ConfigResult<()> {
        validate_profile_name(name)?;
        self.profiles.insert(name.to_string(), profile);
        Ok(())
    }

    /// Remove a profile, clearing the active marker when it pointed there.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ProfileNotFound`] when absent.
    pub fn remove_profile(&mut self, name: &str) -> ConfigResult<Profile> {
        let removed = self
            .profiles
            .remove(name)
            .ok_or_else(|| ConfigError::ProfileNotFound {
                name: name.to_string(),
            })?;
        if self.active_profile == name {
            self.active_profile.clear();
        }
        Ok(removed)
    }

    /// Select the active profile.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ProfileNotFound`] when absent.
    pub fn set_active_profile(&mut self, name: &str) -> ConfigResult<()> {
        if !self.profiles.contains_key(name) {
            return Err(ConfigError::ProfileNotFound {
                name: name.to_string(),
            });
        }
        self.active_profile = name.to_string();
        Ok(())
    }

    /// Name of the active profile when it refers to an existing profile.
    #[must_use]
    pub fn active_profile_name(&self) -> Option<&str> {
        if self.active_profile.is_empty() || !self.profiles.contains_key(&self.active_profile) {
            None
        } else {
            Some(self.active_profile.as_str())
        }
    }

    /// The active profile with its name.
    #[must_use]
    pub fn active_profile(&self) -> Option<(&str, &Profile)> {
        let name = self.active_profile_name()?;
        self.profiles.get(name).map(|profile| (name, profile))
    }

    /// First profile whose effective URL equals `url`, preferring the active
    /// profile when it matches.
    #[must_use]
    pub fn find_profile_by_base_url(&self, url: &str, sessions: &SessionDocument) -> Option<&str> {
        let matches = |profile: &Profile| {
            profile
                .effective_url(sessions)
                .is_some_and(|effective| same_url(&effective, url))
        };
        if let Some((name, profile)) = self.active_profile()
            && matches(profile)
        {
            return Some(name);
        }
        self.profiles
            .iter()
            .find(|&(_, profile)| matches(profile))
            .map(|(name, _)| name.as_str())
    }

    /// Whether any profile other than `except` links to `session`.
    #[must_use]
    pub fn session_referenced_elsewhere(&self, session: &str, except: &str) -> bool {
        self.profiles
            .iter()
            .any(|(name, profile)| name != except && profile.session.as_deref() == Some(session))
    }

    /// Clear every profile link to `session`, returning the affected profiles.
    pub fn unlink_session(&mut self, session: &str) -> Vec<String> {
        let mut unlinked = Vec::new();
        for (name, profile) in &mut self.profiles {
            if profile.session.as_deref() == Some(session) {
                profile.session = None;
                unlinked.push(name.clone());
            }
        }
        unlinked
    }
}

/// Persisted session document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionDocument {
    /// Sessions keyed by name.
    pub sessions: BTreeMap<String, Session>,
}

impl SessionDocument {
    /// Insert or overwrite a session by name.
    pub fn add_session(&mut self, name: &str, session: Session) {
        self.sessions.insert(name.to_string(), session);
    }

    /// Look up a session by name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SessionNotFound`] when absent.
    pub fn get_session(&self, name: &str) -> ConfigResult<&Session> {
        self.sessions
            .get(name)
            .ok_or_else(|| ConfigError::SessionNotFound {
                name: name.to_string(),
            })
    }

    /// Remove a session by name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SessionNotFound`] when absent.
    pub fn remove_session(&mut self, name: &str) -> ConfigResult<Session> {
        self.sessions
            .remove(name)
            .ok_or_else(|| ConfigError::SessionNotFound {
                name: name.to_string(),
            })
    }

    /// Names of every session for the `(url, username)` identity.
    #[must_use]
    pub fn find_by_identity(&self, url: &str, username: &str) -> Vec<String> {
        self.sessions
            .iter()
            .filter(|(_, session)| session.matches_identity(url, username))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Replace the token on every session of the identity in place and return
    /// the refreshed names. Other sessions are left untouched.
    pub fn refresh_identity(
        &mut self,
        url: &str,
        username: &str,
        token: &str,
        created_at: DateTime<Utc>,
        auth_method: AuthMethod,
    ) -> Vec<String> {
        let mut refreshed = Vec::new();
        for (name, session) in &mut self.sessions {
            if session.matches_identity(url, username) {
                session.token = token.to_string();
                session.created_at = created_at;
                session.auth_method = auth_method;
                refreshed.push(name.clone());
            }
        }
        refreshed
    }

    /// Number of stored sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sessions are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

fn violation(key: &str, value: &str, err: &ConfigError) -> Violation {
    let reason = match err {
        ConfigError::InvalidValue { reason, .. } => reason.clone(),
        other => other.to_string(),
    };
    Violation {
        key: key.to_string(),
        value: value.to_string(),
        reason,
    }
}

/// Text of a stored scalar as the user would have written it.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        other => serde_yaml::to_string(other)
            .map_or_else(|_| String::new(), |text| text.trim_end().to_string()),
    }
}
