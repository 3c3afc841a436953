//! Filesystem locations of the config and session documents.
//!
//! Stores receive a [`PathProvider`] at construction so tests can point them
//! at a temporary directory without touching process-wide state.

use std::path::PathBuf;

use crate::error::{ConfigError, ConfigResult};
use crate::resolve::Environment;

/// Directory name below the per-user config directory.
pub const APP_DIR: &str = "iz";
/// File name of the config document.
pub const CONFIG_FILE: &str = "config.yaml";
/// File name of the session document, placed in the home directory.
pub const SESSIONS_FILE: &str = ".izsessions";

/// Environment variable overriding the config document path.
pub const ENV_CONFIG_FILE: &str = "IZ_CONFIG_FILE";
/// Environment variable overriding the session document path.
pub const ENV_SESSIONS_FILE: &str = "IZ_SESSIONS_FILE";

/// Resolves where the persisted documents live.
pub trait PathProvider: Send + Sync {
    /// Path of the config document.
    ///
    /// # Errors
    ///
    /// Returns an error when no suitable directory can be determined.
    fn config_file(&self) -> ConfigResult<PathBuf>;

    /// Path of the session document.
    ///
    /// # Errors
    ///
    /// Returns an error when no suitable directory can be determined.
    fn sessions_file(&self) -> ConfigResult<PathBuf>;
}

/// Production provider backed by the OS per-user directories.
#[derive(Debug, Clone, Default)]
pub struct OsPaths {
    config_override: Option<PathBuf>,
    sessions_override: Option<PathBuf>,
}

impl OsPaths {
    /// Build a provider honouring `IZ_CONFIG_FILE` / `IZ_SESSIONS_FILE`.
    #[must_use]
    pub fn from_env(env: &Environment) -> Self {
        Self {
            config_override: env.get(ENV_CONFIG_FILE).map(PathBuf::from),
            sessions_override: env.get(ENV_SESSIONS_FILE).map(PathBuf::from),
        }
    }
}

impl PathProvider for OsPaths {
    fn config_file(&self) -> ConfigResult<PathBuf> {
        if let Some(path) = &self.config_override {
            return Ok(path.clone());
        }
        let dir = dirs::config_dir().ok_or(ConfigError::NoDirectory { kind: "config" })?;
        Ok(dir.join(APP_DIR).join(CONFIG_FILE))
    }

    fn sessions_file(&self) -> ConfigResult<PathBuf> {
        if let Some(path) = &self.sessions_override {
            return Ok(path.clone());
        }
        let home = dirs::home_dir().ok_or(ConfigError::NoDirectory { kind: "home" })?;
        Ok(home.join(SESSIONS_FILE))
    }
}

/// Provider returning fixed paths, used by tests and embedding callers.
#[derive(Debug, Clone)]
pub struct FixedPaths {
    config: PathBuf,
    sessions: PathBuf,
}

impl FixedPaths {
    /// Use the given document paths verbatim.
    #[must_use]
    pub fn new(config: impl Into<PathBuf>, sessions: impl Into<PathBuf>) -> Self {
        Self {
            config: config.into(),
            sessions: sessions.into(),
        }
    }
}

impl PathProvider for FixedPaths {
    fn config_file(&self) -> ConfigResult<PathBuf> {
        Ok(self.config.clone())
    }

    fn sessions_file(&self) -> ConfigResult<PathBuf> {
        Ok(self.sessions.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_paths_prefer_environment_overrides() {
        let env = Environment::from_pairs([
            (ENV_CONFIG_FILE, "/tmp/iz/custom.yaml"),
            (ENV_SESSIONS_FILE, "/tmp/iz/sessions.yaml"),
        ]);
        let paths = OsPaths::from_env(&env);
        assert_eq!(
            paths.config_file().expect("config path"),
            PathBuf::from("/tmp/iz/custom.yaml")
        );
        assert_eq!(
            paths.sessions_file().expect("sessions path"),
            PathBuf::from("/tmp/iz/sessions.yaml")
        );
    }

    #[test]
    fn os_paths_keep_sessions_outside_config_dir() {
        let paths = OsPaths::default();
        if let (Ok(config), Ok(sessions)) = (paths.config_file(), paths.sessions_file()) {
            assert!(config.ends_with("iz/config.yaml"));
            let config_dir = config.parent().expect("config dir");
            assert!(!sessions.starts_with(config_dir));
        }
    }
}
