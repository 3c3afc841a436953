//! File-backed config document store.
//!
//! Every mutating operation reads the whole document, applies the change in
//! memory and writes the whole document back. There is no inter-process
//! locking: two concurrent invocations can race and the later write wins.

use std::fmt::{self, Display, Formatter};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{ConfigDocument, Profile};
use crate::paths::PathProvider;
use crate::resolve::{Environment, Source};
use crate::validate::SettingKey;

/// Loads, saves and edits the config document.
#[derive(Clone)]
pub struct ConfigStore {
    paths: Arc<dyn PathProvider>,
}

/// Result of looking up a global setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingLookup {
    /// Key that was looked up.
    pub key: SettingKey,
    /// Value and where it came from, if set anywhere.
    pub value: Option<(String, Source)>,
}

impl Display for SettingLookup {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some((value, source)) => write!(formatter, "{value} (source: {source})"),
            None => formatter.write_str("(not set)"),
        }
    }
}

impl ConfigStore {
    /// Create a store reading and writing at the provider's config path.
    #[must_use]
    pub fn new(paths: Arc<dyn PathProvider>) -> Self {
        Self { paths }
    }

    /// Location of the config document.
    ///
    /// # Errors
    ///
    /// Returns an error when the path cannot be determined.
    pub fn path(&self) -> ConfigResult<PathBuf> {
        self.paths.config_file()
    }

    /// Whether a config document exists on disk.
    ///
    /// # Errors
    ///
    /// Returns an error when the path cannot be determined.
    pub fn exists(&self) -> ConfigResult<bool> {
        Ok(self.path()?.is_file())
    }

    /// Read the document; a missing file yields an empty document.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read or parsed.
    pub fn load(&self) -> ConfigResult<ConfigDocument> {
        let path = self.path()?;
        Ok(read_document(&path)?.unwrap_or_default())
    }

    /// Write the whole document.
    ///
    /// # Errors
    ///
    /// Returns an error when serialisation or the write fails.
    pub fn save(&self, doc: &ConfigDocument) -> ConfigResult<()> {
        write_document(&self.path()?, doc, false)
    }

    /// Create a new document, optionally populated with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::AlreadyExists`] when a document is present.
    pub fn init(&self, with_defaults: bool) -> ConfigResult<ConfigDocument> {
        let path = self.path()?;
        if path.exists() {
            return Err(ConfigError::AlreadyExists { path });
        }
        let doc = if with_defaults {
            ConfigDocument::with_defaults()
        } else {
            ConfigDocument::default()
        };
        write_document(&path, &doc, false)?;
        Ok(doc)
    }

    /// Assign a global setting.
    ///
    /// # Errors
    ///
    /// Rejects unknown and profile-scoped keys and invalid values; returns IO
    /// errors from the write.
    pub fn set(&self, key: &str, value: &str) -> ConfigResult<SettingKey> {
        let key = SettingKey::parse(key)?;
        let mut doc = self.load()?;
        doc.set_setting(key, value)?;
        self.save(&doc)?;
        debug!(key = key.as_str(), "global setting updated");
        Ok(key)
    }

    /// Remove a global setting from the file.
    ///
    /// # Errors
    ///
    /// Rejects unknown and profile-scoped keys; returns IO errors from the write.
    pub fn unset(&self, key: &str) -> ConfigResult<SettingKey> {
        let key = SettingKey::parse(key)?;
        let mut doc = self.load()?;
        doc.unset_setting(key);
        self.save(&doc)?;
        debug!(key = key.as_str(), "global setting cleared");
        Ok(key)
    }

    /// Look up a global setting, reporting whether it came from the
    /// environment or the file.
    ///
    /// # Errors
    ///
    /// Rejects unknown and profile-scoped keys; returns load errors.
    pub fn get(&self, key: &str, env: &Environment) -> ConfigResult<SettingLookup> {
        let key = SettingKey::parse(key)?;
        let from_env = key
            .env_var()
            .and_then(|var| env.get(var))
            .map(|value| (value.to_string(), Source::Env));
        let value = match from_env {
            Some(found) => Some(found),
            None => self
                .load()?
                .setting(key)
                .map(|value| (value, Source::File)),
        };
        Ok(SettingLookup { key, value })
    }

    /// Validate the stored document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] listing every violation, or load errors.
    pub fn validate(&self) -> ConfigResult<()> {
        self.load()?.validate()
    }

    /// Restore the default global settings, keeping profiles.
    ///
    /// # Errors
    ///
    /// Returns load or write errors.
    pub fn reset(&self) -> ConfigResult<ConfigDocument> {
        let mut doc = self.load()?;
        doc.apply_default_settings();
        self.save(&doc)?;
        Ok(doc)
    }

    /// Create a profile; the first profile ever created becomes active.
    /// Returns whether the new profile was activated.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ProfileExists`] for duplicates, or IO errors.
    pub fn add_profile(&self, name: &str, profile: Profile, activate: bool) -> ConfigResult<bool> {
        let mut doc = self.load()?;
        if doc.profiles.contains_key(name) {
            return Err(ConfigError::ProfileExists {
                name: name.to_string(),
            });
        }
        let activate = activate || doc.active_profile_name().is_none();
        doc.add_profile(name, profile)?;
        if activate {
            doc.set_active_profile(name)?;
        }
        self.save(&doc)?;
        Ok(activate)
    }

    /// Select the active profile.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ProfileNotFound`] or IO errors.
    pub fn set_active_profile(&self, name: &str) -> ConfigResult<()> {
        let mut doc = self.load()?;
        doc.set_active_profile(name)?;
        self.save(&doc)
    }

    /// Name of the active profile, if one is selected.
    ///
    /// # Errors
    ///
    /// Returns load errors.
    pub fn active_profile_name(&self) -> ConfigResult<Option<String>> {
        Ok(self.load()?.active_profile_name().map(str::to_string))
    }
}

pub(crate) fn read_document<T: DeserializeOwned>(path: &Path) -> ConfigResult<Option<T>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "document absent, using empty document");
            return Ok(None);
        }
        Err(err) => return Err(ConfigError::io("read", path, err)),
    };
    if raw.trim().is_empty() {
        return Ok(None);
    }
    serde_yaml::from_str(&raw)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

/// Write through a temp file in the target directory and persist it over the
/// target so a crash never leaves a half-written document behind.
pub(crate) fn write_document<T: Serialize>(
    path: &Path,
    doc: &T,
    private: bool,
) -> ConfigResult<()> {
    let serialized = serde_yaml::to_string(doc).map_err(|source| ConfigError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;

    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|err| ConfigError::io("create directory", parent, err))?;

    let mut staging =
        NamedTempFile::new_in(parent).map_err(|err| ConfigError::io("create temp file in", parent, err))?;
    staging
        .write_all(serialized.as_bytes())
        .and_then(|()| set_mode(staging.as_file(), private))
        .and_then(|()| staging.as_file().sync_all())
        .map_err(|err| ConfigError::io("write", staging.path(), err))?;

    staging
        .persist(path)
        .map_err(|err| ConfigError::io("replace", path, err.error))?;
    debug!(path = %path.display(), "document written");
    Ok(())
}

#[cfg(unix)]
fn set_mode(file: &File, private: bool) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mode = if private { 0o600 } else { 0o644 };
    file.set_permissions(fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_file: &File, _private: bool) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::FixedPaths;
    use anyhow::Result;
    use tempfile::TempDir;

    fn store() -> Result<(TempDir, ConfigStore)> {
        let dir = tempfile::Builder::new().prefix("iz-config-").tempdir()?;
        let paths = FixedPaths::new(
            dir.path().join("iz").join("config.yaml"),
            dir.path().join(".izsessions"),
        );
        Ok((dir, ConfigStore::new(Arc::new(paths))))
    }

    #[test]
    fn load_missing_file_returns_empty_document() -> Result<()> {
        let (_dir, store) = store()?;
        let doc = store.load()?;
        assert!(doc.profiles.is_empty());
        assert_eq!(doc.active_profile_name(), None);
        assert!(!store.exists()?);
        Ok(())
    }

    #[test]
    fn init_refuses_to_overwrite() -> Result<()> {
        let (_dir, store) = store()?;
        let doc = store.init(true)?;
        assert_eq!(doc.timeout_secs().transpose()?, Some(30));
        assert!(matches!(
            store.init(false),
            Err(ConfigError::AlreadyExists { .. })
        ));
        Ok(())
    }

    #[test]
    fn set_get_unset_round_trip_reports_source() -> Result<()> {
        let (_dir, store) = store()?;
        let env = Environment::default();

        store.set("timeout", "45")?;
        let lookup = store.get("timeout", &env)?;
        assert_eq!(lookup.value, Some(("45".to_string(), Source::File)));
        assert_eq!(lookup.to_string(), "45 (source: file)");

        store.unset("timeout")?;
        assert_eq!(store.get("timeout", &env)?.to_string(), "(not set)");
        Ok(())
    }

    #[test]
    fn get_reports_environment_override() -> Result<()> {
        let (_dir, store) = store()?;
        store.set("output-format", "table")?;
        let env = Environment::from_pairs([("IZ_OUTPUT_FORMAT", "json")]);
        let lookup = store.get("output-format", &env)?;
        assert_eq!(lookup.value, Some(("json".to_string(), Source::Env)));
        Ok(())
    }

    #[test]
    fn set_rejects_profile_keys_without_writing() -> Result<()> {
        let (_dir, store) = store()?;
        let err = store.set("base-url", "http://localhost:9000").unwrap_err();
        assert!(matches!(err, ConfigError::ProfileScopedKey { .. }));
        assert!(err.to_string().contains("iz profiles set"));
        assert!(!store.exists()?);
        Ok(())
    }

    #[test]
    fn save_replaces_whole_document_without_temp_leftovers() -> Result<()> {
        let (dir, store) = store()?;
        store.set("color", "never")?;
        store.set("verbose", "true")?;
        let raw = fs::read_to_string(store.path()?)?;
        assert!(raw.contains("color: never"));
        assert!(raw.contains("verbose: true"));
        let entries: Vec<_> = fs::read_dir(dir.path().join("iz"))?
            .map(|entry| entry.map(|entry| entry.file_name()))
            .collect::<io::Result<_>>()?;
        assert_eq!(entries, vec![std::ffi::OsString::from("config.yaml")]);
        Ok(())
    }

    #[test]
    fn failed_replace_keeps_previous_document() -> Result<()> {
        let (dir, store) = store()?;
        store.set("color", "never")?;
        let blocked = FixedPaths::new(dir.path().join("iz"), dir.path().join(".izsessions"));
        let err = write_document(&blocked.config_file()?, &ConfigDocument::default(), false)
            .expect_err("target is a directory");
        assert!(matches!(err, ConfigError::Io { operation: "replace", .. }));
        assert!(fs::read_to_string(store.path()?)?.contains("color: never"));
        Ok(())
    }

    #[test]
    fn first_profile_becomes_active() -> Result<()> {
        let (_dir, store) = store()?;
        assert!(store.add_profile("dev", Profile::default(), false)?);
        assert!(!store.add_profile("prod", Profile::default(), false)?);
        assert_eq!(store.active_profile_name()?.as_deref(), Some("dev"));
        assert!(matches!(
            store.add_profile("dev", Profile::default(), false),
            Err(ConfigError::ProfileExists { .. })
        ));
        store.set_active_profile("prod")?;
        assert_eq!(store.active_profile_name()?.as_deref(), Some("prod"));
        Ok(())
    }

    #[test]
    fn reset_keeps_profiles() -> Result<()> {
        let (_dir, store) = store()?;
        store.add_profile("dev", Profile::default(), false)?;
        store.set("timeout", "90")?;
        let doc = store.reset()?;
        assert_eq!(doc.timeout_secs().transpose()?, Some(30));
        assert!(store.load()?.profiles.contains_key("dev"));
        Ok(())
    }

    #[test]
    fn malformed_document_is_a_parse_error() -> Result<()> {
        let (_dir, store) = store()?;
        let path = store.path()?;
        fs::create_dir_all(path.parent().expect("parent"))?;
        fs::write(&path, "profiles: [unterminated")?;
        assert!(matches!(store.load(), Err(ConfigError::Parse { .. })));
        Ok(())
    }
}
