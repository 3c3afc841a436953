//! File-backed session document store.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::error::ConfigResult;
use crate::model::{Session, SessionDocument};
use crate::paths::PathProvider;
use crate::store::{read_document, write_document};

/// Loads and saves the session document. The file holds bearer tokens and is
/// written owner-readable only.
#[derive(Clone)]
pub struct SessionStore {
    paths: Arc<dyn PathProvider>,
}

impl SessionStore {
    /// Create a store reading and writing at the provider's session path.
    #[must_use]
    pub fn new(paths: Arc<dyn PathProvider>) -> Self {
        Self { paths }
    }

    /// Location of the session document.
    ///
    /// # Errors
    ///
    /// Returns an error when the path cannot be determined.
    pub fn path(&self) -> ConfigResult<PathBuf> {
        self.paths.sessions_file()
    }

    /// Read the document; a missing file yields an empty document.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read or parsed.
    pub fn load(&self) -> ConfigResult<SessionDocument> {
        let path = self.path()?;
        Ok(read_document(&path)?.unwrap_or_default())
    }

    /// Write the whole document.
    ///
    /// # Errors
    ///
    /// Returns an error when serialisation or the write fails.
    pub fn save(&self, doc: &SessionDocument) -> ConfigResult<()> {
        write_document(&self.path()?, doc, true)
    }

    /// Insert or overwrite a session by name and persist it.
    ///
    /// # Errors
    ///
    /// Returns load or write errors.
    pub fn add_session(&self, name: &str, session: Session) -> ConfigResult<()> {
        let mut doc = self.load()?;
        doc.add_session(name, session);
        self.save(&doc)?;
        debug!(session = name, "session stored");
        Ok(())
    }

    /// Look up a session by name.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::SessionNotFound`] when absent, or load errors.
    pub fn get_session(&self, name: &str) -> ConfigResult<Session> {
        self.load()?.get_session(name).cloned()
    }

    /// Names of every stored session for the `(url, username)` identity.
    ///
    /// # Errors
    ///
    /// Returns load errors.
    pub fn find_by_identity(&self, url: &str, username: &str) -> ConfigResult<Vec<String>> {
        Ok(self.load()?.find_by_identity(url, username))
    }

    /// Remove a session by name and persist the change.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::SessionNotFound`] when absent, or IO errors.
    pub fn remove_session(&self, name: &str) -> ConfigResult<Session> {
        let mut doc = self.load()?;
        let removed = doc.remove_session(name)?;
        self.save(&doc)?;
        debug!(session = name, "session removed");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigError;
    use crate::model::AuthMethod;
    use crate::paths::FixedPaths;
    use anyhow::Result;
    use chrono::Utc;
    use tempfile::TempDir;

    fn store() -> Result<(TempDir, SessionStore)> {
        let dir = tempfile::Builder::new().prefix("iz-sessions-").tempdir()?;
        let paths = FixedPaths::new(dir.path().join("config.yaml"), dir.path().join(".izsessions"));
        Ok((dir, SessionStore::new(Arc::new(paths))))
    }

    fn session(url: &str, username: &str) -> Session {
        Session {
            url: url.to_string(),
            username: username.to_string(),
            token: "token".to_string(),
            created_at: Utc::now(),
            auth_method: AuthMethod::Oidc,
        }
    }

    #[test]
    fn missing_document_is_empty() -> Result<()> {
        let (_dir, store) = store()?;
        assert!(store.load()?.is_empty());
        assert!(matches!(
            store.get_session("nope"),
            Err(ConfigError::SessionNotFound { .. })
        ));
        Ok(())
    }

    #[test]
    fn add_overwrites_by_name_and_finds_by_identity() -> Result<()> {
        let (_dir, store) = store()?;
        store.add_session("a", session("http://h:9000", "u"))?;
        store.add_session("b", session("http://h:9000/", "u"))?;
        store.add_session("c", session("http://h:9000", "other"))?;
        store.add_session("a", session("http://h:9000", "u"))?;

        assert_eq!(store.load()?.len(), 3);
        assert_eq!(
            store.find_by_identity("http://h:9000", "u")?,
            vec!["a".to_string(), "b".to_string()]
        );
        assert_eq!(store.get_session("c")?.auth_method, AuthMethod::Oidc);
        Ok(())
    }

    #[test]
    fn remove_session_persists() -> Result<()> {
        let (_dir, store) = store()?;
        store.add_session("a", session("http://h", "u"))?;
        store.remove_session("a")?;
        assert!(store.load()?.is_empty());
        assert!(store.remove_session("a").is_err());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn session_file_is_owner_only() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, store) = store()?;
        store.add_session("a", session("http://h", "u"))?;
        let mode = std::fs::metadata(store.path()?)?.permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        Ok(())
    }
}
