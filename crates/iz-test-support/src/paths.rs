//! Temporary-directory document locations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use iz_config::{ConfigStore, FixedPaths, PathProvider, SessionStore};
use tempfile::TempDir;

/// Config and session documents rooted in a temporary directory that is
/// removed on drop.
#[derive(Debug)]
pub struct TempPaths {
    dir: TempDir,
    config: PathBuf,
    sessions: PathBuf,
}

impl TempPaths {
    /// Create a fresh directory; neither document exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directory cannot be created.
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("iz-test-").tempdir()?;
        let config = dir.path().join("config").join("iz").join("config.yaml");
        let sessions = dir.path().join("home").join(".izsessions");
        Ok(Self {
            dir,
            config,
            sessions,
        })
    }

    /// Root of the temporary directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Config document path.
    #[must_use]
    pub fn config_file(&self) -> &Path {
        &self.config
    }

    /// Session document path.
    #[must_use]
    pub fn sessions_file(&self) -> &Path {
        &self.sessions
    }

    /// Shareable provider for store constructors.
    #[must_use]
    pub fn provider(&self) -> Arc<dyn PathProvider> {
        Arc::new(FixedPaths::new(&self.config, &self.sessions))
    }

    /// Config store over these paths.
    #[must_use]
    pub fn config_store(&self) -> ConfigStore {
        ConfigStore::new(self.provider())
    }

    /// Session store over these paths.
    #[must_use]
    pub fn session_store(&self) -> SessionStore {
        SessionStore::new(self.provider())
    }
}
