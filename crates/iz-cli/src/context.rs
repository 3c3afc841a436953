//! Per-invocation dependencies handed to every command handler.

use std::sync::Arc;

use iz_config::{
    ConfigDocument, ConfigStore, EffectiveSettings, Environment, Overrides, PathProvider,
    ResolvedConfig, Resolver, SessionDocument, SessionStore,
};

use crate::client::CliResult;
use crate::output::{Renderer, print_warnings};

/// Stores, environment snapshot and command-line overrides for one run.
#[derive(Clone)]
pub(crate) struct CliContext {
    pub(crate) config: ConfigStore,
    pub(crate) sessions: SessionStore,
    pub(crate) env: Environment,
    pub(crate) overrides: Overrides,
    pub(crate) force: bool,
}

impl CliContext {
    pub(crate) fn new(
        paths: &Arc<dyn PathProvider>,
        env: Environment,
        overrides: Overrides,
        force: bool,
    ) -> Self {
        Self {
            config: ConfigStore::new(Arc::clone(paths)),
            sessions: SessionStore::new(Arc::clone(paths)),
            env,
            overrides,
            force,
        }
    }

    pub(crate) fn documents(&self) -> CliResult<(ConfigDocument, SessionDocument)> {
        Ok((self.config.load()?, self.sessions.load()?))
    }

    /// Resolve the effective configuration and print any resolution warnings.
    pub(crate) fn resolve(&self) -> CliResult<ResolvedConfig> {
        let (config, sessions) = self.documents()?;
        let resolved = Resolver::new(&config, &sessions, &self.env).resolve(&self.overrides)?;
        print_warnings(&resolved.warnings);
        Ok(resolved)
    }

    pub(crate) fn settings(&self) -> CliResult<EffectiveSettings> {
        let config = self.config.load()?;
        let sessions = SessionDocument::default();
        Ok(Resolver::new(&config, &sessions, &self.env).settings(&self.overrides)?)
    }

    /// Renderer honouring the effective output format and colour policy.
    /// Falls back to the defaults when the settings cannot be resolved.
    pub(crate) fn renderer(&self) -> Renderer {
        self.settings()
            .map(|settings| Renderer::new(settings.output_format.value, settings.color.value))
            .unwrap_or_default()
    }
}
