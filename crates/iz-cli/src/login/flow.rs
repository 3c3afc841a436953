//! Login state machine.
//!
//! `ResolveTarget -> Authenticate -> DetermineProfile -> PersistSession ->
//! LinkProfile`. Nothing is written before `PersistSession`; a failure to
//! update the profile afterwards is downgraded to a warning because the
//! stored session is already usable.

use anyhow::Context;
use chrono::Utc;
use iz_config::{AuthMethod, ConfigDocument, Profile, Resolver, Session, SessionDocument};
use serde::Serialize;
use tracing::{debug, info};

use crate::client::{ApiClient, CliError, CliResult};
use crate::context::CliContext;
use crate::login::oidc::{BrowserOpener, PendingOidcLogin, open_browser};
use crate::login::profile::{ProfileChoice, determine_profile_name};
use crate::login::target::{LoginTarget, resolve_target};
use crate::prompt::Prompt;

/// Inputs of one login.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct LoginRequest {
    pub(crate) first: Option<String>,
    pub(crate) second: Option<String>,
    pub(crate) password: Option<String>,
    pub(crate) session_name: Option<String>,
    pub(crate) oidc: bool,
    pub(crate) token: Option<String>,
    pub(crate) no_browser: bool,
}

/// What a successful login changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct LoginOutcome {
    pub(crate) url: String,
    pub(crate) username: String,
    pub(crate) method: AuthMethod,
    pub(crate) profile: String,
    pub(crate) session: String,
    pub(crate) profile_created: bool,
    pub(crate) activated: bool,
    /// Other sessions of the same identity whose token was refreshed.
    pub(crate) refreshed: Vec<String>,
    /// Previous session of the profile replaced by the canonical one.
    pub(crate) removed: Option<String>,
    #[serde(skip)]
    pub(crate) warnings: Vec<String>,
}

struct Credential {
    url: String,
    username: String,
    token: String,
    method: AuthMethod,
}

/// Drives one login against the stores held by the context.
pub(crate) struct LoginFlow<'a> {
    ctx: &'a CliContext,
    prompt: &'a mut dyn Prompt,
    open_browser: BrowserOpener,
}

impl<'a> LoginFlow<'a> {
    pub(crate) fn new(ctx: &'a CliContext, prompt: &'a mut dyn Prompt) -> Self {
        Self {
            ctx,
            prompt,
            open_browser,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_browser(self, open_browser: BrowserOpener) -> Self {
        Self {
            open_browser,
            ..self
        }
    }

    pub(crate) async fn run(mut self, request: LoginRequest) -> CliResult<LoginOutcome> {
        let (mut config, mut sessions) = self.ctx.documents()?;
        let resolved =
            Resolver::new(&config, &sessions, &self.ctx.env).resolve(&self.ctx.overrides)?;

        let oidc_requested = request.oidc || request.token.is_some();
        let target = resolve_target(
            request.first.as_deref(),
            request.second.as_deref(),
            &resolved,
            oidc_requested,
        )?;
        let use_oidc = oidc_requested
            || (request.password.is_none()
                && previous_method(&sessions, &target) == Some(AuthMethod::Oidc));
        if use_oidc && !oidc_requested {
            info!(url = %target.url, "previous session used OIDC; continuing with OIDC");
        }

        let mut warnings = Vec::new();
        let credential = if use_oidc {
            self.prompt_oidc(&target, &request, &mut warnings)?
        } else {
            let timeout = resolved.timeout();
            authenticate_password(&target, request.password.as_deref(), self.prompt, timeout)
                .await?
        };

        let custom_name = request
            .session_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty());
        if let Some(name) = custom_name {
            check_custom_session_name(&sessions, name, &credential)?;
        }

        let choice = determine_profile_name(&config, &sessions, &credential.url, self.prompt)?;
        let profile = choice.name().to_string();
        let session = custom_name
            .map_or_else(|| canonical_session_name(&profile, &credential), str::to_string);

        let (refreshed, removed) =
            persist_session(&config, &mut sessions, &choice, &session, &credential);
        self.ctx
            .sessions
            .save(&sessions)
            .map_err(|err| {
                CliError::failure(anyhow::Error::new(err).context("failed to save session"))
            })?;
        info!(session = %session, url = %credential.url, "session stored");

        let linked = link_profile(&mut config, &choice, &session, &credential.username)
            .and_then(|activated| self.ctx.config.save(&config).map(|()| activated));
        let activated = match linked {
            Ok(activated) => activated,
            Err(err) => {
                warnings.push(format!(
                    "logged in, but profile '{profile}' could not be updated: {err}"
                ));
                false
            }
        };

        Ok(LoginOutcome {
            url: credential.url,
            username: credential.username,
            method: credential.method,
            profile,
            session,
            profile_created: choice.is_new(),
            activated,
            refreshed,
            removed,
            warnings,
        })
    }

    fn prompt_oidc(
        &mut self,
        target: &LoginTarget,
        request: &LoginRequest,
        warnings: &mut Vec<String>,
    ) -> CliResult<Credential> {
        let pending = PendingOidcLogin::begin(&target.url)?;
        let token = if let Some(token) = &request.token {
            token.clone()
        } else {
            if !request.no_browser
                && let Err(err) = (self.open_browser)(pending.authorization_url())
            {
                warnings.push(format!("could not open a browser: {err}"));
            }
            eprintln!("Open this URL to sign in:\n  {}", pending.authorization_url());
            self.prompt.read_line("Paste the token shown after signing in: ")?
        };
        let credential = pending.complete(&token, target.username.as_deref())?;
        Ok(Credential {
            url: credential.url,
            username: credential.username,
            token: credential.token,
            method: AuthMethod::Oidc,
        })
    }
}

async fn authenticate_password(
    target: &LoginTarget,
    password: Option<&str>,
    prompt: &mut dyn Prompt,
    timeout: std::time::Duration,
) -> CliResult<Credential> {
    let username = target
        .username
        .clone()
        .ok_or_else(|| CliError::validation("a username is required for password login"))?;
    let password = match password {
        Some(password) => password.to_string(),
        None => prompt.read_secret("Password: ")?,
    };
    if password.is_empty() {
        return Err(CliError::validation("password cannot be empty"));
    }

    let client = ApiClient::new(&target.url, timeout)?;
    let token = client
        .login(&username, &password)
        .await
        .context("login failed")
        .map_err(CliError::failure)?;
    debug!(url = %target.url, username = %username, "password login succeeded");
    Ok(Credential {
        url: target.url.clone(),
        username,
        token,
        method: AuthMethod::Password,
    })
}

/// Method recorded by the most recent session of the identity.
fn previous_method(sessions: &SessionDocument, target: &LoginTarget) -> Option<AuthMethod> {
    let username = target.username.as_deref()?;
    sessions
        .sessions
        .values()
        .filter(|session| session.matches_identity(&target.url, username))
        .max_by_key(|session| session.created_at)
        .map(|session| session.auth_method)
}

/// A custom name may refresh a session of the same identity but never take
/// over one that points at another server or user.
fn check_custom_session_name(
    sessions: &SessionDocument,
    name: &str,
    credential: &Credential,
) -> CliResult<()> {
    match sessions.sessions.get(name) {
        Some(existing) if !existing.matches_identity(&credential.url, &credential.username) => {
            Err(CliError::validation(format!(
                "session '{name}' already belongs to {} at {}; choose another --name",
                existing.username, existing.url
            )))
        }
        _ => Ok(()),
    }
}

fn canonical_session_name(profile: &str, credential: &Credential) -> String {
    let suffix = match credential.method {
        AuthMethod::Password => "session",
        AuthMethod::Oidc => "oidc",
    };
    format!("{profile}-{}-{suffix}", credential.username)
}

/// Refresh every session of the identity, drop the profile's superseded
/// session and store the canonical one. Returns the refreshed aliases and
/// the removed session, if any.
fn persist_session(
    config: &ConfigDocument,
    sessions: &mut SessionDocument,
    choice: &ProfileChoice,
    session_name: &str,
    credential: &Credential,
) -> (Vec<String>, Option<String>) {
    let now = Utc::now();
    let refreshed = sessions.refresh_identity(
        &credential.url,
        &credential.username,
        &credential.token,
        now,
        credential.method,
    );

    let previous = match choice {
        ProfileChoice::Existing(name) => config
            .profiles
            .get(name)
            .and_then(|profile| profile.session.clone()),
        ProfileChoice::New(_) => None,
    };
    let removed = previous.filter(|previous| {
        previous != session_name
            && sessions
                .sessions
                .get(previous)
                .is_some_and(|session| session.matches_identity(&credential.url, &credential.username))
            && !config.session_referenced_elsewhere(previous, choice.name())
    });
    if let Some(name) = &removed {
        sessions.sessions.remove(name);
        debug!(session = %name, "removed superseded session");
    }

    sessions.add_session(
        session_name,
        Session {
            url: credential.url.clone(),
            username: credential.username.clone(),
            token: credential.token.clone(),
            created_at: now,
            auth_method: credential.method,
        },
    );

    let refreshed = refreshed
        .into_iter()
        .filter(|name| name != session_name && removed.as_deref() != Some(name.as_str()))
        .collect();
    (refreshed, removed)
}

/// Point the profile at the session. New profiles always become active;
/// existing ones only when nothing else is active. Returns whether the
/// profile was activated.
fn link_profile(
    config: &mut ConfigDocument,
    choice: &ProfileChoice,
    session: &str,
    username: &str,
) -> iz_config::ConfigResult<bool> {
    match choice {
        ProfileChoice::New(name) => {
            config.add_profile(
                name,
                Profile {
                    session: Some(session.to_string()),
                    username: Some(username.to_string()),
                    ..Profile::default()
                },
            )?;
            config.set_active_profile(name)?;
            Ok(true)
        }
        ProfileChoice::Existing(name) => {
            let profile = config.get_profile_mut(name)?;
            profile.session = Some(session.to_string());
            profile.username = Some(username.to_string());
            if config.active_profile_name().is_none() {
                config.set_active_profile(name)?;
                Ok(true)
            } else {
                Ok(false)
            }
        }
    }
}
