//! Which server and user a login is for.

use iz_config::validate::{looks_like_url, normalize_url};
use iz_config::{ConfigError, ResolvedConfig};

use crate::client::CliResult;

/// Server and user to authenticate as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LoginTarget {
    pub(crate) url: String,
    /// Absent only for OIDC logins, where the token names the user.
    pub(crate) username: Option<String>,
}

/// Work out the target from up to two positional arguments, falling back to
/// the resolved configuration (flag, environment, active profile, session).
///
/// A single argument is a URL when it parses as one, otherwise a username.
pub(crate) fn resolve_target(
    first: Option<&str>,
    second: Option<&str>,
    resolved: &ResolvedConfig,
    username_optional: bool,
) -> CliResult<LoginTarget> {
    let first = first.map(str::trim).filter(|value| !value.is_empty());
    let second = second.map(str::trim).filter(|value| !value.is_empty());

    let (url, username) = match (first, second) {
        (Some(url), Some(username)) => (normalize_url(url)?, Some(username.to_string())),
        (Some(url), None) if looks_like_url(url) => {
            let url = normalize_url(url)?;
            let username = resolved.username().map(str::to_string);
            if username.is_none() && !username_optional {
                return Err(unresolved("username", format!("run 'iz login {url} <username>'")));
            }
            (url, username)
        }
        (Some(username), None) => {
            let url = resolved.base_url().map(str::to_string).ok_or_else(|| {
                unresolved(
                    "base URL",
                    format!("run 'iz login <url> {username}' or pass --url <url>"),
                )
            })?;
            (url, Some(username.to_string()))
        }
        (None, _) => {
            let url = resolved.base_url().map(str::to_string);
            let username = resolved.username().map(str::to_string);
            match (url, username) {
                (None, None) if !username_optional => {
                    return Err(unresolved(
                        "base URL or username",
                        "run 'iz login <url> <username>'".to_string(),
                    ));
                }
                (None, _) => {
                    return Err(unresolved(
                        "base URL",
                        "run 'iz login <url> <username>' or pass --url <url>".to_string(),
                    ));
                }
                (Some(url), None) if !username_optional => {
                    return Err(unresolved("username", format!("run 'iz login {url} <username>'")));
                }
                (Some(url), username) => (url, username),
            }
        }
    };
    Ok(LoginTarget { url, username })
}

fn unresolved(field: &'static str, hint: String) -> crate::client::CliError {
    ConfigError::Unresolved { field, hint }.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::CliError;
    use iz_config::{
        ConfigDocument, Environment, Overrides, Resolver, SessionDocument,
    };
    use iz_test_support::fixtures::{linked_profile, password_session};

    fn resolved(with_session: bool) -> ResolvedConfig {
        let mut config = ConfigDocument::default();
        let mut sessions = SessionDocument::default();
        if with_session {
            sessions.add_session("s", password_session("http://h:9000", "admin", "t"));
            config
                .add_profile("local", linked_profile("s", "admin"))
                .expect("profile");
            config.set_active_profile("local").expect("activate");
        }
        Resolver::new(&config, &sessions, &Environment::default())
            .resolve(&Overrides::default())
            .expect("resolve")
    }

    fn message(err: CliError) -> String {
        match err {
            CliError::Validation(message) => message,
            CliError::Failure(err) => panic!("unexpected failure: {err:#}"),
        }
    }

    #[test]
    fn two_arguments_are_url_and_username() {
        let target = resolve_target(Some("https://x.example/"), Some("u"), &resolved(false), false)
            .expect("target");
        assert_eq!(target.url, "https://x.example");
        assert_eq!(target.username.as_deref(), Some("u"));
    }

    #[test]
    fn single_url_borrows_username_from_active_profile() {
        let target =
            resolve_target(Some("http://other:8080"), None, &resolved(true), false).expect("target");
        assert_eq!(target.url, "http://other:8080");
        assert_eq!(target.username.as_deref(), Some("admin"));

        let err = resolve_target(Some("http://other:8080"), None, &resolved(false), false)
            .expect_err("no username");
        let text = message(err);
        assert!(text.contains("no username available"));
        assert!(text.contains("iz login http://other:8080 <username>"));
    }

    #[test]
    fn single_name_borrows_url_from_active_profile() {
        let target = resolve_target(Some("bob"), None, &resolved(true), false).expect("target");
        assert_eq!(target.url, "http://h:9000");
        assert_eq!(target.username.as_deref(), Some("bob"));

        let err = resolve_target(Some("bob"), None, &resolved(false), false).expect_err("no url");
        assert!(message(err).contains("no base URL available"));
    }

    #[test]
    fn no_arguments_name_what_is_missing() {
        let target = resolve_target(None, None, &resolved(true), false).expect("target");
        assert_eq!(target.username.as_deref(), Some("admin"));

        let err = resolve_target(None, None, &resolved(false), false).expect_err("nothing");
        assert!(message(err).contains("base URL or username"));

        let err = resolve_target(None, None, &resolved(false), true).expect_err("no url");
        assert!(message(err).contains("no base URL available"));
    }

    #[test]
    fn oidc_logins_may_omit_username() {
        let target =
            resolve_target(Some("http://other:8080"), None, &resolved(false), true).expect("target");
        assert_eq!(target.username, None);
    }
}
