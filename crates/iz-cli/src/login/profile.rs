//! Choosing the profile a login belongs to.

use iz_config::validate::validate_profile_name;
use iz_config::{ConfigDocument, ConfigError, SessionDocument};
use url::{Host, Url};

use crate::client::CliResult;
use crate::prompt::Prompt;

const FALLBACK_PROFILE: &str = "default";

/// Profile selected for a login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ProfileChoice {
    /// Reuse and update an existing profile.
    Existing(String),
    /// Create a profile that becomes active.
    New(String),
}

impl ProfileChoice {
    pub(crate) fn name(&self) -> &str {
        match self {
            Self::Existing(name) | Self::New(name) => name,
        }
    }

    pub(crate) const fn is_new(&self) -> bool {
        matches!(self, Self::New(_))
    }
}

/// Reuse the active profile when it already targets `url`, then the first
/// profile (by name) that does, and otherwise ask for a new name.
pub(crate) fn determine_profile_name(
    config: &ConfigDocument,
    sessions: &SessionDocument,
    url: &str,
    prompt: &mut dyn Prompt,
) -> CliResult<ProfileChoice> {
    if !config.profiles.is_empty()
        && let Some(name) = config.find_profile_by_base_url(url, sessions)
    {
        return Ok(ProfileChoice::Existing(name.to_string()));
    }
    prompt_new_profile(config, url, prompt).map(ProfileChoice::New)
}

fn prompt_new_profile(
    config: &ConfigDocument,
    url: &str,
    prompt: &mut dyn Prompt,
) -> CliResult<String> {
    let suggestion = suggest_profile_name(url);
    let answer = prompt.read_line(&format!("Profile name for {url} [{suggestion}]: "))?;
    let name = match answer.trim() {
        "" => suggestion,
        typed => typed.to_string(),
    };
    validate_profile_name(&name)?;
    if config.profiles.contains_key(&name) {
        return Err(ConfigError::ProfileExists { name }.into());
    }
    Ok(name)
}

/// `default` for local servers, otherwise the first label of the host.
pub(crate) fn suggest_profile_name(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return FALLBACK_PROFILE.to_string();
    };
    let suggestion = match parsed.host() {
        Some(Host::Domain(domain)) if domain.eq_ignore_ascii_case("localhost") => None,
        Some(Host::Domain(domain)) => domain
            .split('.')
            .next()
            .map(str::to_ascii_lowercase),
        Some(Host::Ipv4(ip)) if !(ip.is_loopback() || ip.is_unspecified()) => {
            Some(ip.to_string().replace('.', "-"))
        }
        Some(Host::Ipv6(ip)) if !(ip.is_loopback() || ip.is_unspecified()) => {
            Some(ip.to_string().replace(':', "-"))
        }
        _ => None,
    };
    suggestion
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_PROFILE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::CliError;
    use crate::prompt::LinePrompt;
    use iz_test_support::fixtures::{linked_profile, password_session, url_profile};
    use std::io::Cursor;

    fn prompt(input: &str) -> LinePrompt<Cursor<String>> {
        LinePrompt::new(Cursor::new(input.to_string()))
    }

    #[test]
    fn suggestions_follow_host_shape() {
        assert_eq!(suggest_profile_name("http://localhost:9000"), "default");
        assert_eq!(suggest_profile_name("http://127.0.0.1:9000"), "default");
        assert_eq!(suggest_profile_name("http://[::1]:9000"), "default");
        assert_eq!(suggest_profile_name("http://0.0.0.0"), "default");
        assert_eq!(suggest_profile_name("https://Flags.Example.com"), "flags");
        assert_eq!(suggest_profile_name("http://10.1.2.3:9000"), "10-1-2-3");
        assert_eq!(suggest_profile_name("not a url"), "default");
    }

    #[test]
    fn empty_configuration_prompts_for_new_profile() {
        let config = ConfigDocument::default();
        let sessions = SessionDocument::default();
        let mut input = prompt("myprofile\n");
        let choice = determine_profile_name(&config, &sessions, "https://x.example", &mut input)
            .expect("choice");
        assert_eq!(choice, ProfileChoice::New("myprofile".to_string()));
        assert!(choice.is_new());

        let mut input = prompt("\n");
        let choice = determine_profile_name(&config, &sessions, "https://x.example", &mut input)
            .expect("choice");
        assert_eq!(choice.name(), "x");
    }

    #[test]
    fn active_profile_wins_over_other_matches() {
        let mut sessions = SessionDocument::default();
        sessions.add_session("a-s", password_session("http://h:9000", "u", "t"));
        let mut config = ConfigDocument::default();
        config.add_profile("alpha", linked_profile("a-s", "u")).expect("alpha");
        config.add_profile("zulu", url_profile("http://h:9000/")).expect("zulu");
        config.set_active_profile("zulu").expect("activate");

        let mut input = prompt("");
        let choice =
            determine_profile_name(&config, &sessions, "http://h:9000", &mut input).expect("choice");
        assert_eq!(choice, ProfileChoice::Existing("zulu".to_string()));

        config.set_active_profile("alpha").expect("activate");
        let choice =
            determine_profile_name(&config, &sessions, "http://h:9000", &mut input).expect("choice");
        assert_eq!(choice, ProfileChoice::Existing("alpha".to_string()));
    }

    #[test]
    fn first_match_by_name_when_active_targets_elsewhere() {
        let sessions = SessionDocument::default();
        let mut config = ConfigDocument::default();
        config.add_profile("beta", url_profile("http://h:9000")).expect("beta");
        config.add_profile("alpha", url_profile("http://h:9000")).expect("alpha");
        config.add_profile("other", url_profile("http://elsewhere")).expect("other");
        config.set_active_profile("other").expect("activate");

        let mut input = prompt("");
        let choice =
            determine_profile_name(&config, &sessions, "http://h:9000", &mut input).expect("choice");
        assert_eq!(choice, ProfileChoice::Existing("alpha".to_string()));
    }

    #[test]
    fn prompted_name_must_be_new() {
        let sessions = SessionDocument::default();
        let mut config = ConfigDocument::default();
        config.add_profile("prod", url_profile("http://elsewhere")).expect("prod");

        let mut input = prompt("prod\n");
        let err = determine_profile_name(&config, &sessions, "http://h:9000", &mut input)
            .expect_err("duplicate");
        assert!(matches!(err, CliError::Validation(message) if message.contains("already exists")));
    }
}
