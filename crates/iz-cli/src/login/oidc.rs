//! Two-phase OIDC login: produce the authorization URL, then accept the token
//! obtained in the browser.

use std::io;
use std::process::{Command, Stdio};

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Map, Value};
use tracing::debug;

use crate::client::{CliError, CliResult, OIDC_PATH, endpoint};

/// Label used when the token carries no usable identity claim.
pub(crate) const FALLBACK_USERNAME: &str = "oidc-user";

/// Launches a browser at the authorization URL.
pub(crate) type BrowserOpener = fn(&str) -> io::Result<()>;

/// Phase one of an OIDC login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PendingOidcLogin {
    url: String,
    authorization_url: String,
}

/// Completed OIDC login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OidcCredential {
    pub(crate) url: String,
    pub(crate) username: String,
    pub(crate) token: String,
}

impl PendingOidcLogin {
    pub(crate) fn begin(url: &str) -> CliResult<Self> {
        let authorization_url = endpoint(url, OIDC_PATH)?.to_string();
        Ok(Self {
            url: url.to_string(),
            authorization_url,
        })
    }

    pub(crate) fn authorization_url(&self) -> &str {
        &self.authorization_url
    }

    /// Phase two: accept the pasted or supplied token. The signature is not
    /// verified; the server validates the token on first use.
    pub(crate) fn complete(self, token: &str, username_hint: Option<&str>) -> CliResult<OidcCredential> {
        let token = token.trim();
        if token.is_empty() {
            return Err(CliError::validation("OIDC token cannot be empty"));
        }
        let decoded = decode_username(token);
        let username = match (decoded.as_str(), username_hint) {
            (FALLBACK_USERNAME, Some(hint)) => hint.to_string(),
            _ => decoded,
        };
        Ok(OidcCredential {
            url: self.url,
            username,
            token: token.to_string(),
        })
    }
}

/// Username from the token payload: `username`, `name`, `sub`, then the
/// local part of `email`.
pub(crate) fn decode_username(token: &str) -> String {
    claims(token)
        .and_then(|claims| {
            ["username", "name", "sub"]
                .iter()
                .find_map(|key| string_claim(&claims, key).map(str::to_string))
                .or_else(|| {
                    string_claim(&claims, "email")
                        .and_then(|email| email.split('@').next())
                        .filter(|local| !local.is_empty())
                        .map(str::to_string)
                })
        })
        .unwrap_or_else(|| FALLBACK_USERNAME.to_string())
}

fn claims(token: &str) -> Option<Map<String, Value>> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn string_claim<'a>(claims: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    claims
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Hand the URL to the platform opener without waiting for it.
pub(crate) fn open_browser(url: &str) -> io::Result<()> {
    let mut command = opener(url);
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    command.spawn().map(|child| {
        debug!(pid = child.id(), "browser launched");
    })
}

#[cfg(target_os = "macos")]
fn opener(url: &str) -> Command {
    let mut command = Command::new("open");
    command.arg(url);
    command
}

#[cfg(target_os = "windows")]
fn opener(url: &str) -> Command {
    let mut command = Command::new("cmd");
    command.args(["/C", "start", "", url]);
    command
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn opener(url: &str) -> Command {
    let mut command = Command::new("xdg-open");
    command.arg(url);
    command
}

#[cfg(test)]
mod tests {
    use super::*;
    use iz_test_support::fixtures::unsigned_jwt;

    #[test]
    fn username_claims_are_tried_in_order() {
        assert_eq!(
            decode_username(&unsigned_jwt(r#"{"username":"alice","name":"Alice A","sub":"1"}"#)),
            "alice"
        );
        assert_eq!(decode_username(&unsigned_jwt(r#"{"name":"Alice A","sub":"1"}"#)), "Alice A");
        assert_eq!(decode_username(&unsigned_jwt(r#"{"sub":"user-1"}"#)), "user-1");
        assert_eq!(
            decode_username(&unsigned_jwt(r#"{"email":"carol@example.com"}"#)),
            "carol"
        );
        assert_eq!(decode_username(&unsigned_jwt(r#"{"aud":"iz"}"#)), FALLBACK_USERNAME);
        assert_eq!(decode_username("not-a-jwt"), FALLBACK_USERNAME);
    }

    #[test]
    fn pending_login_points_at_provider_and_completes() {
        let pending = PendingOidcLogin::begin("https://iz.example/").expect("begin");
        assert_eq!(
            pending.authorization_url(),
            "https://iz.example/api/admin/openid-connect"
        );

        let token = unsigned_jwt(r#"{"sub":"bob"}"#);
        let credential = pending.clone().complete(&format!(" {token}\n"), None).expect("complete");
        assert_eq!(credential.username, "bob");
        assert_eq!(credential.token, token);

        let opaque = pending.clone().complete("opaque", Some("carol")).expect("hint");
        assert_eq!(opaque.username, "carol");
        assert!(pending.complete("  ", None).is_err());
    }
}
