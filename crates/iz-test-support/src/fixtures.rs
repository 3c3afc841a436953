//! Builders for seeded profiles and sessions.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeZone, Utc};
use iz_config::{AuthMethod, Profile, Session};

/// Fixed timestamp so seeded documents compare deterministically.
#[must_use]
pub fn seeded_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Password session for `(url, username)` carrying `token`.
#[must_use]
pub fn password_session(url: &str, username: &str, token: &str) -> Session {
    Session {
        url: url.to_string(),
        username: username.to_string(),
        token: token.to_string(),
        created_at: seeded_at(),
        auth_method: AuthMethod::Password,
    }
}

/// OIDC session for `(url, username)` carrying `token`.
#[must_use]
pub fn oidc_session(url: &str, username: &str, token: &str) -> Session {
    Session {
        auth_method: AuthMethod::Oidc,
        ..password_session(url, username, token)
    }
}

/// Profile linked to `session` for `username`.
#[must_use]
pub fn linked_profile(session: &str, username: &str) -> Profile {
    Profile {
        session: Some(session.to_string()),
        username: Some(username.to_string()),
        ..Profile::default()
    }
}

/// Profile pointing directly at `url` with no session.
#[must_use]
pub fn url_profile(url: &str) -> Profile {
    Profile {
        base_url: Some(url.to_string()),
        ..Profile::default()
    }
}

/// Unsigned JWT whose payload is `claims` (a JSON object literal).
#[must_use]
pub fn unsigned_jwt(claims: &str) -> String {
    format!(
        "{}.{}.signature",
        encode_segment(r#"{"alg":"none","typ":"JWT"}"#),
        encode_segment(claims)
    )
}

fn encode_segment(raw: &str) -> String {
    URL_SAFE_NO_PAD.encode(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_jwt_uses_url_safe_unpadded_segments() {
        assert_eq!(encode_segment("{}"), "e30");
        assert_eq!(encode_segment("abc"), "YWJj");
        let token = unsigned_jwt(r#"{"sub":"x"}"#);
        assert_eq!(token.split('.').count(), 3);
        assert!(!token.contains('='));
    }

    #[test]
    fn oidc_session_keeps_identity() {
        let session = oidc_session("http://h", "u", "t");
        assert_eq!(session.auth_method, AuthMethod::Oidc);
        assert_eq!(session.username, "u");
    }
}
