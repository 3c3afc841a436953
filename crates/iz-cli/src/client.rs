//! HTTP client for the login and health endpoints, and the CLI error type.

use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use anyhow::{Context, anyhow};
use iz_config::ConfigError;
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

pub(crate) const LOGIN_PATH: &str = "api/admin/login";
pub(crate) const OIDC_PATH: &str = "api/admin/openid-connect";
pub(crate) const HEALTH_PATH: &str = "api/_health";
const TOKEN_COOKIE: &str = "token";

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.display_message())
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(error: ConfigError) -> Self {
        if error.is_user_error() {
            Self::Validation(error.to_string())
        } else {
            Self::Failure(error.into())
        }
    }
}

/// Join an API path onto a server URL, keeping any path prefix the server is
/// mounted under.
pub(crate) fn endpoint(base_url: &str, path: &str) -> CliResult<Url> {
    let joined = format!("{}/{}", base_url.trim_end_matches('/'), path);
    joined
        .parse::<Url>()
        .map_err(|err| CliError::validation(format!("invalid base URL '{base_url}': {err}")))
}

/// Result of the health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct HealthReport {
    pub(crate) url: String,
    pub(crate) status: u16,
    pub(crate) healthy: bool,
    pub(crate) body: Value,
}

#[derive(Deserialize)]
struct TokenBody {
    token: String,
}

/// Client bound to one server.
#[derive(Clone)]
pub(crate) struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub(crate) fn new(base_url: &str, timeout: Duration) -> CliResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Exchange username and password for an admin JWT.
    pub(crate) async fn login(&self, username: &str, password: &str) -> anyhow::Result<String> {
        let url = endpoint(&self.base_url, LOGIN_PATH).map_err(|err| anyhow!(err))?;
        debug!(url = %url, username, "sending login request");
        let response = self
            .client
            .post(url)
            .basic_auth(username, Some(password))
            .send()
            .await
            .context("request to the login endpoint failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body = body.trim();
            return Err(if body.is_empty() {
                anyhow!("server returned {status}")
            } else {
                anyhow!("server returned {status}: {body}")
            });
        }
        token_from_response(response).await
    }

    /// Probe the health endpoint.
    pub(crate) async fn health(&self) -> CliResult<HealthReport> {
        let url = endpoint(&self.base_url, HEALTH_PATH)?;
        debug!(url = %url, "probing health endpoint");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| CliError::failure(anyhow!("request to {url} failed: {err}")))?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok(HealthReport {
            url: url.to_string(),
            status: status.as_u16(),
            healthy: status.is_success(),
            body,
        })
    }
}

async fn token_from_response(response: Response) -> anyhow::Result<String> {
    let from_cookie = response
        .cookies()
        .find(|cookie| cookie.name() == TOKEN_COOKIE && !cookie.value().trim().is_empty())
        .map(|cookie| cookie.value().trim().to_string());
    if let Some(token) = from_cookie {
        return Ok(token);
    }

    let body = response.text().await.context("failed to read login response")?;
    serde_json::from_str::<TokenBody>(&body)
        .ok()
        .map(|parsed| parsed.token)
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| anyhow!("login response did not contain a token"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer) -> Result<ApiClient> {
        ApiClient::new(&server.base_url(), Duration::from_secs(5)).map_err(|err| anyhow!(err))
    }

    #[test]
    fn endpoint_keeps_path_prefix() -> Result<()> {
        let url = endpoint("https://iz.example/izanami/", LOGIN_PATH).map_err(|err| anyhow!(err))?;
        assert_eq!(url.as_str(), "https://iz.example/izanami/api/admin/login");
        Ok(())
    }

    #[test]
    fn config_errors_map_to_exit_codes() {
        let user = CliError::from(ConfigError::MissingAdminAuth);
        assert_eq!(user.exit_code(), 2);
        let io = CliError::from(ConfigError::NoDirectory { kind: "home" });
        assert_eq!(io.exit_code(), 3);
        assert!(io.display_message().contains("home"));
    }

    #[tokio::test]
    async fn login_reads_token_cookie() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/admin/login")
                .header("authorization", "Basic dTpw");
            then.status(200)
                .header("set-cookie", "token=jwt-cookie; Path=/; HttpOnly");
        });

        let token = client(&server)?.login("u", "p").await?;
        assert_eq!(token, "jwt-cookie");
        mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn other_cookies_do_not_count_as_token() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/admin/login");
            then.status(200)
                .header("set-cookie", "session=xyz; Path=/")
                .header("content-type", "application/json")
                .json_body(json!({"token": "jwt-body"}));
        });

        assert_eq!(client(&server)?.login("u", "p").await?, "jwt-body");
        Ok(())
    }

    #[tokio::test]
    async fn login_falls_back_to_json_body() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/admin/login");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"token": "jwt-body"}));
        });

        assert_eq!(client(&server)?.login("u", "p").await?, "jwt-body");
        Ok(())
    }

    #[tokio::test]
    async fn login_surfaces_status_and_body() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/admin/login");
            then.status(401).body("bad credentials");
        });

        let err = client(&server)?.login("u", "wrong").await.expect_err("401");
        let message = format!("{err:#}");
        assert!(message.contains("401"));
        assert!(message.contains("bad credentials"));
        Ok(())
    }

    #[tokio::test]
    async fn health_reports_status_and_body() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/_health");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"database": true}));
        });

        let report = client(&server)?.health().await.map_err(|err| anyhow!(err))?;
        assert!(report.healthy);
        assert_eq!(report.status, 200);
        assert_eq!(report.body, json!({"database": true}));
        Ok(())
    }
}
