//! `iz health`: check the resolved server.

use crate::client::{ApiClient, CliError, CliResult};
use crate::context::CliContext;

pub(crate) async fn handle_health(ctx: &CliContext) -> CliResult<()> {
    let resolved = ctx.resolve()?;
    let base_url = resolved.validate()?;
    let client = ApiClient::new(base_url, resolved.timeout())?;
    let report = client.health().await?;

    let renderer = ctx.renderer();
    if renderer.is_json() {
        renderer.json(&report)?;
    } else {
        let state = if report.healthy { "healthy" } else { "unhealthy" };
        renderer.fields(&[
            ("url", report.url.clone()),
            ("status", report.status.to_string()),
            ("state", state.to_string()),
        ]);
    }

    if report.healthy {
        Ok(())
    } else {
        Err(CliError::failure(anyhow::anyhow!(
            "server at {base_url} reported status {}",
            report.status
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::{context, context_with};
    use anyhow::Result;
    use httpmock::prelude::*;
    use iz_config::{Environment, Overrides};
    use iz_test_support::TempPaths;
    use iz_test_support::fixtures::url_profile;

    #[tokio::test]
    async fn checks_profile_url() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/api/_health");
            then.status(200).body(r#"{"database":true}"#);
        });
        let paths = TempPaths::new()?;
        paths
            .config_store()
            .add_profile("local", url_profile(&server.base_url()), true)?;

        handle_health(&context(&paths)).await.map_err(|err| anyhow::anyhow!(err))?;
        mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn unhealthy_server_is_a_failure() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/_health");
            then.status(503);
        });
        let paths = TempPaths::new()?;
        let overrides = Overrides {
            base_url: Some(server.base_url()),
            ..Overrides::default()
        };
        let err = handle_health(&context_with(&paths, Environment::default(), overrides))
            .await
            .expect_err("503");
        assert_eq!(err.exit_code(), 3);
        assert!(err.display_message().contains("503"));
        Ok(())
    }

    #[tokio::test]
    async fn missing_url_fails_before_any_request() -> Result<()> {
        let paths = TempPaths::new()?;
        let err = handle_health(&context(&paths)).await.expect_err("no url");
        assert_eq!(err.exit_code(), 2);
        assert!(err.display_message().contains("no base URL available"));
        Ok(())
    }
}
