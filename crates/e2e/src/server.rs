//! Readiness checks against the application under test
//!
//! The app is started outside this crate (e.g. `npm run dev` on port 9002).
//! Before launching a browser the runner can poll it so a cold dev server
//! shows up as "unreachable" rather than as a login-heading timeout.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

/// Handle to a running application server
#[derive(Debug, Clone)]
pub struct AppServer {
    base_url: String,
    client: reqwest::Client,
}

impl AppServer {
    pub fn new(base_url: impl Into<String>) -> E2eResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    /// Poll the base URL until it answers with a success status
    pub async fn wait_until_ready(&self, config: &ReadinessConfig) -> E2eResult<()> {
        let start = Instant::now();
        let deadline = Duration::from_secs(config.timeout_secs);
        let interval = Duration::from_millis(config.poll_interval_ms);
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.client.get(&self.base_url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    info!("Application is up at {}", self.base_url);
                    return Ok(());
                }
                Ok(resp) => {
                    warn!("Readiness check returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for application at {}...", self.base_url);
                    }
                    // Connection refused is expected while the dev server boots
                    if !e.is_connect() {
                        warn!("Readiness check error: {}", e);
                    }
                }
            }

            if start.elapsed() + interval > deadline {
                break;
            }
            sleep(interval).await;
        }

        Err(E2eError::AppUnreachable(attempts))
    }
}

/// How long to wait for the application
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReadinessConfig {
    pub enabled: bool,
    pub timeout_secs: u64,
    pub poll_interval_ms: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_secs: 30,
            poll_interval_ms: 250,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_ready_server() {
        let mock = MockServer::start_async().await;
        let root = mock
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(200).body("<h1>Welcome Back</h1>");
            })
            .await;

        let server = AppServer::new(mock.url("/")).unwrap();
        server.wait_until_ready(&ReadinessConfig::default()).await.unwrap();
        root.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_is_not_ready() {
        let mock = MockServer::start_async().await;
        mock.mock_async(|when, then| {
            when.method(GET).path("/");
            then.status(503);
        })
        .await;

        let config = ReadinessConfig {
            enabled: true,
            timeout_secs: 1,
            poll_interval_ms: 100,
        };
        let server = AppServer::new(mock.url("/")).unwrap();
        let err = server.wait_until_ready(&config).await.unwrap_err();
        assert!(matches!(err, E2eError::AppUnreachable(n) if n >= 2));
    }

    #[tokio::test]
    async fn test_zero_timeout_still_tries_once() {
        let config = ReadinessConfig {
            enabled: true,
            timeout_secs: 0,
            poll_interval_ms: 100,
        };
        // Port 9 (discard) is essentially never serving HTTP.
        let server = AppServer::new("http://127.0.0.1:9/").unwrap();
        let err = server.wait_until_ready(&config).await.unwrap_err();
        assert!(matches!(err, E2eError::AppUnreachable(1)));
    }
}
