//! Polling a freshly started container until its HTTP service answers.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, info};

use crate::error::{CoordinatorError, Result};
use crate::http::build_client;

/// Timeout of a single readiness poll.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Polls a URL with a fixed delay until it answers `200 OK`.
#[derive(Debug, Clone)]
pub struct ReadinessProber {
    http: Client,
    max_attempts: u32,
    interval: Duration,
}

impl ReadinessProber {
    /// Creates a prober making at most `max_attempts` polls, `interval` apart.
    pub fn new(max_attempts: u32, interval: Duration) -> Result<Self> {
        Ok(Self {
            http: build_client(PROBE_TIMEOUT)?,
            max_attempts: max_attempts.max(1),
            interval,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Waits until `url` answers `200 OK`.
    ///
    /// Connection errors and other statuses count as failed polls.
    ///
    /// # Errors
    ///
    /// Returns `CoordinatorError::ReadinessTimeout` once every poll has failed.
    pub async fn wait_ready(&self, url: &str) -> Result<()> {
        for attempt in 1..=self.max_attempts {
            match self.http.get(url).send().await {
                Ok(response) if response.status() == StatusCode::OK => {
                    info!(endpoint = %url, attempt, "Endpoint ready");
                    return Ok(());
                }
                Ok(response) => {
                    debug!(endpoint = %url, attempt, status = %response.status(), "Endpoint not ready");
                }
                Err(e) => {
                    debug!(endpoint = %url, attempt, error = %e, "Endpoint unreachable");
                }
            }
            if attempt < self.max_attempts {
                tokio::time::sleep(self.interval).await;
            }
        }

        Err(CoordinatorError::ReadinessTimeout {
            endpoint: url.to_string(),
            attempts: self.max_attempts,
        })
    }
}
