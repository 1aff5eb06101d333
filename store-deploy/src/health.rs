//! Post-deployment health polling

use std::time::Duration;

/// Polling schedule
#[derive(Debug, Clone)]
pub struct HealthCheck {
    pub initial_delay: Duration,
    pub attempts: u32,
    pub interval: Duration,
    pub request_timeout: Duration,
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(10),
            attempts: 5,
            interval: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl HealthCheck {
    /// Wait `initial_delay`, then GET `url` until it answers 200 or the
    /// attempts run out
    pub async fn wait_healthy(&self, url: &str) -> bool {
        let client = match reqwest::Client::builder()
            .timeout(self.request_timeout)
            .build()
        {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to build HTTP client for health check");
                return false;
            }
        };

        tokio::time::sleep(self.initial_delay).await;

        for attempt in 1..=self.attempts {
            match client.get(url).send().await {
                Ok(resp) if resp.status() == reqwest::StatusCode::OK => {
                    tracing::info!(url, "Health check passed!");
                    return true;
                }
                Ok(resp) => {
                    tracing::info!(attempt, status = %resp.status(), "Health check attempt failed, retrying...");
                }
                Err(e) => {
                    tracing::info!(attempt, error = %e, "Health check attempt failed, retrying...");
                }
            }
            if attempt < self.attempts {
                tokio::time::sleep(self.interval).await;
            }
        }

        tracing::warn!(url, attempts = self.attempts, "Health check failed");
        false
    }
}
