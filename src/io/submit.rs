//! One-shot submission of finalized session results

use crate::domain::result::SubmissionPayload;
use crate::infra::config::Config;
use anyhow::bail;
use std::time::Instant;
use tracing::info;

#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};
#[cfg(test)]
use std::sync::Arc;

/// Mock outcome recorder for tests: counts calls, optionally fails
#[cfg(test)]
#[derive(Debug, Clone)]
struct MockSubmit {
    fail: bool,
    calls: Arc<AtomicUsize>,
}

pub struct ResultSubmitter {
    url: String,
    // Created once for connection reuse
    client: Option<reqwest::Client>,
    #[cfg(test)]
    mock: Option<MockSubmit>,
}

impl ResultSubmitter {
    pub fn new(config: &Config) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.submit_timeout())
            .http1_only()
            .build()
            .ok();

        Self {
            url: config.submit_url().to_string(),
            client,
            #[cfg(test)]
            mock: None,
        }
    }

    /// Mock submitter for tests; the counter records outbound requests
    #[cfg(test)]
    pub fn mock(fail: bool) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let submitter = Self {
            url: "mock://results".to_string(),
            client: None,
            mock: Some(MockSubmit { fail, calls: calls.clone() }),
        };
        (submitter, calls)
    }

    /// Send the finalized payload to the results endpoint.
    /// Any non-success status is an error; the caller decides retry policy.
    pub async fn submit(&self, payload: &SubmissionPayload) -> anyhow::Result<()> {
        #[cfg(test)]
        if let Some(ref mock) = self.mock {
            mock.calls.fetch_add(1, Ordering::SeqCst);
            if mock.fail {
                bail!("mock submission failure");
            }
            return Ok(());
        }

        let start = Instant::now();
        let Some(ref client) = self.client else {
            bail!("http client not initialized");
        };

        let response = client.post(&self.url).json(payload).send().await?;
        let status = response.status();
        let latency_us = start.elapsed().as_micros() as u64;

        if !status.is_success() {
            bail!("results endpoint returned {}", status.as_u16());
        }

        info!(
            status = %status.as_u16(),
            latency_us = %latency_us,
            "results_submitted"
        );
        Ok(())
    }
}
