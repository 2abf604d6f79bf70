use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::Client;

use super::AlertEvent;

/// Generic JSON webhook sink with a small retry budget.
#[derive(Clone)]
pub struct WebhookNotifier {
    url: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            url,
            client: Client::new(),
            timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }

    pub async fn send_alert(&self, event: &AlertEvent) -> Result<()> {
        let mut last_err = anyhow!("no attempts made");
        for attempt in 1..=self.max_retries.max(1) {
            let res = self
                .client
                .post(&self.url)
                .timeout(self.timeout)
                .json(event)
                .send()
                .await
                .context("post alert webhook");
            match res {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) => {
                    last_err = anyhow!("webhook returned status {}", resp.status());
                }
                Err(e) => last_err = e,
            }
            if attempt < self.max_retries {
                tokio::time::sleep(Duration::from_millis(250 * attempt as u64)).await;
            }
        }
        Err(last_err)
    }
}
