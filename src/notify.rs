use serde_json::json;
use tracing::{debug, warn};

/// Best-effort, write-only notification channel for the run summary. A
/// delivery failure never affects the run's outcome.
#[derive(Debug, Clone)]
pub struct Notifier {
    http: reqwest::Client,
    webhook_url: String,
}

impl Notifier {
    pub fn new(webhook_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            webhook_url: webhook_url.to_string(),
        }
    }

    pub async fn post_summary(&self, text: &str) {
        let result = self
            .http
            .post(&self.webhook_url)
            .json(&json!({ "text": text }))
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => {
                debug!("Run summary notification delivered");
            }
            Ok(response) => {
                warn!(status = %response.status(), "Run summary notification rejected");
            }
            Err(e) => {
                warn!(error = %e, "Run summary notification failed");
            }
        }
    }
}
