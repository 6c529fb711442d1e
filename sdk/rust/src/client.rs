use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

/// Acknowledgment returned by the collector for a tracked event.
#[derive(Debug, Serialize, Deserialize)]
pub struct TrackAck {
    pub status: String,
    pub message: String,
}

/// Liveness payload returned by the collector.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub time: String,
}

/// Client for the APM collector facade.
pub struct CollectorClient {
    client: Client,
    base_url: String,
}

impl CollectorClient {
    /// Create a client for the collector at `base_url`.
    ///
    /// Redirects are not followed, so `submit_contact` callers can observe
    /// the redirect the collector answers with.
    pub fn new(base_url: &str) -> Self {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Send a custom event. The body must be a JSON object; its fields are
    /// persisted as-is.
    pub async fn track_event(
        &self,
        event: &serde_json::Value,
    ) -> Result<TrackAck, Box<dyn std::error::Error>> {
        let resp = self
            .client
            .post(format!("{}/apm/track_event/", self.base_url))
            .json(event)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(format!("collector returned status {}: {}", status, text).into());
        }

        Ok(serde_json::from_str::<TrackAck>(&text)?)
    }

    /// Check collector liveness.
    pub async fn health(&self) -> Result<HealthStatus, Box<dyn std::error::Error>> {
        let resp = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(format!("collector returned status {}: {}", status, text).into());
        }

        Ok(serde_json::from_str::<HealthStatus>(&text)?)
    }

    /// Submit the contact form and return the raw response, so callers can
    /// inspect the redirect or the validation detail.
    pub async fn submit_contact(
        &self,
        name: &str,
        email: &str,
        message: &str,
    ) -> Result<Response, reqwest::Error> {
        self.client
            .post(format!("{}/contact", self.base_url))
            .form(&[("name", name), ("email", email), ("message", message)])
            .send()
            .await
    }
}
