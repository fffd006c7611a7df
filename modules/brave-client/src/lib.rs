pub mod error;

pub use error::{BraveError, Result};

use reqwest::StatusCode;

const BASE_URL: &str = "https://api.search.brave.com";

pub struct BraveClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl BraveClient {
    pub fn new(token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: BASE_URL.to_string(),
            token: token.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Run an image search and return the raw response body.
    ///
    /// The result entries come in more than one shape, so parsing is left to
    /// the caller.
    pub async fn image_search(&self, query: &str, count: u32) -> Result<serde_json::Value> {
        let endpoint = format!("{}/res/v1/images/search", self.base_url);
        let count = count.to_string();

        let resp = self
            .client
            .get(&endpoint)
            .header("Accept", "application/json")
            .header("X-Subscription-Token", &self.token)
            .query(&[("q", query), ("count", count.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::FORBIDDEN {
            let message = resp.text().await.unwrap_or_default();
            return Err(BraveError::Unauthorized(message));
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BraveError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = resp.text().await?;
        tracing::debug!(query, bytes = body.len(), "Brave image search response");
        serde_json::from_str(&body).map_err(|e| BraveError::Parse(e.to_string()))
    }
}
