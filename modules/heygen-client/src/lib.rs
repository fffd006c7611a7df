pub mod error;
pub mod types;

pub use error::{HeyGenError, Result};
pub use types::HeyGenAvatar;

use types::AvatarListResponse;

const BASE_URL: &str = "https://api.heygen.com";

pub struct HeyGenClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl HeyGenClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Fetch the full avatar catalog in one request.
    pub async fn list_avatars(&self) -> Result<Vec<HeyGenAvatar>> {
        let url = format!("{}/v2/avatars", self.base_url);
        let resp = self
            .client
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(HeyGenError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.text().await?;
        let parsed: AvatarListResponse = serde_json::from_str(&body)?;
        let avatars = parsed.into_avatars();
        tracing::info!(count = avatars.len(), "Fetched HeyGen avatar catalog");

        Ok(avatars)
    }
}
