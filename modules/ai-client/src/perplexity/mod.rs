//! Perplexity search-augmented chat completions.
//!
//! The wire format is OpenAI's chat completions plus a top-level `citations`
//! array listing the URLs the answer was grounded on.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::debug;

use crate::error::{AiError, Result};
use crate::openai::types::{ChatRequest, ChatResponse, ResponseFormat, WireMessage};

const PERPLEXITY_API_URL: &str = "https://api.perplexity.ai";

/// Answer text plus the sources the search step cited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchAnswer {
    pub content: String,
    pub citations: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Perplexity {
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
    temperature: f32,
    max_tokens: u32,
    http: reqwest::Client,
}

impl Perplexity {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: PERPLEXITY_API_URL.to_string(),
            timeout: Duration::from_secs(100),
            temperature: 0.1,
            max_tokens: 2000,
            http: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Per-request timeout. An elapsed timeout surfaces as [`AiError::Timeout`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|e| AiError::Config(format!("invalid API key header: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    /// One system + user exchange. Returns the first choice and the citations.
    pub async fn search_chat(&self, system: &str, user: &str) -> Result<SearchAnswer> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut request = ChatRequest::new(&self.model)
            .message(WireMessage::system(system))
            .message(WireMessage::user(user))
            .temperature(self.temperature)
            .response_format(ResponseFormat::text());
        request.max_tokens = Some(self.max_tokens);

        debug!(model = %self.model, "Perplexity chat request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let chat_response: ChatResponse = response.json().await?;
        let citations = chat_response.citations.clone();
        let content = chat_response
            .first_content()
            .ok_or_else(|| AiError::EmptyResponse("no choices in Perplexity response".into()))?;

        Ok(SearchAnswer { content, citations })
    }
}
