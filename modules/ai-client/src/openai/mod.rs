mod client;
pub(crate) mod schema;
pub(crate) mod types;

pub use schema::StructuredOutput;

use tracing::debug;

use crate::error::{AiError, Result};
use client::OpenAiClient;
use types::{ChatRequest, ResponseFormat, WireMessage};

const GROQ_API_URL: &str = "https://api.groq.com/openai/v1";

/// Sampling knobs for a single vision request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for VisionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: 1024,
        }
    }
}

// =============================================================================
// OpenAi Agent
// =============================================================================

/// Client for any OpenAI-compatible chat completions endpoint.
///
/// Groq exposes the same wire format, so [`OpenAi::groq`] is the same client
/// pointed at a different base URL.
#[derive(Debug, Clone)]
pub struct OpenAi {
    api_key: String,
    model: String,
    base_url: Option<String>,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
        }
    }

    pub fn groq(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new(api_key, model).with_base_url(GROQ_API_URL)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Get the model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn client(&self) -> OpenAiClient {
        let client = OpenAiClient::new(&self.api_key);
        if let Some(ref url) = self.base_url {
            client.with_base_url(url)
        } else {
            client
        }
    }

    /// Free-text answer about a single image.
    pub async fn describe_image(
        &self,
        prompt: &str,
        image_url: &str,
        options: VisionOptions,
    ) -> Result<String> {
        let request = ChatRequest::new(&self.model)
            .message(WireMessage::user_with_image(prompt, image_url))
            .temperature(options.temperature)
            .token_limit(options.max_tokens);

        self.client().chat_content(&request).await
    }

    /// Structured output about a single image, constrained to `T`'s schema.
    pub async fn extract_from_image<T: StructuredOutput>(
        &self,
        prompt: &str,
        image_url: &str,
        options: VisionOptions,
    ) -> Result<T> {
        let request = ChatRequest::new(&self.model)
            .message(WireMessage::user_with_image(prompt, image_url))
            .temperature(options.temperature)
            .token_limit(options.max_tokens)
            .response_format(ResponseFormat::json_schema(T::type_name(), T::openai_schema()));

        let json_str = self.client().chat_content(&request).await?;
        debug!(model = %self.model, bytes = json_str.len(), "structured output received");

        serde_json::from_str(&json_str)
            .map_err(|e| AiError::Parse(format!("failed to deserialize {}: {e}", T::type_name())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use schemars::JsonSchema;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct Verdict {
        label: String,
        score: f64,
    }

    #[test]
    fn groq_points_at_groq() {
        let ai = OpenAi::groq("gsk-test", "llama-3.2-11b-vision-preview");
        assert_eq!(ai.base_url.as_deref(), Some(GROQ_API_URL));
        assert_eq!(ai.model(), "llama-3.2-11b-vision-preview");
    }

    #[tokio::test]
    async fn extract_from_image_sends_schema_and_parses() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .header("authorization", "Bearer sk-test")
                    .body_includes("\"json_schema\"")
                    .body_includes("https://img.example/face.jpg");
                then.status(200).json_body(json!({
                    "choices": [{
                        "message": {"content": "{\"label\":\"A\",\"score\":0.75}"}
                    }]
                }));
            })
            .await;

        let ai = OpenAi::new("sk-test", "gpt-4o-mini").with_base_url(server.base_url());
        let verdict: Verdict = ai
            .extract_from_image("pick one", "https://img.example/face.jpg", VisionOptions::default())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(verdict.label, "A");
        assert_eq!(verdict.score, 0.75);
    }

    #[tokio::test]
    async fn api_error_carries_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(401).body("bad key");
            })
            .await;

        let ai = OpenAi::new("sk-bad", "gpt-4o-mini").with_base_url(server.base_url());
        let err = ai
            .describe_image("describe", "https://img.example/x.png", VisionOptions::default())
            .await
            .unwrap_err();

        match err {
            AiError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "bad key");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_choices_is_empty_response() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(json!({"choices": []}));
            })
            .await;

        let ai = OpenAi::new("sk-test", "gpt-4o-mini").with_base_url(server.base_url());
        let err = ai
            .describe_image("describe", "https://img.example/x.png", VisionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::EmptyResponse(_)));
    }
}
