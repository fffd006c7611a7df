use std::env;

use tracing::info;

use crate::error::PipelineError;

/// Application configuration loaded from environment variables.
///
/// The datastore is needed by every stage. API keys are optional at load time
/// and demanded by the accessor of whichever stage uses them.
#[derive(Clone)]
pub struct Config {
    // Datastore
    pub supabase_url: String,
    pub supabase_service_key: String,

    // Inference providers
    openai_api_key: Option<String>,
    groq_api_key: Option<String>,
    perplexity_api_key: Option<String>,

    // Catalog + search
    heygen_api_key: Option<String>,
    brave_api_key: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, PipelineError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, PipelineError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| {
                PipelineError::Config(format!("{key} environment variable is required"))
            })
        };

        Ok(Self {
            supabase_url: required("SUPABASE_URL")?,
            supabase_service_key: required("SUPABASE_SERVICE_KEY")?,
            openai_api_key: get("OPENAI_API_KEY"),
            groq_api_key: get("GROQ_API_KEY"),
            perplexity_api_key: get("PERPLEXITY_API_KEY"),
            heygen_api_key: get("HEYGEN_API_KEY"),
            brave_api_key: get("BRAVE_API_KEY"),
        })
    }

    pub fn openai_api_key(&self) -> Result<&str, PipelineError> {
        demand(&self.openai_api_key, "OPENAI_API_KEY")
    }

    pub fn groq_api_key(&self) -> Result<&str, PipelineError> {
        demand(&self.groq_api_key, "GROQ_API_KEY")
    }

    pub fn perplexity_api_key(&self) -> Result<&str, PipelineError> {
        demand(&self.perplexity_api_key, "PERPLEXITY_API_KEY")
    }

    pub fn heygen_api_key(&self) -> Result<&str, PipelineError> {
        demand(&self.heygen_api_key, "HEYGEN_API_KEY")
    }

    pub fn brave_api_key(&self) -> Result<&str, PipelineError> {
        demand(&self.brave_api_key, "BRAVE_API_KEY")
    }

    /// Log which settings are present without printing secrets.
    pub fn log_redacted(&self) {
        info!(
            supabase_url = %self.supabase_url,
            openai = self.openai_api_key.is_some(),
            groq = self.groq_api_key.is_some(),
            perplexity = self.perplexity_api_key.is_some(),
            heygen = self.heygen_api_key.is_some(),
            brave = self.brave_api_key.is_some(),
            "Loaded configuration"
        );
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("Config")
            .field("supabase_url", &self.supabase_url)
            .field("supabase_service_key", &"<redacted>")
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("groq_api_key", &redact(&self.groq_api_key))
            .field("perplexity_api_key", &redact(&self.perplexity_api_key))
            .field("heygen_api_key", &redact(&self.heygen_api_key))
            .field("brave_api_key", &redact(&self.brave_api_key))
            .finish()
    }
}

fn demand<'a>(value: &'a Option<String>, key: &str) -> Result<&'a str, PipelineError> {
    value
        .as_deref()
        .ok_or_else(|| PipelineError::Config(format!("{key} environment variable is required")))
}
