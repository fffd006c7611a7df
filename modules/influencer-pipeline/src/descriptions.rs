// Generates a short physical description for every avatar that lacks one.

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use ai_client::{OpenAi, VisionOptions};

use crate::traits::{AvatarDescriber, InfluencerStore};

pub const DESCRIPTION_MODEL: &str = "llama-3.2-11b-vision-preview";

const DESCRIPTION_PROMPT: &str = "Describe the person in this image -- their gender, race, \
facial features, age, etc. No need to describe the image or their clothing, just the person \
themselves and the vibe they give off. Don't start with 'The person in the image is'. Just \
directly give the description. Keep it to 1-2 sentences. Example: 'A young woman with long \
brown hair and blue eyes, wearing a white t-shirt and blue jeans. She has a friendly and \
approachable smile.'";

const DESCRIPTION_OPTIONS: VisionOptions = VisionOptions {
    temperature: 1.0,
    max_tokens: 1024,
};

/// Groq-hosted vision model behind [`AvatarDescriber`].
pub struct GroqDescriber {
    ai: OpenAi,
}

impl GroqDescriber {
    pub fn new(api_key: &str) -> Self {
        Self {
            ai: OpenAi::groq(api_key, DESCRIPTION_MODEL),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.ai = self.ai.with_base_url(url);
        self
    }
}

#[async_trait]
impl AvatarDescriber for GroqDescriber {
    async fn describe(&self, image_url: &str) -> Result<String> {
        let text = self
            .ai
            .describe_image(DESCRIPTION_PROMPT, image_url, DESCRIPTION_OPTIONS)
            .await
            .context("vision description request failed")?;
        Ok(text)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DescribeStats {
    pub described: u32,
    pub empty: u32,
    pub skipped: u32,
    pub failed: u32,
}

/// Describe every avatar whose description is null.
///
/// Avatars without a preview image are skipped. A blank answer writes nothing,
/// so the avatar stays pending for the next run.
pub async fn describe_pending(
    store: &dyn InfluencerStore,
    describer: &dyn AvatarDescriber,
) -> Result<DescribeStats> {
    let avatars = store
        .avatars_missing_description()
        .await
        .context("loading avatars without descriptions")?;
    info!(count = avatars.len(), "Avatars pending description");

    let mut stats = DescribeStats::default();
    for avatar in &avatars {
        let avatar_id = avatar.avatar_id.as_str();
        let Some(image_url) = avatar.image_url.as_deref().filter(|u| !u.is_empty()) else {
            warn!(avatar_id, "Avatar has no preview image, skipping");
            stats.skipped += 1;
            continue;
        };

        let description = match describer.describe(image_url).await {
            Ok(text) => text,
            Err(e) => {
                warn!(avatar_id, error = %e, "Failed to describe avatar");
                stats.failed += 1;
                continue;
            }
        };

        if description.trim().is_empty() {
            warn!(avatar_id, "Vision model returned an empty description");
            stats.empty += 1;
            continue;
        }

        match store.set_avatar_description(avatar_id, &description).await {
            Ok(()) => {
                info!(avatar_id, description = %description, "Stored avatar description");
                stats.described += 1;
            }
            Err(e) => {
                warn!(avatar_id, error = %e, "Failed to store avatar description");
                stats.failed += 1;
            }
        }
    }

    info!(
        described = stats.described,
        empty = stats.empty,
        skipped = stats.skipped,
        failed = stats.failed,
        "Avatar descriptions complete"
    );
    Ok(stats)
}
