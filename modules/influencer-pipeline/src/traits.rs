// Trait abstractions for the pipeline's external collaborators.
//
// InfluencerStore: every datastore read/write the stages perform.
// AvatarCatalog, ImageSearch, SearchChat: one per outbound API.
// AvatarDescriber, AvatarMatcher: vision-model calls with their prompts baked in.
//
// The real clients implement these here; `testing` provides in-memory mocks
// so stage logic runs without network or database.

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use ai_client::{AiError, Perplexity, SearchAnswer};
use brave_client::{BraveClient, BraveError};
use heygen_client::{HeyGenAvatar, HeyGenClient};
use influencer_common::{
    Avatar, AvatarMatch, AvatarProfile, Influencer, NewInfluencer, ResearchRecord,
};

// ---------------------------------------------------------------------------
// InfluencerStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait InfluencerStore: Send + Sync {
    // --- influencers ---

    /// Insert all rows in one statement. Any failure rejects the whole batch.
    async fn insert_influencers(&self, rows: &[NewInfluencer]) -> Result<()>;

    /// Influencers whose `image_url` is null (`id`, `name`).
    async fn influencers_missing_image(&self) -> Result<Vec<Influencer>>;

    async fn set_influencer_image(&self, id: Uuid, image_url: &str) -> Result<()>;

    /// Influencers whose `avatar_id` is null (`id`, `image_url`).
    async fn influencers_missing_avatar(&self) -> Result<Vec<Influencer>>;

    async fn set_influencer_avatar(&self, id: Uuid, avatar_id: &str) -> Result<()>;

    /// Influencers whose `research` is null (`id`, `name`, `tiktok_profile_link`).
    async fn influencers_missing_research(&self) -> Result<Vec<Influencer>>;

    async fn set_influencer_research(&self, id: Uuid, research: &ResearchRecord) -> Result<()>;

    // --- avatars ---

    /// Insert or overwrite by `avatar_id`.
    async fn upsert_avatars(&self, avatars: &[Avatar]) -> Result<()>;

    /// Avatars whose `description` is null.
    async fn avatars_missing_description(&self) -> Result<Vec<AvatarProfile>>;

    async fn set_avatar_description(&self, avatar_id: &str, description: &str) -> Result<()>;

    /// Every avatar with its description: the candidate set for matching.
    async fn avatar_roster(&self) -> Result<Vec<AvatarProfile>>;
}

// ---------------------------------------------------------------------------
// Outbound APIs
// ---------------------------------------------------------------------------

#[async_trait]
pub trait AvatarCatalog: Send + Sync {
    async fn list_avatars(&self) -> Result<Vec<HeyGenAvatar>>;
}

#[async_trait]
impl AvatarCatalog for HeyGenClient {
    async fn list_avatars(&self) -> Result<Vec<HeyGenAvatar>> {
        Ok(HeyGenClient::list_avatars(self).await?)
    }
}

/// Image search returning the raw response body. The error stays typed so
/// callers can tell a rejected key apart from a per-query failure.
#[async_trait]
pub trait ImageSearch: Send + Sync {
    async fn image_search(
        &self,
        query: &str,
        count: u32,
    ) -> std::result::Result<serde_json::Value, BraveError>;
}

#[async_trait]
impl ImageSearch for BraveClient {
    async fn image_search(
        &self,
        query: &str,
        count: u32,
    ) -> std::result::Result<serde_json::Value, BraveError> {
        BraveClient::image_search(self, query, count).await
    }
}

/// Search-augmented chat. The error stays typed so callers can retry timeouts.
#[async_trait]
pub trait SearchChat: Send + Sync {
    async fn search_chat(
        &self,
        system: &str,
        user: &str,
    ) -> std::result::Result<SearchAnswer, AiError>;
}

#[async_trait]
impl SearchChat for Perplexity {
    async fn search_chat(
        &self,
        system: &str,
        user: &str,
    ) -> std::result::Result<SearchAnswer, AiError> {
        Perplexity::search_chat(self, system, user).await
    }
}

// ---------------------------------------------------------------------------
// Vision models
// ---------------------------------------------------------------------------

#[async_trait]
pub trait AvatarDescriber: Send + Sync {
    /// Short physical description of the person in the image.
    async fn describe(&self, image_url: &str) -> Result<String>;
}

#[async_trait]
pub trait AvatarMatcher: Send + Sync {
    /// Pick the roster entry that best resembles the person in the image.
    async fn match_avatar(&self, image_url: &str, roster: &[AvatarProfile])
        -> Result<AvatarMatch>;
}
