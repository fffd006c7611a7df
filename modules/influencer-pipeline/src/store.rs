// Supabase-backed InfluencerStore. Each method is one PostgREST call.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use supabase_client::{Query, SupabaseClient};
use uuid::Uuid;

use influencer_common::{
    Avatar, AvatarProfile, Influencer, NewInfluencer, PipelineError, ResearchRecord,
};

use crate::traits::InfluencerStore;

const INFLUENCERS: &str = "influencers";
const AVATARS: &str = "avatars";

pub struct SupabaseStore {
    client: SupabaseClient,
}

impl SupabaseStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    async fn update_influencer(&self, id: Uuid, patch: serde_json::Value) -> Result<()> {
        self.client
            .update(INFLUENCERS, &patch, &Query::new().eq("id", &id.to_string()))
            .await
            .map_err(datastore)
            .with_context(|| format!("updating influencer {id}"))
    }
}

fn datastore(e: supabase_client::SupabaseError) -> PipelineError {
    PipelineError::Datastore(e.to_string())
}

#[async_trait]
impl InfluencerStore for SupabaseStore {
    async fn insert_influencers(&self, rows: &[NewInfluencer]) -> Result<()> {
        self.client
            .insert(INFLUENCERS, rows)
            .await
            .map_err(datastore)?;
        Ok(())
    }

    async fn influencers_missing_image(&self) -> Result<Vec<Influencer>> {
        let rows = self
            .client
            .select(INFLUENCERS, &Query::new().select("id, name").is_null("image_url"))
            .await
            .map_err(datastore)?;
        Ok(rows)
    }

    async fn set_influencer_image(&self, id: Uuid, image_url: &str) -> Result<()> {
        self.update_influencer(id, json!({ "image_url": image_url }))
            .await
    }

    async fn influencers_missing_avatar(&self) -> Result<Vec<Influencer>> {
        let rows = self
            .client
            .select(
                INFLUENCERS,
                &Query::new().select("id, image_url").is_null("avatar_id"),
            )
            .await
            .map_err(datastore)?;
        Ok(rows)
    }

    async fn set_influencer_avatar(&self, id: Uuid, avatar_id: &str) -> Result<()> {
        self.update_influencer(id, json!({ "avatar_id": avatar_id }))
            .await
    }

    async fn influencers_missing_research(&self) -> Result<Vec<Influencer>> {
        let rows = self
            .client
            .select(
                INFLUENCERS,
                &Query::new()
                    .select("id, name, tiktok_profile_link")
                    .is_null("research"),
            )
            .await
            .map_err(datastore)?;
        Ok(rows)
    }

    async fn set_influencer_research(&self, id: Uuid, research: &ResearchRecord) -> Result<()> {
        self.update_influencer(id, json!({ "research": research }))
            .await
    }

    async fn upsert_avatars(&self, avatars: &[Avatar]) -> Result<()> {
        self.client
            .upsert(AVATARS, avatars, "avatar_id")
            .await
            .map_err(datastore)?;
        Ok(())
    }

    async fn avatars_missing_description(&self) -> Result<Vec<AvatarProfile>> {
        let rows = self
            .client
            .select(
                AVATARS,
                &Query::new()
                    .select("avatar_id, image_url, description")
                    .is_null("description"),
            )
            .await
            .map_err(datastore)?;
        Ok(rows)
    }

    async fn set_avatar_description(&self, avatar_id: &str, description: &str) -> Result<()> {
        self.client
            .update(
                AVATARS,
                &json!({ "description": description }),
                &Query::new().eq("avatar_id", avatar_id),
            )
            .await
            .map_err(datastore)
            .with_context(|| format!("updating avatar {avatar_id}"))
    }

    async fn avatar_roster(&self) -> Result<Vec<AvatarProfile>> {
        let rows = self
            .client
            .select(AVATARS, &Query::new().select("avatar_id, description"))
            .await
            .map_err(datastore)?;
        Ok(rows)
    }
}
