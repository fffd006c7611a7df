// Mirrors the HeyGen avatar catalog into the avatars table.
//
// HeyGen lists several looks per person ("Abigail (Upper Body)", "Abigail
// Office Front", ...). Only the first avatar per person key is kept.

use std::collections::HashSet;

use anyhow::{Context, Result};
use tracing::{info, warn};

use heygen_client::HeyGenAvatar;
use influencer_common::Avatar;

use crate::traits::{AvatarCatalog, InfluencerStore};

/// First whitespace-delimited token of an avatar name.
pub fn person_key(name: &str) -> Option<&str> {
    name.split_whitespace().next()
}

/// Keep the first avatar seen for each person key, in source order.
/// The stored name is the person key.
pub fn dedupe_by_person(avatars: Vec<HeyGenAvatar>) -> Vec<Avatar> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut unique = Vec::new();

    for avatar in avatars {
        let Some(key) = person_key(&avatar.avatar_name) else {
            warn!(avatar_id = %avatar.avatar_id, "Skipping avatar with empty name");
            continue;
        };
        if !seen.insert(key.to_string()) {
            continue;
        }
        unique.push(Avatar {
            avatar_id: avatar.avatar_id,
            name: key.to_string(),
            gender: avatar.gender,
            image_url: avatar.preview_image_url,
        });
    }

    unique
}

/// Fetch the catalog, dedupe it and upsert on `avatar_id`. Returns rows upserted.
///
/// Re-running with the same catalog rewrites the same rows.
pub async fn sync_avatars(
    catalog: &dyn AvatarCatalog,
    store: &dyn InfluencerStore,
) -> Result<usize> {
    let fetched = catalog
        .list_avatars()
        .await
        .context("fetching avatar catalog")?;
    let fetched_count = fetched.len();

    let avatars = dedupe_by_person(fetched);
    for avatar in &avatars {
        info!(
            avatar_id = %avatar.avatar_id,
            name = %avatar.name,
            gender = avatar.gender.as_deref().unwrap_or("unknown"),
            "Unique avatar"
        );
    }

    if avatars.is_empty() {
        info!("Catalog returned no avatars, nothing to upsert");
        return Ok(0);
    }

    store
        .upsert_avatars(&avatars)
        .await
        .context("upserting avatars")?;

    info!(
        fetched = fetched_count,
        upserted = avatars.len(),
        "Avatar catalog synced"
    );
    Ok(avatars.len())
}
