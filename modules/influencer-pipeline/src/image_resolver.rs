// Finds a profile picture for every influencer without one.
//
// Brave image results come in two shapes, so URL extraction is an ordered
// list of strategies; the first that yields a URL wins.

use std::time::Duration;

use anyhow::{bail, Result};
use serde_json::Value;
use tracing::{debug, info, warn};

use ai_client::truncate_to_char_boundary;
use brave_client::BraveError;

use crate::traits::{ImageSearch, InfluencerStore};

/// Minimum spacing between consecutive search requests.
pub const REQUEST_INTERVAL: Duration = Duration::from_millis(1100);

/// Query used to verify the key before touching any rows.
const WARM_UP_QUERY: &str = "test";

type Extractor = fn(&Value) -> Option<&str>;

/// Tried in order against the first search result.
const EXTRACTORS: &[(&str, Extractor)] = &[
    ("properties.url", properties_url),
    ("thumbnail.src", thumbnail_src),
];

fn properties_url(result: &Value) -> Option<&str> {
    result.get("properties")?.get("url")?.as_str()
}

fn thumbnail_src(result: &Value) -> Option<&str> {
    result.get("thumbnail")?.get("src")?.as_str()
}

/// First image URL in a Brave image search response, if any.
pub fn extract_image_url(body: &Value) -> Option<String> {
    let first = body.get("results")?.as_array()?.first()?;
    EXTRACTORS
        .iter()
        .find_map(|(shape, extract)| {
            let url = extract(first).filter(|url| !url.is_empty())?;
            debug!(shape, "Extracted image URL");
            Some(url.to_string())
        })
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImageStats {
    pub updated: u32,
    pub no_image: u32,
    pub failed: u32,
    pub skipped: u32,
}

impl std::fmt::Display for ImageStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "updated={} no_image={} failed={} skipped={}",
            self.updated, self.no_image, self.failed, self.skipped
        )
    }
}

pub struct ImageResolver<'a> {
    search: &'a dyn ImageSearch,
    store: &'a dyn InfluencerStore,
    interval: Duration,
}

impl<'a> ImageResolver<'a> {
    pub fn new(search: &'a dyn ImageSearch, store: &'a dyn InfluencerStore) -> Self {
        Self {
            search,
            store,
            interval: REQUEST_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Look up one image. Sleeps for the request interval first, every time.
    pub async fn fetch_image_url(&self, name: &str) -> Result<Option<String>, BraveError> {
        tokio::time::sleep(self.interval).await;

        let query = format!("{name} profile picture");
        let body = self.search.image_search(&query, 1).await?;

        let url = extract_image_url(&body);
        if url.is_none() {
            info!(name, "No results found in image search response");
        }
        Ok(url)
    }

    /// Resolve images for every influencer whose `image_url` is null.
    ///
    /// A rejected key (403) aborts the run, during warm-up or mid-batch.
    /// Anything else is logged against the one influencer and the batch continues.
    pub async fn run(&self) -> Result<ImageStats> {
        match self.fetch_image_url(WARM_UP_QUERY).await {
            Ok(Some(_)) => {}
            Ok(None) => bail!("Initial image search test returned no image"),
            Err(BraveError::Unauthorized(body)) => {
                bail!(
                    "Image search rejected the API key: {}",
                    truncate_to_char_boundary(&body, 500)
                )
            }
            Err(e) => bail!("Initial image search test failed: {e}"),
        }

        let influencers = self.store.influencers_missing_image().await?;
        let total = influencers.len();
        info!(total, "Found influencers to process");

        let mut stats = ImageStats::default();
        for (i, influencer) in influencers.iter().enumerate() {
            let name = influencer.display_name().trim();
            info!(progress = i + 1, total, name, "Processing influencer");

            if name.is_empty() {
                warn!(influencer_id = %influencer.id, "Skipping influencer with empty name");
                stats.skipped += 1;
                continue;
            }

            let image_url = match self.fetch_image_url(name).await {
                Ok(Some(url)) => url,
                Ok(None) => {
                    info!(name, "No image URL found");
                    stats.no_image += 1;
                    continue;
                }
                Err(BraveError::Unauthorized(body)) => {
                    bail!(
                        "Image search rejected the API key while processing {name}: {}",
                        truncate_to_char_boundary(&body, 500)
                    )
                }
                Err(e) => {
                    warn!(name, error = %e, "Error fetching image");
                    stats.failed += 1;
                    continue;
                }
            };

            match self.store.set_influencer_image(influencer.id, &image_url).await {
                Ok(()) => {
                    info!(name, image_url = %image_url, "Updated image URL");
                    stats.updated += 1;
                }
                Err(e) => {
                    warn!(name, error = %e, "Failed to update image URL");
                    stats.failed += 1;
                }
            }
        }

        info!(%stats, "Image resolution complete");
        Ok(stats)
    }
}
