// Pairs each influencer with the closest-looking avatar.
//
// Matching runs on a fixed pool of worker tasks pulling from a shared queue.
// Each worker owns its own matcher. Outcomes are gathered only once every
// worker has returned, and database writes happen after that single join.

use std::collections::{HashSet, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use ai_client::{OpenAi, VisionOptions};
use influencer_common::{AvatarMatch, AvatarProfile, Influencer, PipelineError};

use crate::traits::{AvatarMatcher, InfluencerStore};

/// Size of the matching worker pool.
pub const WORKER_COUNT: usize = 8;

pub const MATCH_MODEL: &str = "gpt-4o-mini";

const MATCH_OPTIONS: VisionOptions = VisionOptions {
    temperature: 0.2,
    max_tokens: 1000,
};

const MATCH_PROMPT_HEADER: &str = "Given the image of this person, analyze their appearance and \
match them with the most suitable avatar from the following descriptions. Consider facial \
features, overall appearance, and style:\n\n";

/// Prompt listing every roster entry as `Avatar {id}: {description}`.
pub fn build_match_prompt(roster: &[AvatarProfile]) -> String {
    let lines: Vec<String> = roster
        .iter()
        .map(|a| {
            format!(
                "Avatar {}: {}",
                a.avatar_id,
                a.description.as_deref().unwrap_or("")
            )
        })
        .collect();
    format!("{MATCH_PROMPT_HEADER}{}", lines.join("\n"))
}

// ---------------------------------------------------------------------------
// VisionMatcher
// ---------------------------------------------------------------------------

/// OpenAI vision model constrained to the [`AvatarMatch`] schema.
pub struct VisionMatcher {
    ai: OpenAi,
}

impl VisionMatcher {
    pub fn new(api_key: &str) -> Self {
        Self {
            ai: OpenAi::new(api_key, MATCH_MODEL),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.ai = self.ai.with_base_url(url);
        self
    }
}

#[async_trait]
impl AvatarMatcher for VisionMatcher {
    async fn match_avatar(
        &self,
        image_url: &str,
        roster: &[AvatarProfile],
    ) -> Result<AvatarMatch> {
        let prompt = build_match_prompt(roster);
        let result = self
            .ai
            .extract_from_image::<AvatarMatch>(&prompt, image_url, MATCH_OPTIONS)
            .await
            .context("avatar match request failed")?;
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Worker pool
// ---------------------------------------------------------------------------

/// Result of matching one influencer. Failures are values, not errors, so one
/// bad row never takes down the pool.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Matched {
        influencer_id: Uuid,
        avatar_id: String,
        confidence: f64,
    },
    Failed {
        influencer_id: Uuid,
        reason: String,
    },
}

impl MatchOutcome {
    pub fn influencer_id(&self) -> Uuid {
        match self {
            MatchOutcome::Matched { influencer_id, .. } => *influencer_id,
            MatchOutcome::Failed { influencer_id, .. } => *influencer_id,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, MatchOutcome::Matched { .. })
    }
}

/// The chosen id must name a roster entry.
fn validate_choice(result: &AvatarMatch, known_ids: &HashSet<&str>) -> Result<(), PipelineError> {
    if known_ids.contains(result.best_match_avatar_id.as_str()) {
        Ok(())
    } else {
        Err(PipelineError::Validation(format!(
            "model chose unknown avatar id {:?}",
            result.best_match_avatar_id
        )))
    }
}

async fn match_one(
    matcher: &dyn AvatarMatcher,
    influencer: &Influencer,
    roster: &[AvatarProfile],
    known_ids: &HashSet<&str>,
) -> MatchOutcome {
    let influencer_id = influencer.id;
    let Some(image_url) = influencer.image_url.as_deref().filter(|u| !u.is_empty()) else {
        return MatchOutcome::Failed {
            influencer_id,
            reason: "influencer has no image URL".to_string(),
        };
    };

    let result = match matcher.match_avatar(image_url, roster).await {
        Ok(result) => result,
        Err(e) => {
            return MatchOutcome::Failed {
                influencer_id,
                reason: format!("{e:#}"),
            }
        }
    };

    if let Err(e) = validate_choice(&result, known_ids) {
        return MatchOutcome::Failed {
            influencer_id,
            reason: e.to_string(),
        };
    }

    let confidence = result.confidence_score.clamp(0.0, 1.0);
    info!(
        %influencer_id,
        avatar_id = %result.best_match_avatar_id,
        confidence,
        reasoning = %result.reasoning,
        "Matched influencer to avatar"
    );

    MatchOutcome::Matched {
        influencer_id,
        avatar_id: result.best_match_avatar_id,
        confidence,
    }
}

/// Match every influencer across `workers` tasks and return all outcomes.
///
/// `factory` is called once per worker. A panic while matching one influencer
/// becomes a failed outcome for that influencer only. Returns after every
/// worker has drained the queue; outcome order across influencers is
/// unspecified.
pub async fn run_matching_pool<M, F>(
    influencers: Vec<Influencer>,
    roster: Arc<Vec<AvatarProfile>>,
    workers: usize,
    factory: F,
) -> Vec<MatchOutcome>
where
    M: AvatarMatcher + 'static,
    F: Fn() -> M,
{
    let total = influencers.len();
    let queue = Arc::new(Mutex::new(VecDeque::from(influencers)));
    let mut pool = JoinSet::new();

    for worker in 0..workers.max(1) {
        let matcher = factory();
        let queue = Arc::clone(&queue);
        let roster = Arc::clone(&roster);

        pool.spawn(async move {
            let known_ids: HashSet<&str> = roster.iter().map(|a| a.avatar_id.as_str()).collect();
            let mut outcomes = Vec::new();
            loop {
                let next = queue.lock().await.pop_front();
                let Some(influencer) = next else { break };
                let outcome =
                    AssertUnwindSafe(match_one(&matcher, &influencer, &roster, &known_ids))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|_| MatchOutcome::Failed {
                            influencer_id: influencer.id,
                            reason: "matcher panicked".to_string(),
                        });
                outcomes.push(outcome);
            }
            debug!(worker, processed = outcomes.len(), "Matching worker finished");
            outcomes
        });
    }

    let mut outcomes = Vec::with_capacity(total);
    while let Some(joined) = pool.join_next().await {
        match joined {
            Ok(batch) => outcomes.extend(batch),
            Err(e) => warn!(error = %e, "Matching worker terminated abnormally"),
        }
    }
    outcomes
}

// ---------------------------------------------------------------------------
// Stage driver
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MatchStats {
    pub matched: u32,
    pub failed: u32,
}

/// Match every influencer without an avatar, then persist the successes.
pub async fn match_avatars<M, F>(
    store: &dyn InfluencerStore,
    factory: F,
    workers: usize,
) -> Result<MatchStats>
where
    M: AvatarMatcher + 'static,
    F: Fn() -> M,
{
    let roster = store.avatar_roster().await.context("loading avatar roster")?;
    if roster.is_empty() {
        info!("No avatars found in the database");
        return Ok(MatchStats::default());
    }

    let influencers = store
        .influencers_missing_avatar()
        .await
        .context("loading unmatched influencers")?;
    if influencers.is_empty() {
        info!("No influencers need avatar matching");
        return Ok(MatchStats::default());
    }

    info!(
        influencers = influencers.len(),
        avatars = roster.len(),
        workers,
        "Matching influencers to avatars"
    );

    let outcomes = run_matching_pool(influencers, Arc::new(roster), workers, factory).await;

    let mut stats = MatchStats::default();
    for outcome in &outcomes {
        match outcome {
            MatchOutcome::Matched {
                influencer_id,
                avatar_id,
                ..
            } => match store.set_influencer_avatar(*influencer_id, avatar_id).await {
                Ok(()) => stats.matched += 1,
                Err(e) => {
                    warn!(%influencer_id, error = %e, "Failed to store avatar match");
                    stats.failed += 1;
                }
            },
            MatchOutcome::Failed {
                influencer_id,
                reason,
            } => {
                warn!(%influencer_id, reason = %reason, "Avatar match failed");
                stats.failed += 1;
            }
        }
    }

    info!(
        matched = stats.matched,
        failed = stats.failed,
        "Avatar matching complete"
    );
    Ok(stats)
}
