// Multi-area influencer research over a search-augmented chat model.
//
// Four areas are queried concurrently per influencer. Each answer is parsed
// into its own typed shape; citations from all four are merged. Only request
// timeouts are retried.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use futures::future::join_all;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use ai_client::{strip_code_blocks, AiError, Perplexity, SearchAnswer};
use influencer_common::ResearchRecord;

use crate::traits::{InfluencerStore, SearchChat};

pub const RESEARCH_MODEL: &str = "sonar";

pub const SYSTEM_PROMPT: &str = "You are a specialized research agent that MUST ALWAYS respond \
with valid JSON only. Do not include any text before or after the JSON.";

const CONTENT_PROMPT: &str = r#"Analyze the influencer's content in detail.
Focus on:
1. Main content categories and themes
2. Content style and tone
3. Posting frequency and consistency
4. Engagement metrics
5. Popular content formats

Format your response as JSON:
{
  "mainCategories": string[],
  "contentStyle": string,
  "postFrequency": string,
  "engagementRate": string,
  "popularContentTypes": string[]
}"#;

const BACKGROUND_PROMPT: &str = r#"Research the influencer's background and expertise.
Focus on:
1. Professional and personal biography
2. Areas of expertise
3. Notable achievements
4. Career progression and highlights

Format your response as JSON:
{
  "biography": string,
  "expertise": string[],
  "achievements": string[],
  "careerHighlights": string[]
}"#;

const TARGET_AUDIENCE_PROMPT: &str = r#"Analyze the influencer's target audience.
Focus on:
1. Demographic information
2. Audience interests and preferences
3. Geographic distribution
4. Engagement patterns

Format your response as JSON:
{
  "demographics": string[],
  "interests": string[],
  "locationFocus": string,
  "engagementPatterns": string
}"#;

const KEY_TOPICS_PROMPT: &str = r#"Analyze the main topics and themes in the influencer's content.
Focus on:
1. Primary content topics
2. Recurring themes and messages
3. Brand collaborations and alignments
4. Overall value proposition

Format your response as JSON:
{
  "primaryTopics": string[],
  "recurringThemes": string[],
  "brandAlignments": string[],
  "valueProposition": string
}"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResearchArea {
    Content,
    Background,
    TargetAudience,
    KeyTopics,
}

impl ResearchArea {
    pub const ALL: [ResearchArea; 4] = [
        ResearchArea::Content,
        ResearchArea::Background,
        ResearchArea::TargetAudience,
        ResearchArea::KeyTopics,
    ];

    /// Key of this area in the stored research payload.
    pub fn key(self) -> &'static str {
        match self {
            ResearchArea::Content => "content",
            ResearchArea::Background => "background",
            ResearchArea::TargetAudience => "targetAudience",
            ResearchArea::KeyTopics => "keyTopics",
        }
    }

    pub fn prompt(self) -> &'static str {
        match self {
            ResearchArea::Content => CONTENT_PROMPT,
            ResearchArea::Background => BACKGROUND_PROMPT,
            ResearchArea::TargetAudience => TARGET_AUDIENCE_PROMPT,
            ResearchArea::KeyTopics => KEY_TOPICS_PROMPT,
        }
    }
}

pub fn build_research_prompt(name: &str, profile_link: &str, area: ResearchArea) -> String {
    format!(
        "Research the TikTok influencer {name} (profile: {profile_link}).\n{}",
        area.prompt()
    )
}

// ---------------------------------------------------------------------------
// Retry
// ---------------------------------------------------------------------------

/// Linear backoff: the wait after attempt `n` is `backoff_unit * n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_unit: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_unit * attempt
    }
}

/// Run `op` until it succeeds, fails with a non-timeout error, or runs out of
/// attempts. `op` receives the 1-based attempt number.
pub async fn retry_on_timeout<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, AiError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AiError>>,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Err(e) if e.is_timeout() && attempt < policy.max_attempts => {
                let wait = policy.backoff(attempt);
                warn!(attempt, wait_secs = wait.as_secs(), "Request timed out, retrying");
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

// ---------------------------------------------------------------------------
// Researcher
// ---------------------------------------------------------------------------

pub struct Researcher<C> {
    chat: C,
    retry: RetryPolicy,
}

impl Researcher<Perplexity> {
    pub fn perplexity(api_key: &str) -> Self {
        Self::new(Perplexity::new(api_key, RESEARCH_MODEL))
    }
}

impl<C: SearchChat> Researcher<C> {
    pub fn new(chat: C) -> Self {
        Self {
            chat,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn chat(&self) -> &C {
        &self.chat
    }

    async fn query_area(
        &self,
        area: ResearchArea,
        name: &str,
        profile_link: &str,
    ) -> Result<SearchAnswer, AiError> {
        let prompt = build_research_prompt(name, profile_link, area);
        retry_on_timeout(&self.retry, |attempt| {
            debug!(area = area.key(), attempt, name, "Querying research area");
            self.chat.search_chat(SYSTEM_PROMPT, &prompt)
        })
        .await
    }

    /// Research one influencer across all four areas.
    ///
    /// All four requests run to completion before any failure is reported;
    /// the first failing area (in [`ResearchArea::ALL`] order) is returned.
    pub async fn research(&self, name: &str, profile_link: &str) -> Result<ResearchRecord> {
        let results = join_all(
            ResearchArea::ALL
                .iter()
                .map(|&area| self.query_area(area, name, profile_link)),
        )
        .await;

        let answers = ResearchArea::ALL
            .iter()
            .zip(results)
            .map(|(area, result)| {
                result.with_context(|| format!("{} research failed for {name}", area.key()))
            })
            .collect::<Result<Vec<_>>>()?;

        let [content, background, target_audience, key_topics]: [SearchAnswer; 4] = answers
            .try_into()
            .map_err(|_| anyhow!("expected one answer per research area"))?;

        let citations = merge_citations([
            &content.citations,
            &background.citations,
            &target_audience.citations,
            &key_topics.citations,
        ]);

        Ok(ResearchRecord {
            content: parse_area(ResearchArea::Content, &content)?,
            background: parse_area(ResearchArea::Background, &background)?,
            target_audience: parse_area(ResearchArea::TargetAudience, &target_audience)?,
            key_topics: parse_area(ResearchArea::KeyTopics, &key_topics)?,
            citations,
        })
    }
}

fn parse_area<T: DeserializeOwned>(area: ResearchArea, answer: &SearchAnswer) -> Result<T> {
    let cleaned = strip_code_blocks(&answer.content);
    serde_json::from_str(cleaned)
        .with_context(|| format!("{} research returned malformed JSON", area.key()))
}

/// Union of citation lists, keeping first-seen order.
pub fn merge_citations<'a>(lists: impl IntoIterator<Item = &'a Vec<String>>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for url in lists.into_iter().flatten() {
        if seen.insert(url.as_str()) {
            merged.push(url.clone());
        }
    }
    merged
}

// ---------------------------------------------------------------------------
// Batch stage
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResearchStats {
    pub researched: u32,
    pub failed: u32,
    pub skipped: u32,
}

/// Research every influencer whose `research` column is null, one at a time.
pub async fn research_pending<C: SearchChat>(
    store: &dyn InfluencerStore,
    researcher: &Researcher<C>,
) -> Result<ResearchStats> {
    let influencers = store
        .influencers_missing_research()
        .await
        .context("loading influencers without research")?;
    let total = influencers.len();
    info!(total, "Influencers pending research");

    let mut stats = ResearchStats::default();
    for (i, influencer) in influencers.iter().enumerate() {
        let name = influencer.display_name().trim();
        let link = influencer.tiktok_profile_link.as_deref().unwrap_or("").trim();
        if name.is_empty() || link.is_empty() {
            warn!(influencer_id = %influencer.id, "Missing name or profile link, skipping");
            stats.skipped += 1;
            continue;
        }

        info!(progress = i + 1, total, name, "Researching influencer");
        let record = match researcher.research(name, link).await {
            Ok(record) => record,
            Err(e) => {
                warn!(name, error = %format!("{e:#}"), "Research failed");
                stats.failed += 1;
                continue;
            }
        };

        match store.set_influencer_research(influencer.id, &record).await {
            Ok(()) => {
                info!(name, citations = record.citations.len(), "Stored research");
                stats.researched += 1;
            }
            Err(e) => {
                warn!(name, error = %e, "Failed to store research");
                stats.failed += 1;
            }
        }
    }

    info!(
        researched = stats.researched,
        failed = stats.failed,
        skipped = stats.skipped,
        "Research complete"
    );
    Ok(stats)
}
