// Test mocks for the influencer pipeline.
//
// One mock per trait boundary:
// - MockStore (InfluencerStore): stateful in-memory influencers + avatars tables
// - MockCatalog (AvatarCatalog): fixed avatar list
// - MockImageSearch (ImageSearch): name→image URL, with scripted key rejection
// - MockDescriber (AvatarDescriber): image URL→description
// - MockMatcher (AvatarMatcher): image URL→match, cloneable per worker
// - MockSearchChat (SearchChat): per-area scripted answers, timeouts, failures
//
// Plus CallLog, a shared ordered record of calls across mocks, and builders
// for the row types.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::time::Instant;
use uuid::Uuid;

use ai_client::{AiError, SearchAnswer};
use brave_client::BraveError;
use heygen_client::HeyGenAvatar;
use influencer_common::{
    Avatar, AvatarMatch, AvatarProfile, Influencer, NewInfluencer, ResearchRecord,
};

use crate::research::ResearchArea;
use crate::traits::{
    AvatarCatalog, AvatarDescriber, AvatarMatcher, ImageSearch, InfluencerStore, SearchChat,
};

// ---------------------------------------------------------------------------
// CallLog
// ---------------------------------------------------------------------------

/// Ordered record of calls shared across mocks, for asserting interleaving.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

// ---------------------------------------------------------------------------
// Row builders
// ---------------------------------------------------------------------------

pub fn influencer(name: &str) -> Influencer {
    Influencer {
        id: Uuid::new_v4(),
        name: Some(name.to_string()),
        tiktok_profile_link: Some(format!(
            "https://www.tiktok.com/@{}",
            name.to_lowercase().replace(' ', "")
        )),
        image_url: None,
        avatar_id: None,
    }
}

pub fn influencer_with_image(name: &str, image_url: &str) -> Influencer {
    Influencer {
        image_url: Some(image_url.to_string()),
        ..influencer(name)
    }
}

pub fn heygen_avatar(avatar_id: &str, avatar_name: &str) -> HeyGenAvatar {
    HeyGenAvatar {
        avatar_id: avatar_id.to_string(),
        avatar_name: avatar_name.to_string(),
        gender: Some("female".to_string()),
        preview_image_url: Some(format!("https://files.heygen.ai/{avatar_id}.webp")),
    }
}

pub fn avatar_match(avatar_id: &str, confidence: f64) -> AvatarMatch {
    AvatarMatch {
        reasoning: format!("Closest facial features to {avatar_id}"),
        best_match_avatar_id: avatar_id.to_string(),
        confidence_score: confidence,
    }
}

// ---------------------------------------------------------------------------
// MockStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct AvatarRow {
    avatar_id: String,
    name: String,
    gender: Option<String>,
    image_url: Option<String>,
    description: Option<String>,
}

#[derive(Default)]
struct StoreState {
    influencers: Vec<Influencer>,
    research: HashMap<Uuid, ResearchRecord>,
    avatars: Vec<AvatarRow>,
    insert_batches: usize,
}

/// In-memory influencers and avatars tables with the same selection rules as
/// the real store.
#[derive(Default)]
pub struct MockStore {
    state: Mutex<StoreState>,
    fail_inserts: bool,
    log: Option<CallLog>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_influencer(self, influencer: Influencer) -> Self {
        self.state.lock().unwrap().influencers.push(influencer);
        self
    }

    pub fn with_avatar(self, avatar_id: &str, image_url: Option<&str>, description: Option<&str>) -> Self {
        self.state.lock().unwrap().avatars.push(AvatarRow {
            avatar_id: avatar_id.to_string(),
            name: avatar_id.to_string(),
            gender: None,
            image_url: image_url.map(str::to_string),
            description: description.map(str::to_string),
        });
        self
    }

    /// Every `insert_influencers` call fails and writes nothing.
    pub fn failing_inserts(mut self) -> Self {
        self.fail_inserts = true;
        self
    }

    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = Some(log);
        self
    }

    fn record(&self, entry: String) {
        if let Some(log) = &self.log {
            log.push(entry);
        }
    }

    // --- inspection ---

    pub fn influencers(&self) -> Vec<Influencer> {
        self.state.lock().unwrap().influencers.clone()
    }

    pub fn influencer(&self, id: Uuid) -> Option<Influencer> {
        self.state
            .lock()
            .unwrap()
            .influencers
            .iter()
            .find(|i| i.id == id)
            .cloned()
    }

    pub fn research_for(&self, id: Uuid) -> Option<ResearchRecord> {
        self.state.lock().unwrap().research.get(&id).cloned()
    }

    pub fn insert_batches(&self) -> usize {
        self.state.lock().unwrap().insert_batches
    }

    pub fn avatar_count(&self) -> usize {
        self.state.lock().unwrap().avatars.len()
    }

    pub fn avatar(&self, avatar_id: &str) -> Option<Avatar> {
        self.state
            .lock()
            .unwrap()
            .avatars
            .iter()
            .find(|a| a.avatar_id == avatar_id)
            .map(|a| Avatar {
                avatar_id: a.avatar_id.clone(),
                name: a.name.clone(),
                gender: a.gender.clone(),
                image_url: a.image_url.clone(),
            })
    }

    pub fn avatar_description(&self, avatar_id: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .avatars
            .iter()
            .find(|a| a.avatar_id == avatar_id)
            .and_then(|a| a.description.clone())
    }
}

#[async_trait]
impl InfluencerStore for MockStore {
    async fn insert_influencers(&self, rows: &[NewInfluencer]) -> Result<()> {
        if self.fail_inserts {
            bail!("insert rejected: duplicate key value violates unique constraint");
        }
        let mut state = self.state.lock().unwrap();
        state.insert_batches += 1;
        state.influencers.extend(rows.iter().map(|r| Influencer {
            id: r.id,
            name: Some(r.name.clone()),
            tiktok_profile_link: Some(r.tiktok_profile_link.clone()),
            image_url: None,
            avatar_id: None,
        }));
        Ok(())
    }

    async fn influencers_missing_image(&self) -> Result<Vec<Influencer>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .influencers
            .iter()
            .filter(|i| i.image_url.is_none())
            .cloned()
            .collect())
    }

    async fn set_influencer_image(&self, id: Uuid, image_url: &str) -> Result<()> {
        self.record(format!("set_image:{id}"));
        let mut state = self.state.lock().unwrap();
        match state.influencers.iter_mut().find(|i| i.id == id) {
            Some(row) => {
                row.image_url = Some(image_url.to_string());
                Ok(())
            }
            None => bail!("influencer {id} not found"),
        }
    }

    async fn influencers_missing_avatar(&self) -> Result<Vec<Influencer>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .influencers
            .iter()
            .filter(|i| i.avatar_id.is_none())
            .cloned()
            .collect())
    }

    async fn set_influencer_avatar(&self, id: Uuid, avatar_id: &str) -> Result<()> {
        self.record(format!("set_avatar:{id}"));
        let mut state = self.state.lock().unwrap();
        match state.influencers.iter_mut().find(|i| i.id == id) {
            Some(row) => {
                row.avatar_id = Some(avatar_id.to_string());
                Ok(())
            }
            None => bail!("influencer {id} not found"),
        }
    }

    async fn influencers_missing_research(&self) -> Result<Vec<Influencer>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .influencers
            .iter()
            .filter(|i| !state.research.contains_key(&i.id))
            .cloned()
            .collect())
    }

    async fn set_influencer_research(&self, id: Uuid, research: &ResearchRecord) -> Result<()> {
        self.record(format!("set_research:{id}"));
        let mut state = self.state.lock().unwrap();
        state.research.insert(id, research.clone());
        Ok(())
    }

    async fn upsert_avatars(&self, avatars: &[Avatar]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        for avatar in avatars {
            let existing = state
                .avatars
                .iter()
                .position(|a| a.avatar_id == avatar.avatar_id);
            match existing {
                Some(idx) => {
                    let row = &mut state.avatars[idx];
                    row.name = avatar.name.clone();
                    row.gender = avatar.gender.clone();
                    row.image_url = avatar.image_url.clone();
                }
                None => state.avatars.push(AvatarRow {
                    avatar_id: avatar.avatar_id.clone(),
                    name: avatar.name.clone(),
                    gender: avatar.gender.clone(),
                    image_url: avatar.image_url.clone(),
                    description: None,
                }),
            }
        }
        Ok(())
    }

    async fn avatars_missing_description(&self) -> Result<Vec<AvatarProfile>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .avatars
            .iter()
            .filter(|a| a.description.is_none())
            .map(|a| AvatarProfile {
                avatar_id: a.avatar_id.clone(),
                image_url: a.image_url.clone(),
                description: None,
            })
            .collect())
    }

    async fn set_avatar_description(&self, avatar_id: &str, description: &str) -> Result<()> {
        self.record(format!("set_description:{avatar_id}"));
        let mut state = self.state.lock().unwrap();
        match state.avatars.iter_mut().find(|a| a.avatar_id == avatar_id) {
            Some(row) => {
                row.description = Some(description.to_string());
                Ok(())
            }
            None => bail!("avatar {avatar_id} not found"),
        }
    }

    async fn avatar_roster(&self) -> Result<Vec<AvatarProfile>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .avatars
            .iter()
            .map(|a| AvatarProfile {
                avatar_id: a.avatar_id.clone(),
                image_url: None,
                description: a.description.clone(),
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// MockCatalog
// ---------------------------------------------------------------------------

pub struct MockCatalog {
    avatars: Vec<HeyGenAvatar>,
}

impl MockCatalog {
    pub fn new(avatars: Vec<HeyGenAvatar>) -> Self {
        Self { avatars }
    }
}

#[async_trait]
impl AvatarCatalog for MockCatalog {
    async fn list_avatars(&self) -> Result<Vec<HeyGenAvatar>> {
        Ok(self.avatars.clone())
    }
}

// ---------------------------------------------------------------------------
// MockImageSearch
// ---------------------------------------------------------------------------

const QUERY_SUFFIX: &str = " profile picture";

/// Image search keyed by the name in `"{name} profile picture"`.
/// Unregistered names return an empty result list.
#[derive(Default)]
pub struct MockImageSearch {
    images: HashMap<String, String>,
    rejected: HashSet<String>,
    failing: HashSet<String>,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl MockImageSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond with `url` in the `properties.url` shape.
    pub fn on(mut self, name: &str, url: &str) -> Self {
        self.images.insert(name.to_string(), url.to_string());
        self
    }

    /// Respond with HTTP 403 for `name`.
    pub fn reject(mut self, name: &str) -> Self {
        self.rejected.insert(name.to_string());
        self
    }

    /// Respond with a 500 for `name`.
    pub fn fail(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    /// Names queried, in order, with the instant of each call.
    pub fn calls(&self) -> Vec<(String, Instant)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageSearch for MockImageSearch {
    async fn image_search(&self, query: &str, _count: u32) -> Result<Value, BraveError> {
        let name = query.strip_suffix(QUERY_SUFFIX).unwrap_or(query).to_string();
        self.calls.lock().unwrap().push((name.clone(), Instant::now()));

        if self.rejected.contains(&name) {
            return Err(BraveError::Unauthorized("invalid subscription token".into()));
        }
        if self.failing.contains(&name) {
            return Err(BraveError::Api {
                status: 500,
                message: "internal error".into(),
            });
        }
        Ok(match self.images.get(&name) {
            Some(url) => json!({"type": "images", "results": [{"properties": {"url": url}}]}),
            None => json!({"type": "images", "results": []}),
        })
    }
}

// ---------------------------------------------------------------------------
// MockDescriber
// ---------------------------------------------------------------------------

/// Image URL → description. Unregistered URLs fail.
#[derive(Default)]
pub struct MockDescriber {
    descriptions: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl MockDescriber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, image_url: &str, description: &str) -> Self {
        self.descriptions
            .insert(image_url.to_string(), description.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AvatarDescriber for MockDescriber {
    async fn describe(&self, image_url: &str) -> Result<String> {
        self.calls.lock().unwrap().push(image_url.to_string());
        match self.descriptions.get(image_url) {
            Some(text) => Ok(text.clone()),
            None => bail!("vision API error (status 400): could not fetch {image_url}"),
        }
    }
}

// ---------------------------------------------------------------------------
// MockMatcher
// ---------------------------------------------------------------------------

/// Image URL → match. Unregistered URLs fail. Clones share their data and
/// call log, so one instance can back a per-worker factory.
#[derive(Clone, Default)]
pub struct MockMatcher {
    matches: Arc<HashMap<String, AvatarMatch>>,
    panics: Arc<HashSet<String>>,
    log: CallLog,
}

impl MockMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, image_url: &str, result: AvatarMatch) -> Self {
        Arc::make_mut(&mut self.matches).insert(image_url.to_string(), result);
        self
    }

    /// Panic when asked to match `image_url`.
    pub fn panic_on(mut self, image_url: &str) -> Self {
        Arc::make_mut(&mut self.panics).insert(image_url.to_string());
        self
    }

    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }
}

#[async_trait]
impl AvatarMatcher for MockMatcher {
    async fn match_avatar(&self, image_url: &str, roster: &[AvatarProfile]) -> Result<AvatarMatch> {
        self.log.push(format!("match:{image_url}"));
        tokio::task::yield_now().await;
        if self.panics.contains(image_url) {
            panic!("matcher crashed on {image_url}");
        }
        if roster.is_empty() {
            bail!("empty roster");
        }
        match self.matches.get(image_url) {
            Some(result) => Ok(result.clone()),
            None => bail!("vision API error (status 400): invalid image {image_url}"),
        }
    }
}

// ---------------------------------------------------------------------------
// MockSearchChat
// ---------------------------------------------------------------------------

/// One scripted response for a research area.
#[derive(Debug, Clone)]
pub enum ChatStep {
    Answer(String, Vec<String>),
    Timeout,
    Fail(String),
}

/// Search chat that recognises the research area from the user prompt.
///
/// Scripted steps for an area are consumed in order; once exhausted, the area
/// gets a valid canned answer with no citations.
#[derive(Default)]
pub struct MockSearchChat {
    scripts: Mutex<HashMap<ResearchArea, VecDeque<ChatStep>>>,
    attempts: Mutex<HashMap<ResearchArea, u32>>,
}

impl MockSearchChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, area: ResearchArea, steps: Vec<ChatStep>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(area)
            .or_default()
            .extend(steps);
        self
    }

    pub fn attempts(&self, area: ResearchArea) -> u32 {
        self.attempts.lock().unwrap().get(&area).copied().unwrap_or(0)
    }

    pub fn total_attempts(&self) -> u32 {
        self.attempts.lock().unwrap().values().sum()
    }
}

/// Valid JSON body for `area`, matching its typed shape.
pub fn canned_area_json(area: ResearchArea) -> Value {
    match area {
        ResearchArea::Content => json!({
            "mainCategories": ["comedy"],
            "contentStyle": "deadpan skits",
            "postFrequency": "daily",
            "engagementRate": "high",
            "popularContentTypes": ["short skits"]
        }),
        ResearchArea::Background => json!({
            "biography": "Creator from Aruba.",
            "expertise": ["comedy"],
            "achievements": ["10M followers"],
            "careerHighlights": ["viral series"]
        }),
        ResearchArea::TargetAudience => json!({
            "demographics": ["18-24"],
            "interests": ["humor"],
            "locationFocus": "global",
            "engagementPatterns": "evenings"
        }),
        ResearchArea::KeyTopics => json!({
            "primaryTopics": ["everyday humor"],
            "recurringThemes": ["family"],
            "brandAlignments": ["snacks"],
            "valueProposition": "relatable laughs"
        }),
    }
}

#[async_trait]
impl SearchChat for MockSearchChat {
    async fn search_chat(&self, _system: &str, user: &str) -> Result<SearchAnswer, AiError> {
        let Some(area) = ResearchArea::ALL
            .iter()
            .copied()
            .find(|a| user.contains(a.prompt()))
        else {
            return Err(AiError::Api {
                status: 400,
                message: "unrecognised research prompt".into(),
            });
        };

        *self.attempts.lock().unwrap().entry(area).or_default() += 1;
        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&area)
            .and_then(|steps| steps.pop_front());

        tokio::task::yield_now().await;
        match step {
            Some(ChatStep::Answer(content, citations)) => Ok(SearchAnswer { content, citations }),
            Some(ChatStep::Timeout) => Err(AiError::Timeout("operation timed out".into())),
            Some(ChatStep::Fail(message)) => Err(AiError::Api {
                status: 500,
                message,
            }),
            None => Ok(SearchAnswer {
                content: canned_area_json(area).to_string(),
                citations: vec![],
            }),
        }
    }
}
