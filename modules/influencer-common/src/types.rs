use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Base URL every seeded handle is appended to.
pub const TIKTOK_PROFILE_BASE: &str = "https://www.tiktok.com/@";

// --- Influencers ---

/// A freshly parsed influencer, as written by the seeder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInfluencer {
    pub id: Uuid,
    pub name: String,
    pub tiktok_profile_link: String,
}

impl NewInfluencer {
    pub fn new(name: &str, handle: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            tiktok_profile_link: format!("{TIKTOK_PROFILE_BASE}{}", handle.trim()),
        }
    }
}

/// An `influencers` row. Stages select only the columns they need, so
/// everything except the id defaults when absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Influencer {
    pub id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tiktok_profile_link: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub avatar_id: Option<String>,
}

impl Influencer {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

// --- Avatars ---

/// An `avatars` row as written by catalog sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Avatar {
    pub avatar_id: String,
    pub name: String,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// An avatar's id, preview image and generated description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarProfile {
    pub avatar_id: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Structured answer from the vision model when pairing an influencer with an avatar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AvatarMatch {
    /// Why this avatar resembles the person in the photo.
    pub reasoning: String,
    /// `avatar_id` of the chosen roster entry.
    pub best_match_avatar_id: String,
    /// Model confidence between 0 and 1.
    pub confidence_score: f64,
}

// --- Research ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentProfile {
    pub main_categories: Vec<String>,
    pub content_style: String,
    pub post_frequency: String,
    pub engagement_rate: String,
    pub popular_content_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Background {
    pub biography: String,
    pub expertise: Vec<String>,
    pub achievements: Vec<String>,
    pub career_highlights: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetAudience {
    pub demographics: Vec<String>,
    pub interests: Vec<String>,
    pub location_focus: String,
    pub engagement_patterns: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyTopics {
    pub primary_topics: Vec<String>,
    pub recurring_themes: Vec<String>,
    pub brand_alignments: Vec<String>,
    pub value_proposition: String,
}

/// Composite research output for one influencer. Serialized as the
/// `influencers.research` JSON payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchRecord {
    pub content: ContentProfile,
    pub background: Background,
    pub target_audience: TargetAudience,
    pub key_topics: KeyTopics,
    pub citations: Vec<String>,
}
