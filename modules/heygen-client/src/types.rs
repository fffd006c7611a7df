use serde::Deserialize;

/// Envelope for `GET /v2/avatars`. Either level may be absent on an empty account.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvatarListResponse {
    #[serde(default)]
    pub data: Option<AvatarListData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvatarListData {
    #[serde(default)]
    pub avatars: Vec<HeyGenAvatar>,
}

/// A single catalog entry as HeyGen returns it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HeyGenAvatar {
    pub avatar_id: String,
    pub avatar_name: String,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub preview_image_url: Option<String>,
}

impl AvatarListResponse {
    pub fn into_avatars(self) -> Vec<HeyGenAvatar> {
        self.data.map(|d| d.avatars).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_data_is_empty() {
        let resp: AvatarListResponse = serde_json::from_str(r#"{"error": null}"#).unwrap();
        assert!(resp.into_avatars().is_empty());
    }

    #[test]
    fn parses_catalog_entries() {
        let resp: AvatarListResponse = serde_json::from_str(
            r#"{"error": null, "data": {"avatars": [
                {"avatar_id": "Abigail_expressive_2024112501", "avatar_name": "Abigail (Upper Body)",
                 "gender": "female", "preview_image_url": "https://files.heygen.ai/a.webp",
                 "preview_video_url": "https://files.heygen.ai/a.mp4", "premium": false}
            ], "talking_photos": []}}"#,
        )
        .unwrap();

        let avatars = resp.into_avatars();
        assert_eq!(avatars.len(), 1);
        assert_eq!(avatars[0].avatar_id, "Abigail_expressive_2024112501");
        assert_eq!(avatars[0].gender.as_deref(), Some("female"));
    }
}
