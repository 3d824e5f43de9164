// Vibe Analyzer: one vision call that turns a photo into a structured descriptor.

use super::sanitize::parse_json_object;
use crate::model::{GenerativeModel, ImageInput};
use crate::prompts::{PROMPTS, Prompt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

pub const VIBE_MAX_TOKENS: u32 = 260;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Safety {
    #[default]
    Yes,
    No,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VibeAnalysis {
    pub mood: String,
    pub scene: String,
    pub colors: String,
    #[serde(default, alias = "vibe_tags")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub safe: Safety,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

impl VibeAnalysis {
    /// Neutral analysis used whenever the model output is unusable.
    pub fn neutral() -> Self {
        Self {
            mood: "universal".into(),
            scene: "photo".into(),
            colors: "neutral".into(),
            tags: vec!["aesthetic".into(), "calm".into()],
            safe: Safety::Yes,
            persona: Some("natural vibe".into()),
            style: Some("minimalism".into()),
        }
    }

    pub fn is_safe(&self) -> bool {
        self.safe == Safety::Yes
    }

    // Parse model text; any parse or shape failure yields the neutral analysis.
    pub fn from_model_text(text: &str) -> Self {
        match parse_json_object(text) {
            Some(map) => Self::from_map(&map),
            None => {
                warn!("Vibe analysis was not a JSON object, using neutral analysis");
                Self::neutral()
            }
        }
    }

    // Field-tolerant extraction: wrong types fall back to neutral values per field.
    fn from_map(map: &Map<String, Value>) -> Self {
        let neutral = Self::neutral();
        let text = |key: &str| {
            map.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let tags = map
            .get("tags")
            .or_else(|| map.get("vibe_tags"))
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(Value::as_str)
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .unwrap_or(neutral.tags);

        // Anything other than an explicit "no" counts as safe.
        let safe = match text("safe").map(|s| s.to_lowercase()) {
            Some(s) if s == "no" => Safety::No,
            _ => Safety::Yes,
        };

        Self {
            mood: text("mood").unwrap_or(neutral.mood),
            scene: text("scene").unwrap_or(neutral.scene),
            colors: text("colors").unwrap_or(neutral.colors),
            tags,
            safe,
            persona: text("persona"),
            style: text("style"),
        }
    }
}

/// Run one multimodal call and always come back with some analysis.
pub async fn analyze(model: &dyn GenerativeModel, image_bytes: &[u8]) -> VibeAnalysis {
    let prompt = PROMPTS.get(Prompt::Vibe);
    match model
        .complete(prompt, Some(ImageInput { bytes: image_bytes }), VIBE_MAX_TOKENS)
        .await
    {
        Ok(text) => VibeAnalysis::from_model_text(&text),
        Err(e) => {
            warn!("Vibe analysis call failed: {e}");
            VibeAnalysis::neutral()
        }
    }
}
