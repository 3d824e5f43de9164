// Candidate Generator: vibe + preferences -> up to `count` clean, distinct captions.

use super::preferences::{CaptionLength, UserPreferences};
use super::sanitize::{normalize_captions, parse_json_object};
use super::vibe::VibeAnalysis;
use crate::model::GenerativeModel;
use crate::prompts::{PROMPTS, Prompt};
use serde_json::Value;
use tracing::warn;

pub const DEFAULT_CANDIDATES: usize = 10;

pub const BANNED_CLICHES: &[&str] = &[
    "follow your dreams",
    "success",
    "just be yourself",
    "never give up",
    "live in the moment",
    "anything is possible",
    "happiness is in the little things",
    "inner strength",
    "good vibes only",
    "living my best life",
];

pub fn max_tokens_for(length: CaptionLength) -> u32 {
    match length {
        CaptionLength::Short => 280,
        CaptionLength::Medium => 420,
    }
}

pub fn build_prompt(analysis: &VibeAnalysis, prefs: &UserPreferences, count: usize) -> String {
    let count = count.to_string();
    let tags = analysis.tags.join(", ");
    let banned = BANNED_CLICHES.join(", ");
    PROMPTS.render(
        Prompt::Captions,
        &[
            ("language", prefs.language.prompt_name()),
            ("gender", prefs.gender_style.descriptor()),
            ("tone", prefs.tone.descriptor()),
            ("length", prefs.length.instruction()),
            ("policy", prefs.content_mode.policy()),
            ("banned", banned.as_str()),
            ("count", count.as_str()),
            ("mood", analysis.mood.as_str()),
            ("persona", analysis.persona.as_deref().unwrap_or("-")),
            ("scene", analysis.scene.as_str()),
            ("style", analysis.style.as_deref().unwrap_or("-")),
            ("colors", analysis.colors.as_str()),
            ("tags", tags.as_str()),
        ],
    )
}

// Extract `{"captions": [...]}`; any shape failure means no candidates.
pub fn parse_candidates(text: &str, count: usize) -> Vec<String> {
    let Some(map) = parse_json_object(text) else {
        warn!("Caption output was not a JSON object");
        return Vec::new();
    };
    match map.get("captions") {
        Some(Value::Array(items)) => normalize_captions(items, count),
        _ => {
            warn!("Caption output had no `captions` array");
            Vec::new()
        }
    }
}

/// Returns 0..=count captions. Empty means failure; the caller picks a fallback.
pub async fn generate(
    model: &dyn GenerativeModel,
    analysis: &VibeAnalysis,
    prefs: &UserPreferences,
    count: usize,
) -> Vec<String> {
    let prompt = build_prompt(analysis, prefs, count);
    match model.complete(&prompt, None, max_tokens_for(prefs.length)).await {
        Ok(text) => parse_candidates(&text, count),
        Err(e) => {
            warn!("Caption generation call failed: {e}");
            Vec::new()
        }
    }
}
