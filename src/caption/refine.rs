// Refinement: rewrite a chosen caption shorter or longer.

use super::preferences::UserPreferences;
use super::sanitize::clean_caption;
use crate::model::{GenerativeModel, ModelError};
use crate::prompts::{PROMPTS, Prompt};
use strum::{AsRefStr, EnumString};

pub const REFINE_MAX_TOKENS: u32 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum RefineDirection {
    Shorter,
    Longer,
}

impl RefineDirection {
    fn instruction(self) -> &'static str {
        match self {
            RefineDirection::Shorter => "Make it shorter: at most 8 words.",
            RefineDirection::Longer => "Make it longer: one or two lines.",
        }
    }
}

pub fn build_prompt(caption: &str, direction: RefineDirection, prefs: &UserPreferences) -> String {
    PROMPTS.render(
        Prompt::Refine,
        &[
            ("language", prefs.language.prompt_name()),
            ("direction", direction.instruction()),
            ("tone", prefs.tone.descriptor()),
            ("policy", prefs.content_mode.policy()),
            ("caption", caption),
        ],
    )
}

/// One model call; the caller keeps the previous caption on `Err`.
pub async fn rewrite(
    model: &dyn GenerativeModel,
    caption: &str,
    direction: RefineDirection,
    prefs: &UserPreferences,
) -> Result<String, ModelError> {
    let prompt = build_prompt(caption, direction, prefs);
    let text = model.complete(&prompt, None, REFINE_MAX_TOKENS).await?;

    // Models sometimes add a preamble line; the caption is the last non-empty line.
    let line = text.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
    let cleaned = clean_caption(line);
    if cleaned.is_empty() {
        Err(ModelError::EmptyResponse)
    } else {
        Ok(cleaned)
    }
}
