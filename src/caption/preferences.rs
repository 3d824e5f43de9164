// Per-user caption settings and the enumerations they are built from.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, AsRefStr, EnumString, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GenderStyle {
    Female,
    Male,
    #[default]
    Universal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, AsRefStr, EnumString, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CaptionLength {
    Short,
    #[default]
    Medium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, AsRefStr, EnumString, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContentMode {
    #[default]
    Clean,
    Adult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, AsRefStr, EnumString, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Tone {
    #[default]
    Instagram,
    Romantic,
    Bold,
    Minimal,
    Poetic,
    Ironic,
    Motivational,
    Cinematic,
    Funny,
    Wise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, AsRefStr, EnumString, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Language {
    #[default]
    En,
    Ru,
    Es,
    De,
    Fr,
    It,
    Pt,
    Uk,
}

impl GenderStyle {
    pub fn descriptor(self) -> &'static str {
        match self {
            GenderStyle::Female => "Feminine voice: aesthetic, soft, self-assured.",
            GenderStyle::Male => "Masculine voice: restrained, confident, a little daring is fine.",
            GenderStyle::Universal => "Universal voice: suits anyone, natural and good-looking.",
        }
    }
}

impl CaptionLength {
    pub fn instruction(self) -> &'static str {
        match self {
            CaptionLength::Short => "Very short: at most 8 words.",
            CaptionLength::Medium => "Medium length: one or two lines.",
        }
    }
}

impl ContentMode {
    pub fn policy(self) -> &'static str {
        match self {
            ContentMode::Clean => "Strictly no profanity and no insults.",
            ContentMode::Adult => {
                "Profanity is allowed (18+), but never harassment, hate towards groups of people, \
                 threats, calls to violence, or sexual content."
            }
        }
    }
}

impl Tone {
    pub fn descriptor(self) -> &'static str {
        match self {
            Tone::Instagram => "Spot-on for the photo's vibe, modern and natural, like a great Instagram caption.",
            Tone::Romantic => "Tender and romantic, warm without being syrupy.",
            Tone::Bold => "Bold and confident, but never toxic or rude.",
            Tone::Minimal => "Minimalist: few words, clean, understated.",
            Tone::Poetic => "Poetic imagery and rhythm, without pathos.",
            Tone::Ironic => "Light irony and self-awareness, clever rather than mean.",
            Tone::Motivational => "Quietly motivating, no clichéd pep talk.",
            Tone::Cinematic => "Cinematic, like a line from a film scene.",
            Tone::Funny => "Funny and smart, light irony, never cringe.",
            Tone::Wise => "Wise and deep, but without banal slogans.",
        }
    }
}

impl Language {
    // Name used inside prompts.
    pub fn prompt_name(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Ru => "Russian",
            Language::Es => "Spanish",
            Language::De => "German",
            Language::Fr => "French",
            Language::It => "Italian",
            Language::Pt => "Portuguese",
            Language::Uk => "Ukrainian",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserPreferences {
    pub gender_style: GenderStyle,
    pub length: CaptionLength,
    pub content_mode: ContentMode,
    pub adult_confirmed: bool,
    pub tone: Tone,
    pub language: Language,
    pub rerank_enabled: bool,
}

/// Field-by-field update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferencesPatch {
    pub gender_style: Option<GenderStyle>,
    pub length: Option<CaptionLength>,
    pub content_mode: Option<ContentMode>,
    pub adult_confirmed: Option<bool>,
    pub tone: Option<Tone>,
    pub language: Option<Language>,
    pub rerank_enabled: Option<bool>,
}

impl PreferencesPatch {
    // Leave adult mode, or enter it after the user confirmed. Keeps the mode/flag pair consistent.
    pub fn content(mode: ContentMode) -> Self {
        Self {
            content_mode: Some(mode),
            adult_confirmed: Some(mode == ContentMode::Adult),
            ..Self::default()
        }
    }

    /// Changes that make already generated candidates stale.
    pub fn changes_style(&self) -> bool {
        self.gender_style.is_some()
            || self.length.is_some()
            || self.content_mode.is_some()
            || self.tone.is_some()
            || self.language.is_some()
    }

    pub fn apply(&self, prefs: &mut UserPreferences) {
        if let Some(v) = self.gender_style {
            prefs.gender_style = v;
        }
        if let Some(v) = self.length {
            prefs.length = v;
        }
        if let Some(v) = self.content_mode {
            prefs.content_mode = v;
        }
        if let Some(v) = self.adult_confirmed {
            prefs.adult_confirmed = v;
        }
        if let Some(v) = self.tone {
            prefs.tone = v;
        }
        if let Some(v) = self.language {
            prefs.language = v;
        }
        if let Some(v) = self.rerank_enabled {
            prefs.rerank_enabled = v;
        }
    }
}
