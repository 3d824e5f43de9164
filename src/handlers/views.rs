// HTML message bodies. User-originated and model-originated text is always escaped.

use super::keyboards::{gender_label, language_label, length_label, mode_label, tone_label};
use crate::caption::UserPreferences;
use crate::service::Presentation;
use crate::store::{FavoriteCaption, QuotaRecord};
use html_escape::encode_text;

pub const WELCOME: &str = "Hi! I write captions for your photos 📸\n\nFirst, a quick setup.\n<b>Step 1/3:</b> which style should captions have?";
pub const ASK_GENDER: &str = "Which style should captions have?";
pub const ASK_MODE: &str = "<b>Step 2/3:</b> content mode?";
pub const ASK_ADULT_CONFIRM: &str = "18+ mode allows profanity and rougher language. \
Sexual content, hate and threats stay off-limits.\nAre you 18 or older?";
pub const ASK_TONE: &str = "<b>Step 3/3:</b> pick a tone.";
pub const ASK_LENGTH: &str = "Caption length?";
pub const ASK_LANGUAGE: &str = "Caption language?";
pub const SEND_PHOTO: &str = "All set ✅ Now send me a photo.";
pub const SEND_PHOTO_OR_START: &str = "Send me a photo 📸 or press /start to set up your style.";
pub const NEEDS_PHOTO: &str = "Send a photo first 📸";
pub const UNSAFE_PHOTO: &str = "🚫 I can't caption this photo. Please send another one.";
pub const WAIT: &str = "✨ Picking captions…";
pub const STALE_BUTTON: &str = "This button is outdated. Send a new photo or press /start.";
pub const STALE_BATCH: &str = "These variants are outdated. Press \"More\" or send a new photo.";
pub const NOTHING_SELECTED: &str = "Pick a caption first.";
pub const SUPERSEDED: &str = "A newer set of variants replaced this one.";
pub const INTERNAL_ERROR: &str = "Something went wrong on my side. Please try again.";

pub fn presentation(p: &Presentation) -> String {
    let mut out = String::from("Here are your captions:\n");
    for (i, v) in p.variants.iter().enumerate() {
        out.push_str(&format!("\n<b>{}.</b> {}\n", i + 1, encode_text(v)));
    }
    if p.degraded {
        out.push_str("\n<i>The caption service is busy, so these come from my stash.</i>\n");
    }
    if p.rerank_enabled {
        out.push_str("\n⚡ Super mode picked the best three.");
    }
    out.trim_end().to_string()
}

pub fn selected(caption: &str) -> String {
    format!("✅ Your caption:\n\n<b>{}</b>", encode_text(caption))
}

pub fn refined(caption: &str) -> String {
    format!("✏️ Rewritten:\n\n<b>{}</b>", encode_text(caption))
}

pub fn refine_failed(kept: &str) -> String {
    format!(
        "Couldn't rewrite it right now. Your caption stays:\n\n<b>{}</b>",
        encode_text(kept)
    )
}

pub fn saved(total: i64) -> String {
    format!("⭐ Saved! You have {total} in favorites.")
}

pub fn settings(prefs: &UserPreferences) -> String {
    format!(
        "<b>Your settings</b>\n\nStyle: {}\nMode: {}\nTone: {}\nLength: {}\nLanguage: {}\nSuper mode: {}",
        gender_label(prefs.gender_style),
        mode_label(prefs.content_mode),
        tone_label(prefs.tone),
        length_label(prefs.length),
        language_label(prefs.language),
        if prefs.rerank_enabled { "on" } else { "off" },
    )
}

pub fn favorites(list: &[FavoriteCaption], total: i64) -> String {
    if list.is_empty() {
        return "No favorites yet. Pick a caption and tap ⭐ to save it.".to_string();
    }
    let mut out = format!("<b>⭐ Favorites</b> ({total} total, newest first)\n");
    for (i, f) in list.iter().enumerate() {
        out.push_str(&format!(
            "\n{}. {} <i>({})</i>",
            i + 1,
            encode_text(&f.text),
            f.created_at.format("%Y-%m-%d")
        ));
    }
    out
}

pub fn quota(record: &QuotaRecord, daily_limit: u32) -> String {
    format!(
        "📊 Today: {} of {daily_limit} used, {} left.\nAll time: {}.",
        record.requests_used,
        daily_limit.saturating_sub(record.requests_used),
        record.lifetime_requests_used
    )
}
