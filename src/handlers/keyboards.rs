// Inline keyboards. Every button carries an encoded `CallbackAction`.

use crate::action::{CallbackAction, NavTarget};
use crate::caption::{CaptionLength, ContentMode, GenderStyle, Language, RefineDirection, Tone};
use strum::IntoEnumIterator;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

fn button(label: impl Into<String>, action: CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(label, action.encode())
}

pub fn gender_label(g: GenderStyle) -> &'static str {
    match g {
        GenderStyle::Female => "👩 Female",
        GenderStyle::Male => "👨 Male",
        GenderStyle::Universal => "🌐 Universal",
    }
}

pub fn mode_label(m: ContentMode) -> &'static str {
    match m {
        ContentMode::Clean => "😇 Clean",
        ContentMode::Adult => "🔥 18+",
    }
}

pub fn length_label(l: CaptionLength) -> &'static str {
    match l {
        CaptionLength::Short => "✂️ Short",
        CaptionLength::Medium => "📝 Medium",
    }
}

pub fn tone_label(t: Tone) -> &'static str {
    match t {
        Tone::Instagram => "📸 Instagram",
        Tone::Romantic => "💞 Romantic",
        Tone::Bold => "😎 Bold",
        Tone::Minimal => "▫️ Minimal",
        Tone::Poetic => "🌙 Poetic",
        Tone::Ironic => "🙃 Ironic",
        Tone::Motivational => "🚀 Motivational",
        Tone::Cinematic => "🎬 Cinematic",
        Tone::Funny => "😂 Funny",
        Tone::Wise => "🦉 Wise",
    }
}

pub fn language_label(l: Language) -> &'static str {
    match l {
        Language::En => "🇬🇧 EN",
        Language::Ru => "🇷🇺 RU",
        Language::Es => "🇪🇸 ES",
        Language::De => "🇩🇪 DE",
        Language::Fr => "🇫🇷 FR",
        Language::It => "🇮🇹 IT",
        Language::Pt => "🇵🇹 PT",
        Language::Uk => "🇺🇦 UK",
    }
}

// Lay out `buttons` in rows of `per_row`.
fn grid(buttons: Vec<InlineKeyboardButton>, per_row: usize) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(buttons.chunks(per_row).map(<[_]>::to_vec))
}

pub fn gender_keyboard() -> InlineKeyboardMarkup {
    grid(
        GenderStyle::iter()
            .map(|g| button(gender_label(g), CallbackAction::Gender(g)))
            .collect(),
        3,
    )
}

pub fn mode_keyboard() -> InlineKeyboardMarkup {
    grid(
        ContentMode::iter()
            .map(|m| button(mode_label(m), CallbackAction::Mode(m)))
            .collect(),
        2,
    )
}

pub fn adult_confirm_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[
        button("✅ Yes, I'm 18+", CallbackAction::AdultConfirm(true)),
        button("↩️ No, keep it clean", CallbackAction::AdultConfirm(false)),
    ]])
}

pub fn tone_keyboard() -> InlineKeyboardMarkup {
    grid(
        Tone::iter()
            .map(|t| button(tone_label(t), CallbackAction::Tone(t)))
            .collect(),
        2,
    )
}

pub fn length_keyboard() -> InlineKeyboardMarkup {
    grid(
        CaptionLength::iter()
            .map(|l| button(length_label(l), CallbackAction::Length(l)))
            .collect(),
        2,
    )
}

pub fn language_keyboard() -> InlineKeyboardMarkup {
    grid(
        Language::iter()
            .map(|l| button(language_label(l), CallbackAction::Language(l)))
            .collect(),
        4,
    )
}

fn super_button(rerank_enabled: bool) -> InlineKeyboardButton {
    let label = if rerank_enabled {
        "⚡ Super mode: ON"
    } else {
        "⚡ Super mode: OFF"
    };
    button(label, CallbackAction::SuperMode(!rerank_enabled))
}

fn nav_row() -> Vec<InlineKeyboardButton> {
    vec![
        button("🎭 Style", CallbackAction::Nav(NavTarget::Gender)),
        button("🔞 Mode", CallbackAction::Nav(NavTarget::Mode)),
        button("🎨 Tone", CallbackAction::Nav(NavTarget::Tone)),
        button("📏 Length", CallbackAction::Nav(NavTarget::Length)),
    ]
}

pub fn settings_keyboard(rerank_enabled: bool) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        nav_row(),
        vec![
            button("🌍 Language", CallbackAction::Nav(NavTarget::Lang)),
            super_button(rerank_enabled),
        ],
    ])
}

/// One pick button per variant, then "more", the super-mode toggle and navigation.
pub fn candidates_keyboard(
    batch_id: &str,
    variant_count: usize,
    quota_left: u32,
    rerank_enabled: bool,
) -> InlineKeyboardMarkup {
    let picks: Vec<InlineKeyboardButton> = (0..variant_count)
        .map(|index| {
            button(
                format!("✅ {}", index + 1),
                CallbackAction::Pick {
                    batch_id: batch_id.to_string(),
                    index,
                },
            )
        })
        .collect();

    InlineKeyboardMarkup::new([
        picks,
        vec![button(
            format!("🔁 More variants ({quota_left} left)"),
            CallbackAction::More,
        )],
        vec![super_button(rerank_enabled)],
        nav_row(),
    ])
}

pub fn selection_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        vec![
            button("➖ Shorter", CallbackAction::Refine(RefineDirection::Shorter)),
            button("➕ Longer", CallbackAction::Refine(RefineDirection::Longer)),
        ],
        vec![button("⭐ Save to favorites", CallbackAction::SaveFavorite)],
        vec![button("🔁 More variants", CallbackAction::More)],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::InlineKeyboardButtonKind;

    fn payloads(markup: &InlineKeyboardMarkup) -> Vec<String> {
        markup
            .inline_keyboard
            .iter()
            .flatten()
            .filter_map(|b| match &b.kind {
                InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn every_payload_decodes_and_fits_telegram_limit() {
        let boards = [
            gender_keyboard(),
            mode_keyboard(),
            adult_confirm_keyboard(),
            tone_keyboard(),
            length_keyboard(),
            language_keyboard(),
            settings_keyboard(false),
            candidates_keyboard("AbC-12_x", 3, 17, true),
            selection_keyboard(),
        ];
        for board in &boards {
            for data in payloads(board) {
                assert!(data.len() <= 64, "{data} is too long");
                assert!(CallbackAction::decode(&data).is_ok(), "{data} does not decode");
            }
        }
    }

    #[test]
    fn candidate_buttons_point_at_their_batch() {
        let board = candidates_keyboard("b1", 3, 5, false);
        let data = payloads(&board);
        assert_eq!(&data[..3], ["pick:b1:0", "pick:b1:1", "pick:b1:2"]);
        assert!(data.contains(&"more".to_string()));
        assert!(data.contains(&"super:on".to_string()));

        let more = board.inline_keyboard[1][0].text.clone();
        assert_eq!(more, "🔁 More variants (5 left)");
    }

    #[test]
    fn tone_keyboard_lists_all_tones_two_per_row() {
        let board = tone_keyboard();
        assert_eq!(board.inline_keyboard.len(), 5);
        assert_eq!(payloads(&board).len(), Tone::iter().count());
    }
}
