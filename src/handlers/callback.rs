// Inline-button presses: settings wizard, picks, refinement, favorites.

use super::keyboards::{
    adult_confirm_keyboard, gender_keyboard, language_keyboard, length_keyboard, mode_keyboard,
    selection_keyboard, tone_keyboard,
};
use super::photo::{send_generation_outcome, with_progress};
use super::utils::{Origin, send_reply_or_plain};
use super::views;
use crate::action::{CallbackAction, NavTarget};
use crate::caption::{ContentMode, PreferencesPatch};
use crate::service::{CaptionService, FavoriteOutcome, PickOutcome, RefineOutcome};
use std::sync::Arc;
use teloxide::{
    prelude::*,
    types::{InlineKeyboardMarkup, MessageId, ParseMode},
};
use tracing::{debug, error, warn};

// The message a button was attached to.
#[derive(Clone, Copy)]
struct Anchor {
    origin: Origin,
    message_id: MessageId,
}

// Best effort: an expired query must not abort the action itself.
async fn answer(bot: &Bot, q: &CallbackQuery, notice: Option<&str>) {
    let mut req = bot.answer_callback_query(q.id.clone());
    if let Some(text) = notice {
        req = req.text(text);
    }
    if let Err(e) = req.await {
        warn!("answer_callback_query failed: {e}");
    }
}

// Replace the wizard message in place; fall back to a new message if it can't be edited.
async fn show_step(
    bot: &Bot,
    anchor: Anchor,
    text: &str,
    keyboard: InlineKeyboardMarkup,
) -> Result<(), teloxide::RequestError> {
    let edited = bot
        .edit_message_text(anchor.origin.chat_id, anchor.message_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard.clone())
        .await;
    if let Err(e) = edited {
        debug!("Falling back to a new message: {e}");
        send_reply_or_plain(bot, anchor.origin, text, Some(keyboard)).await?;
    }
    Ok(())
}

async fn close_step(bot: &Bot, anchor: Anchor, text: &str) -> Result<(), teloxide::RequestError> {
    if bot
        .edit_message_text(anchor.origin.chat_id, anchor.message_id, text)
        .parse_mode(ParseMode::Html)
        .await
        .is_err()
    {
        send_reply_or_plain(bot, anchor.origin, text, None).await?;
    }
    Ok(())
}

pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    service: Arc<CaptionService>,
) -> Result<(), teloxide::RequestError> {
    let user_id = q.from.id.0 as i64;
    let Some(message) = q.regular_message() else {
        answer(&bot, &q, Some(views::STALE_BUTTON)).await;
        return Ok(());
    };
    let anchor = Anchor {
        origin: Origin {
            user_id,
            chat_id: message.chat.id,
            thread_id: message.thread_id,
        },
        message_id: message.id,
    };

    let action = match CallbackAction::decode(q.data.as_deref().unwrap_or_default()) {
        Ok(a) => a,
        Err(e) => {
            debug!("Undecodable callback from user {user_id}: {e}");
            answer(&bot, &q, Some(views::STALE_BUTTON)).await;
            return Ok(());
        }
    };

    match action {
        CallbackAction::Gender(g) => {
            answer(&bot, &q, None).await;
            let patch = PreferencesPatch {
                gender_style: Some(g),
                ..Default::default()
            };
            if apply(&bot, &service, anchor.origin, &patch).await? {
                show_step(&bot, anchor, views::ASK_MODE, mode_keyboard()).await?;
            }
        }
        CallbackAction::Mode(ContentMode::Adult) => {
            answer(&bot, &q, None).await;
            show_step(&bot, anchor, views::ASK_ADULT_CONFIRM, adult_confirm_keyboard()).await?;
        }
        CallbackAction::Mode(ContentMode::Clean) | CallbackAction::AdultConfirm(false) => {
            answer(&bot, &q, None).await;
            let patch = PreferencesPatch::content(ContentMode::Clean);
            if apply(&bot, &service, anchor.origin, &patch).await? {
                show_step(&bot, anchor, views::ASK_TONE, tone_keyboard()).await?;
            }
        }
        CallbackAction::AdultConfirm(true) => {
            answer(&bot, &q, None).await;
            let patch = PreferencesPatch::content(ContentMode::Adult);
            if apply(&bot, &service, anchor.origin, &patch).await? {
                show_step(&bot, anchor, views::ASK_TONE, tone_keyboard()).await?;
            }
        }
        CallbackAction::Tone(t) => {
            answer(&bot, &q, None).await;
            let patch = PreferencesPatch {
                tone: Some(t),
                ..Default::default()
            };
            if apply(&bot, &service, anchor.origin, &patch).await? {
                service.finish_settings(user_id);
                close_step(&bot, anchor, views::SEND_PHOTO).await?;
            }
        }
        CallbackAction::Length(l) => {
            answer(&bot, &q, None).await;
            let patch = PreferencesPatch {
                length: Some(l),
                ..Default::default()
            };
            if !apply(&bot, &service, anchor.origin, &patch).await? {
                return Ok(());
            }
            match service.has_analysis(user_id).await {
                Ok(true) => {
                    close_step(&bot, anchor, "Length saved. Rewriting for your last photo…").await?;
                    let outcome = with_progress(&bot, anchor.origin, service.more_variants(user_id)).await;
                    send_generation_outcome(&bot, anchor.origin, outcome).await?;
                }
                Ok(false) => {
                    service.finish_settings(user_id);
                    close_step(&bot, anchor, views::SEND_PHOTO).await?;
                }
                Err(e) => {
                    error!("Store error for user {user_id}: {e}");
                    send_reply_or_plain(&bot, anchor.origin, views::INTERNAL_ERROR, None).await?;
                }
            }
        }
        CallbackAction::Language(l) => {
            answer(&bot, &q, None).await;
            let patch = PreferencesPatch {
                language: Some(l),
                ..Default::default()
            };
            if apply(&bot, &service, anchor.origin, &patch).await? {
                close_step(&bot, anchor, "Language saved ✅").await?;
            }
        }
        CallbackAction::SuperMode(on) => {
            let patch = PreferencesPatch {
                rerank_enabled: Some(on),
                ..Default::default()
            };
            match service.apply_setting(user_id, &patch).await {
                Ok(_) => {
                    let notice = if on {
                        "⚡ Super mode on: the best three of ten"
                    } else {
                        "Super mode off"
                    };
                    answer(&bot, &q, Some(notice)).await;
                }
                Err(e) => {
                    error!("Could not toggle super mode for user {user_id}: {e}");
                    answer(&bot, &q, Some(views::INTERNAL_ERROR)).await;
                }
            }
        }
        CallbackAction::Nav(target) => {
            answer(&bot, &q, None).await;
            let (text, keyboard) = match target {
                NavTarget::Gender => (views::ASK_GENDER, gender_keyboard()),
                NavTarget::Mode => (views::ASK_MODE, mode_keyboard()),
                NavTarget::Tone => (views::ASK_TONE, tone_keyboard()),
                NavTarget::Length => (views::ASK_LENGTH, length_keyboard()),
                NavTarget::Lang => (views::ASK_LANGUAGE, language_keyboard()),
            };
            // Candidate messages keep their variants; the step opens below them.
            send_reply_or_plain(&bot, anchor.origin, text, Some(keyboard)).await?;
        }
        CallbackAction::More => {
            answer(&bot, &q, None).await;
            let outcome = with_progress(&bot, anchor.origin, service.more_variants(user_id)).await;
            send_generation_outcome(&bot, anchor.origin, outcome).await?;
        }
        CallbackAction::Pick { batch_id, index } => match service.pick(user_id, &batch_id, index) {
            PickOutcome::Selected(caption) => {
                answer(&bot, &q, None).await;
                send_reply_or_plain(
                    &bot,
                    anchor.origin,
                    views::selected(&caption),
                    Some(selection_keyboard()),
                )
                .await?;
            }
            PickOutcome::Stale(_) => {
                answer(&bot, &q, Some(views::STALE_BATCH)).await;
            }
        },
        CallbackAction::Refine(direction) => {
            answer(&bot, &q, None).await;
            let outcome = with_progress(&bot, anchor.origin, service.refine(user_id, direction)).await;
            let (text, keyboard) = match outcome {
                Ok(RefineOutcome::Refined(caption)) => {
                    (views::refined(&caption), Some(selection_keyboard()))
                }
                Ok(RefineOutcome::Failed { kept }) => {
                    (views::refine_failed(&kept), Some(selection_keyboard()))
                }
                Ok(RefineOutcome::Denied(denial)) => (denial.message(), None),
                Ok(RefineOutcome::NothingSelected) => (views::NOTHING_SELECTED.to_string(), None),
                Ok(RefineOutcome::Superseded) => (views::SUPERSEDED.to_string(), None),
                Err(e) => {
                    error!("Refine failed for user {user_id}: {e}");
                    (views::INTERNAL_ERROR.to_string(), None)
                }
            };
            send_reply_or_plain(&bot, anchor.origin, text, keyboard).await?;
        }
        CallbackAction::SaveFavorite => match service.save_favorite(user_id).await {
            Ok(FavoriteOutcome::Saved { total, .. }) => {
                answer(&bot, &q, Some(views::saved(total).as_str())).await;
            }
            Ok(FavoriteOutcome::NothingSelected) => {
                answer(&bot, &q, Some(views::NOTHING_SELECTED)).await;
            }
            Err(e) => {
                error!("Could not save favorite for user {user_id}: {e}");
                answer(&bot, &q, Some(views::INTERNAL_ERROR)).await;
            }
        },
    }

    Ok(())
}

// Persist a settings change; on store failure tell the user and report `false`.
async fn apply(
    bot: &Bot,
    service: &CaptionService,
    origin: Origin,
    patch: &PreferencesPatch,
) -> Result<bool, teloxide::RequestError> {
    match service.apply_setting(origin.user_id, patch).await {
        Ok(_) => Ok(true),
        Err(e) => {
            error!("Could not update preferences for user {}: {e}", origin.user_id);
            send_reply_or_plain(bot, origin, views::INTERNAL_ERROR, None).await?;
            Ok(false)
        }
    }
}

