// Photo messages and every other path that ends in a fresh set of variants.

use super::keyboards::candidates_keyboard;
use super::utils::{
    ChatActionKeepAlive, Origin, UNKNOWN_USER, download_photo, extract_user_info,
    largest_photo_file_id, send_reply_or_plain,
};
use super::views;
use crate::service::{CaptionService, GenerationOutcome};
use crate::store::StoreError;
use std::future::Future;
use std::sync::Arc;
use teloxide::{prelude::*, types::ChatAction};
use tracing::{error, info, warn};

pub async fn handle_photo(
    bot: Bot,
    msg: Message,
    service: Arc<CaptionService>,
) -> Result<(), teloxide::RequestError> {
    let origin = match extract_user_info(&msg) {
        Ok(o) => o,
        Err(text) => {
            bot.send_message(msg.chat.id, text).await?;
            return Ok(());
        }
    };

    let Some(file_id) = largest_photo_file_id(&msg) else {
        send_reply_or_plain(&bot, origin, views::SEND_PHOTO_OR_START, None).await?;
        return Ok(());
    };
    info!("Photo received from user {}", origin.user_id);

    let fetch_bot = bot.clone();
    let outcome = with_progress(&bot, origin, async {
        service
            .process_photo(origin.user_id, download_photo(&fetch_bot, file_id))
            .await
    })
    .await;

    send_generation_outcome(&bot, origin, outcome).await
}

/// Run `work` with a typing indicator and a transient wait message.
pub(super) async fn with_progress<T>(bot: &Bot, origin: Origin, work: impl Future<Output = T>) -> T {
    let mut keep =
        ChatActionKeepAlive::spawn(bot.clone(), origin.chat_id, origin.thread_id, ChatAction::Typing, 4);

    let wait = match send_reply_or_plain(bot, origin, views::WAIT, None).await {
        Ok(m) => Some(m),
        Err(e) => {
            warn!("Could not send wait message: {e}");
            None
        }
    };

    let result = work.await;
    keep.shutdown().await;

    if let Some(m) = wait
        && let Err(e) = bot.delete_message(m.chat.id, m.id).await
    {
        warn!("Could not delete wait message: {e}");
    }
    result
}

pub(super) async fn send_generation_outcome(
    bot: &Bot,
    origin: Origin,
    outcome: Result<GenerationOutcome, StoreError>,
) -> Result<(), teloxide::RequestError> {
    match outcome {
        Ok(GenerationOutcome::Presented(p)) => {
            let keyboard =
                candidates_keyboard(&p.batch_id, p.variants.len(), p.quota_left, p.rerank_enabled);
            send_reply_or_plain(bot, origin, views::presentation(&p), Some(keyboard)).await?;
        }
        Ok(GenerationOutcome::Unsafe) => {
            send_reply_or_plain(bot, origin, views::UNSAFE_PHOTO, None).await?;
        }
        Ok(GenerationOutcome::Denied(denial)) => {
            send_reply_or_plain(bot, origin, denial.message(), None).await?;
        }
        Ok(GenerationOutcome::NeedsPhoto) => {
            send_reply_or_plain(bot, origin, views::NEEDS_PHOTO, None).await?;
        }
        Err(e) => {
            error!("Generation failed for user {}: {e}", origin.user_id);
            send_reply_or_plain(bot, origin, views::INTERNAL_ERROR, None).await?;
        }
    }
    Ok(())
}

// Answer text messages that are neither commands nor photos.
pub async fn handle_other(bot: Bot, msg: Message) -> Result<(), teloxide::RequestError> {
    match extract_user_info(&msg) {
        Ok(origin) => {
            send_reply_or_plain(&bot, origin, views::SEND_PHOTO_OR_START, None).await?;
        }
        Err(_) => {
            bot.send_message(msg.chat.id, UNKNOWN_USER).await?;
        }
    }
    Ok(())
}
