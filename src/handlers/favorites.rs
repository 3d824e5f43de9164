// Read-only account views: /settings, /favorites and /quota.

use crate::handlers::keyboards::settings_keyboard;
use crate::handlers::utils::{Origin, send_reply_or_plain};
use crate::handlers::views;
use crate::service::CaptionService;
use teloxide::prelude::*;
use tracing::error;

pub async fn settings(
    bot: &Bot,
    origin: Origin,
    service: &CaptionService,
) -> Result<(), teloxide::RequestError> {
    match service.preferences(origin.user_id).await {
        Ok(prefs) => {
            let keyboard = settings_keyboard(prefs.rerank_enabled);
            send_reply_or_plain(bot, origin, views::settings(&prefs), Some(keyboard)).await?;
        }
        Err(e) => {
            error!("Could not load preferences for user {}: {e}", origin.user_id);
            send_reply_or_plain(bot, origin, views::INTERNAL_ERROR, None).await?;
        }
    }
    Ok(())
}

pub async fn favorites(
    bot: &Bot,
    origin: Origin,
    service: &CaptionService,
) -> Result<(), teloxide::RequestError> {
    let text = match service.favorites(origin.user_id).await {
        Ok((list, total)) => views::favorites(&list, total),
        Err(e) => {
            error!("Could not load favorites for user {}: {e}", origin.user_id);
            views::INTERNAL_ERROR.to_string()
        }
    };
    send_reply_or_plain(bot, origin, text, None).await?;
    Ok(())
}

pub async fn quota(
    bot: &Bot,
    origin: Origin,
    service: &CaptionService,
) -> Result<(), teloxide::RequestError> {
    let text = match service.quota_status(origin.user_id).await {
        Ok((record, limit)) => views::quota(&record, limit),
        Err(e) => {
            error!("Could not load quota for user {}: {e}", origin.user_id);
            views::INTERNAL_ERROR.to_string()
        }
    };
    send_reply_or_plain(bot, origin, text, None).await?;
    Ok(())
}
