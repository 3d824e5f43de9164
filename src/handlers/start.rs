// /start: make sure preferences exist, forget the last photo and open the settings wizard.

use crate::handlers::keyboards::gender_keyboard;
use crate::handlers::utils::{Origin, send_reply_or_plain};
use crate::handlers::views;
use crate::service::CaptionService;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::error;

pub async fn start(
    bot: Bot,
    origin: Origin,
    service: Arc<CaptionService>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = service.start(origin.user_id).await {
        error!("Failed to reset user {}: {e}", origin.user_id);
        send_reply_or_plain(&bot, origin, views::INTERNAL_ERROR, None).await?;
        return Ok(());
    }

    if let Err(e) = send_reply_or_plain(&bot, origin, views::WELCOME, Some(gender_keyboard())).await {
        error!("Telegram send failed: {e}");
        return Err(e);
    }

    Ok(())
}
