mod callback;
mod favorites;
pub mod keyboards;
mod photo;
mod start;
pub mod utils;
pub mod views;

use crate::commands::Command;
use crate::service::CaptionService;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::info;
use utils::extract_user_info;

pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    service: Arc<CaptionService>,
) -> ResponseResult<()> {
    info!("Update received: chat_id = {}", msg.chat.id);

    let origin = match extract_user_info(&msg) {
        Ok(o) => o,
        Err(text) => {
            bot.send_message(msg.chat.id, text).await?;
            return Ok(());
        }
    };

    match cmd {
        Command::Start => start::start(bot, origin, service).await?,
        Command::Settings => favorites::settings(&bot, origin, &service).await?,
        Command::Favorites => favorites::favorites(&bot, origin, &service).await?,
        Command::Quota => favorites::quota(&bot, origin, &service).await?,
        Command::Help => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string())
                .await?;
        }
    }
    Ok(())
}

/// Commands, then photos, then any other message; inline buttons separately.
pub fn get_update_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(
            Update::filter_message()
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(handle_command),
                )
                .branch(
                    dptree::filter(|msg: Message| msg.photo().is_some())
                        .endpoint(photo::handle_photo),
                )
                .branch(dptree::endpoint(photo::handle_other)),
        )
        .branch(Update::filter_callback_query().endpoint(callback::handle_callback))
}
