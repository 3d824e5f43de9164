// Sends an HTML message into the originating chat/thread, optionally with an inline keyboard.

use super::Origin;
use teloxide::{
    prelude::*,
    types::{InlineKeyboardMarkup, ParseMode},
};

pub async fn send_reply_or_plain(
    bot: &Bot,
    origin: Origin,
    text: impl Into<String>,
    keyboard: Option<InlineKeyboardMarkup>,
) -> Result<Message, teloxide::RequestError> {
    // Every body we send is HTML with user text already escaped
    let mut req = bot
        .send_message(origin.chat_id, text.into())
        .parse_mode(ParseMode::Html);

    // Stay in the forum topic the update came from
    if let Some(tid) = origin.thread_id {
        req = req.message_thread_id(tid);
    }

    // Attach the inline keyboard if one was given
    if let Some(markup) = keyboard {
        req = req.reply_markup(markup);
    }

    // Send the request
    req.await
}
