// Sender/chat extraction in one place so handlers stay thin.

use teloxide::types::{ChatId, Message, ThreadId};

pub const UNKNOWN_USER: &str = "The user could not be identified.";

/// Where a reply should go and whom it is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin {
    pub user_id: i64,
    pub chat_id: ChatId,
    pub thread_id: Option<ThreadId>,
}

// Channel posts and some service messages carry no sender; those can't have preferences.
pub fn extract_user_info(msg: &Message) -> Result<Origin, &'static str> {
    // The sender is required; preferences and quota are keyed on it
    let user = msg.from.as_ref().ok_or(UNKNOWN_USER)?;

    // Replies go back to the same chat and topic
    Ok(Origin {
        user_id: user.id.0 as i64,
        chat_id: msg.chat.id,
        thread_id: msg.thread_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide_tests::MockMessageText;

    #[test]
    fn origin_follows_sender_and_chat() {
        let msg = MockMessageText::new().text("hi").build();
        let origin = extract_user_info(&msg).unwrap();
        assert_eq!(origin.chat_id, msg.chat.id);
        assert_eq!(origin.user_id, msg.from.as_ref().unwrap().id.0 as i64);
    }

    #[test]
    fn message_without_sender_is_rejected() {
        let mut msg = MockMessageText::new().text("hi").build();
        msg.from = None;
        assert_eq!(extract_user_info(&msg), Err(UNKNOWN_USER));
    }
}
