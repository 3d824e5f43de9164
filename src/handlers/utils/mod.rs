pub mod chat_action_keep_alive;
pub use chat_action_keep_alive::ChatActionKeepAlive;

pub mod extract_user_info;
pub use extract_user_info::{Origin, UNKNOWN_USER, extract_user_info};

pub mod send_reply_or_plain;
pub use send_reply_or_plain::send_reply_or_plain;

pub mod telegram_photo;
pub use telegram_photo::{download_photo, largest_photo_file_id};
