// Download the best photo of a message straight into memory.

use reqwest::Client;
use teloxide::{
    prelude::*,
    types::{FileId, MediaKind, Message, MessageKind},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PhotoDownloadError {
    #[error("telegram get_file failed: {0}")]
    Telegram(#[from] teloxide::RequestError),
    #[error("file download failed: {0}")]
    Http(#[from] reqwest::Error),
}

// Returns the FileId of the largest available photo size.
pub fn largest_photo_file_id(msg: &Message) -> Option<FileId> {
    // Only ordinary messages carry photo media
    if let MessageKind::Common(common) = &msg.kind
        && let MediaKind::Photo(photo) = &common.media_kind
    {
        // Telegram sends several sizes of one photo; prefer the most pixels
        return photo
            .photo
            .iter()
            .max_by_key(|p| (p.width * p.height, p.file.size))
            .map(|p| p.file.id.clone());
    }
    None
}

pub async fn download_photo(bot: &Bot, file_id: FileId) -> Result<Vec<u8>, PhotoDownloadError> {
    // Resolve the file path on Telegram's side
    let file = bot.get_file(file_id).send().await?;

    // Build the download URL from the bot token and that path
    let url = format!("https://api.telegram.org/file/bot{}/{}", bot.token(), file.path);
    // Fetch the bytes, treating HTTP error statuses as failures
    let bytes = Client::new()
        .get(&url)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;
    Ok(bytes.to_vec())
}
