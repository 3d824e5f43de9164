// Groq-backed Generative Model: text prompts go to the text model, photos to the vision model.

use super::{GenerativeModel, ImageInput, ModelError, with_timeout};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use groqai::{ChatMessage, GroqClient, ImageUrl, MessageContent, MessagePart, Role};
use std::time::Duration;
use tracing::debug;

pub struct GroqModel {
    client: GroqClient,
    text_model: String,
    vision_model: String,
    timeout: Duration,
}

impl GroqModel {
    pub fn new(client: GroqClient, text_model: String, vision_model: String, timeout: Duration) -> Self {
        Self {
            client,
            text_model,
            vision_model,
            timeout,
        }
    }

    async fn send(
        &self,
        prompt: &str,
        image: Option<ImageInput<'_>>,
        max_output_tokens: u32,
    ) -> Result<String, ModelError> {
        let (model, message) = match image {
            Some(img) => {
                // Encode image as base64 data URL.
                let mime = detect_image_mime(img.bytes);
                let data_url = format!(
                    "data:{};base64,{}",
                    mime,
                    general_purpose::STANDARD.encode(img.bytes)
                );

                // Multimodal message: text first, image second.
                let msg = ChatMessage {
                    role: Role::User,
                    content: MessageContent::Parts(vec![
                        MessagePart::Text {
                            text: prompt.to_string(),
                        },
                        MessagePart::ImageUrl {
                            image_url: ImageUrl::new(data_url),
                        },
                    ]),
                    tool_calls: None,
                    tool_call_id: None,
                };
                (self.vision_model.as_str(), msg)
            }
            None => (
                self.text_model.as_str(),
                ChatMessage::new_text(Role::User, prompt.to_string()),
            ),
        };

        debug!("Groq request: model = {model}, max_tokens = {max_output_tokens}");

        let resp = self
            .client
            .chat(model)
            .messages(vec![message])
            .max_completion_tokens(max_output_tokens)
            .temperature(0.9)
            .send()
            .await
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        resp.choices
            .first()
            .and_then(|choice| extract_text_from_message_content(&choice.message.content))
            .ok_or(ModelError::EmptyResponse)
    }
}

#[async_trait]
impl GenerativeModel for GroqModel {
    async fn complete(
        &self,
        prompt: &str,
        image: Option<ImageInput<'_>>,
        max_output_tokens: u32,
    ) -> Result<String, ModelError> {
        with_timeout(self.timeout, self.send(prompt, image, max_output_tokens)).await
    }
}

// Basic MIME type detection from file signatures; Telegram photos are almost always JPEG.
pub(crate) fn detect_image_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0xFF, 0xD8]) {
        "image/jpeg"
    } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        "image/png"
    } else if bytes.starts_with(b"GIF89a") || bytes.starts_with(b"GIF87a") {
        "image/gif"
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "image/jpeg"
    }
}

// Extracts usable text from a MessageContent structure.
fn extract_text_from_message_content(mc: &MessageContent) -> Option<String> {
    match mc {
        MessageContent::Text(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        MessageContent::Parts(parts) => {
            let out = parts
                .iter()
                .filter_map(|p| match p {
                    MessagePart::Text { text } if !text.trim().is_empty() => Some(text.trim()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n");
            if out.is_empty() { None } else { Some(out) }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_common_signatures() {
        assert_eq!(detect_image_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
        assert_eq!(
            detect_image_mime(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0]),
            "image/png"
        );
        assert_eq!(detect_image_mime(b"GIF89a...."), "image/gif");
        assert_eq!(detect_image_mime(b"RIFF\0\0\0\0WEBPVP8 "), "image/webp");
        assert_eq!(detect_image_mime(b"??"), "image/jpeg");
    }

    #[test]
    fn blank_text_content_is_not_usable() {
        assert_eq!(
            extract_text_from_message_content(&MessageContent::Text("   ".into())),
            None
        );
        assert_eq!(
            extract_text_from_message_content(&MessageContent::Text(" {\"a\":1} ".into())),
            Some("{\"a\":1}".to_string())
        );
    }
}
