// Generative Model seam: prompt (+ optional image) in, free-form text out.

mod groq;
pub use groq::GroqModel;

use async_trait::async_trait;
use std::{future::Future, time::Duration};
use thiserror::Error;

/// Why a model call produced no usable text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("model transport error: {0}")]
    Transport(String),
    #[error("model call timed out after {0:?}")]
    Timeout(Duration),
    #[error("model returned no text")]
    EmptyResponse,
}

/// Raw image attached to a multimodal prompt.
#[derive(Debug, Clone, Copy)]
pub struct ImageInput<'a> {
    pub bytes: &'a [u8],
}

#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Complete `prompt`, optionally looking at `image`, within `max_output_tokens`.
    ///
    /// Nothing about the returned text is guaranteed: callers re-validate it.
    async fn complete(
        &self,
        prompt: &str,
        image: Option<ImageInput<'_>>,
        max_output_tokens: u32,
    ) -> Result<String, ModelError>;
}

// Bound any external call; a timeout is reported like any other model failure.
pub async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, ModelError>
where
    F: Future<Output = Result<T, ModelError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(res) => res,
        Err(_) => Err(ModelError::Timeout(limit)),
    }
}
