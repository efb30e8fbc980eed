use async_trait::async_trait;
use common::helper::error_chain_fmt;

use crate::domain::entities::chat_message::ChatMessage;

/// Language model server answering chat conversations and raw prompts.
///
/// No retry: any failure is returned to the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatCompletionService: Send + Sync {
    /// Returns the text of the assistant message generated after `messages`
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, ChatCompletionServiceError>;

    /// Returns the text generated from a single prompt
    async fn generate(&self, prompt: &str) -> Result<String, ChatCompletionServiceError>;
}

#[derive(thiserror::Error)]
pub enum ChatCompletionServiceError {
    #[error("Error while requesting the LLM server: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Unexpected response from the LLM server ({status}): {body}")]
    UnexpectedResponse { status: u16, body: String },
}

impl std::fmt::Debug for ChatCompletionServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
