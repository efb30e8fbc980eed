use async_trait::async_trait;
use common::helper::error_chain_fmt;

use crate::domain::entities::context_item::Embeddings;

/// Generates a fixed-length embeddings vector from a text.
///
/// All the vectors produced by an implementation have the same dimension.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingsService: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embeddings, EmbeddingsServiceError>;
}

#[derive(thiserror::Error)]
pub enum EmbeddingsServiceError {
    #[error("No text provided")]
    EmptyText,
    #[error("Embeddings model error: {0}")]
    ModelError(String),
    #[error("Embeddings model runner is not available")]
    RunnerUnavailable,
    #[error("Error while requesting the embeddings API: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Unexpected response from the embeddings API ({status}): {body}")]
    UnexpectedResponse { status: u16, body: String },
}

impl std::fmt::Debug for EmbeddingsServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
