use std::sync::Arc;

use common::helper::error_chain_fmt;
use tracing::info;

use crate::{
    domain::{
        entities::user_id::UserId,
        services::prompt_messages::{build_context_block, build_prompt_messages},
    },
    ports::{
        chat_completion_service::{ChatCompletionService, ChatCompletionServiceError},
        context_store::{ContextStore, ContextStoreError},
        embeddings_service::{EmbeddingsService, EmbeddingsServiceError},
    },
};

/// Answers a user question with the language model, given the nearest items
/// of the user context collection.
pub struct AnswerPromptUseCase {
    embeddings_service: Arc<dyn EmbeddingsService>,
    context_store: Arc<dyn ContextStore>,
    chat_completion_service: Arc<dyn ChatCompletionService>,
    system_prompt: String,
    retrieval_limit: usize,
}

impl AnswerPromptUseCase {
    /// # Parameters
    /// - `retrieval_limit`: maximum number of context items forwarded to the language model
    pub fn new(
        embeddings_service: Arc<dyn EmbeddingsService>,
        context_store: Arc<dyn ContextStore>,
        chat_completion_service: Arc<dyn ChatCompletionService>,
        system_prompt: &str,
        retrieval_limit: usize,
    ) -> Self {
        Self {
            embeddings_service,
            context_store,
            chat_completion_service,
            system_prompt: system_prompt.to_string(),
            retrieval_limit,
        }
    }

    #[tracing::instrument(name = "Answering user prompt", skip(self, user_id, question), fields(user_id = %user_id))]
    pub async fn execute(
        &self,
        user_id: &UserId,
        question: &str,
    ) -> Result<String, AnswerPromptError> {
        let embedding = self.embeddings_service.embed(question).await?;

        let items = self
            .context_store
            .query(user_id, embedding, self.retrieval_limit)
            .await?;
        info!(nb_items = items.len(), "Retrieved context items");

        let context_block = build_context_block(&items);
        let messages = build_prompt_messages(&self.system_prompt, question, &context_block);

        let answer = self.chat_completion_service.chat(messages).await?;

        Ok(answer)
    }
}

#[derive(thiserror::Error)]
pub enum AnswerPromptError {
    #[error(transparent)]
    EmbeddingsError(#[from] EmbeddingsServiceError),
    #[error(transparent)]
    ContextStoreError(#[from] ContextStoreError),
    #[error(transparent)]
    ChatCompletionError(#[from] ChatCompletionServiceError),
}

impl std::fmt::Debug for AnswerPromptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
