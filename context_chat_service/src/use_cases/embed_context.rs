use std::sync::Arc;

use common::helper::error_chain_fmt;
use tracing::{info, warn};

use crate::{
    domain::entities::{context_item::ContextItem, image_upload::ImageUpload, user_id::UserId},
    ports::{
        captioning_service::CaptioningService,
        context_store::{ContextStore, ContextStoreError},
        embeddings_service::EmbeddingsService,
    },
};

pub struct EmbedContextRequest {
    pub user_id: UserId,
    pub messages: Vec<String>,
    pub image: Option<ImageUpload>,
}

#[derive(Debug, PartialEq)]
pub struct EmbedContextResponse {
    /// Caption of the image, only set when the image was stored
    pub caption: Option<String>,
    /// Number of items written to the user collection
    pub stored: usize,
}

/// Ingests the texts and the image sent by a user into their context collection.
///
/// Ingestion is best-effort: an item that could not be captioned or embedded is logged and skipped.
/// Only a failure of the context store fails the whole request.
pub struct EmbedContextUseCase {
    embeddings_service: Arc<dyn EmbeddingsService>,
    captioning_service: Arc<dyn CaptioningService>,
    context_store: Arc<dyn ContextStore>,
}

impl EmbedContextUseCase {
    pub fn new(
        embeddings_service: Arc<dyn EmbeddingsService>,
        captioning_service: Arc<dyn CaptioningService>,
        context_store: Arc<dyn ContextStore>,
    ) -> Self {
        Self {
            embeddings_service,
            captioning_service,
            context_store,
        }
    }

    #[tracing::instrument(
        name = "Embedding user context",
        skip(self, request),
        fields(user_id = %request.user_id, nb_messages = request.messages.len(), with_image = request.image.is_some())
    )]
    pub async fn execute(
        &self,
        request: EmbedContextRequest,
    ) -> Result<EmbedContextResponse, EmbedContextError> {
        let EmbedContextRequest {
            user_id,
            messages,
            image,
        } = request;

        let mut items = vec![];
        let mut caption = None;

        if let Some(image) = image {
            match self.captioning_service.caption(&image).await {
                Ok(generated_caption) => {
                    info!(caption = generated_caption, "Image captioned");

                    match self.embeddings_service.embed(&generated_caption).await {
                        Ok(embedding) => {
                            items.push(ContextItem::image(
                                image.filename.as_deref(),
                                &image.content,
                                &generated_caption,
                                embedding,
                            ));
                            caption = Some(generated_caption);
                        }
                        Err(error) => warn!(?error, "Skipping image: failed to embed its caption"),
                    }
                }
                Err(error) => warn!(?error, "Skipping image: failed to caption it"),
            }
        }

        for message in messages {
            match self.embeddings_service.embed(&message).await {
                Ok(embedding) => items.push(ContextItem::text(&message, embedding)),
                Err(error) => warn!(?error, "Skipping message: failed to embed it"),
            }
        }

        let stored = items.len();
        self.context_store.upsert(&user_id, items).await?;

        info!(stored, "Stored context items");
        Ok(EmbedContextResponse { caption, stored })
    }
}

#[derive(thiserror::Error)]
pub enum EmbedContextError {
    #[error(transparent)]
    ContextStoreError(#[from] ContextStoreError),
}

impl std::fmt::Debug for EmbedContextError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
