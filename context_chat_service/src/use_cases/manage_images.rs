use std::sync::Arc;

use common::helper::error_chain_fmt;
use serde::Serialize;
use tracing::info;

use crate::{
    domain::entities::{
        context_item::{ContextItemKind, ContextItemPayload, StoredContextItem},
        user_id::UserId,
    },
    ports::context_store::{ContextStore, ContextStoreError},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageDescription {
    pub filename: String,
    pub caption: String,
}

impl ImageDescription {
    fn from_stored(item: StoredContextItem) -> Option<Self> {
        match item.payload {
            ContextItemPayload::Image { filename, caption } => Some(Self { filename, caption }),
            ContextItemPayload::Text { .. } => None,
        }
    }
}

/// Lists and deletes the images of a user context collection
pub struct ManageImagesUseCase {
    context_store: Arc<dyn ContextStore>,
}

impl ManageImagesUseCase {
    pub fn new(context_store: Arc<dyn ContextStore>) -> Self {
        Self { context_store }
    }

    #[tracing::instrument(name = "Listing user images", skip(self))]
    pub async fn list_images(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ImageDescription>, ManageImagesError> {
        let items = self
            .context_store
            .list(user_id, ContextItemKind::Image)
            .await?;

        Ok(items
            .into_iter()
            .filter_map(ImageDescription::from_stored)
            .collect())
    }

    /// Returns the number of deleted images
    #[tracing::instrument(name = "Deleting all user images", skip(self))]
    pub async fn delete_all_images(&self, user_id: &UserId) -> Result<usize, ManageImagesError> {
        let ids: Vec<_> = self
            .context_store
            .list(user_id, ContextItemKind::Image)
            .await?
            .into_iter()
            .map(|item| item.id)
            .collect();

        let deleted = ids.len();
        self.context_store.delete(user_id, ids).await?;

        info!(deleted, "Deleted images");
        Ok(deleted)
    }
}

#[derive(thiserror::Error)]
pub enum ManageImagesError {
    #[error(transparent)]
    ContextStoreError(#[from] ContextStoreError),
}

impl std::fmt::Debug for ManageImagesError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
