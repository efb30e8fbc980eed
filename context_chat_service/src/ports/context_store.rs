use async_trait::async_trait;
use common::helper::error_chain_fmt;
use uuid::Uuid;

use crate::domain::entities::{
    context_item::{ContextItem, ContextItemKind, Embeddings, StoredContextItem},
    user_id::UserId,
};

/// Per-user collections of context items in a vector database.
///
/// A user collection is created on the first `upsert` or `query`, with the dimension of
/// the written or queried vectors. `list` and `delete` on a missing collection are no-ops.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Writes items, replacing the items with the same id
    async fn upsert(
        &self,
        user_id: &UserId,
        items: Vec<ContextItem>,
    ) -> Result<(), ContextStoreError>;

    /// Returns at most `limit` items, the nearest from `vector` first.
    ///
    /// The distance metric and ties are up to the store.
    async fn query(
        &self,
        user_id: &UserId,
        vector: Embeddings,
        limit: usize,
    ) -> Result<Vec<StoredContextItem>, ContextStoreError>;

    /// Returns all the items of a given kind
    async fn list(
        &self,
        user_id: &UserId,
        kind: ContextItemKind,
    ) -> Result<Vec<StoredContextItem>, ContextStoreError>;

    async fn delete(&self, user_id: &UserId, ids: Vec<Uuid>) -> Result<(), ContextStoreError>;
}

#[derive(thiserror::Error)]
pub enum ContextStoreError {
    #[error("Error from Qdrant: {0}")]
    QdrantError(String),
    #[error("Error from Qdrant config: {0}")]
    QdrantConfigurationError(String),
    #[error("Vector of dimension {actual} does not fit collection {collection} of dimension {expected}")]
    DimensionMismatch {
        collection: String,
        expected: usize,
        actual: usize,
    },
    #[error("Invalid stored payload: {0}")]
    InvalidPayload(String),
}

impl std::fmt::Debug for ContextStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
