use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    domain::entities::{
        context_item::{ContextItem, ContextItemKind, Embeddings, StoredContextItem},
        user_id::UserId,
    },
    ports::context_store::{ContextStore, ContextStoreError},
};

/// Process-local context store, ranking items by cosine similarity.
///
/// Nothing is persisted: meant for local development and tests.
#[derive(Default)]
pub struct ContextItemInMemoryRepository {
    collections: RwLock<HashMap<UserId, Collection>>,
}

struct Collection {
    dimension: usize,
    items: HashMap<Uuid, ContextItem>,
}

impl Collection {
    fn check_dimension(&self, user_id: &UserId, actual: usize) -> Result<(), ContextStoreError> {
        if actual != self.dimension {
            return Err(ContextStoreError::DimensionMismatch {
                collection: user_id.to_string(),
                expected: self.dimension,
                actual,
            });
        }
        Ok(())
    }
}

impl ContextItemInMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContextStore for ContextItemInMemoryRepository {
    #[tracing::instrument(name = "Saving context items in memory", skip(self, items), fields(nb_items = items.len()))]
    async fn upsert(
        &self,
        user_id: &UserId,
        items: Vec<ContextItem>,
    ) -> Result<(), ContextStoreError> {
        let Some(dimension) = items.first().map(|item| item.embedding.len()) else {
            return Ok(());
        };

        let mut collections = self.collections.write().await;
        let collection = collections
            .entry(user_id.clone())
            .or_insert_with(|| Collection {
                dimension,
                items: HashMap::new(),
            });

        // Checks every item before writing any of them
        for item in &items {
            collection.check_dimension(user_id, item.embedding.len())?;
        }

        for item in items {
            collection.items.insert(item.id, item);
        }

        Ok(())
    }

    #[tracing::instrument(name = "Querying nearest context items in memory", skip(self, vector))]
    async fn query(
        &self,
        user_id: &UserId,
        vector: Embeddings,
        limit: usize,
    ) -> Result<Vec<StoredContextItem>, ContextStoreError> {
        let mut collections = self.collections.write().await;
        let collection = collections
            .entry(user_id.clone())
            .or_insert_with(|| Collection {
                dimension: vector.len(),
                items: HashMap::new(),
            });
        collection.check_dimension(user_id, vector.len())?;

        let mut scored: Vec<StoredContextItem> = collection
            .items
            .values()
            .map(|item| StoredContextItem {
                id: item.id,
                payload: item.payload.clone(),
                score: Some(cosine_similarity(&vector, &item.embedding)),
            })
            .collect();

        scored.sort_by(|a, b| b.score.unwrap_or(0.0).total_cmp(&a.score.unwrap_or(0.0)));
        scored.truncate(limit);

        Ok(scored)
    }

    #[tracing::instrument(name = "Listing context items in memory", skip(self))]
    async fn list(
        &self,
        user_id: &UserId,
        kind: ContextItemKind,
    ) -> Result<Vec<StoredContextItem>, ContextStoreError> {
        let collections = self.collections.read().await;

        Ok(collections
            .get(user_id)
            .map(|collection| {
                collection
                    .items
                    .values()
                    .filter(|item| item.payload.kind() == kind)
                    .map(|item| StoredContextItem {
                        id: item.id,
                        payload: item.payload.clone(),
                        score: None,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    #[tracing::instrument(name = "Deleting context items in memory", skip(self))]
    async fn delete(&self, user_id: &UserId, ids: Vec<Uuid>) -> Result<(), ContextStoreError> {
        let mut collections = self.collections.write().await;

        if let Some(collection) = collections.get_mut(user_id) {
            for id in ids {
                collection.items.remove(&id);
            }
        }

        Ok(())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
