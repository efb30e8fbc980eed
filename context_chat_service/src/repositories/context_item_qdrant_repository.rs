use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::{
    qdrant::{
        self, point_id::PointIdOptions, value::Kind, Condition, CreateCollectionBuilder,
        DeletePointsBuilder, Distance, Filter, PointId, PointStruct, ScrollPointsBuilder,
        SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
    },
    Qdrant,
};
use tracing::info;
use uuid::Uuid;

use crate::{
    domain::entities::{
        context_item::{
            ContextItem, ContextItemKind, ContextItemPayload, Embeddings, StoredContextItem,
        },
        user_id::UserId,
    },
    ports::context_store::{ContextStore, ContextStoreError},
};

/// Number of points fetched per scroll request when listing a collection
const SCROLL_PAGE_SIZE: u32 = 256;

/// Repository for the context items of each user, one Qdrant collection per user
pub struct ContextItemQdrantRepository {
    client: Qdrant,
    collection_prefix: String,
    collection_distance: Distance,
}

impl ContextItemQdrantRepository {
    pub fn try_new(
        client: Qdrant,
        collection_prefix: &str,
        collection_distance: &str,
    ) -> Result<Self, ContextStoreError> {
        let collection_distance = Distance::from_str_name(collection_distance).ok_or_else(|| {
            ContextStoreError::QdrantConfigurationError(format!(
                "Invalid Qdrant distance from configuration: {}",
                collection_distance
            ))
        })?;

        Ok(Self {
            client,
            collection_prefix: collection_prefix.to_string(),
            collection_distance,
        })
    }

    fn collection_name(&self, user_id: &UserId) -> String {
        format!("{}{}", self.collection_prefix, user_id)
    }

    async fn collection_exists(&self, collection_name: &str) -> Result<bool, ContextStoreError> {
        self.client
            .collection_exists(collection_name)
            .await
            .map_err(|e| ContextStoreError::QdrantError(e.to_string()))
    }

    /// Creates the collection if it does not exist yet
    #[tracing::instrument(name = "Getting or creating Qdrant collection", skip(self))]
    async fn get_or_create_collection(
        &self,
        collection_name: &str,
        vector_size: usize,
    ) -> Result<(), ContextStoreError> {
        if self.collection_exists(collection_name).await? {
            return Ok(());
        }

        let request = CreateCollectionBuilder::new(collection_name).vectors_config(
            VectorParamsBuilder::new(vector_size as u64, self.collection_distance),
        );

        match self.client.create_collection(request).await {
            Ok(_) => {
                info!("Created collection {}", collection_name);
                Ok(())
            }
            // Another request could have created it in the meantime
            Err(error) if error.to_string().contains("already exists") => Ok(()),
            Err(error) => Err(ContextStoreError::QdrantError(error.to_string())),
        }
    }
}

#[async_trait]
impl ContextStore for ContextItemQdrantRepository {
    #[tracing::instrument(name = "Saving context items to Qdrant", skip(self, items), fields(nb_items = items.len()))]
    async fn upsert(
        &self,
        user_id: &UserId,
        items: Vec<ContextItem>,
    ) -> Result<(), ContextStoreError> {
        let Some(vector_size) = items.first().map(|item| item.embedding.len()) else {
            return Ok(());
        };

        let collection_name = self.collection_name(user_id);
        self.get_or_create_collection(&collection_name, vector_size)
            .await?;

        self.client
            .upsert_points(
                UpsertPointsBuilder::new(
                    &collection_name,
                    items.into_iter().map(PointStruct::from).collect::<Vec<_>>(),
                )
                .wait(true),
            )
            .await
            .map_err(|e| ContextStoreError::QdrantError(e.to_string()))?;

        info!("Saved context items");
        Ok(())
    }

    #[tracing::instrument(name = "Querying nearest context items from Qdrant", skip(self, vector))]
    async fn query(
        &self,
        user_id: &UserId,
        vector: Embeddings,
        limit: usize,
    ) -> Result<Vec<StoredContextItem>, ContextStoreError> {
        let collection_name = self.collection_name(user_id);
        self.get_or_create_collection(&collection_name, vector.len())
            .await?;

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&collection_name, vector, limit as u64).with_payload(true),
            )
            .await
            .map_err(|e| ContextStoreError::QdrantError(e.to_string()))?;

        response
            .result
            .into_iter()
            .map(|point| {
                Ok(StoredContextItem {
                    id: point_id_to_uuid(point.id.as_ref())?,
                    payload: ContextItemPayload::try_from(point.payload)?,
                    score: Some(point.score),
                })
            })
            .collect()
    }

    #[tracing::instrument(name = "Listing context items from Qdrant", skip(self))]
    async fn list(
        &self,
        user_id: &UserId,
        kind: ContextItemKind,
    ) -> Result<Vec<StoredContextItem>, ContextStoreError> {
        let collection_name = self.collection_name(user_id);
        if !self.collection_exists(&collection_name).await? {
            return Ok(vec![]);
        }

        let filter = Filter::must([Condition::matches("type", kind.as_str().to_string())]);

        let mut items = vec![];
        let mut offset: Option<PointId> = None;

        loop {
            let mut request = ScrollPointsBuilder::new(&collection_name)
                .filter(filter.clone())
                .limit(SCROLL_PAGE_SIZE)
                .with_payload(true);
            if let Some(offset) = offset.take() {
                request = request.offset(offset);
            }

            let response = self
                .client
                .scroll(request)
                .await
                .map_err(|e| ContextStoreError::QdrantError(e.to_string()))?;

            for point in response.result {
                items.push(StoredContextItem {
                    id: point_id_to_uuid(point.id.as_ref())?,
                    payload: ContextItemPayload::try_from(point.payload)?,
                    score: None,
                });
            }

            match response.next_page_offset {
                Some(next_page_offset) => offset = Some(next_page_offset),
                None => break,
            }
        }

        Ok(items)
    }

    #[tracing::instrument(name = "Deleting context items from Qdrant", skip(self))]
    async fn delete(&self, user_id: &UserId, ids: Vec<Uuid>) -> Result<(), ContextStoreError> {
        let collection_name = self.collection_name(user_id);
        if ids.is_empty() || !self.collection_exists(&collection_name).await? {
            return Ok(());
        }

        let point_ids: Vec<PointId> = ids.iter().map(|id| PointId::from(id.to_string())).collect();

        self.client
            .delete_points(
                DeletePointsBuilder::new(&collection_name)
                    .points(point_ids)
                    .wait(true),
            )
            .await
            .map_err(|e| ContextStoreError::QdrantError(e.to_string()))?;

        info!("Deleted context items");
        Ok(())
    }
}

impl From<ContextItem> for PointStruct {
    fn from(item: ContextItem) -> Self {
        PointStruct::new(
            PointId::from(item.id.to_string()),
            item.embedding,
            HashMap::<String, qdrant::Value>::from(item.payload),
        )
    }
}

impl From<ContextItemPayload> for HashMap<String, qdrant::Value> {
    fn from(payload: ContextItemPayload) -> Self {
        let kind = qdrant::Value::from(payload.kind().as_str().to_string());

        match payload {
            ContextItemPayload::Text { text } => HashMap::from([
                ("type".into(), kind),
                ("text".into(), qdrant::Value::from(text)),
            ]),
            ContextItemPayload::Image { filename, caption } => HashMap::from([
                ("type".into(), kind),
                ("filename".into(), qdrant::Value::from(filename)),
                ("caption".into(), qdrant::Value::from(caption)),
            ]),
        }
    }
}

impl TryFrom<HashMap<String, qdrant::Value>> for ContextItemPayload {
    type Error = ContextStoreError;

    fn try_from(mut payload: HashMap<String, qdrant::Value>) -> Result<Self, Self::Error> {
        let mut take_string = |key: &str| -> Result<String, ContextStoreError> {
            match payload.remove(key).and_then(|value| value.kind) {
                Some(Kind::StringValue(value)) => Ok(value),
                _ => Err(ContextStoreError::InvalidPayload(format!(
                    "missing string field `{}`",
                    key
                ))),
            }
        };

        match take_string("type")?.as_str() {
            "text" => Ok(ContextItemPayload::Text {
                text: take_string("text")?,
            }),
            "image" => Ok(ContextItemPayload::Image {
                filename: take_string("filename")?,
                caption: take_string("caption")?,
            }),
            other => Err(ContextStoreError::InvalidPayload(format!(
                "unknown item type `{}`",
                other
            ))),
        }
    }
}

fn point_id_to_uuid(point_id: Option<&PointId>) -> Result<Uuid, ContextStoreError> {
    match point_id.and_then(|id| id.point_id_options.as_ref()) {
        Some(PointIdOptions::Uuid(uuid)) => Uuid::parse_str(uuid)
            .map_err(|e| ContextStoreError::InvalidPayload(format!("Invalid point id: {}", e))),
        Some(PointIdOptions::Num(num)) => Ok(Uuid::from_u128(*num as u128)),
        None => Err(ContextStoreError::InvalidPayload("Missing point id".into())),
    }
}
