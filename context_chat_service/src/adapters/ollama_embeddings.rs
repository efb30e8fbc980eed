use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::failure_details;
use crate::{
    domain::entities::context_item::Embeddings,
    ports::embeddings_service::{EmbeddingsService, EmbeddingsServiceError},
};

/// Embeddings generated by a model served by an Ollama server (`POST /api/embeddings`)
pub struct OllamaEmbeddingsService {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaEmbeddingsService {
    pub fn new(client: reqwest::Client, base_url: &str, model: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    embedding: Embeddings,
}

#[async_trait]
impl EmbeddingsService for OllamaEmbeddingsService {
    #[tracing::instrument(name = "Generate embeddings with Ollama", skip(self), fields(model = %self.model))]
    async fn embed(&self, text: &str) -> Result<Embeddings, EmbeddingsServiceError> {
        if text.trim().is_empty() {
            return Err(EmbeddingsServiceError::EmptyText);
        }

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&EmbeddingsRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = failure_details(response).await;
            return Err(EmbeddingsServiceError::UnexpectedResponse { status, body });
        }

        let EmbeddingsResponse { embedding } = response.json().await?;

        if embedding.is_empty() {
            return Err(EmbeddingsServiceError::ModelError(
                "Empty embeddings returned".into(),
            ));
        }

        Ok(embedding)
    }
}
