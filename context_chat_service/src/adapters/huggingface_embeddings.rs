use async_trait::async_trait;
use common::helper::error_chain_fmt;
use once_cell::sync::OnceCell;
use rust_bert::pipelines::sentence_embeddings::{
    SentenceEmbeddingsBuilder, SentenceEmbeddingsModelType,
};
use std::thread;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

use crate::{
    domain::entities::context_item::Embeddings,
    ports::embeddings_service::{EmbeddingsService, EmbeddingsServiceError},
};

/// Message type for internal channel, passing around the input text and a sender for the result
type RunnerMessage = (
    String,
    oneshot::Sender<Result<Embeddings, EmbeddingsServiceError>>,
);

/// Generates embeddings from a text with a sentence embeddings model available from Hugging Face.
///
/// The model lives on its own thread, spawned and loaded (downloaded if needed) on the first request.
/// Requests are serialized through a channel to this runner.
pub struct HuggingFaceEmbeddingsService {
    model_type: SentenceEmbeddingsModelType,
    sender_to_runner: OnceCell<mpsc::Sender<RunnerMessage>>,
}

impl HuggingFaceEmbeddingsService {
    /// # Parameters
    /// - `model`: kebab-case name of the model type, ex: `all-mini-lm-l12-v2`
    pub fn try_new(model: &str) -> Result<Self, HuggingFaceModelError> {
        Ok(Self {
            model_type: parse_model_type(model)?,
            sender_to_runner: OnceCell::new(),
        })
    }

    fn runner_sender(&self) -> &mpsc::Sender<RunnerMessage> {
        self.sender_to_runner.get_or_init(|| {
            let (sender, receiver) = mpsc::channel(100);
            let model_type = self.model_type.clone();
            thread::spawn(move || Self::runner(model_type, receiver));
            sender
        })
    }

    /// The embeddings generator runner itself
    ///
    /// Running the model inside a future would block the async runtime,
    /// the runner needs to be in a sync context.
    #[tracing::instrument(name = "Embeddings model runner", skip_all)]
    fn runner(
        model_type: SentenceEmbeddingsModelType,
        mut receiver: mpsc::Receiver<RunnerMessage>,
    ) {
        let model = match SentenceEmbeddingsBuilder::remote(model_type).create_model() {
            Ok(model) => model,
            Err(error) => {
                error!(?error, "Failed to load the embeddings model");
                let error = error.to_string();

                while let Some((_, sender)) = receiver.blocking_recv() {
                    let _ = sender.send(Err(EmbeddingsServiceError::ModelError(error.clone())));
                }
                return;
            }
        };
        info!("Embeddings model loaded ✅");

        while let Some((text, sender)) = receiver.blocking_recv() {
            let result = model
                .encode(&[text.as_str()])
                .map_err(|e| EmbeddingsServiceError::ModelError(e.to_string()))
                .and_then(|mut embeddings| {
                    embeddings.pop().ok_or_else(|| {
                        EmbeddingsServiceError::ModelError("No embeddings generated".into())
                    })
                });

            // The requester could have been dropped in the meantime
            let _ = sender.send(result);
        }

        info!("Embeddings model runner stopped");
    }
}

#[async_trait]
impl EmbeddingsService for HuggingFaceEmbeddingsService {
    #[tracing::instrument(name = "Generate embeddings with Hugging Face model", skip(self))]
    async fn embed(&self, text: &str) -> Result<Embeddings, EmbeddingsServiceError> {
        if text.trim().is_empty() {
            return Err(EmbeddingsServiceError::EmptyText);
        }

        let (sender, receiver) = oneshot::channel();

        self.runner_sender()
            .send((text.to_string(), sender))
            .await
            .map_err(|_| EmbeddingsServiceError::RunnerUnavailable)?;

        receiver
            .await
            .map_err(|_| EmbeddingsServiceError::RunnerUnavailable)?
    }
}

fn parse_model_type(model: &str) -> Result<SentenceEmbeddingsModelType, HuggingFaceModelError> {
    match model {
        "all-mini-lm-l12-v2" => Ok(SentenceEmbeddingsModelType::AllMiniLmL12V2),
        "all-mini-lm-l6-v2" => Ok(SentenceEmbeddingsModelType::AllMiniLmL6V2),
        "all-distilroberta-v1" => Ok(SentenceEmbeddingsModelType::AllDistilrobertaV1),
        "bert-base-nli-mean-tokens" => Ok(SentenceEmbeddingsModelType::BertBaseNliMeanTokens),
        "distiluse-base-multilingual-cased" => {
            Ok(SentenceEmbeddingsModelType::DistiluseBaseMultilingualCased)
        }
        "paraphrase-albert-small-v2" => Ok(SentenceEmbeddingsModelType::ParaphraseAlbertSmallV2),
        "sentence-t5-base" => Ok(SentenceEmbeddingsModelType::SentenceT5Base),
        other => Err(HuggingFaceModelError::UnknownModel(other.to_string())),
    }
}

#[derive(thiserror::Error)]
pub enum HuggingFaceModelError {
    #[error("Unknown sentence embeddings model: {0}")]
    UnknownModel(String),
}

impl std::fmt::Debug for HuggingFaceModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
