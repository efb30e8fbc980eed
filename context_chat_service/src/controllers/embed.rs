use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use common::helper::error_chain_fmt;
use serde_json::json;

use super::json_error_response;
use crate::ports::embeddings_service::{EmbeddingsService, EmbeddingsServiceError};

#[derive(Debug, serde::Deserialize)]
pub struct EmbedBodyData {
    pub text: Option<String>,
}

/// Standalone embeddings API
#[tracing::instrument(name = "Embed handler", skip(embeddings_service, body))]
pub async fn embed(
    embeddings_service: web::Data<dyn EmbeddingsService>,
    body: web::Json<EmbedBodyData>,
) -> Result<HttpResponse, EmbedControllerError> {
    let text = body
        .text
        .as_deref()
        .filter(|text| !text.trim().is_empty())
        .ok_or(EmbedControllerError::MissingText)?;

    let embedding = embeddings_service.embed(text).await?;

    Ok(HttpResponse::Ok().json(json!({ "embedding": embedding })))
}

#[derive(thiserror::Error)]
pub enum EmbedControllerError {
    #[error("No text provided")]
    MissingText,
    #[error("An error occurred: {0}")]
    EmbeddingsError(#[from] EmbeddingsServiceError),
}

impl std::fmt::Debug for EmbedControllerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for EmbedControllerError {
    fn status_code(&self) -> StatusCode {
        match self {
            EmbedControllerError::MissingText => StatusCode::BAD_REQUEST,
            EmbedControllerError::EmbeddingsError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[tracing::instrument(name = "Response error from embed controller", skip(self), fields(error = %self))]
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        json_error_response(self.status_code(), self)
    }
}
