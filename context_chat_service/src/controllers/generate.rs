use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use common::helper::error_chain_fmt;
use serde_json::json;

use super::json_error_response;
use crate::ports::chat_completion_service::{ChatCompletionService, ChatCompletionServiceError};

#[derive(Debug, serde::Deserialize)]
pub struct GenerateBodyData {
    pub prompt: Option<String>,
}

/// Standalone LLM API: forwards a raw prompt to the language model
#[tracing::instrument(name = "Generate handler", skip(chat_completion_service, body))]
pub async fn generate(
    chat_completion_service: web::Data<dyn ChatCompletionService>,
    body: web::Json<GenerateBodyData>,
) -> Result<HttpResponse, GenerateControllerError> {
    let prompt = body
        .prompt
        .as_deref()
        .filter(|prompt| !prompt.trim().is_empty())
        .ok_or(GenerateControllerError::MissingPrompt)?;

    let text = chat_completion_service.generate(prompt).await?;

    Ok(HttpResponse::Ok().json(json!({ "text": text })))
}

#[derive(thiserror::Error)]
pub enum GenerateControllerError {
    #[error("No prompt provided")]
    MissingPrompt,
    #[error("An error occurred: {0}")]
    ChatCompletionError(#[from] ChatCompletionServiceError),
}

impl std::fmt::Debug for GenerateControllerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for GenerateControllerError {
    fn status_code(&self) -> StatusCode {
        match self {
            GenerateControllerError::MissingPrompt => StatusCode::BAD_REQUEST,
            GenerateControllerError::ChatCompletionError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[tracing::instrument(name = "Response error from generate controller", skip(self), fields(error = %self))]
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        json_error_response(self.status_code(), self)
    }
}
