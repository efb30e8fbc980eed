use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use common::helper::error_chain_fmt;
use serde_json::json;

use super::json_error_response;
use crate::{
    domain::entities::user_id::{UserId, UserIdError},
    use_cases::answer_prompt::{AnswerPromptError, AnswerPromptUseCase},
};

#[derive(Debug, serde::Deserialize)]
pub struct PromptBodyData {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    pub message: Option<String>,
}

/// Answers a user question from the context they previously sent
#[tracing::instrument(name = "Prompt handler", skip(use_case, body))]
pub async fn prompt(
    use_case: web::Data<AnswerPromptUseCase>,
    body: web::Json<PromptBodyData>,
) -> Result<HttpResponse, PromptControllerError> {
    let body = body.into_inner();

    let user_id = UserId::parse(body.user_id.as_deref().unwrap_or_default())?;
    let message = body
        .message
        .filter(|message| !message.trim().is_empty())
        .ok_or(PromptControllerError::MissingMessage)?;

    let answer = use_case.execute(&user_id, &message).await?;

    Ok(HttpResponse::Ok().json(json!({ "response": answer })))
}

#[derive(thiserror::Error)]
pub enum PromptControllerError {
    #[error(transparent)]
    InvalidUserId(#[from] UserIdError),
    #[error("Message is required")]
    MissingMessage,
    #[error("An error occurred: {0}")]
    UseCaseError(#[from] AnswerPromptError),
}

impl std::fmt::Debug for PromptControllerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for PromptControllerError {
    fn status_code(&self) -> StatusCode {
        match self {
            PromptControllerError::InvalidUserId(_) | PromptControllerError::MissingMessage => {
                StatusCode::BAD_REQUEST
            }
            PromptControllerError::UseCaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[tracing::instrument(name = "Response error from prompt controller", skip(self), fields(error = %self))]
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        json_error_response(self.status_code(), self)
    }
}
