use actix_multipart::form::{tempfile::TempFile, text::Text, MultipartForm};
use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use common::helper::error_chain_fmt;
use serde_json::json;
use tracing::info;

use super::{json_error_response, read_image_upload};
use crate::{
    domain::entities::user_id::{UserId, UserIdError},
    use_cases::embed_context::{EmbedContextError, EmbedContextRequest, EmbedContextUseCase},
};

#[derive(Debug, MultipartForm)]
pub struct EmbedContextForm {
    #[multipart(rename = "userId")]
    user_id: Option<Text<String>>,
    messages: Vec<Text<String>>,
    image: Option<TempFile>,
}

/// Stores the messages and the image of a user as context for their next prompts
#[tracing::instrument(name = "Embed context handler", skip(use_case, form))]
pub async fn embed_context(
    use_case: web::Data<EmbedContextUseCase>,
    MultipartForm(form): MultipartForm<EmbedContextForm>,
) -> Result<HttpResponse, EmbedContextControllerError> {
    let EmbedContextForm {
        user_id,
        messages,
        image,
    } = form;

    let user_id = UserId::parse(user_id.as_ref().map_or("", |user_id| user_id.as_str()))?;

    let image = match image {
        Some(file) => Some(read_image_upload(file).await?),
        None => None,
    };

    info!(%user_id, nb_messages = messages.len(), "Embedding context");

    let response = use_case
        .execute(EmbedContextRequest {
            user_id,
            messages: messages.into_iter().map(Text::into_inner).collect(),
            image,
        })
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "caption": response.caption,
        "stored": response.stored,
    })))
}

#[derive(thiserror::Error)]
pub enum EmbedContextControllerError {
    #[error(transparent)]
    InvalidUserId(#[from] UserIdError),
    #[error("An error occurred: could not read the uploaded image: {0}")]
    UploadError(#[from] std::io::Error),
    #[error("An error occurred: {0}")]
    UseCaseError(#[from] EmbedContextError),
}

impl std::fmt::Debug for EmbedContextControllerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for EmbedContextControllerError {
    fn status_code(&self) -> StatusCode {
        match self {
            EmbedContextControllerError::InvalidUserId(_) => StatusCode::BAD_REQUEST,
            EmbedContextControllerError::UploadError(_)
            | EmbedContextControllerError::UseCaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[tracing::instrument(name = "Response error from embed_context controller", skip(self), fields(error = %self))]
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        json_error_response(self.status_code(), self)
    }
}
