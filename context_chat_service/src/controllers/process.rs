use actix_multipart::form::{tempfile::TempFile, MultipartForm};
use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use common::helper::error_chain_fmt;
use serde_json::json;

use super::{json_error_response, read_image_upload};
use crate::ports::captioning_service::{CaptioningService, CaptioningServiceError};

#[derive(Debug, MultipartForm)]
pub struct ProcessForm {
    image: Option<TempFile>,
}

/// Standalone vision API: captions a single image
#[tracing::instrument(name = "Process image handler", skip(captioning_service, form))]
pub async fn process(
    captioning_service: web::Data<dyn CaptioningService>,
    MultipartForm(form): MultipartForm<ProcessForm>,
) -> Result<HttpResponse, ProcessControllerError> {
    let file = form.image.ok_or(ProcessControllerError::MissingImage)?;
    let image = read_image_upload(file).await?;

    if image.content.is_empty() {
        return Err(ProcessControllerError::MissingImage);
    }

    let caption = captioning_service.caption(&image).await?;

    Ok(HttpResponse::Ok().json(json!({ "caption": caption })))
}

#[derive(thiserror::Error)]
pub enum ProcessControllerError {
    #[error("No image provided")]
    MissingImage,
    #[error("An error occurred: could not read the uploaded image: {0}")]
    UploadError(#[from] std::io::Error),
    #[error("An error occurred: {0}")]
    CaptioningError(#[from] CaptioningServiceError),
}

impl std::fmt::Debug for ProcessControllerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for ProcessControllerError {
    fn status_code(&self) -> StatusCode {
        match self {
            ProcessControllerError::MissingImage => StatusCode::BAD_REQUEST,
            ProcessControllerError::UploadError(_) | ProcessControllerError::CaptioningError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    #[tracing::instrument(name = "Response error from process controller", skip(self), fields(error = %self))]
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        json_error_response(self.status_code(), self)
    }
}
