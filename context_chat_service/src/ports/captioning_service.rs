use async_trait::async_trait;
use common::helper::error_chain_fmt;

use crate::domain::entities::image_upload::ImageUpload;

/// Describes an image with a short natural-language caption
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaptioningService: Send + Sync {
    async fn caption(&self, image: &ImageUpload) -> Result<String, CaptioningServiceError>;
}

#[derive(thiserror::Error)]
pub enum CaptioningServiceError {
    #[error("The uploaded image is empty")]
    EmptyImage,
    #[error("The captioning model returned an empty caption")]
    EmptyCaption,
    #[error("Error while requesting the captioning API: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Unexpected response from the captioning API ({status}): {body}")]
    UnexpectedResponse { status: u16, body: String },
}

impl std::fmt::Debug for CaptioningServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
