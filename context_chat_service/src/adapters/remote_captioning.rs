use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use super::failure_details;
use crate::{
    domain::entities::{context_item::DEFAULT_IMAGE_FILENAME, image_upload::ImageUpload},
    ports::captioning_service::{CaptioningService, CaptioningServiceError},
};

/// Captions generated by a standalone vision API.
///
/// The API receives the image as the `image` field of a multipart form on `POST /process`
/// and answers `{"caption": "..."}`, like this service running with only the `vision` API.
pub struct RemoteCaptioningService {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteCaptioningService {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProcessResponse {
    caption: String,
}

#[async_trait]
impl CaptioningService for RemoteCaptioningService {
    #[tracing::instrument(name = "Caption image with remote vision API", skip(self))]
    async fn caption(&self, image: &ImageUpload) -> Result<String, CaptioningServiceError> {
        if image.content.is_empty() {
            return Err(CaptioningServiceError::EmptyImage);
        }

        let mut part = Part::bytes(image.content.clone())
            .file_name(
                image
                    .filename
                    .clone()
                    .unwrap_or_else(|| DEFAULT_IMAGE_FILENAME.to_string()),
            );
        if let Some(content_type) = &image.content_type {
            part = part.mime_str(content_type)?;
        }

        let response = self
            .client
            .post(format!("{}/process", self.base_url))
            .multipart(Form::new().part("image", part))
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = failure_details(response).await;
            return Err(CaptioningServiceError::UnexpectedResponse { status, body });
        }

        let ProcessResponse { caption } = response.json().await?;

        let caption = caption.trim();
        if caption.is_empty() {
            return Err(CaptioningServiceError::EmptyCaption);
        }

        Ok(caption.to_string())
    }
}
