use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use super::failure_details;
use crate::{
    domain::entities::image_upload::ImageUpload,
    ports::captioning_service::{CaptioningService, CaptioningServiceError},
};

/// Captions generated by a vision model (ex: llava) served by an Ollama server.
///
/// The image is sent base64-encoded to `POST /api/generate`, along with an instruction prompt.
pub struct OllamaCaptioningService {
    client: reqwest::Client,
    base_url: String,
    model: String,
    prompt: String,
}

impl OllamaCaptioningService {
    pub fn new(client: reqwest::Client, base_url: &str, model: &str, prompt: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            prompt: prompt.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    images: Vec<String>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[async_trait]
impl CaptioningService for OllamaCaptioningService {
    #[tracing::instrument(name = "Caption image with Ollama", skip(self), fields(model = %self.model))]
    async fn caption(&self, image: &ImageUpload) -> Result<String, CaptioningServiceError> {
        if image.content.is_empty() {
            return Err(CaptioningServiceError::EmptyImage);
        }

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&GenerateRequest {
                model: &self.model,
                prompt: &self.prompt,
                images: vec![STANDARD.encode(&image.content)],
                stream: false,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = failure_details(response).await;
            return Err(CaptioningServiceError::UnexpectedResponse { status, body });
        }

        let GenerateResponse { response } = response.json().await?;

        let caption = response.trim();
        if caption.is_empty() {
            return Err(CaptioningServiceError::EmptyCaption);
        }

        Ok(caption.to_string())
    }
}
