use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::failure_details;
use crate::{
    domain::entities::chat_message::ChatMessage,
    ports::chat_completion_service::{ChatCompletionService, ChatCompletionServiceError},
};

/// Chat completion and text generation from an Ollama server, without streaming
pub struct OllamaChatCompletionService {
    client: reqwest::Client,
    base_url: String,
    chat_model: String,
    generate_model: String,
}

impl OllamaChatCompletionService {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        chat_model: &str,
        generate_model: &str,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            chat_model: chat_model.to_string(),
            generate_model: generate_model.to_string(),
        }
    }

    async fn post<Request, Response>(
        &self,
        path: &str,
        request: &Request,
    ) -> Result<Response, ChatCompletionServiceError>
    where
        Request: Serialize + ?Sized,
        Response: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = failure_details(response).await;
            return Err(ChatCompletionServiceError::UnexpectedResponse { status, body });
        }

        Ok(response.json().await?)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[async_trait]
impl ChatCompletionService for OllamaChatCompletionService {
    #[tracing::instrument(
        name = "Chat completion with Ollama",
        skip(self, messages),
        fields(model = %self.chat_model, nb_messages = messages.len())
    )]
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, ChatCompletionServiceError> {
        let ChatResponse { message } = self
            .post(
                "/api/chat",
                &ChatRequest {
                    model: &self.chat_model,
                    messages: &messages,
                    stream: false,
                },
            )
            .await?;

        info!("Received chat completion");
        Ok(message.content)
    }

    #[tracing::instrument(name = "Text generation with Ollama", skip(self), fields(model = %self.generate_model))]
    async fn generate(&self, prompt: &str) -> Result<String, ChatCompletionServiceError> {
        let GenerateResponse { response } = self
            .post(
                "/api/generate",
                &GenerateRequest {
                    model: &self.generate_model,
                    prompt,
                    stream: false,
                },
            )
            .await?;

        Ok(response)
    }
}
