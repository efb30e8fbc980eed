#[cfg(feature = "huggingface")]
pub mod huggingface_embeddings;
pub mod ollama_captioning;
pub mod ollama_chat_completion;
pub mod ollama_embeddings;
pub mod remote_captioning;

/// Status code and body of a non-successful response, kept for error messages
async fn failure_details(response: reqwest::Response) -> (u16, String) {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    (status, body)
}
