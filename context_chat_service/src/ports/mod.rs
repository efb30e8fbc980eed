pub mod captioning_service;
pub mod chat_completion_service;
pub mod context_store;
pub mod embeddings_service;
