pub mod answer_prompt;
pub mod embed_context;
pub mod manage_images;
