pub mod chat_message;
pub mod context_item;
pub mod image_upload;
pub mod user_id;
