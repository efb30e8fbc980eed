pub mod embed;
pub mod embed_context;
pub mod generate;
pub mod health_check;
pub mod images;
pub mod process;
pub mod prompt;

pub use embed::*;
pub use embed_context::*;
pub use generate::*;
pub use health_check::*;
pub use images::*;
pub use process::*;
pub use prompt::*;

use actix_multipart::form::tempfile::TempFile;
use actix_web::{http::StatusCode, HttpResponse};
use serde_json::json;

use crate::domain::entities::image_upload::ImageUpload;

/// Every failure is answered with a JSON `{"error": "..."}` body
pub fn json_error_response(status: StatusCode, error: &impl std::fmt::Display) -> HttpResponse {
    HttpResponse::build(status).json(json!({ "error": error.to_string() }))
}

/// Reads an uploaded file, spooled on disk by actix-multipart, back into memory
async fn read_image_upload(file: TempFile) -> Result<ImageUpload, std::io::Error> {
    let content = tokio::fs::read(file.file.path()).await?;

    Ok(ImageUpload {
        filename: file.file_name.filter(|name| !name.trim().is_empty()),
        content_type: file.content_type.map(|mime| mime.to_string()),
        content,
    })
}
