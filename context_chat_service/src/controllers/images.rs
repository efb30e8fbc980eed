use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use common::helper::error_chain_fmt;
use serde_json::json;

use super::json_error_response;
use crate::{
    domain::entities::user_id::{UserId, UserIdError},
    use_cases::manage_images::{ManageImagesError, ManageImagesUseCase},
};

#[derive(Debug, serde::Deserialize)]
pub struct UserQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

impl UserQuery {
    fn parse_user_id(&self) -> Result<UserId, UserIdError> {
        UserId::parse(self.user_id.as_deref().unwrap_or_default())
    }
}

#[tracing::instrument(name = "Get images handler", skip(use_case))]
pub async fn get_images(
    use_case: web::Data<ManageImagesUseCase>,
    query: web::Query<UserQuery>,
) -> Result<HttpResponse, ImagesControllerError> {
    let user_id = query.parse_user_id()?;

    let images = use_case.list_images(&user_id).await?;

    Ok(HttpResponse::Ok().json(json!({ "images": images })))
}

#[tracing::instrument(name = "Delete all images handler", skip(use_case))]
pub async fn delete_all_images(
    use_case: web::Data<ManageImagesUseCase>,
    query: web::Query<UserQuery>,
) -> Result<HttpResponse, ImagesControllerError> {
    let user_id = query.parse_user_id()?;

    let deleted = use_case.delete_all_images(&user_id).await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "deleted": deleted })))
}

#[derive(thiserror::Error)]
pub enum ImagesControllerError {
    #[error(transparent)]
    InvalidUserId(#[from] UserIdError),
    #[error("An error occurred: {0}")]
    UseCaseError(#[from] ManageImagesError),
}

impl std::fmt::Debug for ImagesControllerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for ImagesControllerError {
    fn status_code(&self) -> StatusCode {
        match self {
            ImagesControllerError::InvalidUserId(_) => StatusCode::BAD_REQUEST,
            ImagesControllerError::UseCaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[tracing::instrument(name = "Response error from images controller", skip(self), fields(error = %self))]
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        json_error_response(self.status_code(), self)
    }
}
