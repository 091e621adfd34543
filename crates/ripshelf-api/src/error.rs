use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        ApiError { status: StatusCode::BAD_REQUEST, detail: detail.into() }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        ApiError { status: StatusCode::NOT_FOUND, detail: detail.into() }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        ApiError { status: StatusCode::INTERNAL_SERVER_ERROR, detail: detail.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "detail": self.detail }));
        (self.status, body).into_response()
    }
}

impl From<ripshelf_store::StoreError> for ApiError {
    fn from(e: ripshelf_store::StoreError) -> Self {
        use ripshelf_store::StoreError;
        match e {
            StoreError::JobNotFound(_)
            | StoreError::CollectionNotFound(_)
            | StoreError::WantedNotFound(_) => ApiError::not_found(e.to_string()),
            StoreError::InvalidTransition { .. } | StoreError::Domain(_) => {
                ApiError::bad_request(e.to_string())
            }
            _ => ApiError::internal(e.to_string()),
        }
    }
}

impl From<ripshelf_pipeline::PipelineError> for ApiError {
    fn from(e: ripshelf_pipeline::PipelineError) -> Self {
        match e {
            ripshelf_pipeline::PipelineError::Store(e) => e.into(),
            _ => ApiError::internal(e.to_string()),
        }
    }
}
