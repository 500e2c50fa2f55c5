use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError { status: StatusCode::BAD_REQUEST, message: msg.into() }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError { status: StatusCode::INTERNAL_SERVER_ERROR, message: msg.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

impl From<fmaster_reconciler::ReconcileError> for ApiError {
    fn from(e: fmaster_reconciler::ReconcileError) -> Self {
        ApiError::internal(e.to_string())
    }
}

impl From<fmaster_store::StoreError> for ApiError {
    fn from(e: fmaster_store::StoreError) -> Self {
        ApiError::internal(e.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::internal(e.to_string())
    }
}

impl From<fmaster_rgroup::RgroupError> for ApiError {
    fn from(e: fmaster_rgroup::RgroupError) -> Self {
        ApiError::internal(e.to_string())
    }
}
