use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use navi_types::envelope::Envelope;

use crate::error::ApiError;

/// Successful result, wrapped in the `{code, message, data}` envelope.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub message: &'static str,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: &'static str, data: T) -> Self {
        Self { message, data }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        match serde_json::to_value(&self.data) {
            Ok(data) => (StatusCode::OK, Json(Envelope::ok(self.message, data))).into_response(),
            Err(e) => ApiError::Internal(anyhow::Error::new(e).context("serializing response data"))
                .into_response(),
        }
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;
