pub mod analytics;

pub use analytics::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

/// Envelope for single-object responses
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// Envelope for list responses
#[derive(Debug, Serialize)]
pub struct DataListResponse<T: Serialize> {
    pub data: Vec<T>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse<'a> {
    errors: &'a str,
}

/// JSON error body with the given status
pub fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(ErrorResponse { errors: message })).into_response()
}
