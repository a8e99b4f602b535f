//! HTTP 请求处理器模块
//!
//! 错误统一返回 `{"error": {"message", "type"}}`。

pub mod chassis_api;
pub mod credentials_api;
pub mod inventory;
pub mod ops;
pub mod tags;

pub use chassis_api::*;
pub use credentials_api::*;
pub use inventory::*;
pub use ops::*;
pub use tags::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

pub fn build_error_response(status: StatusCode, error_type: &str, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": {
                "message": message,
                "type": error_type
            }
        })),
    )
        .into_response()
}

pub fn not_found(message: &str) -> Response {
    build_error_response(StatusCode::NOT_FOUND, "not_found", message)
}

pub fn invalid_request(message: &str) -> Response {
    build_error_response(StatusCode::BAD_REQUEST, "invalid_request", message)
}

pub fn database_error(message: &str) -> Response {
    build_error_response(StatusCode::INTERNAL_SERVER_ERROR, "database_error", message)
}

pub fn upstream_error(message: &str) -> Response {
    build_error_response(StatusCode::BAD_GATEWAY, "upstream_error", message)
}
