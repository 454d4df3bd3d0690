//! HTTP error responses for the gateway service

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use selcom_apigw::api::error::Error as SelcomApiError;
use selcom_apigw::GatewayResponse;
use serde_json::json;

/// Error returned by business endpoints
#[derive(Debug)]
pub enum ApiError {
    /// Gateway could not be reached or answered non-2xx
    Transport(SelcomApiError),
    /// Gateway answered with a failing result code
    Business {
        /// Transaction the call was about
        transid: String,
        /// Decoded gateway response
        response: GatewayResponse,
    },
    /// Request could not be built or the answer could not be decoded
    Internal(String),
}

impl From<SelcomApiError> for ApiError {
    fn from(err: SelcomApiError) -> Self {
        if err.is_transport() {
            ApiError::Transport(err)
        } else {
            ApiError::Internal(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Transport(err) => {
                tracing::error!("Selcom transport failure: {}", err);
                let status = if err.is_timeout() {
                    StatusCode::GATEWAY_TIMEOUT
                } else {
                    StatusCode::BAD_GATEWAY
                };
                (
                    status,
                    Json(json!({
                        "status": "error",
                        "detail": format!("Selcom gateway unavailable: {}", err),
                    })),
                )
                    .into_response()
            }
            ApiError::Business { transid, response } => {
                let detail = format!("Transaction {} failed: {}", transid, response.message);
                tracing::warn!("{} (resultcode {})", detail, response.resultcode);
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "status": "failed",
                        "detail": detail,
                        "response": response,
                    })),
                )
                    .into_response()
            }
            ApiError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "status": "error",
                        "detail": detail,
                    })),
                )
                    .into_response()
            }
        }
    }
}
