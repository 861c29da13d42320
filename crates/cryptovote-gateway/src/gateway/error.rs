use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tonic::{Code, Status};

/// Failures surfaced to HTTP callers as `{"error": message}`.
#[derive(thiserror::Error, Debug)]
pub enum GatewayError {
    /// The request body was not valid JSON for the route.
    #[error("Invalid request body: {0}")]
    MalformedPayload(#[from] JsonRejection),

    /// The gRPC server answered with a non-OK status.
    #[error("{}", .0.message())]
    Upstream(#[from] Status),

    /// The gRPC server answered OK but left out the record.
    #[error("Upstream response carried no cryptocurrency")]
    EmptyResponse,
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            GatewayError::Upstream(status) => http_status(status.code()),
            GatewayError::EmptyResponse => StatusCode::BAD_GATEWAY,
        }
    }
}

/// HTTP status for a gRPC status code.
pub fn http_status(code: Code) -> StatusCode {
    match code {
        Code::InvalidArgument => StatusCode::BAD_REQUEST,
        Code::NotFound => StatusCode::NOT_FOUND,
        Code::AlreadyExists => StatusCode::CONFLICT,
        Code::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(%status, "Upstream call failed: {self}");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
