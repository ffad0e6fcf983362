use actix_web::http::StatusCode;
use actix_web::{HttpResponse, HttpResponseBuilder};
use serde::Serialize;

use crate::types::response::ErrorResponse;

use super::authz::DenyReason;

pub const DATABASE_ERROR: &str = "Database error";
pub const TOKEN_ERROR: &str = "Generate token failed";

/// A wrapper struct for HTTP responses. Failures always carry an
/// `{"error": ...}` body.
pub struct Response {
    http_response: HttpResponse,
}

impl Response {
    pub fn not_found(message: impl AsRef<str>) -> Self {
        Self::err_response(StatusCode::NOT_FOUND, message.as_ref().to_string())
    }

    pub fn bad_request(message: impl AsRef<str>) -> Self {
        let message = format!("Bad request: {}", message.as_ref());
        Self::err_response(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthenticated(message: impl AsRef<str>) -> Self {
        let message = format!("Unauthenticated: {}", message.as_ref());
        Self::err_response(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl AsRef<str>) -> Self {
        let message = format!("Forbidden: {}", message.as_ref());
        Self::err_response(StatusCode::FORBIDDEN, message)
    }

    pub fn error(message: &str) -> Self {
        Self::err_response(StatusCode::INTERNAL_SERVER_ERROR, message.to_string())
    }

    /// The response for a request the gate refused.
    pub fn denied(reason: DenyReason) -> Self {
        let status = reason.status();
        match status {
            StatusCode::UNAUTHORIZED => Self::unauthenticated(reason.to_string()),
            StatusCode::BAD_REQUEST => Self::bad_request(reason.to_string()),
            _ => Self::forbidden(reason.to_string()),
        }
    }

    pub fn json<T: Serialize>(data: T) -> Self {
        Self {
            http_response: HttpResponse::Ok().json(data),
        }
    }

    pub fn method_not_allowed() -> Self {
        Self::err_response(
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed".to_string(),
        )
    }

    pub fn status(&self) -> StatusCode {
        self.http_response.status()
    }

    fn err_response(status: StatusCode, message: String) -> Self {
        let resp = ErrorResponse { error: message };
        Self {
            http_response: HttpResponseBuilder::new(status).json(resp),
        }
    }
}

impl From<Response> for HttpResponse {
    fn from(val: Response) -> Self {
        val.http_response
    }
}
