use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use musicbee_util_error::FmtCompact as _;
use serde::Serialize;
use snafu::Snafu;
use tracing::{debug, warn};

use crate::routes::AppJson;
use crate::store::StoreError;

const LOG_TARGET: &str = "musicbee::server";

/// How user-facing error responses are serialized
#[derive(Serialize)]
pub struct UserErrorResponse {
    pub message: String,
}

#[derive(Debug, Snafu)]
pub enum ApiError {
    #[snafu(transparent)]
    Store {
        source: StoreError,
    },
    #[snafu(visibility(pub(crate)))]
    #[snafu(display("Please sign in"))]
    LoginRequired,
    #[snafu(visibility(pub(crate)))]
    #[snafu(display("Not allowed"))]
    Forbidden,
    #[snafu(visibility(pub(crate)))]
    #[snafu(display("Not found"))]
    NotFound,
    #[snafu(visibility(pub(crate)))]
    #[snafu(display("{message}"))]
    Conflict {
        message: String,
    },
    #[snafu(visibility(pub(crate)))]
    #[snafu(display("Image too large"))]
    PayloadTooLarge,
    #[snafu(visibility(pub(crate)))]
    #[snafu(display("{message}"))]
    BadRequest {
        message: String,
    },
    #[snafu(visibility(pub(crate)))]
    #[snafu(display("InternalServerError: {msg}"))]
    InternalServerError {
        msg: &'static str,
    },
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Body extraction failures surface as plain bad requests.
impl From<axum::extract::rejection::JsonRejection> for ApiError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        ApiError::BadRequest {
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        debug!(
            target: LOG_TARGET,
            err = %self.fmt_compact(),
            "Request error"
        );

        let (status_code, message) = match self {
            ApiError::LoginRequired => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            ApiError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Conflict { message } => (StatusCode::CONFLICT, message),
            ApiError::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, self.to_string()),
            ApiError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            ApiError::InternalServerError { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Service Error".to_owned(),
            ),
            ApiError::Store { ref source } => {
                warn!(
                    target: LOG_TARGET,
                    err = %source.fmt_compact(),
                    "Store error"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Service Error".to_owned(),
                )
            }
        };

        (status_code, AppJson(UserErrorResponse { message })).into_response()
    }
}
