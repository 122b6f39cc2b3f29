use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use maud::html;
use musicbee_client::error::ApiError;
use musicbee_util_error::FmtCompact as _;
use snafu::Snafu;
use tracing::{debug, warn};

use crate::LOG_TARGET;
use crate::routes::Maud;

#[derive(Debug, Snafu)]
pub enum RequestError {
    #[snafu(visibility(pub(crate)))]
    LoginRequired {
        redirect: Option<String>,
    },
    #[snafu(transparent)]
    Api {
        source: ApiError,
    },
    #[snafu(transparent)]
    Init {
        source: musicbee_client::InitError,
    },
    #[snafu(visibility(pub(crate)))]
    #[snafu(display("InternalServerError: {msg}"))]
    InternalServerError {
        msg: &'static str,
    },
}

pub type RequestResult<T> = std::result::Result<T, RequestError>;

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        debug!(
            target: LOG_TARGET,
            err = %self.fmt_compact(),
            "Request error"
        );

        match self {
            RequestError::LoginRequired { redirect } => {
                let url = match redirect {
                    Some(ref path) => {
                        format!("/signin?redirect={}", urlencoding::encode(path))
                    }
                    None => "/signin".to_string(),
                };
                Redirect::to(&url).into_response()
            }
            RequestError::Api { source } if source.is_unauthorized() => {
                // The remote rejected our session; make the user sign in
                // again rather than showing a dead end.
                Redirect::to("/signin").into_response()
            }
            RequestError::Api { source } => {
                let status = match source {
                    ApiError::NotFound => StatusCode::NOT_FOUND,
                    ApiError::Forbidden => StatusCode::FORBIDDEN,
                    ApiError::Conflict { .. } => StatusCode::CONFLICT,
                    ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
                    ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
                    _ => StatusCode::BAD_GATEWAY,
                };
                let message = source.user_message();
                (
                    status,
                    Maud(html! {
                        div ."o-notice -error" {
                            p { (message) }
                            a href="javascript:history.back()" { "Go back" }
                        }
                    }),
                )
                    .into_response()
            }
            err => {
                warn!(
                    target: LOG_TARGET,
                    err = %err.fmt_compact(),
                    "Unexpected request error"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Maud(html! {
                        div ."o-notice -error" {
                            p { "Something went wrong, please try again" }
                        }
                    }),
                )
                    .into_response()
            }
        }
    }
}
