use snafu::{Location, Snafu};

/// Failures of a single request-handler call
///
/// The sync controller only cares about "failed at all" (any variant means
/// fall back to the mirror); mutation callers branch on the variants, 401
/// first.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ApiError {
    #[snafu(display("Remote store unreachable"))]
    Transport {
        source: reqwest::Error,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("Please sign in"))]
    Unauthorized,
    #[snafu(display("Not allowed"))]
    Forbidden,
    #[snafu(display("Not found"))]
    NotFound,
    #[snafu(display("{message}"))]
    Conflict {
        message: String,
    },
    #[snafu(display("Image too large"))]
    PayloadTooLarge,
    #[snafu(display("{message}"))]
    BadRequest {
        message: String,
    },
    #[snafu(display("Remote store error ({status})"))]
    Server {
        status: u16,
    },
    #[snafu(display("Malformed remote store response"))]
    Decode {
        source: reqwest::Error,
        #[snafu(implicit)]
        location: Location,
    },
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// 401 gets its own user-visible treatment; everything else that is not
    /// a recognizable validation message collapses to a generic notice.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized
            | ApiError::Conflict { .. }
            | ApiError::BadRequest { .. }
            | ApiError::PayloadTooLarge
            | ApiError::Forbidden
            | ApiError::NotFound => self.to_string(),
            ApiError::Transport { .. } | ApiError::Server { .. } | ApiError::Decode { .. } => {
                "Something went wrong, please try again".to_owned()
            }
        }
    }
}
