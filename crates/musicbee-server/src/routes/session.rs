use axum::extract::{FromRequestParts, State};
use axum::http::{StatusCode, request};
use axum::response::IntoResponse;
use musicbee_core::entity::SignInRequest;
use musicbee_core::id::Username;
use tower_sessions::Session;

use super::AppJson;
use crate::SharedState;
use crate::error::{ApiError, ApiResult, InternalServerSnafu, LoginRequiredSnafu};

pub const SESSION_KEY: &str = "musicbee_username";

/// The signed-in identity, straight from the session cookie
///
/// The username is only ever used for display and ownership comparisons;
/// there is nothing else to an identity here.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser(pub Username);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        req: &mut request::Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(req, state)
            .await
            .map_err(|(_, msg)| InternalServerSnafu { msg }.build())?;

        let username: Username = session
            .get(SESSION_KEY)
            .await
            .map_err(|_| {
                InternalServerSnafu {
                    msg: "session store error",
                }
                .build()
            })?
            .ok_or_else(|| LoginRequiredSnafu.build())?;

        Ok(AuthenticatedUser(username))
    }
}

/// The identity-provider callback analog
///
/// A successful redirect from the provider lands here with the established
/// username; first sign-in creates the account.
pub async fn sign_in(
    State(state): State<SharedState>,
    session: Session,
    AppJson(req): AppJson<SignInRequest>,
) -> ApiResult<impl IntoResponse> {
    let created = state
        .store
        .upsert_user_on_sign_in(&req.username, &req.display_name, &req.email)
        .await?;

    session
        .insert(SESSION_KEY, req.username.clone())
        .await
        .map_err(|_| {
            InternalServerSnafu {
                msg: "session store error",
            }
            .build()
        })?;

    let profile = state
        .store
        .get_user_profile(&req.username)
        .await?
        .expect("Just upserted");

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, AppJson(profile)))
}

pub async fn sign_out(session: Session) -> ApiResult<impl IntoResponse> {
    session.flush().await.map_err(|_| {
        InternalServerSnafu {
            msg: "session store error",
        }
        .build()
    })?;
    Ok(StatusCode::NO_CONTENT)
}
