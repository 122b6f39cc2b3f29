use axum::extract::{Path, State};
use axum::response::IntoResponse;
use musicbee_core::entity::ProfileEdit;
use musicbee_core::id::Username;

use super::AppJson;
use super::session::AuthenticatedUser;
use crate::SharedState;
use crate::error::{
    ApiResult, BadRequestSnafu, ConflictSnafu, ForbiddenSnafu, NotFoundSnafu,
};
use crate::store::ProfileUpdateOutcome;

pub async fn get_profile(
    State(state): State<SharedState>,
    Path(username): Path<Username>,
) -> ApiResult<impl IntoResponse> {
    let profile = state
        .store
        .get_user_profile(&username)
        .await?
        .ok_or_else(|| NotFoundSnafu.build())?;
    Ok(AppJson(profile))
}

pub async fn edit_profile(
    State(state): State<SharedState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(username): Path<Username>,
    AppJson(edit): AppJson<ProfileEdit>,
) -> ApiResult<impl IntoResponse> {
    if actor != username {
        return ForbiddenSnafu.fail();
    }

    match state.store.update_profile(&username, edit).await? {
        ProfileUpdateOutcome::Updated(profile) => Ok(AppJson(profile)),
        ProfileUpdateOutcome::NotFound => NotFoundSnafu.fail(),
        ProfileUpdateOutcome::DuplicateEmail => ConflictSnafu {
            message: "That email address is already in use",
        }
        .fail(),
        ProfileUpdateOutcome::UnknownGenre(genre) => BadRequestSnafu {
            message: format!("Unknown genre: {genre}"),
        }
        .fail(),
    }
}

pub async fn toggle_follow(
    State(state): State<SharedState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(username): Path<Username>,
) -> ApiResult<impl IntoResponse> {
    if actor == username {
        return BadRequestSnafu {
            message: "You can't follow yourself",
        }
        .fail();
    }

    let profile = state
        .store
        .toggle_follow(&actor, &username)
        .await?
        .ok_or_else(|| NotFoundSnafu.build())?;
    Ok(AppJson(profile))
}

pub async fn list_stories(
    State(state): State<SharedState>,
    Path(username): Path<Username>,
) -> ApiResult<impl IntoResponse> {
    if state.store.get_user_profile(&username).await?.is_none() {
        return NotFoundSnafu.fail();
    }

    let stories = state.store.stories_of_user(&username).await?;
    Ok(AppJson(stories))
}
