use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use musicbee_core::StoryId;
use musicbee_core::entity::{CaptionEdit, CommentCreate, StoryCreate};
use musicbee_core::relay::RelayFrame;

use super::AppJson;
use super::session::AuthenticatedUser;
use crate::SharedState;
use crate::error::{ApiResult, BadRequestSnafu, ForbiddenSnafu, NotFoundSnafu};
use crate::store::{StoryCreateOutcome, WriteOutcome};

const FEED_LIMIT: usize = 100;

pub async fn create(
    State(state): State<SharedState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    AppJson(create): AppJson<StoryCreate>,
) -> ApiResult<impl IntoResponse> {
    match state.store.create_story(&actor, create).await? {
        StoryCreateOutcome::Created(details) => {
            // Wall viewers of the associated event learn about it live.
            if let Some(event) = details.event {
                state.relay.publish(&RelayFrame::NewEventStory {
                    room: event,
                    story: details.clone(),
                });
            }
            Ok((StatusCode::CREATED, AppJson(details)))
        }
        StoryCreateOutcome::UnknownEvent => BadRequestSnafu {
            message: "Unknown event",
        }
        .fail(),
        StoryCreateOutcome::UnknownImage => BadRequestSnafu {
            message: "Unknown image",
        }
        .fail(),
    }
}

pub async fn get_details(
    State(state): State<SharedState>,
    Path(id): Path<StoryId>,
) -> ApiResult<impl IntoResponse> {
    let details = state
        .store
        .get_story_details(id)
        .await?
        .ok_or_else(|| NotFoundSnafu.build())?;
    Ok(AppJson(details))
}

pub async fn feed(
    State(state): State<SharedState>,
    AuthenticatedUser(actor): AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    let stories = state.store.story_feed(&actor, FEED_LIMIT).await?;
    Ok(AppJson(stories))
}

pub async fn edit_caption(
    State(state): State<SharedState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<StoryId>,
    AppJson(edit): AppJson<CaptionEdit>,
) -> ApiResult<impl IntoResponse> {
    match state.store.edit_story_caption(&actor, id, edit.caption).await? {
        WriteOutcome::Done(details) => Ok(AppJson(details)),
        WriteOutcome::NotFound => NotFoundSnafu.fail(),
        WriteOutcome::Denied => ForbiddenSnafu.fail(),
    }
}

pub async fn delete(
    State(state): State<SharedState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<StoryId>,
) -> ApiResult<impl IntoResponse> {
    match state.store.delete_story(&actor, id).await? {
        WriteOutcome::Done(()) => Ok(StatusCode::NO_CONTENT),
        WriteOutcome::NotFound => NotFoundSnafu.fail(),
        WriteOutcome::Denied => ForbiddenSnafu.fail(),
    }
}

pub async fn toggle_like(
    State(state): State<SharedState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<StoryId>,
) -> ApiResult<impl IntoResponse> {
    let details = state
        .store
        .toggle_story_like(&actor, id)
        .await?
        .ok_or_else(|| NotFoundSnafu.build())?;
    Ok(AppJson(details))
}

pub async fn add_comment(
    State(state): State<SharedState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<StoryId>,
    AppJson(req): AppJson<CommentCreate>,
) -> ApiResult<impl IntoResponse> {
    let text = req.text.trim().to_owned();
    if text.is_empty() {
        return BadRequestSnafu {
            message: "Comment can't be empty",
        }
        .fail();
    }

    let comment = state
        .store
        .add_story_comment(&actor, id, text)
        .await?
        .ok_or_else(|| NotFoundSnafu.build())?;

    state.relay.publish(&RelayFrame::NewComment {
        username: comment.author.clone(),
        comment: comment.text.clone(),
        room: id,
    });

    Ok((StatusCode::CREATED, AppJson(comment)))
}
