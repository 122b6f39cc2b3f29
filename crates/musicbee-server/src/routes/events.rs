use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use musicbee_core::entity::{CommentCreate, EventCreate, EventEdit, RsvpRequest};
use musicbee_core::id::GenreId;
use musicbee_core::relay::RelayFrame;
use musicbee_core::{EventId, Timestamp};
use serde::Deserialize;

use super::AppJson;
use super::session::AuthenticatedUser;
use crate::SharedState;
use crate::error::{ApiResult, BadRequestSnafu, ForbiddenSnafu, NotFoundSnafu};
use crate::store::EventWriteOutcome;

const EVENT_LIST_LIMIT: usize = 100;

#[derive(Deserialize, Default)]
pub struct EventListQuery {
    pub genre: Option<GenreId>,
    /// Unix seconds; defaults to "from now on"
    pub from: Option<u64>,
}

pub async fn create(
    State(state): State<SharedState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    AppJson(create): AppJson<EventCreate>,
) -> ApiResult<impl IntoResponse> {
    match state.store.create_event(&actor, create).await? {
        EventWriteOutcome::Done(details) => Ok((StatusCode::CREATED, AppJson(details))),
        EventWriteOutcome::UnknownGenre(genre) => BadRequestSnafu {
            message: format!("Unknown genre: {genre}"),
        }
        .fail(),
        EventWriteOutcome::NotFound => NotFoundSnafu.fail(),
        EventWriteOutcome::NotOrganiser => ForbiddenSnafu.fail(),
    }
}

pub async fn list(
    State(state): State<SharedState>,
    Query(query): Query<EventListQuery>,
) -> ApiResult<impl IntoResponse> {
    let from = query.from.map(Timestamp).unwrap_or_else(Timestamp::now);
    let events = state
        .store
        .list_upcoming_events(from, query.genre, EVENT_LIST_LIMIT)
        .await?;
    Ok(AppJson(events))
}

pub async fn get_details(
    State(state): State<SharedState>,
    Path(id): Path<EventId>,
) -> ApiResult<impl IntoResponse> {
    let details = state
        .store
        .get_event_details(id)
        .await?
        .ok_or_else(|| NotFoundSnafu.build())?;
    Ok(AppJson(details))
}

pub async fn edit(
    State(state): State<SharedState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<EventId>,
    AppJson(edit): AppJson<EventEdit>,
) -> ApiResult<impl IntoResponse> {
    match state.store.edit_event(&actor, id, edit).await? {
        EventWriteOutcome::Done(details) => Ok(AppJson(details)),
        EventWriteOutcome::NotFound => NotFoundSnafu.fail(),
        EventWriteOutcome::NotOrganiser => ForbiddenSnafu.fail(),
        EventWriteOutcome::UnknownGenre(genre) => BadRequestSnafu {
            message: format!("Unknown genre: {genre}"),
        }
        .fail(),
    }
}

pub async fn rsvp(
    State(state): State<SharedState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<EventId>,
    AppJson(req): AppJson<RsvpRequest>,
) -> ApiResult<impl IntoResponse> {
    let details = state
        .store
        .set_rsvp(&actor, id, req.state)
        .await?
        .ok_or_else(|| NotFoundSnafu.build())?;
    Ok(AppJson(details))
}

pub async fn add_comment(
    State(state): State<SharedState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<EventId>,
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
        .add_event_comment(&actor, id, text)
        .await?
        .ok_or_else(|| NotFoundSnafu.build())?;

    // Notify viewers of the event's discussion; the write is already
    // committed, so a missed frame is only a missed live update.
    state.relay.publish(&RelayFrame::NewEventComment {
        username: comment.author.clone(),
        comment: comment.text.clone(),
        room: id,
    });

    Ok((StatusCode::CREATED, AppJson(comment)))
}

pub async fn list_stories(
    State(state): State<SharedState>,
    Path(id): Path<EventId>,
) -> ApiResult<impl IntoResponse> {
    if state.store.get_event_details(id).await?.is_none() {
        return NotFoundSnafu.fail();
    }

    let stories = state.store.stories_of_event(id).await?;
    Ok(AppJson(stories))
}
