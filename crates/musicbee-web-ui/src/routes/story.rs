use std::str::FromStr as _;

use axum::Form;
use axum::extract::{Multipart, Path, State};
use axum::response::{IntoResponse, Redirect};
use maud::{Markup, html};
use musicbee_client::{ViewContext, ViewState};
use musicbee_client_db::StoryMirrorRecord;
use musicbee_core::entity::StoryCreate;
use musicbee_core::{EventId, StoryId};
use serde::Deserialize;

use super::Maud;
use super::session::{MaybeSession, UserSession};
use crate::error::{InternalServerSnafu, RequestResult};
use crate::fragment::{comment_line, stale_notice, unable_to_load};
use crate::util::time::format_timestamp;
use crate::{SharedState, UiState};

pub async fn get_story(
    state: State<SharedState>,
    session: MaybeSession,
    Path(id): Path<StoryId>,
) -> RequestResult<impl IntoResponse> {
    let client = state.client(&session).await?;
    let mut ctx = ViewContext::new();
    let loaded = client.load_story(&mut ctx, id).await;
    ctx.finish();

    let content = match &loaded {
        ViewState::Fresh(story) => state.render_story_page(&session, story, false),
        ViewState::Cached(story) => state.render_story_page(&session, story, true),
        ViewState::Unavailable => unable_to_load("this story"),
    };

    Ok(Maud(state.render_page("Story - Musicbee", &session, content)))
}

impl UiState {
    fn render_story_page(
        &self,
        session: &MaybeSession,
        story: &StoryMirrorRecord,
        stale: bool,
    ) -> Markup {
        let viewer = session.username();
        let is_owner = viewer.is_some_and(|u| *u == story.owner);
        let has_liked = viewer.is_some_and(|u| story.likes.contains(u));

        html! {
            @if stale {
                (stale_notice(story.fetched_at))
            }
            article ."o-storyPage"
                data-relay-url=(self.relay_url())
                data-room-kind="story"
                data-room-id=(story.id)
            {
                img ."o-storyPage__image" src=(self.image_url(story.image)) alt="Story photo" {}

                div ."o-storyPage__meta" {
                    a ."o-storyPage__owner" href=(format!("/profile/{}", story.owner)) {
                        (story.owner)
                    }
                    span ."o-storyPage__timestamp" { (format_timestamp(story.created_at)) }
                    @if let Some(location) = &story.location {
                        span ."o-storyPage__location" { (location) }
                    }
                    @if let Some(event) = story.event {
                        a ."o-storyPage__event" href=(format!("/events/{event}")) {
                            "From an event"
                        }
                    }
                }

                @if let Some(caption) = &story.caption {
                    p ."o-storyPage__caption" { (caption) }
                }
                @if is_owner {
                    form ."o-storyPage__captionForm"
                        action=(format!("/story/{}/caption", story.id))
                        method="post"
                    {
                        input type="text" name="caption" maxlength="500"
                            value=[story.caption.clone()]
                            placeholder="Edit caption..." {}
                        button ."u-button" type="submit" { "Save" }
                    }
                    form action=(format!("/story/{}/delete", story.id)) method="post" {
                        button ."u-button u-button--danger" type="submit" { "Delete story" }
                    }
                }

                div ."o-storyPage__likes" {
                    span { (story.likes.len()) " likes" }
                    @if viewer.is_some() {
                        form action=(format!("/story/{}/like", story.id)) method="post" {
                            button ."u-button" ."-active"[has_liked] type="submit" {
                                @if has_liked { "Unlike" } @else { "Like" }
                            }
                        }
                    }
                }

                section ."o-storyPage__comments" {
                    h2 { "Comments" }
                    div ."o-storyPage__commentList" {
                        @for comment in &story.comments {
                            (comment_line(comment.author.as_str(), &comment.text, comment.created_at))
                        }
                    }
                    div #live-comments {}
                    @if viewer.is_some() {
                        form ."o-storyPage__commentForm"
                            action=(format!("/story/{}/comment", story.id))
                            method="post"
                        {
                            input type="text" name="text" placeholder="Say something..."
                                maxlength="1000" required {}
                            button ."u-button" type="submit" { "Comment" }
                        }
                    }
                }
            }
        }
    }
}

/// Multipart: the photo plus optional caption, location and event id.
pub async fn post_new_story(
    state: State<SharedState>,
    session: UserSession,
    mut multipart: Multipart,
) -> RequestResult<impl IntoResponse> {
    let client = state.client_for(session.username()).await?;

    let mut image = None;
    let mut caption = None;
    let mut location = None;
    let mut event = None;

    while let Some(field) = multipart.next_field().await.map_err(|_| {
        InternalServerSnafu {
            msg: "multipart read error",
        }
        .build()
    })? {
        match field.name() {
            Some("image") => {
                let mime = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field.bytes().await.map_err(|_| {
                    InternalServerSnafu {
                        msg: "multipart read error",
                    }
                    .build()
                })?;
                image = Some(client.upload_image(&mime, data.to_vec()).await?);
            }
            Some("caption") => {
                let text = field.text().await.unwrap_or_default();
                if !text.trim().is_empty() {
                    caption = Some(text);
                }
            }
            Some("location") => {
                let text = field.text().await.unwrap_or_default();
                if !text.trim().is_empty() {
                    location = Some(text);
                }
            }
            Some("event") => {
                let text = field.text().await.unwrap_or_default();
                event = EventId::from_str(text.trim()).ok();
            }
            _ => {}
        }
    }

    let Some(image) = image else {
        return Ok(Redirect::to("/feed").into_response());
    };

    let story = client
        .create_story(&StoryCreate {
            image,
            caption,
            location,
            event,
        })
        .await?;

    Ok(Redirect::to(&format!("/story/{}", story.id)).into_response())
}

#[derive(Deserialize)]
pub struct CommentForm {
    pub text: String,
}

pub async fn post_comment(
    state: State<SharedState>,
    session: UserSession,
    Path(id): Path<StoryId>,
    Form(form): Form<CommentForm>,
) -> RequestResult<impl IntoResponse> {
    let client = state.client_for(session.username()).await?;
    client.comment_story(id, &form.text).await?;

    Ok(Redirect::to(&format!("/story/{id}")))
}

pub async fn post_like(
    state: State<SharedState>,
    session: UserSession,
    Path(id): Path<StoryId>,
) -> RequestResult<impl IntoResponse> {
    let client = state.client_for(session.username()).await?;
    client.toggle_like(id).await?;

    Ok(Redirect::to(&format!("/story/{id}")))
}

#[derive(Deserialize)]
pub struct CaptionForm {
    pub caption: String,
}

pub async fn post_caption(
    state: State<SharedState>,
    session: UserSession,
    Path(id): Path<StoryId>,
    Form(form): Form<CaptionForm>,
) -> RequestResult<impl IntoResponse> {
    let caption = if form.caption.trim().is_empty() {
        None
    } else {
        Some(form.caption)
    };

    let client = state.client_for(session.username()).await?;
    client.edit_caption(id, caption).await?;

    Ok(Redirect::to(&format!("/story/{id}")))
}

pub async fn post_delete(
    state: State<SharedState>,
    session: UserSession,
    Path(id): Path<StoryId>,
) -> RequestResult<impl IntoResponse> {
    let client = state.client_for(session.username()).await?;
    client.delete_story(id).await?;

    // The mirror copy goes too, so the ghost doesn't linger offline.
    if let Err(err) = client.mirror().delete_story(id).await {
        use musicbee_util_error::FmtCompact as _;
        tracing::warn!(
            target: crate::LOG_TARGET,
            err = %err.fmt_compact(),
            "Failed to drop deleted story from mirror"
        );
    }

    Ok(Redirect::to("/feed"))
}
