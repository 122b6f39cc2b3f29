use maud::{Markup, html};
use musicbee_client_db::{EventMirrorRecord, StoryMirrorRecord};
use musicbee_core::Timestamp;

use crate::UiState;
use crate::util::time::{format_event_time, format_timestamp};

/// The deterministic fallback for a view that could not be loaded from the
/// remote or the mirror; never leave a page silently blank.
pub(crate) fn unable_to_load(what: &str) -> Markup {
    html! {
        div ."o-unavailable" {
            p ."o-unavailable__title" { "Unable to load " (what) }
            p ."o-unavailable__hint" {
                "The server can't be reached and there is no local copy yet. Try again later."
            }
        }
    }
}

/// Banner on views rendered from the mirror rather than the remote store.
pub(crate) fn stale_notice(fetched_at: Timestamp) -> Markup {
    html! {
        div ."o-staleNotice" {
            "Offline: showing a local copy from " (format_timestamp(fetched_at)) " ago"
        }
    }
}

pub(crate) fn comment_line(author: &str, text: &str, created_at: Timestamp) -> Markup {
    html! {
        div ."m-comment" {
            a ."m-comment__author" href=(format!("/profile/{author}")) { (author) }
            span ."m-comment__text" { (text) }
            span ."m-comment__timestamp" { (format_timestamp(created_at)) }
        }
    }
}

impl UiState {
    pub(crate) fn render_story_card(&self, story: &StoryMirrorRecord) -> Markup {
        html! {
            article ."m-storyCard" {
                a href=(format!("/story/{}", story.id)) {
                    img ."m-storyCard__image"
                        src=(self.image_url(story.image))
                        alt="Story photo"
                        loading="lazy"
                        {}
                }
                div ."m-storyCard__meta" {
                    a ."m-storyCard__owner" href=(format!("/profile/{}", story.owner)) {
                        (story.owner)
                    }
                    span ."m-storyCard__timestamp" { (format_timestamp(story.created_at)) }
                }
                @if let Some(caption) = &story.caption {
                    p ."m-storyCard__caption" { (caption) }
                }
                div ."m-storyCard__counts" {
                    span { (story.likes.len()) " likes" }
                    span { (story.comments.len()) " comments" }
                }
            }
        }
    }

    pub(crate) fn render_event_card(&self, event: &EventMirrorRecord) -> Markup {
        html! {
            article ."m-eventCard" {
                @if let Some(image) = event.image {
                    img ."m-eventCard__image"
                        src=(self.image_url(image))
                        alt="Event photo"
                        loading="lazy"
                        {}
                }
                a ."m-eventCard__name" href=(format!("/events/{}", event.id)) { (event.name) }
                div ."m-eventCard__meta" {
                    span ."m-eventCard__time" { (format_event_time(event.starts_at)) }
                    span ."m-eventCard__venue" { (event.venue_address) }
                }
                div ."m-eventCard__genres" {
                    @for name in &event.genre_names {
                        span ."m-eventCard__genre" { (name) }
                    }
                }
                div ."m-eventCard__counts" {
                    span { (event.interested.len()) " interested" }
                    span { (event.going.len()) " going" }
                }
            }
        }
    }
}
