use std::str::FromStr as _;

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Redirect};
use axum_extra::extract::Form;
use maud::{Markup, html};
use musicbee_client::{ViewContext, ViewState};
use musicbee_client_db::EventMirrorRecord;
use musicbee_core::entity::{EventCreate, EventEdit, RsvpState, Venue};
use musicbee_core::id::GenreId;
use musicbee_core::{EventId, Timestamp};
use serde::Deserialize;
use time::PrimitiveDateTime;
use time::macros::format_description;

use super::Maud;
use super::session::{MaybeSession, UserSession};
use crate::error::RequestResult;
use crate::fragment::{comment_line, stale_notice, unable_to_load};
use crate::{SharedState, UiState};

#[derive(Deserialize, Default)]
pub struct HomeQuery {
    pub genre: Option<String>,
}

pub async fn home(
    state: State<SharedState>,
    session: MaybeSession,
    Query(query): Query<HomeQuery>,
) -> RequestResult<impl IntoResponse> {
    let genre = query
        .genre
        .as_deref()
        .and_then(|raw| GenreId::from_str(raw).ok());

    let client = state.client(&session).await?;
    let mut ctx = ViewContext::new();
    let loaded = client.load_upcoming_events(&mut ctx, genre.as_ref()).await;

    let content = match loaded {
        ViewState::Fresh(events) => render_event_list(&state, &session, &events, None),
        ViewState::Cached(events) => {
            let fetched_at = events.iter().map(|e| e.fetched_at).min();
            render_event_list(&state, &session, &events, fetched_at)
        }
        ViewState::Unavailable => unable_to_load("upcoming events"),
    };
    ctx.finish();

    Ok(Maud(state.render_page("Events - Musicbee", &session, content)))
}

fn render_event_list(
    state: &UiState,
    session: &MaybeSession,
    events: &[EventMirrorRecord],
    stale_since: Option<Timestamp>,
) -> Markup {
    html! {
        @if let Some(fetched_at) = stale_since {
            (stale_notice(fetched_at))
        }
        div ."o-eventList" {
            div ."o-eventList__header" {
                h1 { "Upcoming events" }
                @if session.is_signed_in() {
                    a ."u-button" href="/events/new" { "New event" }
                }
            }
            @if events.is_empty() {
                p ."o-eventList__empty" { "Nothing coming up." }
            }
            div ."o-eventList__items" {
                @for event in events {
                    (state.render_event_card(event))
                }
            }
        }
    }
}

pub async fn get_event(
    state: State<SharedState>,
    session: MaybeSession,
    Path(id): Path<EventId>,
) -> RequestResult<impl IntoResponse> {
    let client = state.client(&session).await?;
    let mut ctx = ViewContext::new();

    let loaded = client.load_event(&mut ctx, id).await;
    let stories = client.load_event_stories(&mut ctx, id).await;

    let content = match &loaded {
        ViewState::Fresh(event) => state.render_event_page(&session, event, &stories, false),
        ViewState::Cached(event) => state.render_event_page(&session, event, &stories, true),
        ViewState::Unavailable => unable_to_load("this event"),
    };
    ctx.finish();

    let title = loaded
        .into_option()
        .map(|e| format!("{} - Musicbee", e.name))
        .unwrap_or_else(|| "Musicbee".to_owned());
    Ok(Maud(state.render_page(&title, &session, content)))
}

impl UiState {
    fn render_event_page(
        &self,
        session: &MaybeSession,
        event: &EventMirrorRecord,
        stories: &ViewState<Vec<musicbee_client_db::StoryMirrorRecord>>,
        stale: bool,
    ) -> Markup {
        let viewer = session.username();
        let is_interested = viewer.is_some_and(|u| event.interested.contains(u));
        let is_going = viewer.is_some_and(|u| event.going.contains(u));
        let is_organiser = viewer.is_some_and(|u| *u == event.organiser);

        html! {
            @if stale {
                (stale_notice(event.fetched_at))
            }
            article ."o-eventPage"
                data-relay-url=(self.relay_url())
                data-room-kind="event"
                data-room-id=(event.id)
            {
                header ."o-eventPage__header" {
                    h1 { (event.name) }
                    @if is_organiser {
                        a ."u-button" href=(format!("/events/{}/edit", event.id)) { "Edit" }
                    }
                }
                @if let Some(image) = event.image {
                    img ."o-eventPage__image" src=(self.image_url(image)) alt="Event photo" {}
                }
                div ."o-eventPage__meta" {
                    span { "Organised by " a href=(format!("/profile/{}", event.organiser)) { (event.organiser) } }
                    span { (crate::util::time::format_event_time(event.starts_at)) " - " (crate::util::time::format_event_time(event.ends_at)) }
                    span { (event.venue_address) }
                    div ."o-eventPage__genres" {
                        @for name in &event.genre_names {
                            span ."o-eventPage__genre" { (name) }
                        }
                    }
                }
                p ."o-eventPage__description" { (event.description) }

                div ."o-eventPage__rsvp" {
                    span { (event.interested.len()) " interested, " (event.going.len()) " going" }
                    @if viewer.is_some() {
                        form action=(format!("/events/{}/rsvp", event.id)) method="post" {
                            input type="hidden" name="state"
                                value=(if is_interested { "none" } else { "interested" });
                            button ."u-button" ."-active"[is_interested] type="submit" {
                                "Interested"
                            }
                        }
                        form action=(format!("/events/{}/rsvp", event.id)) method="post" {
                            input type="hidden" name="state"
                                value=(if is_going { "none" } else { "going" });
                            button ."u-button" ."-active"[is_going] type="submit" {
                                "Going"
                            }
                        }
                    }
                }

                section ."o-eventPage__stories" {
                    h2 { "Stories" }
                    @match stories {
                        ViewState::Fresh(stories) | ViewState::Cached(stories) => {
                            @if stories.is_empty() {
                                p { "No stories from this event yet." }
                            }
                            div ."o-eventPage__storyWall" {
                                @for story in stories {
                                    (self.render_story_card(story))
                                }
                            }
                        }
                        ViewState::Unavailable => {
                            (unable_to_load("stories"))
                        }
                    }
                }

                section ."o-eventPage__comments" {
                    h2 { "Discussion" }
                    div ."o-eventPage__commentList" {
                        @for comment in &event.comments {
                            (comment_line(comment.author.as_str(), &comment.text, comment.created_at))
                        }
                    }
                    // New comments from other viewers land here live
                    div #live-comments {}
                    @if viewer.is_some() {
                        form ."o-eventPage__commentForm"
                            action=(format!("/events/{}/comment", event.id))
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

const DATETIME_LOCAL: &[time::format_description::BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]");

fn parse_datetime_local(raw: &str) -> Option<Timestamp> {
    let dt = PrimitiveDateTime::parse(raw, DATETIME_LOCAL).ok()?;
    let secs = dt.assume_utc().unix_timestamp();
    (0 <= secs).then(|| Timestamp(secs as u64))
}

#[derive(Deserialize)]
pub struct EventForm {
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub starts_at: String,
    pub ends_at: String,
    pub description: String,
    #[serde(default)]
    pub genres: Vec<String>,
}

async fn genre_checkboxes(
    state: &UiState,
    session: &MaybeSession,
    checked: &[String],
) -> RequestResult<Markup> {
    let client = state.client(session).await?;
    let mut ctx = ViewContext::new();
    let genres = client
        .load_genres(&mut ctx)
        .await
        .into_option()
        .unwrap_or_default();
    ctx.finish();

    Ok(html! {
        fieldset ."m-genrePicker" {
            legend { "Genres" }
            // `checked` holds slugs for new forms, display names when
            // prefilled from a mirror record
            @for genre in &genres {
                label ."m-genrePicker__option" {
                    input type="checkbox" name="genres" value=(genre.id)
                        checked[checked.contains(&genre.id.to_string()) || checked.contains(&genre.name)];
                    (genre.name)
                }
            }
        }
    })
}

fn event_form(action: &str, prefill: Option<&EventMirrorRecord>, genres: Markup) -> Markup {
    html! {
        form ."o-eventForm" action=(action) method="post" {
            label { "Name"
                input type="text" name="name" required
                    value=[prefill.map(|e| e.name.clone())] {}
            }
            label { "Address"
                input type="text" name="address" required
                    value=[prefill.map(|e| e.venue_address.clone())] {}
            }
            label { "Latitude"
                input type="number" step="any" name="latitude"
                    value=(prefill.map(|e| e.latitude).unwrap_or(0.0)) {}
            }
            label { "Longitude"
                input type="number" step="any" name="longitude"
                    value=(prefill.map(|e| e.longitude).unwrap_or(0.0)) {}
            }
            label { "Starts"
                input type="datetime-local" name="starts_at" required {}
            }
            label { "Ends"
                input type="datetime-local" name="ends_at" required {}
            }
            label { "Description"
                textarea name="description" rows="4" {
                    (prefill.map(|e| e.description.clone()).unwrap_or_default())
                }
            }
            (genres)
            button ."u-button" type="submit" { "Save" }
        }
    }
}

pub async fn get_new_event(
    state: State<SharedState>,
    session: UserSession,
) -> RequestResult<impl IntoResponse> {
    let maybe = session.as_maybe();
    let genres = genre_checkboxes(&state, &maybe, &[]).await?;
    let content = html! {
        div ."o-eventFormPage" {
            h1 { "New event" }
            (event_form("/events/new", None, genres))
        }
    };
    Ok(Maud(state.render_page("New event - Musicbee", &maybe, content)))
}

fn form_to_create(form: EventForm) -> Option<EventCreate> {
    Some(EventCreate {
        name: form.name,
        venue: Venue {
            address: form.address,
            latitude: form.latitude,
            longitude: form.longitude,
        },
        starts_at: parse_datetime_local(&form.starts_at)?,
        ends_at: parse_datetime_local(&form.ends_at)?,
        genres: form
            .genres
            .iter()
            .filter_map(|raw| GenreId::from_str(raw).ok())
            .collect(),
        description: form.description,
        image: None,
    })
}

pub async fn post_new_event(
    state: State<SharedState>,
    session: UserSession,
    Form(form): Form<EventForm>,
) -> RequestResult<impl IntoResponse> {
    let client = state.client_for(session.username()).await?;

    let Some(create) = form_to_create(form) else {
        return Ok(Redirect::to("/events/new").into_response());
    };

    let event = client.create_event(&create).await?;
    Ok(Redirect::to(&format!("/events/{}", event.id)).into_response())
}

pub async fn get_edit_event(
    state: State<SharedState>,
    session: UserSession,
    Path(id): Path<EventId>,
) -> RequestResult<impl IntoResponse> {
    let maybe = session.as_maybe();
    let client = state.client_for(session.username()).await?;

    let mut ctx = ViewContext::new();
    let loaded = client.load_event(&mut ctx, id).await;
    ctx.finish();

    let content = match loaded {
        ViewState::Fresh(event) | ViewState::Cached(event) => {
            let genres = genre_checkboxes(&state, &maybe, &event.genre_names).await?;
            html! {
                div ."o-eventFormPage" {
                    h1 { "Edit " (event.name) }
                    (event_form(&format!("/events/{id}/edit"), Some(&event), genres))
                }
            }
        }
        ViewState::Unavailable => unable_to_load("this event"),
    };

    Ok(Maud(state.render_page("Edit event - Musicbee", &maybe, content)))
}

pub async fn post_edit_event(
    state: State<SharedState>,
    session: UserSession,
    Path(id): Path<EventId>,
    Form(form): Form<EventForm>,
) -> RequestResult<impl IntoResponse> {
    let client = state.client_for(session.username()).await?;

    let edit = EventEdit {
        name: Some(form.name),
        venue: Some(Venue {
            address: form.address,
            latitude: form.latitude,
            longitude: form.longitude,
        }),
        starts_at: parse_datetime_local(&form.starts_at),
        ends_at: parse_datetime_local(&form.ends_at),
        genres: Some(
            form.genres
                .iter()
                .filter_map(|raw| GenreId::from_str(raw).ok())
                .collect(),
        ),
        description: Some(form.description),
        image: None,
    };

    client.edit_event(id, &edit).await?;
    Ok(Redirect::to(&format!("/events/{id}")))
}

#[derive(Deserialize)]
pub struct RsvpForm {
    pub state: String,
}

pub async fn post_rsvp(
    state: State<SharedState>,
    session: UserSession,
    Path(id): Path<EventId>,
    Form(form): Form<RsvpForm>,
) -> RequestResult<impl IntoResponse> {
    let rsvp = match form.state.as_str() {
        "interested" => RsvpState::Interested,
        "going" => RsvpState::Going,
        _ => RsvpState::None,
    };

    let client = state.client_for(session.username()).await?;
    client.set_rsvp(id, rsvp).await?;

    Ok(Redirect::to(&format!("/events/{id}")))
}

#[derive(Deserialize)]
pub struct CommentForm {
    pub text: String,
}

pub async fn post_comment(
    state: State<SharedState>,
    session: UserSession,
    Path(id): Path<EventId>,
    Form(form): Form<CommentForm>,
) -> RequestResult<impl IntoResponse> {
    let client = state.client_for(session.username()).await?;
    client.comment_event(id, &form.text).await?;

    Ok(Redirect::to(&format!("/events/{id}")))
}
