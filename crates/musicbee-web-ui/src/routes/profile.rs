use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect};
use axum_extra::extract::Form;
use maud::{Markup, html};
use musicbee_client::{ViewContext, ViewState};
use musicbee_client_db::UserMirrorRecord;
use musicbee_core::entity::ProfileEdit;
use musicbee_core::id::{GenreId, Username};
use serde::Deserialize;
use std::str::FromStr as _;

use super::Maud;
use super::session::{MaybeSession, UserSession};
use crate::error::RequestResult;
use crate::fragment::{stale_notice, unable_to_load};
use crate::{SharedState, UiState};

pub async fn get_profile(
    state: State<SharedState>,
    session: MaybeSession,
    Path(username): Path<Username>,
) -> RequestResult<impl IntoResponse> {
    let client = state.client(&session).await?;
    let mut ctx = ViewContext::new();

    let loaded = client.load_user(&mut ctx, &username).await;
    let stories = client.load_user_stories(&mut ctx, &username).await;
    ctx.finish();

    let content = match &loaded {
        ViewState::Fresh(user) => state.render_profile(&session, user, &stories, false),
        ViewState::Cached(user) => state.render_profile(&session, user, &stories, true),
        ViewState::Unavailable => unable_to_load("this profile"),
    };

    let title = format!("{username} - Musicbee");
    Ok(Maud(state.render_page(&title, &session, content)))
}

impl UiState {
    fn render_profile(
        &self,
        session: &MaybeSession,
        user: &UserMirrorRecord,
        stories: &ViewState<Vec<musicbee_client_db::StoryMirrorRecord>>,
        stale: bool,
    ) -> Markup {
        let viewer = session.username();
        let is_self = viewer.is_some_and(|u| *u == user.username);
        let follows = viewer.is_some_and(|u| user.followers.contains(u));

        html! {
            @if stale {
                (stale_notice(user.fetched_at))
            }
            div ."o-profile" {
                header ."o-profile__header" {
                    @if let Some(avatar) = user.avatar {
                        img ."o-profile__avatar u-userImage"
                            src=(self.image_url(avatar))
                            alt=(format!("{}'s avatar", user.username))
                            {}
                    }
                    div ."o-profile__names" {
                        h1 { (user.display_name) }
                        span ."o-profile__username" { "@" (user.username) }
                    }
                    @if is_self {
                        a ."u-button" href="/self/edit" { "Edit profile" }
                    } @else if viewer.is_some() {
                        form action=(format!("/profile/{}/follow", user.username)) method="post" {
                            button ."u-button" ."-active"[follows] type="submit" {
                                @if follows { "Unfollow" } @else { "Follow" }
                            }
                        }
                    }
                }

                @if !user.bio.is_empty() {
                    p ."o-profile__bio" { (user.bio) }
                }

                div ."o-profile__stats" {
                    span { (user.followers.len()) " followers" }
                    span { (user.following.len()) " following" }
                }

                @if !user.favorite_genres.is_empty() {
                    div ."o-profile__genres" {
                        @for name in &user.favorite_genres {
                            span ."o-profile__genre" { (name) }
                        }
                    }
                }

                section ."o-profile__stories" {
                    h2 { "Stories" }
                    @match stories {
                        ViewState::Fresh(stories) | ViewState::Cached(stories) => {
                            @if stories.is_empty() {
                                p { "No stories yet." }
                            }
                            div ."o-profile__storyGrid" {
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
            }
        }
    }
}

pub async fn post_follow(
    state: State<SharedState>,
    session: UserSession,
    Path(username): Path<Username>,
) -> RequestResult<impl IntoResponse> {
    let client = state.client_for(session.username()).await?;
    client.toggle_follow(&username).await?;

    Ok(Redirect::to(&format!("/profile/{username}")))
}

pub async fn get_self_edit(
    state: State<SharedState>,
    session: UserSession,
) -> RequestResult<impl IntoResponse> {
    let maybe = session.as_maybe();
    let client = state.client_for(session.username()).await?;

    let mut ctx = ViewContext::new();
    let loaded = client.load_user(&mut ctx, session.username()).await;
    let genres = client
        .load_genres(&mut ctx)
        .await
        .into_option()
        .unwrap_or_default();
    ctx.finish();

    let content = match loaded {
        ViewState::Fresh(user) | ViewState::Cached(user) => html! {
            div ."o-profileEdit" {
                h1 { "Edit profile" }
                form action="/self/edit" method="post" {
                    label { "Display name"
                        input type="text" name="display_name" value=(user.display_name) {}
                    }
                    label { "Email"
                        input type="email" name="email" value=(user.email) {}
                    }
                    label { "Bio"
                        textarea name="bio" rows="3" { (user.bio) }
                    }
                    fieldset ."m-genrePicker" {
                        legend { "Favorite genres" }
                        @for genre in &genres {
                            label ."m-genrePicker__option" {
                                input type="checkbox" name="favorite_genres" value=(genre.id)
                                    checked[user.favorite_genres.contains(&genre.name)];
                                (genre.name)
                            }
                        }
                    }
                    button ."u-button" type="submit" { "Save" }
                }
            }
        },
        ViewState::Unavailable => unable_to_load("your profile"),
    };

    Ok(Maud(state.render_page("Edit profile - Musicbee", &maybe, content)))
}

#[derive(Deserialize)]
pub struct SelfEditForm {
    pub display_name: String,
    pub email: String,
    pub bio: String,
    #[serde(default)]
    pub favorite_genres: Vec<String>,
}

pub async fn post_self_edit(
    state: State<SharedState>,
    session: UserSession,
    Form(form): Form<SelfEditForm>,
) -> RequestResult<impl IntoResponse> {
    let client = state.client_for(session.username()).await?;

    let edit = ProfileEdit {
        display_name: Some(form.display_name),
        email: Some(form.email),
        bio: Some(form.bio),
        favorite_genres: Some(
            form.favorite_genres
                .iter()
                .filter_map(|raw| GenreId::from_str(raw).ok())
                .collect(),
        ),
        avatar: None,
    };

    client.update_profile(session.username(), &edit).await?;

    Ok(Redirect::to(&format!("/profile/{}", session.username())))
}
