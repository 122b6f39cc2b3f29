use axum::extract::{Query, State};
use axum::response::IntoResponse;
use maud::{Markup, html};
use musicbee_client::{ViewContext, ViewState};
use serde::Deserialize;

use super::Maud;
use super::session::UserSession;
use crate::error::RequestResult;
use crate::fragment::{stale_notice, unable_to_load};
use crate::{SharedState, UiState};

#[derive(Deserialize, Default)]
pub struct FeedQuery {
    /// Pre-selects the event a new story is posted to.
    pub event: Option<String>,
}

pub async fn get_feed(
    state: State<SharedState>,
    session: UserSession,
    Query(query): Query<FeedQuery>,
) -> RequestResult<impl IntoResponse> {
    let maybe = session.as_maybe();
    let client = state.client_for(session.username()).await?;

    let mut ctx = ViewContext::new();
    let loaded = client.load_feed(&mut ctx).await;
    ctx.finish();

    let content = match &loaded {
        ViewState::Fresh(stories) => {
            state.render_feed(stories, query.event.as_deref(), None)
        }
        ViewState::Cached(stories) => {
            let fetched_at = stories.iter().map(|s| s.fetched_at).min();
            state.render_feed(stories, query.event.as_deref(), fetched_at)
        }
        ViewState::Unavailable => unable_to_load("your feed"),
    };

    Ok(Maud(state.render_page("Feed - Musicbee", &maybe, content)))
}

impl UiState {
    fn render_feed(
        &self,
        stories: &[musicbee_client_db::StoryMirrorRecord],
        new_story_event: Option<&str>,
        stale_since: Option<musicbee_core::Timestamp>,
    ) -> Markup {
        html! {
            @if let Some(fetched_at) = stale_since {
                (stale_notice(fetched_at))
            }
            div ."o-feed" {
                h1 { "Your feed" }

                form ."o-feed__newStory"
                    action="/story/new"
                    method="post"
                    enctype="multipart/form-data"
                {
                    input type="file" name="image" accept="image/*" required {}
                    input type="text" name="caption" placeholder="Caption..." maxlength="500" {}
                    input type="text" name="location" placeholder="Where was this?" {}
                    @if let Some(event) = new_story_event {
                        input type="hidden" name="event" value=(event);
                    }
                    button ."u-button" type="submit" { "Post story" }
                }

                @if stories.is_empty() {
                    p ."o-feed__empty" {
                        "Nothing here yet. Follow some people to fill your feed."
                    }
                }
                div ."o-feed__items" {
                    @for story in stories {
                        (self.render_story_card(story))
                    }
                }
            }
        }
    }
}
