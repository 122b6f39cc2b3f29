use axum::extract::State;
use axum::response::IntoResponse;
use maud::html;
use musicbee_client::{ViewContext, ViewState};

use super::Maud;
use super::session::MaybeSession;
use crate::SharedState;
use crate::error::RequestResult;
use crate::fragment::unable_to_load;

pub async fn get_genres(
    state: State<SharedState>,
    session: MaybeSession,
) -> RequestResult<impl IntoResponse> {
    let client = state.client(&session).await?;
    let mut ctx = ViewContext::new();
    let loaded = client.load_genres(&mut ctx).await;
    ctx.finish();

    let content = match loaded {
        ViewState::Fresh(genres) | ViewState::Cached(genres) => html! {
            div ."o-genres" {
                h1 { "Browse by genre" }
                div ."o-genres__list" {
                    @for genre in &genres {
                        a ."o-genres__item" href=(format!("/?genre={}", genre.id)) {
                            (genre.name)
                        }
                    }
                }
            }
        },
        ViewState::Unavailable => unable_to_load("genres"),
    };

    Ok(Maud(state.render_page("Genres - Musicbee", &session, content)))
}
