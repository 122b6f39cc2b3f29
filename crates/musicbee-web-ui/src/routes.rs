mod events;
mod feed;
mod genres;
mod profile;
pub mod session;
mod story;

use axum::Router;
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Path, Request, State};
use axum::http::header::{self, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use maud::Markup;

use crate::{SharedState, UiState};

#[derive(Clone, Debug)]
#[must_use]
pub struct Maud(pub Markup);

impl IntoResponse for Maud {
    fn into_response(self) -> Response {
        (
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/html; charset=utf-8"),
            )],
            self.0.0,
        )
            .into_response()
    }
}

pub async fn cache_control(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;

    if let Some(content_type) = response.headers().get(CONTENT_TYPE) {
        const NON_CACHEABLE_CONTENT_TYPES: &[&str] = &["text/html"];
        const SHORT_CACHE_CONTENT_TYPES: &[&str] = &["text/css"];

        let cache_duration_secs = if SHORT_CACHE_CONTENT_TYPES
            .iter()
            .any(|&ct| content_type.as_bytes().starts_with(ct.as_bytes()))
        {
            Some(10 * 60)
        } else if NON_CACHEABLE_CONTENT_TYPES
            .iter()
            .any(|&ct| content_type.as_bytes().starts_with(ct.as_bytes()))
        {
            None
        } else {
            Some(60 * 60)
        };

        if let Some(dur) = cache_duration_secs {
            let value = format!("public, max-age={dur}");

            response.headers_mut().insert(
                "cache-control",
                HeaderValue::from_str(&value).expect("Can't fail"),
            );
        }
    }

    response
}

pub async fn get_static_asset(
    state: State<SharedState>,
    Path(path): Path<String>,
    req_headers: HeaderMap,
) -> impl IntoResponse {
    let Some(asset) = state.assets.get(&path) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let mut resp_headers = HeaderMap::new();

    if let Some(content_type) = asset.content_type() {
        resp_headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(content_type),
        );
    }
    resp_headers.insert(
        header::ETAG,
        HeaderValue::from_str(&asset.etag).expect("Hex is header-safe"),
    );

    if let Some(if_none_match) = req_headers.get(header::IF_NONE_MATCH) {
        if if_none_match.as_bytes() == asset.etag.as_bytes() {
            return (StatusCode::NOT_MODIFIED, resp_headers).into_response();
        }
    }

    (resp_headers, asset.raw.clone()).into_response()
}

pub async fn not_found(state: State<SharedState>, _req: Request<Body>) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Maud(state.render_html_page(
            "Not found - Musicbee",
            crate::fragment::unable_to_load("this page"),
        )),
    )
}

pub fn route_handler(state: SharedState) -> Router<()> {
    Router::new()
        .route("/", get(events::home))
        .route("/signin", get(session::get_sign_in).post(session::post_sign_in))
        .route("/signout", post(session::post_sign_out))
        .route("/feed", get(feed::get_feed))
        .route("/genres", get(genres::get_genres))
        .route("/events/new", get(events::get_new_event).post(events::post_new_event))
        .route("/events/{id}", get(events::get_event))
        .route(
            "/events/{id}/edit",
            get(events::get_edit_event).post(events::post_edit_event),
        )
        .route("/events/{id}/rsvp", post(events::post_rsvp))
        .route("/events/{id}/comment", post(events::post_comment))
        .route(
            "/story/new",
            post(story::post_new_story).layer(DefaultBodyLimit::max(12 * 1024 * 1024)),
        )
        .route("/story/{id}", get(story::get_story))
        .route("/story/{id}/like", post(story::post_like))
        .route("/story/{id}/comment", post(story::post_comment))
        .route("/story/{id}/caption", post(story::post_caption))
        .route("/story/{id}/delete", post(story::post_delete))
        .route("/profile/{username}", get(profile::get_profile))
        .route("/profile/{username}/follow", post(profile::post_follow))
        .route(
            "/self/edit",
            get(profile::get_self_edit).post(profile::post_self_edit),
        )
        .fallback(not_found)
        .with_state(state)
        .layer(middleware::from_fn(cache_control))
}

/// In-memory asset routes; dev mode serves the source tree instead.
pub fn asset_route_handler(state: SharedState) -> Router<()> {
    Router::new()
        .route("/assets/{*path}", get(get_static_asset))
        .with_state(state)
}

impl UiState {
    /// Pick the signed-in connection when there is one, the anonymous one
    /// otherwise.
    pub(crate) async fn client(
        &self,
        session: &session::MaybeSession,
    ) -> crate::error::RequestResult<musicbee_client::Client> {
        match session.username() {
            Some(username) => self.client_for(username).await,
            None => Ok(self.client_anon()),
        }
    }
}
