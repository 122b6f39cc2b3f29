mod events;
mod genres;
mod images;
pub mod session;
mod stories;
mod users;

use axum::Router;
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, FromRequest, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};

use crate::SharedState;
use crate::error::{ApiError, UserErrorResponse};

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

impl<T> IntoResponse for AppJson<T>
where
    axum::Json<T>: IntoResponse,
{
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

pub async fn not_found(_state: State<SharedState>, _req: Request<Body>) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        AppJson(UserErrorResponse {
            message: "Not Found".to_string(),
        }),
    )
}

pub fn route_handler(state: SharedState) -> Router {
    Router::new()
        .route(
            "/api/session",
            post(session::sign_in).delete(session::sign_out),
        )
        .route("/api/genres", get(genres::list))
        .route(
            "/api/users/{username}",
            get(users::get_profile).put(users::edit_profile),
        )
        .route("/api/users/{username}/follow", post(users::toggle_follow))
        .route("/api/users/{username}/stories", get(users::list_stories))
        .route("/api/feed", get(stories::feed))
        .route(
            "/api/events",
            get(events::list).post(events::create),
        )
        .route(
            "/api/events/{id}",
            get(events::get_details).put(events::edit),
        )
        .route("/api/events/{id}/rsvp", post(events::rsvp))
        .route("/api/events/{id}/comments", post(events::add_comment))
        .route("/api/events/{id}/stories", get(events::list_stories))
        .route(
            "/api/stories",
            post(stories::create),
        )
        .route(
            "/api/stories/{id}",
            get(stories::get_details)
                .put(stories::edit_caption)
                .delete(stories::delete),
        )
        .route("/api/stories/{id}/like", post(stories::toggle_like))
        .route("/api/stories/{id}/comments", post(stories::add_comment))
        .route(
            "/api/images",
            post(images::upload).layer(DefaultBodyLimit::max(images::UPLOAD_BODY_LIMIT)),
        )
        .route("/api/images/{id}", get(images::get))
        .route("/ws", get(crate::relay::ws_handler))
        .fallback(not_found)
        .with_state(state)
}
