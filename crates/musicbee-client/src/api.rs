//! Typed request-handler calls
//!
//! One method per server operation; JSON in, JSON out, status codes mapped
//! onto [`ApiError`]. A single attempt each, no retry, the transport's
//! default timeout.

use musicbee_core::entity::{
    CaptionEdit, CommentCreate, CommentView, EventCreate, EventDetails, EventEdit, Genre,
    ImageUploaded, ProfileEdit, RsvpRequest, RsvpState, SignInRequest, StoryCreate, StoryDetails,
    UserProfile,
};
use musicbee_core::id::{GenreId, Username};
use musicbee_core::{EventId, ImageId, StoryId};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::Client;
use crate::error::{
    ApiError, ApiResult, DecodeSnafu, TransportSnafu,
};
use snafu::ResultExt as _;

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Map a non-2xx response onto the error taxonomy, keeping the server's
/// message where there is one.
async fn failure_of(resp: reqwest::Response) -> ApiError {
    let status = resp.status();
    let message = resp
        .json::<ErrorBody>()
        .await
        .map(|body| body.message)
        .unwrap_or_else(|_| status.to_string());

    match status.as_u16() {
        401 => ApiError::Unauthorized,
        403 => ApiError::Forbidden,
        404 => ApiError::NotFound,
        409 => ApiError::Conflict { message },
        413 => ApiError::PayloadTooLarge,
        400 => ApiError::BadRequest { message },
        status => ApiError::Server { status },
    }
}

impl Client {
    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: Result<reqwest::Response, reqwest::Error>,
    ) -> ApiResult<T> {
        let resp = resp.context(TransportSnafu)?;

        if resp.status().is_success() {
            return resp.json().await.context(DecodeSnafu);
        }

        Err(failure_of(resp).await)
    }

    async fn handle_empty_response(
        &self,
        resp: Result<reqwest::Response, reqwest::Error>,
    ) -> ApiResult<()> {
        let resp = resp.context(TransportSnafu)?;

        if resp.status().is_success() {
            return Ok(());
        }

        Err(failure_of(resp).await)
    }

    // Session

    pub async fn sign_in(&self, req: &SignInRequest) -> ApiResult<UserProfile> {
        let resp = self
            .http
            .post(self.api_url("/api/session"))
            .json(req)
            .send()
            .await;
        self.handle_response(resp).await
    }

    pub async fn sign_out(&self) -> ApiResult<()> {
        let resp = self.http.delete(self.api_url("/api/session")).send().await;
        self.handle_empty_response(resp).await
    }

    // Users

    pub async fn fetch_user(&self, username: &Username) -> ApiResult<UserProfile> {
        let resp = self
            .http
            .get(self.api_url(&format!("/api/users/{username}")))
            .send()
            .await;
        self.handle_response(resp).await
    }

    pub async fn update_profile(
        &self,
        username: &Username,
        edit: &ProfileEdit,
    ) -> ApiResult<UserProfile> {
        let resp = self
            .http
            .put(self.api_url(&format!("/api/users/{username}")))
            .json(edit)
            .send()
            .await;
        self.handle_response(resp).await
    }

    pub async fn toggle_follow(&self, username: &Username) -> ApiResult<UserProfile> {
        let resp = self
            .http
            .post(self.api_url(&format!("/api/users/{username}/follow")))
            .send()
            .await;
        self.handle_response(resp).await
    }

    pub async fn fetch_user_stories(&self, username: &Username) -> ApiResult<Vec<StoryDetails>> {
        let resp = self
            .http
            .get(self.api_url(&format!("/api/users/{username}/stories")))
            .send()
            .await;
        self.handle_response(resp).await
    }

    // Events

    pub async fn create_event(&self, create: &EventCreate) -> ApiResult<EventDetails> {
        let resp = self
            .http
            .post(self.api_url("/api/events"))
            .json(create)
            .send()
            .await;
        self.handle_response(resp).await
    }

    pub async fn fetch_event(&self, id: EventId) -> ApiResult<EventDetails> {
        let resp = self
            .http
            .get(self.api_url(&format!("/api/events/{id}")))
            .send()
            .await;
        self.handle_response(resp).await
    }

    pub async fn fetch_upcoming_events(
        &self,
        genre: Option<&GenreId>,
    ) -> ApiResult<Vec<EventDetails>> {
        let mut req = self.http.get(self.api_url("/api/events"));
        if let Some(genre) = genre {
            req = req.query(&[("genre", genre.to_string())]);
        }
        self.handle_response(req.send().await).await
    }

    pub async fn edit_event(&self, id: EventId, edit: &EventEdit) -> ApiResult<EventDetails> {
        let resp = self
            .http
            .put(self.api_url(&format!("/api/events/{id}")))
            .json(edit)
            .send()
            .await;
        self.handle_response(resp).await
    }

    pub async fn set_rsvp(&self, id: EventId, state: RsvpState) -> ApiResult<EventDetails> {
        let resp = self
            .http
            .post(self.api_url(&format!("/api/events/{id}/rsvp")))
            .json(&RsvpRequest { state })
            .send()
            .await;
        self.handle_response(resp).await
    }

    pub async fn comment_event(&self, id: EventId, text: &str) -> ApiResult<CommentView> {
        let resp = self
            .http
            .post(self.api_url(&format!("/api/events/{id}/comments")))
            .json(&CommentCreate {
                text: text.to_owned(),
            })
            .send()
            .await;
        self.handle_response(resp).await
    }

    pub async fn fetch_event_stories(&self, id: EventId) -> ApiResult<Vec<StoryDetails>> {
        let resp = self
            .http
            .get(self.api_url(&format!("/api/events/{id}/stories")))
            .send()
            .await;
        self.handle_response(resp).await
    }

    // Stories

    pub async fn create_story(&self, create: &StoryCreate) -> ApiResult<StoryDetails> {
        let resp = self
            .http
            .post(self.api_url("/api/stories"))
            .json(create)
            .send()
            .await;
        self.handle_response(resp).await
    }

    pub async fn fetch_story(&self, id: StoryId) -> ApiResult<StoryDetails> {
        let resp = self
            .http
            .get(self.api_url(&format!("/api/stories/{id}")))
            .send()
            .await;
        self.handle_response(resp).await
    }

    pub async fn fetch_feed(&self) -> ApiResult<Vec<StoryDetails>> {
        let resp = self.http.get(self.api_url("/api/feed")).send().await;
        self.handle_response(resp).await
    }

    pub async fn edit_caption(&self, id: StoryId, caption: Option<String>) -> ApiResult<StoryDetails> {
        let resp = self
            .http
            .put(self.api_url(&format!("/api/stories/{id}")))
            .json(&CaptionEdit { caption })
            .send()
            .await;
        self.handle_response(resp).await
    }

    pub async fn delete_story(&self, id: StoryId) -> ApiResult<()> {
        let resp = self
            .http
            .delete(self.api_url(&format!("/api/stories/{id}")))
            .send()
            .await;
        self.handle_empty_response(resp).await
    }

    pub async fn toggle_like(&self, id: StoryId) -> ApiResult<StoryDetails> {
        let resp = self
            .http
            .post(self.api_url(&format!("/api/stories/{id}/like")))
            .send()
            .await;
        self.handle_response(resp).await
    }

    pub async fn comment_story(&self, id: StoryId, text: &str) -> ApiResult<CommentView> {
        let resp = self
            .http
            .post(self.api_url(&format!("/api/stories/{id}/comments")))
            .json(&CommentCreate {
                text: text.to_owned(),
            })
            .send()
            .await;
        self.handle_response(resp).await
    }

    // Genres

    pub async fn fetch_genres(&self) -> ApiResult<Vec<Genre>> {
        let resp = self.http.get(self.api_url("/api/genres")).send().await;
        self.handle_response(resp).await
    }

    // Images

    pub async fn upload_image(&self, mime: &str, data: Vec<u8>) -> ApiResult<ImageId> {
        let part = reqwest::multipart::Part::bytes(data)
            .file_name("upload")
            .mime_str(mime)
            .map_err(|_| crate::error::ApiError::BadRequest {
                message: format!("Invalid mime type: {mime}"),
            })?;
        let form = reqwest::multipart::Form::new().part("image", part);

        let resp = self
            .http
            .post(self.api_url("/api/images"))
            .multipart(form)
            .send()
            .await;
        let uploaded: ImageUploaded = self.handle_response(resp).await?;
        Ok(uploaded.id)
    }
}
