use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use musicbee_core::ImageId;
use musicbee_core::entity::ImageUploaded;
use musicbee_util_error::{BoxedError, FmtCompact as _};
use tracing::debug;

use super::AppJson;
use super::session::AuthenticatedUser;
use crate::SharedState;
use crate::error::{ApiResult, BadRequestSnafu, NotFoundSnafu, PayloadTooLargeSnafu};
use crate::store::StoreError;

const LOG_TARGET: &str = "musicbee::server::images";

/// Oversized uploads are rejected with 413.
pub const MAX_IMAGE_BYTES: usize = 8 * 1024 * 1024;
/// Body cap leaves headroom over the image limit for multipart framing.
pub const UPLOAD_BODY_LIMIT: usize = MAX_IMAGE_BYTES + 1024 * 1024;

pub async fn upload(
    State(state): State<SharedState>,
    AuthenticatedUser(_actor): AuthenticatedUser,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| StoreError::from(Box::new(err) as BoxedError))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let mime = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = match field.bytes().await {
            Ok(data) => data,
            Err(err) => {
                // The body-limit layer aborts the stream mid-field when the
                // upload is over the cap.
                debug!(target: LOG_TARGET, err = %err.fmt_compact(), "Image upload aborted");
                return PayloadTooLargeSnafu.fail();
            }
        };

        if MAX_IMAGE_BYTES < data.len() {
            return PayloadTooLargeSnafu.fail();
        }

        let id = state.store.put_image(mime, data.to_vec()).await?;
        return Ok((StatusCode::CREATED, AppJson(ImageUploaded { id })));
    }

    BadRequestSnafu {
        message: "No image field in upload",
    }
    .fail()
}

pub async fn get(
    State(state): State<SharedState>,
    req_headers: HeaderMap,
    Path(id): Path<ImageId>,
) -> ApiResult<Response<Body>> {
    let Some(image) = state.store.get_image(id).await? else {
        return NotFoundSnafu.fail();
    };

    // Image bytes never change under an id, so the id is the ETag.
    let etag = format!("\"{id}\"");
    if let Some(if_none_match) = req_headers.get(header::IF_NONE_MATCH) {
        if if_none_match.as_bytes() == etag.as_bytes() {
            return Ok(StatusCode::NOT_MODIFIED.into_response());
        }
    }

    let mut resp_headers = HeaderMap::new();
    let Ok(mime) = HeaderValue::from_str(&image.mime) else {
        return BadRequestSnafu {
            message: "Stored image has an invalid mime type",
        }
        .fail();
    };
    resp_headers.insert(header::CONTENT_TYPE, mime);
    resp_headers.insert(
        header::ETAG,
        HeaderValue::from_str(&etag).expect("Base32 is header-safe"),
    );

    Ok((resp_headers, image.data).into_response())
}
