//! Client side of Musicbee
//!
//! A typed HTTP client for the remote store's request handlers, plus the
//! sync controller that keeps views usable when the remote is unreachable
//! by mirroring fetched entities into a local redb cache.

mod api;
pub mod error;
mod sync;

use std::sync::Arc;

use musicbee_client_db::Mirror;
use snafu::{ResultExt as _, Snafu};
use url::Url;

pub use crate::error::{ApiError, ApiResult};
pub use crate::sync::{ViewContext, ViewState};

const LOG_TARGET: &str = "musicbee::client";

#[derive(Debug, Snafu)]
pub enum InitError {
    #[snafu(display("Invalid server url"))]
    InvalidServerUrl { source: url::ParseError },
    #[snafu(display("HTTP client initialization error"))]
    HttpClient { source: reqwest::Error },
}

pub type InitResult<T> = std::result::Result<T, InitError>;

/// One signed-in (or anonymous) connection to the remote store
///
/// Identity is the cookie jar: a `Client` that signed in acts as that user
/// on every later call, so the viewer keeps one `Client` per signed-in
/// username. All of them share one [`Mirror`].
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    server_url: String,
    mirror: Arc<Mirror>,
}

#[bon::bon]
impl Client {
    #[builder(finish_fn(name = "build"))]
    pub fn new(server_url: String, mirror: Arc<Mirror>) -> InitResult<Client> {
        let parsed: Url = server_url.parse().context(InvalidServerUrlSnafu)?;

        let http = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .context(HttpClientSnafu)?;

        Ok(Self {
            http,
            server_url: String::from(parsed).trim_end_matches('/').to_owned(),
            mirror,
        })
    }
}

impl Client {
    pub(crate) fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.server_url, path)
    }

    /// Where the browser finds an image; images are served by the remote
    /// store directly.
    pub fn image_url(&self, id: musicbee_core::ImageId) -> String {
        self.api_url(&format!("/api/images/{id}"))
    }

    /// The relay WebSocket endpoint on the remote store.
    pub fn relay_url(&self) -> String {
        let ws_base = self
            .server_url
            .replacen("http://", "ws://", 1)
            .replacen("https://", "wss://", 1);
        format!("{ws_base}/ws")
    }

    pub fn mirror(&self) -> &Mirror {
        &self.mirror
    }
}
