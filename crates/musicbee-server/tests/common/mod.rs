#![allow(dead_code)]

use musicbee_server::{Opts, Server};
use serde_json::json;
use tempfile::TempDir;
use tokio::task::JoinHandle;

/// A test API server running on a random port with ephemeral storage.
pub struct TestServer {
    base_url: String,
    server_task: JoinHandle<()>,
    _temp_dir: TempDir,
}

impl TestServer {
    pub async fn start() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let opts = Opts::new(
            "127.0.0.1:0".to_owned(),
            None,  // cors_origin
            false, // reuseport
            temp_dir.path().to_path_buf(),
        );

        let server = Server::init(opts).await.expect("Failed to init server");
        let base_url = format!("http://{}", server.addr().expect("Has an address"));

        let server_task = tokio::spawn(async move {
            server.run().await.expect("Server run failed");
        });

        Self {
            base_url,
            server_task,
            _temp_dir: temp_dir,
        }
    }

    /// Create a new `ApiDriver` with its own cookie jar (independent session).
    pub fn driver(&self) -> ApiDriver {
        ApiDriver::new(self.base_url.clone())
    }

    /// Drop the listener, making the remote unreachable from now on.
    pub fn shutdown(&self) {
        self.server_task.abort();
    }
}

/// HTTP client driver for the API in tests.
///
/// Each `ApiDriver` maintains its own cookie jar, so it represents an
/// independent signed-in browser.
pub struct ApiDriver {
    client: reqwest::Client,
    base_url: String,
}

impl ApiDriver {
    fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to build HTTP client");

        Self { client, base_url }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sign in (creating the account on first call) as `username`.
    pub async fn sign_in(&self, username: &str) -> reqwest::Response {
        self.post_json(
            "/api/session",
            &json!({
                "username": username,
                "display_name": username,
                "email": format!("{username}@example.com"),
            }),
        )
        .await
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    pub async fn post_json<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("POST request failed")
    }

    pub async fn put_json<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> reqwest::Response {
        self.client
            .put(self.url(path))
            .json(body)
            .send()
            .await
            .expect("PUT request failed")
    }

    pub async fn delete(&self, path: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .send()
            .await
            .expect("DELETE request failed")
    }

    /// Upload raw image bytes; returns the response.
    pub async fn upload_image(&self, data: Vec<u8>) -> reqwest::Response {
        let part = reqwest::multipart::Part::bytes(data)
            .file_name("upload.jpg")
            .mime_str("image/jpeg")
            .expect("Valid mime");
        let form = reqwest::multipart::Form::new().part("image", part);

        self.client
            .post(self.url("/api/images"))
            .multipart(form)
            .send()
            .await
            .expect("Upload request failed")
    }
}
