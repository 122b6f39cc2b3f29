#![allow(dead_code)]

use serde_json::json;
use tempfile::TempDir;
use tokio::task::JoinHandle;

/// A full viewer stack: remote store + web UI pointed at it, both on
/// random ports with ephemeral storage.
pub struct TestStack {
    pub remote_url: String,
    pub ui_url: String,
    remote_task: JoinHandle<()>,
    ui_task: JoinHandle<()>,
    _remote_dir: TempDir,
    _ui_dir: TempDir,
}

impl TestStack {
    pub async fn start() -> Self {
        let remote_dir = TempDir::new().expect("Failed to create temp dir");
        let remote_opts = musicbee_server::Opts::new(
            "127.0.0.1:0".to_owned(),
            None,
            false,
            remote_dir.path().to_path_buf(),
        );
        let remote = musicbee_server::Server::init(remote_opts)
            .await
            .expect("Failed to init remote");
        let remote_url = format!("http://{}", remote.addr().expect("Has an address"));
        let remote_task = tokio::spawn(async move {
            remote.run().await.expect("Remote run failed");
        });

        let ui_dir = TempDir::new().expect("Failed to create temp dir");
        let ui_opts = musicbee_web_ui::Opts::new(
            "127.0.0.1:0".to_owned(),
            remote_url.clone(),
            None, // assets_dir (source tree default)
            false,
            ui_dir.path().to_path_buf(),
        );
        let ui = musicbee_web_ui::Server::init(ui_opts)
            .await
            .expect("Failed to init viewer");
        let ui_url = format!("http://{}", ui.addr().expect("Has an address"));
        let ui_task = tokio::spawn(async move {
            ui.run().await.expect("Viewer run failed");
        });

        Self {
            remote_url,
            ui_url,
            remote_task,
            ui_task,
            _remote_dir: remote_dir,
            _ui_dir: ui_dir,
        }
    }

    /// Make the remote unreachable; the viewer stays up.
    pub fn remote_goes_dark(&self) {
        self.remote_task.abort();
    }

    pub fn driver(&self) -> UiDriver {
        UiDriver::new(self.ui_url.clone())
    }

    /// A client straight against the remote API, for seeding data.
    pub fn remote_driver(&self) -> RemoteDriver {
        RemoteDriver::new(self.remote_url.clone())
    }
}

/// Browser-like driver for the viewer; keeps its own cookie jar and does
/// not follow redirects, so tests can assert on redirect targets.
pub struct UiDriver {
    client: reqwest::Client,
    base_url: String,
}

impl UiDriver {
    fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to build HTTP client");

        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    pub async fn get_text(&self, path: &str) -> String {
        self.get(path).await.text().await.expect("Body text")
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST request failed")
    }

    pub async fn sign_in(&self, username: &str) -> reqwest::Response {
        self.post_form(
            "/signin",
            &[
                ("username", username),
                ("display_name", username),
                ("email", &format!("{username}@example.com")),
            ],
        )
        .await
    }
}

pub struct RemoteDriver {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteDriver {
    fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to build HTTP client");

        Self { client, base_url }
    }

    pub async fn sign_in(&self, username: &str) {
        let resp = self
            .client
            .post(format!("{}/api/session", self.base_url))
            .json(&json!({
                "username": username,
                "display_name": username,
                "email": format!("{username}@example.com"),
            }))
            .send()
            .await
            .expect("Sign-in failed");
        assert!(resp.status().is_success());
    }

    /// Create an event an hour from now; returns its id.
    pub async fn create_event(&self, name: &str) -> String {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("Clock after epoch")
            .as_secs();
        let resp = self
            .client
            .post(format!("{}/api/events", self.base_url))
            .json(&json!({
                "name": name,
                "venue": { "address": "12 Hive St", "latitude": 51.5, "longitude": -0.1 },
                "starts_at": now + 3600,
                "ends_at": now + 7200,
                "genres": ["techno"],
                "description": "An event",
                "image": null,
            }))
            .send()
            .await
            .expect("Event create failed");
        assert!(resp.status().is_success());
        let body: serde_json::Value = resp.json().await.expect("Json body");
        body["id"].as_str().expect("Has id").to_owned()
    }
}
