#![allow(dead_code)]

use std::str::FromStr as _;
use std::sync::Arc;

use musicbee_client::Client;
use musicbee_client_db::Mirror;
use musicbee_core::Timestamp;
use musicbee_core::entity::{EventCreate, SignInRequest, Venue};
use musicbee_core::id::{GenreId, Username};
use musicbee_server::{Opts, Server};
use tempfile::TempDir;
use tokio::task::JoinHandle;

/// A remote store on a random port with ephemeral storage.
pub struct TestRemote {
    pub base_url: String,
    server_task: JoinHandle<()>,
    _temp_dir: TempDir,
}

impl TestRemote {
    pub async fn start() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let opts = Opts::new(
            "127.0.0.1:0".to_owned(),
            None,
            false,
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

    /// Drop the listener; every remote call fails from here on.
    pub fn go_dark(&self) {
        self.server_task.abort();
    }
}

/// A mirror in its own temp dir plus a client pointed at `base_url`.
pub async fn client_with_mirror(base_url: &str) -> (TempDir, Arc<Mirror>, Client) {
    let mirror_dir = TempDir::new().expect("Failed to create temp dir");
    let mirror = Arc::new(
        Mirror::open(mirror_dir.path().join("mirror.redb"))
            .await
            .expect("Failed to open mirror"),
    );

    let client = Client::builder()
        .server_url(base_url.to_owned())
        .mirror(mirror.clone())
        .build()
        .expect("Failed to build client");

    (mirror_dir, mirror, client)
}

pub fn username(s: &str) -> Username {
    Username::from_str(s).expect("Valid username")
}

pub async fn sign_in(client: &Client, name: &str) {
    client
        .sign_in(&SignInRequest {
            username: username(name),
            display_name: name.to_owned(),
            email: format!("{name}@example.com"),
        })
        .await
        .expect("Sign-in failed");
}

pub fn event_create(name: &str) -> EventCreate {
    EventCreate {
        name: name.to_owned(),
        venue: Venue {
            address: "12 Hive St".to_owned(),
            latitude: 51.5,
            longitude: -0.1,
        },
        starts_at: Timestamp(Timestamp::now().0 + 3600),
        ends_at: Timestamp(Timestamp::now().0 + 7200),
        genres: vec![GenreId::from_str("techno").expect("Seeded")],
        description: "An event".to_owned(),
        image: None,
    }
}
