//! The Musicbee viewer
//!
//! Server-rendered front end: every page loads its data through the sync
//! controller in `musicbee-client`, so the app stays browsable from the
//! local mirror when the remote store is down. Live comment/story updates
//! arrive over the remote's relay WebSocket, which the browser connects to
//! directly.

mod asset_cache;
pub mod error;
mod fragment;
mod layout;
mod routes;
mod util;

use std::collections::HashMap;
use std::net::{AddrParseError, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr as _;
use std::sync::Arc;
use std::io;

use asset_cache::AssetCache;
use musicbee_client::Client;
use musicbee_client_db::{Mirror, MirrorError};
use musicbee_core::id::Username;
use musicbee_session_store::{MusicbeeSessionStore, SessionStoreInitError};
use snafu::{ResultExt as _, Snafu, Whatever};
use tokio::net::{TcpListener, TcpSocket};
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::compression::predicate::SizeAbove;
use tower_http::services::ServeDir;
use tower_http::CompressionLevel;
use tower_sessions::{Expiry, SessionManagerLayer};
use tracing::info;

use crate::error::RequestResult;

const LOG_TARGET: &str = "musicbee::web-ui";

fn default_assets_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets")
}

#[derive(Clone, Debug)]
pub struct Opts {
    pub listen: String,
    pub server_url: String,
    assets_dir: PathBuf,
    pub reuseport: bool,
    pub data_dir: PathBuf,
}

impl Opts {
    pub fn new(
        listen: String,
        server_url: String,
        assets_dir: Option<PathBuf>,
        reuseport: bool,
        data_dir: PathBuf,
    ) -> Self {
        Self {
            listen,
            server_url,
            assets_dir: assets_dir.unwrap_or_else(default_assets_dir),
            reuseport,
            data_dir,
        }
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }
}

pub struct UiState {
    mirror: Arc<Mirror>,
    anon_client: Client,
    /// One remote connection per signed-in username; identity lives in the
    /// client's cookie jar. All of them share the one mirror.
    user_clients: tokio::sync::RwLock<HashMap<Username, Client>>,
    pub assets: AssetCache,
    opts: Opts,
}

impl UiState {
    /// The connection for public, not-signed-in loads.
    pub fn client_anon(&self) -> Client {
        self.anon_client.clone()
    }

    pub async fn client_for(&self, username: &Username) -> RequestResult<Client> {
        if let Some(client) = self.user_clients.read().await.get(username) {
            return Ok(client.clone());
        }

        let client = Client::builder()
            .server_url(self.opts.server_url.clone())
            .mirror(self.mirror.clone())
            .build()?;

        let mut write = self.user_clients.write().await;
        Ok(write
            .entry(username.clone())
            .or_insert(client)
            .clone())
    }

    pub fn relay_url(&self) -> String {
        self.anon_client.relay_url()
    }

    pub fn image_url(&self, id: musicbee_core::ImageId) -> String {
        self.anon_client.image_url(id)
    }
}

pub type SharedState = Arc<UiState>;

#[derive(Debug, Snafu)]
pub enum WebUiServerError {
    #[snafu(transparent)]
    IO {
        source: io::Error,
    },

    Mirror {
        source: MirrorError,
    },

    #[snafu(transparent)]
    ClientInit {
        source: musicbee_client::InitError,
    },

    Session {
        source: SessionStoreInitError,
    },

    ListenAddr {
        source: AddrParseError,
    },

    AssetsLoad {
        source: Whatever,
    },
}

pub type ServerResult<T> = std::result::Result<T, WebUiServerError>;

pub struct Server {
    listener: TcpListener,

    state: SharedState,
}

impl Server {
    pub async fn init(opts: Opts) -> ServerResult<Server> {
        let listener = Self::get_listener(&opts).await?;

        let assets = AssetCache::load_files(opts.assets_dir())
            .await
            .context(AssetsLoadSnafu)?;

        let mirror = Arc::new(
            Mirror::open(Mirror::mk_db_path(&opts.data_dir).await?)
                .await
                .context(MirrorSnafu)?,
        );

        let anon_client = Client::builder()
            .server_url(opts.server_url.clone())
            .mirror(mirror.clone())
            .build()?;

        let state = Arc::new(UiState {
            mirror,
            anon_client,
            user_clients: tokio::sync::RwLock::new(HashMap::new()),
            assets,
            opts,
        });

        info!("Listening on {}", listener.local_addr()?);
        Ok(Self { listener, state })
    }

    pub async fn get_listener(opts: &Opts) -> ServerResult<TcpListener> {
        let socket = {
            let addr = SocketAddr::from_str(&opts.listen).context(ListenAddrSnafu)?;

            let socket = if addr.is_ipv4() {
                TcpSocket::new_v4()?
            } else {
                TcpSocket::new_v6()?
            };
            if opts.reuseport {
                #[cfg(unix)]
                socket.set_reuseport(true)?;
            }
            socket.set_nodelay(true)?;

            socket.bind(addr)?;

            socket
        };

        Ok(socket.listen(1024)?)
    }

    pub async fn run(self) -> ServerResult<()> {
        let session_store = MusicbeeSessionStore::new(self.state.mirror.raw_db())
            .context(SessionSnafu)?;
        let session_layer = SessionManagerLayer::new(session_store)
            .with_secure(false)
            .with_expiry(Expiry::OnInactivity(time::Duration::days(30)));

        let mut router = routes::route_handler(self.state.clone());

        if std::env::var("MUSICBEE_DEV_MODE").is_ok() {
            router = router.nest_service(
                "/assets",
                ServeDir::new(format!("{}/assets", env!("CARGO_MANIFEST_DIR"))),
            );
        } else {
            router = router.merge(routes::asset_route_handler(self.state.clone()));
        }

        info!("Starting viewer");
        axum::serve(
            self.listener,
            router
                .layer(session_layer)
                .layer(compression_layer())
                .into_make_service(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        Ok(())
    }

    pub fn addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}

fn compression_layer() -> CompressionLayer<SizeAbove> {
    CompressionLayer::new()
        .quality(CompressionLevel::Precise(4))
        .compress_when(SizeAbove::new(512))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
