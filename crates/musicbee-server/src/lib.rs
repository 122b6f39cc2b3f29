//! The Musicbee remote store service
//!
//! Owns the canonical application state and fronts it with a JSON API plus
//! the realtime relay WebSocket. Viewers talk to this over HTTP and mirror
//! what they fetch locally; this side neither knows nor cares about their
//! caches.

pub mod error;
mod relay;
mod routes;
pub mod store;

use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr as _;
use std::sync::Arc;
use std::time::Duration;
use std::io;

use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use musicbee_session_store::{MusicbeeSessionStore, SessionStoreInitError};
use musicbee_util_error::WhateverResult;
use snafu::{ResultExt as _, Snafu, Whatever};
use tokio::net::{TcpListener, TcpSocket};
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::compression::predicate::SizeAbove;
use tower_http::cors::CorsLayer;
use tower_http::CompressionLevel;
use tower_sessions::{Expiry, SessionManagerLayer};
use tracing::info;

pub use crate::relay::RelayBroker;
use crate::store::{Store, StoreError};

#[derive(Clone, Debug)]
pub struct Opts {
    pub listen: String,
    pub cors_origin: Option<String>,
    pub reuseport: bool,
    pub data_dir: PathBuf,
}

impl Opts {
    pub fn new(
        listen: String,
        cors_origin: Option<String>,
        reuseport: bool,
        data_dir: PathBuf,
    ) -> Self {
        Self {
            listen,
            cors_origin,
            reuseport,
            data_dir,
        }
    }
}

pub struct AppState {
    pub store: Store,
    pub relay: RelayBroker,
}

pub type SharedState = Arc<AppState>;

#[derive(Debug, Snafu)]
pub enum ApiServerError {
    #[snafu(transparent)]
    IO {
        source: io::Error,
    },

    Store {
        source: StoreError,
    },

    Session {
        source: SessionStoreInitError,
    },

    ListenAddr {
        source: AddrParseError,
    },

    Cors {
        source: Whatever,
    },
}

pub type ServerResult<T> = std::result::Result<T, ApiServerError>;

pub struct Server {
    listener: TcpListener,

    state: SharedState,
    opts: Opts,
}

impl Server {
    pub async fn init(opts: Opts) -> ServerResult<Server> {
        let listener = Self::get_listener(&opts).await?;

        let store = Store::open(Store::mk_db_path(&opts.data_dir).await?)
            .await
            .context(StoreSnafu)?;

        let state = Arc::new(AppState {
            store,
            relay: RelayBroker::new(),
        });

        info!("Listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            state,
            opts,
        })
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
        let session_store =
            MusicbeeSessionStore::new(self.state.store.raw_db()).context(SessionSnafu)?;
        let session_layer = SessionManagerLayer::new(session_store)
            .with_secure(false)
            .with_expiry(Expiry::OnInactivity(time::Duration::days(30)));

        let listen = self.addr()?;
        let router = routes::route_handler(self.state.clone())
            .layer(session_layer)
            .layer(cors_layer(&self.opts, listen)?)
            .layer(compression_layer());

        info!("Starting server");
        axum::serve(self.listener, router.into_make_service())
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

fn cors_layer(opts: &Opts, listen: SocketAddr) -> ServerResult<CorsLayer> {
    Ok(CorsLayer::new()
        .allow_credentials(true)
        .allow_headers([ACCEPT, CONTENT_TYPE])
        .max_age(Duration::from_secs(86400))
        .allow_origin(opts.cors_origin(listen).context(CorsSnafu)?)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::HEAD,
            Method::PATCH,
        ]))
}

impl Opts {
    pub fn cors_origin(&self, listen: SocketAddr) -> WhateverResult<HeaderValue> {
        self.cors_origin
            .clone()
            .unwrap_or_else(|| format!("http://{}", listen))
            .parse()
            .whatever_context("cors_origin does not parse as an http value")
    }
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
