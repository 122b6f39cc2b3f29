use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use clap::{Args, Parser, Subcommand};

/// Command line options for the Musicbee CLI application
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Opts {
    /// Global options that apply to all commands
    #[command(flatten)]
    pub global: GlobalOpts,

    /// The specific command to execute
    #[command(subcommand)]
    pub cmd: OptsCmd,
}

/// Global options that apply across all commands
#[derive(Debug, Args)]
pub struct GlobalOpts {
    #[arg(env = "MUSICBEE_DATA_DIR", long)]
    pub data_dir: Option<PathBuf>,
}

static PROJECTS_DIR: LazyLock<directories::ProjectDirs> = LazyLock::new(|| {
    directories::ProjectDirs::from("org", "Musicbee", "musicbee")
        .expect("Unable to determine project's dir")
});

impl GlobalOpts {
    pub fn data_dir(&self) -> &Path {
        self.data_dir.as_deref().unwrap_or_else(|| {
            PROJECTS_DIR
                .state_dir()
                .unwrap_or_else(|| PROJECTS_DIR.data_local_dir())
        })
    }
}

/// Available commands for the Musicbee CLI
#[derive(Debug, Subcommand)]
pub enum OptsCmd {
    /// Run the remote store API server
    Serve(ServeOpts),

    /// Run the viewer web UI
    WebUi(WebUiOpts),

    /// Development and debugging commands
    #[command(subcommand)]
    Dev(DevCmd),
}

#[derive(Debug, Args)]
pub struct ServeOpts {
    /// Listen address
    #[arg(long, short, default_value = "[::1]:7310", env = "MUSICBEE_LISTEN")]
    pub listen: String,

    /// Set SO_REUSEPORT
    #[arg(long, env = "MUSICBEE_REUSEPORT")]
    pub reuseport: bool,

    /// Cors origin settings
    #[arg(long, env = "MUSICBEE_CORS_ORIGIN")]
    pub cors_origin: Option<String>,
}

#[derive(Debug, Args)]
pub struct WebUiOpts {
    /// Listen address
    #[arg(long, short, default_value = "[::1]:0", env = "MUSICBEE_UI_LISTEN")]
    pub listen: String,

    /// Base url of the remote store API server
    #[arg(
        long,
        default_value = "http://[::1]:7310",
        env = "MUSICBEE_SERVER_URL"
    )]
    pub server_url: String,

    #[arg(long)]
    pub skip_xdg_open: bool,

    /// Set SO_REUSEPORT
    #[arg(long, env = "MUSICBEE_REUSEPORT")]
    pub reuseport: bool,

    /// Root directory of the assets dir
    #[arg(long, env = "MUSICBEE_ASSETS_DIR")]
    pub assets_dir: Option<PathBuf>,
}

pub fn make_serve_opts(data_dir: &Path, opts: &ServeOpts) -> musicbee_server::Opts {
    musicbee_server::Opts::new(
        opts.listen.clone(),
        opts.cors_origin.clone(),
        opts.reuseport,
        data_dir.join("server"),
    )
}

pub fn make_web_opts(data_dir: &Path, opts: &WebUiOpts) -> musicbee_web_ui::Opts {
    musicbee_web_ui::Opts::new(
        opts.listen.clone(),
        opts.server_url.clone(),
        opts.assets_dir.clone(),
        opts.reuseport,
        data_dir.join("viewer"),
    )
}

/// Development and debugging commands
#[derive(Debug, Subcommand)]
pub enum DevCmd {
    /// Dump the keys of a store table
    DbDump {
        /// Table name (users, genres, events, stories, images)
        table: String,
    },
}
