mod cli;

use std::io;

use clap::Parser;
use cli::{Opts, make_serve_opts, make_web_opts};
use duct::cmd;
use musicbee_server::store::{Store, StoreError};
use musicbee_server::{ApiServerError, Server};
use musicbee_web_ui::WebUiServerError;
use snafu::{FromString, ResultExt, Snafu, Whatever};
use tracing::level_filters::LevelFilter;
use tracing::warn;
use tracing_subscriber::EnvFilter;

pub const PROJECT_NAME: &str = "musicbee";
pub const LOG_TARGET: &str = "musicbee::cli";

type WhateverResult<T> = std::result::Result<T, snafu::Whatever>;

#[derive(Debug, Snafu)]
pub enum CliError {
    #[snafu(display("API server error: {source}"))]
    ApiServer { source: ApiServerError },
    #[snafu(display("WebUI server error: {source}"))]
    WebUiServer { source: WebUiServerError },
    #[snafu(display("Store error: {source}"))]
    Store { source: StoreError },
    #[snafu(display("Data dir error: {source:?}"))]
    DataDir { source: io::Error },
    #[snafu(display("Miscellaneous error: {source}"))]
    Whatever { source: Whatever },
}

pub type CliResult<T> = std::result::Result<T, CliError>;

#[snafu::report]
#[tokio::main]
async fn main() -> CliResult<()> {
    init_logging().context(WhateverSnafu)?;

    let opts = Opts::parse();
    match handle_cmd(opts).await {
        Ok(v) => {
            println!("{}", serde_json::to_string_pretty(&v).expect("Can't fail"));
            Ok(())
        }
        Err(err) => Err(err),
    }
}

async fn handle_cmd(opts: Opts) -> CliResult<serde_json::Value> {
    Ok(match opts.cmd {
        cli::OptsCmd::Serve(ref serve_opts) => {
            let server = Server::init(make_serve_opts(opts.global.data_dir(), serve_opts))
                .await
                .context(ApiServerSnafu)?;

            server.run().await.context(ApiServerSnafu)?;

            serde_json::Value::Null
        }
        cli::OptsCmd::WebUi(ref web_opts) => {
            let server =
                musicbee_web_ui::Server::init(make_web_opts(opts.global.data_dir(), web_opts))
                    .await
                    .context(WebUiServerSnafu)?;

            if !web_opts.skip_xdg_open {
                if cmd!(
                    "xdg-open",
                    format!("http://{}", server.addr().context(WebUiServerSnafu)?)
                )
                .run()
                .is_err()
                {
                    warn!(target: LOG_TARGET, "Failed to open browser");
                };
            }

            server.run().await.context(WebUiServerSnafu)?;

            serde_json::Value::Null
        }
        cli::OptsCmd::Dev(cmd) => match cmd {
            cli::DevCmd::DbDump { table } => {
                let db_path = Store::mk_db_path(&opts.global.data_dir().join("server"))
                    .await
                    .context(DataDirSnafu)?;

                let store = Store::open(&db_path).await.context(StoreSnafu)?;

                store.dump_table(&table).await.context(StoreSnafu)?
            }
        },
    })
}

pub fn init_logging() -> WhateverResult<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .try_init()
        .map_err(|_| Whatever::without_source("Failed to initialize logging".to_string()))?;

    Ok(())
}
