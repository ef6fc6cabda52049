//! Whiteboard server: hand-rolled WebSocket session layer plus an axum
//! JSON control plane, run as two concurrent listeners (`spec.md` §4.9).

mod codec;
mod config;
mod connection;
mod error;
mod fanout;
mod http;
mod network;
mod rate_limit;
mod registry;
mod room;
mod router;

use std::sync::{Arc, Mutex};

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use whiteboard_store::{BoardStore, CredentialStore, ImageStore, StoreLayout, TimelapseStore};

use config::ServerConfig;
use registry::RoomRegistry;

#[derive(Parser)]
#[command(name = "whiteboard-server")]
#[command(about = "Collaborative whiteboard server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the whiteboard server
    Serve {
        /// WebSocket + static image listener address
        #[arg(long, env = "WHITEBOARD_WS_ADDR")]
        ws_addr: Option<String>,

        /// HTTP control plane listener address
        #[arg(long, env = "WHITEBOARD_HTTP_ADDR")]
        http_addr: Option<String>,

        /// Base directory for saved boards, images, and credentials
        #[arg(long, env = "WHITEBOARD_DATA_DIR")]
        data_dir: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let Commands::Serve { ws_addr, http_addr, data_dir } = cli.command;

    let mut cfg = ServerConfig::default();
    if let Some(ws_addr) = ws_addr {
        cfg.ws_bind_addr = ws_addr;
    }
    if let Some(http_addr) = http_addr {
        cfg.http_bind_addr = http_addr;
    }
    if let Some(data_dir) = data_dir {
        cfg.data_dir = data_dir;
    }
    cfg.validate();

    tracing::info!(?cfg, "starting whiteboard server");

    let layout = Arc::new(StoreLayout::new(&cfg.data_dir));
    layout.ensure_dirs().await?;

    let registry = Arc::new(RoomRegistry::with_queue_capacity(
        cfg.default_max_participants,
        cfg.replay_log_cap,
        cfg.outbound_queue_capacity,
    ));

    let credentials = CredentialStore::open(&layout.credentials_db_path())?;
    let app_state = Arc::new(http::AppState {
        boards: BoardStore::new((*layout).clone()),
        images: ImageStore::new((*layout).clone()),
        timelapses: TimelapseStore::new((*layout).clone()),
        credentials: Mutex::new(credentials),
        registry: Arc::clone(&registry),
    });

    let ws_listener = TcpListener::bind(&cfg.ws_bind_addr).await?;
    tracing::info!(addr = %cfg.ws_bind_addr, "websocket listener bound");
    let ws_task = tokio::spawn(network::serve(ws_listener, Arc::clone(&registry), Arc::clone(&layout)));

    let http_listener = TcpListener::bind(&cfg.http_bind_addr).await?;
    tracing::info!(addr = %cfg.http_bind_addr, "http control plane bound");
    let http_task = tokio::spawn(async move { axum::serve(http_listener, http::router(app_state)).await });

    tokio::select! {
        res = ws_task => {
            if let Ok(Err(err)) = res {
                tracing::error!(%err, "websocket listener stopped");
            }
        }
        res = http_task => {
            if let Ok(Err(err)) = res {
                tracing::error!(%err, "http control plane stopped");
            }
        }
    }

    Ok(())
}
