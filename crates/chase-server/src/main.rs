//! chase-server: WebSocket chat host running the chase battle plugin.
//!
//! Clients say hello, get a participant slot, and exchange chat lines.
//! Chase commands are handed to the plugin; everything else is relayed to
//! all connected clients.

mod connection;
mod protocol;
mod registry;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use chase_battle::ChasePlugin;
use chase_common::{new_correlation_id, ChaseError};
use chase_config::ChaseConfig;
use clap::Parser;
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tracing::Instrument;

use crate::connection::handle_connection;
use crate::registry::ClientRegistry;
use crate::state::ServerState;

#[derive(Parser)]
#[command(name = "chase-server", about = "Chat server hosting chase battles")]
struct Args {
    /// Config file. Defaults to the platform config dir.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on, overriding the config file.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), ChaseError> {
    let args = Args::parse();
    let config = load(&args)?;

    let level = config.logging.level.as_directive();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("chase_server={level},chase_battle={level},chase_config={level}").into()
            }),
        )
        .init();

    let addr = config.server.listen_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(
        slots = config.server.max_slots,
        ai_slots = ?config.server.ai_slots,
        "chase-server listening on {}",
        addr
    );

    let registry = Arc::new(ClientRegistry::new(&config.server));
    let plugin = ChasePlugin::start(&config, registry.clone(), registry.clone());
    let state = Arc::new(ServerState::new(
        &config,
        registry.clone(),
        plugin.commands().clone(),
    ));

    // Accept loop.
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    let state = state.clone();
                    // Every log line of this connection's task carries `conn`.
                    let span = tracing::info_span!("conn", conn = %new_correlation_id());
                    tokio::spawn(
                        async move {
                            match accept_async(stream).await {
                                Ok(ws) => handle_connection(ws, addr, state).await,
                                Err(e) => {
                                    tracing::warn!(peer = %addr, error = %e, "WS handshake failed");
                                }
                            }
                        }
                        .instrument(span),
                    );
                }
                Err(e) => {
                    tracing::warn!(error = %e, "TCP accept error");
                }
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!(clients = registry.connected(), "Shutting down");
                break;
            }
        }
    }

    registry.shutdown();
    plugin.shutdown();
    Ok(())
}

fn load(args: &Args) -> Result<ChaseConfig, ChaseError> {
    let mut config = match &args.config {
        Some(path) => chase_config::load_config_from(path)?,
        None => chase_config::load_config()?,
    };
    if let Some(port) = args.port {
        config.server.port = port.into();
    }
    Ok(config)
}
