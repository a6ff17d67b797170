//! Tail a socket feed
//!
//! Connects with a `SocketConfig` and logs every message, batch and
//! lifecycle event until Ctrl+C or until the manager gives up.
//!
//! Usage:
//!   socket_tail                      # config from SOCKET_CONFIG_PATH (default config/socket.yaml)
//!   socket_tail path/to/socket.yaml
//!   socket_tail wss://host/ws        # defaults for that URL

use anyhow::Result;
use resocket_tools::bin_common::{describe_config, init_tracing, load_socket_config, parse_args};
use resocket_tools::resocket::{CloseInfo, ConnectionManager, Payload, SocketError};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{info, warn};

fn describe(payload: &Payload) -> String {
    match payload {
        Payload::Text(text) => text.clone(),
        Payload::Json(value) => value.to_string(),
        Payload::Binary(bytes) => format!("<{} bytes>", bytes.len()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenv::dotenv().ok();
    init_tracing("info");

    let config = load_socket_config(&parse_args())?;
    let buffered = config.is_buffered();
    info!("Tailing {}", describe_config(&config));

    let gave_up = Arc::new(Notify::new());
    let gave_up_signal = gave_up.clone();

    let mut builder = ConnectionManager::builder()
        .config(config)
        .on_open(|| info!("Connected"))
        .on_close(|close: &CloseInfo| warn!("Closed: {} {}", close.code, close.reason))
        .on_error(|err: &SocketError| warn!("Error: {}", err))
        .on_destroy(move || gave_up_signal.notify_one());

    builder = if buffered {
        builder.on_bulk_message(|batch: &[Payload]| {
            info!("Batch of {} messages", batch.len());
            for payload in batch {
                info!("  {}", describe(payload));
            }
        })
    } else {
        builder.on_message(|payload: &Payload| info!("{}", describe(payload)))
    };

    let manager = builder.connect()?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C received, shutting down");
        }
        _ = gave_up.notified() => {
            warn!("Manager destroyed, exiting");
        }
    }

    let metrics = manager.metrics();
    manager.shutdown().await?;

    info!(
        "Received {} messages, sent {}, evicted {}, {} reconnect attempts",
        metrics.messages_received,
        metrics.messages_sent,
        metrics.messages_evicted,
        metrics.reconnect_attempts
    );
    Ok(())
}
