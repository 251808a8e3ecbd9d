//! WebSocket server: accept loop and per-session task management.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Upgrading each accepted connection to a WebSocket session.
//! 3. Registering a [`ClientSink`] for the session so it receives broadcasts.
//! 4. Running two concurrent tasks per session:
//!    - **Writer**: drains the sink's channel into the WebSocket.
//!    - **Reader**: parses client JSON, hands it to the [`Relay`], and queues
//!      any direct reply on the session's own sink.
//! 5. Unregistering the sink when either task ends.
//! 6. Stopping the accept loop when the `running` flag is cleared.
//!
//! # Scalability
//!
//! Each session runs in its own Tokio tasks and the relay never awaits a
//! client, so one slow dashboard cannot hold back the others or the decoder.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tracing::{debug, error, info, warn};

use crate::application::registry::ClientSink;
use crate::application::relay::Relay;
use crate::domain::config::BridgeConfig;
use crate::domain::messages::ClientMessage;

/// How often the accept loop re-checks the shutdown flag.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds `config.ws_bind_addr` and serves clients until `running` is cleared.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound (port in use, missing
/// permission).
pub async fn run_server(
    config: &BridgeConfig,
    relay: Arc<Relay>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.ws_bind_addr)
        .await
        .with_context(|| {
            format!(
                "failed to bind WebSocket listener on {}",
                config.ws_bind_addr
            )
        })?;

    info!("WebSocket server listening on {}", config.ws_bind_addr);

    serve(listener, relay, config.sink_buffer, running).await
}

/// Runs the accept loop on an already-bound listener.
///
/// Split out from [`run_server`] so tests can bind port 0 and learn the
/// address before the loop starts.
pub async fn serve(
    listener: TcpListener,
    relay: Arc<Relay>,
    sink_buffer: usize,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        match timeout(ACCEPT_POLL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                debug!("new TCP connection from {peer_addr}");
                let relay = Arc::clone(&relay);
                tokio::spawn(async move {
                    handle_client_session(stream, peer_addr, relay, sink_buffer).await;
                });
            }
            Ok(Err(e)) => {
                // Transient (e.g. out of file descriptors); keep serving.
                error!("accept error: {e}");
            }
            Err(_) => {
                // No connection within the poll interval.
            }
        }
    }

    Ok(())
}

// ── Per-session handler ───────────────────────────────────────────────────────

async fn handle_client_session(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    relay: Arc<Relay>,
    sink_buffer: usize,
) {
    match run_session(raw_stream, peer_addr, relay, sink_buffer).await {
        Ok(()) => info!("client {peer_addr} disconnected"),
        Err(e) => warn!("client {peer_addr} closed with error: {e:#}"),
    }
}

/// Runs one client session from handshake to unregistration.
///
/// # Errors
///
/// Returns an error if the WebSocket handshake fails.
async fn run_session(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    relay: Arc<Relay>,
    sink_buffer: usize,
) -> anyhow::Result<()> {
    // ── Step 1: WebSocket handshake ───────────────────────────────────────────
    let ws_stream = accept_async(raw_stream)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    // ── Step 2: Register the session's sink ───────────────────────────────────
    let (sink, mut outbound) = ClientSink::channel(sink_buffer);
    let registry = Arc::clone(relay.registry());
    let sink_id = registry.register(sink.clone());
    info!(
        "client {peer_addr} connected as {sink_id} ({} total)",
        registry.len()
    );

    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    // ── Task A: Writer ────────────────────────────────────────────────────────
    //
    // Sole owner of the WebSocket write half.  Broadcasts and direct replies
    // both arrive through `outbound`.
    let mut writer_task = tokio::spawn(async move {
        while let Some(json) = outbound.recv().await {
            if let Err(e) = ws_tx.send(WsMessage::Text(json.to_string())).await {
                debug!("client {sink_id}: WebSocket send failed: {e}");
                break;
            }
        }
    });

    // ── Task B: Reader ────────────────────────────────────────────────────────
    let reader_relay = Arc::clone(&relay);
    let mut reader_task = tokio::spawn(async move {
        loop {
            let ws_msg = match ws_rx.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(WsError::ConnectionClosed | WsError::Protocol(_))) => {
                    debug!("client {sink_id}: WebSocket closed");
                    break;
                }
                Some(Err(e)) => {
                    warn!("client {sink_id}: WebSocket error: {e}");
                    break;
                }
                None => {
                    debug!("client {sink_id}: stream ended");
                    break;
                }
            };

            match ws_msg {
                WsMessage::Text(text) => {
                    let msg: ClientMessage = match serde_json::from_str(&text) {
                        Ok(m) => m,
                        Err(e) => {
                            warn!("client {sink_id}: ignoring invalid message: {e}");
                            continue;
                        }
                    };
                    debug!("client {sink_id}: {}", msg.type_name());

                    // Device calls may block briefly (port open, enumeration).
                    let relay = Arc::clone(&reader_relay);
                    let reply =
                        match tokio::task::spawn_blocking(move || relay.handle_client_message(msg))
                            .await
                        {
                            Ok(reply) => reply,
                            Err(e) => {
                                error!("client {sink_id}: request handler failed: {e}");
                                continue;
                            }
                        };

                    let Some(reply) = reply else { continue };
                    match serde_json::to_string(&reply) {
                        Ok(json) => {
                            if !sink.send(json.into()).await {
                                break;
                            }
                        }
                        Err(e) => error!("client {sink_id}: JSON serialization error: {e}"),
                    }
                }
                WsMessage::Binary(_) => {
                    warn!("client {sink_id}: unexpected binary frame (ignored)");
                }
                WsMessage::Ping(_) | WsMessage::Pong(_) => {}
                WsMessage::Close(_) => {
                    debug!("client {sink_id}: Close frame received");
                    break;
                }
                WsMessage::Frame(_) => {}
            }
        }
    });

    // ── Step 3: Wait for either task, then tear down ──────────────────────────
    tokio::select! {
        _ = &mut writer_task => debug!("client {sink_id}: writer task ended"),
        _ = &mut reader_task => debug!("client {sink_id}: reader task ended"),
    }
    writer_task.abort();
    reader_task.abort();

    registry.unregister(sink_id);
    Ok(())
}
