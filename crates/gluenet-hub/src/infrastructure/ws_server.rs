//! WebSocket server: accept loop and per-connection tasks.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Upgrading each accepted connection to a WebSocket.
//! 3. Asking the [`Hub`] for a session, or closing with 4000 when it refuses.
//! 4. Running two halves per connection:
//!    - **Reader**: binary messages → [`Hub::dispatch`], one at a time, in
//!      arrival order.
//!    - **Writer**: drains the session's [`ChannelSink`] onto the socket.
//! 5. Tearing the session down when either side ends.
//! 6. Stopping the accept loop when the `running` flag is cleared, shutting
//!    the hub down and waiting briefly for every peer to get its 1001 close.

use std::borrow::Cow;
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use gluenet_core::protocol::messages::{
    SessionId, CLOSE_TOO_MANY_SESSIONS, CLOSE_TOO_MANY_SESSIONS_REASON,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{
        protocol::{frame::coding::CloseCode, CloseFrame},
        Error as WsError, Message as WsMessage,
    },
    WebSocketStream,
};
use tracing::{debug, error, info, trace, warn};

use crate::application::{
    Hub, HubError, SessionError, CLOSE_GOING_AWAY, CLOSE_GOING_AWAY_REASON,
};
use crate::domain::config::HubConfig;
use crate::domain::events::SessionKey;
use crate::infrastructure::outbound::{ChannelSink, Outbound};

type WsSink = SplitSink<WebSocketStream<TcpStream>, WsMessage>;
type WsSource = SplitStream<WebSocketStream<TcpStream>>;

/// How often the accept loop wakes up to check the `running` flag.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

/// How long open connections get to say goodbye after the accept loop stops.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds the WebSocket listener.
///
/// # Errors
///
/// Returns an error if the address is in use or not permitted.
pub async fn bind(addr: SocketAddr) -> anyhow::Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind WebSocket listener on {addr}"))
}

/// Accepts connections on `listener` until `running` is set to `false`.
///
/// Each connection gets its own task; a slow peer never delays the others.
/// Once the flag is cleared the hub is shut down, so every peer is sent
/// 1001 "Hub Shutting Down", and the connection tasks get up to
/// [`SHUTDOWN_GRACE`] to deliver that close frame before they are aborted.
///
/// # Errors
///
/// Accept errors are logged and skipped; this currently always returns `Ok`.
pub async fn serve(
    listener: TcpListener,
    hub: Arc<Hub>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    match listener.local_addr() {
        Ok(addr) => info!("GlueNet hub listening on ws://{addr}"),
        Err(e) => warn!("listening on an unknown address: {e}"),
    }

    let mut connections = JoinSet::new();

    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        // Bounded wait so the flag is re-checked even when nobody connects.
        match timeout(ACCEPT_POLL, listener.accept()).await {
            Ok(Ok((stream, peer))) => {
                debug!("TCP connection from {peer}");
                connections.spawn(handle_connection(stream, peer, Arc::clone(&hub)));
            }
            Ok(Err(e)) => error!("accept error: {e}"),
            Err(_) => {}
        }

        // Reap finished connections so the set does not grow without bound.
        while connections.try_join_next().is_some() {}
    }

    drop(listener);
    hub.shutdown();
    drain_connections(connections, SHUTDOWN_GRACE).await;
    Ok(())
}

/// Waits for the connection tasks to finish writing their close frames.
async fn drain_connections(mut connections: JoinSet<()>, grace: Duration) {
    if connections.is_empty() {
        return;
    }
    info!("waiting for {} connection(s) to close", connections.len());
    let drained = timeout(grace, async {
        while connections.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        warn!(
            "{} connection(s) still open after {grace:?}; aborting",
            connections.len()
        );
        connections.abort_all();
    }
}

/// Binds `config.bind_addr` and runs [`serve`] on it.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound.
pub async fn run_server(
    config: &HubConfig,
    hub: Arc<Hub>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let listener = bind(config.bind_addr).await?;
    serve(listener, hub, running).await
}

// ── Per-connection handler ────────────────────────────────────────────────────

async fn handle_connection(stream: TcpStream, peer: SocketAddr, hub: Arc<Hub>) {
    match run_connection(stream, peer, hub).await {
        Ok(()) => debug!("connection {peer} finished"),
        Err(e) => warn!("connection {peer} ended with error: {e:#}"),
    }
}

async fn run_connection(stream: TcpStream, peer: SocketAddr, hub: Arc<Hub>) -> anyhow::Result<()> {
    // ── Step 1: Complete the WebSocket handshake ──────────────────────────────
    let ws_stream = accept_async(stream)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer}"))?;
    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    // ── Step 2: Ask the hub for a session ─────────────────────────────────────
    //
    // The hub writes the HANDSHAKE into the sink during `admit`, so the
    // channel already holds it when the writer task starts draining.
    let (sink, outbound) = ChannelSink::new();
    let sink = Arc::new(sink);

    let key = match hub.admit(peer, sink.clone()) {
        Ok(key) => key,
        Err(e) => {
            info!("refusing {peer}: {e}");
            let (code, reason) = match e {
                HubError::TooManySessions { .. } => {
                    (CLOSE_TOO_MANY_SESSIONS, CLOSE_TOO_MANY_SESSIONS_REASON)
                }
                HubError::ShuttingDown => (CLOSE_GOING_AWAY, CLOSE_GOING_AWAY_REASON),
            };
            ws_tx
                .send(close_message(code, reason))
                .await
                .with_context(|| format!("failed to send close frame to {peer}"))?;
            return Ok(());
        }
    };

    // ── Step 3: Run the writer and reader halves ──────────────────────────────
    //
    // The writer owns the sink half and drains the session's channel, so
    // device commands issued from any task reach the socket in queue order.
    // The reader stays on this task and dispatches frames one at a time.
    let writer = tokio::spawn(write_outbound(ws_tx, outbound, key.sid));
    let result = read_inbound(&mut ws_rx, &hub, key).await;

    // ── Step 4: Tear down ─────────────────────────────────────────────────────
    //
    // Retire the session first so no new frames are queued, then let the
    // writer flush what is left and close the socket.  A stale key (hub
    // already closed the session) makes `disconnect` a no-op.
    hub.disconnect(key);
    sink.finish();
    if let Err(e) = writer.await {
        debug!("session#{}: writer task failed: {e}", key.sid);
    }
    result
}

/// Feeds inbound messages to the hub until the peer or the hub ends the session.
async fn read_inbound(ws_rx: &mut WsSource, hub: &Hub, key: SessionKey) -> anyhow::Result<()> {
    let sid = key.sid;
    loop {
        let message = match ws_rx.next().await {
            Some(Ok(message)) => message,
            Some(Err(WsError::ConnectionClosed | WsError::Protocol(_))) => {
                debug!("session#{sid}: WebSocket closed");
                return Ok(());
            }
            Some(Err(e)) => {
                warn!("session#{sid}: WebSocket error: {e}");
                return Ok(());
            }
            None => {
                info!("session#{sid}: connection dropped without a close frame");
                return Ok(());
            }
        };

        match message {
            WsMessage::Binary(bytes) => match hub.dispatch(key, &bytes) {
                Ok(()) => {}
                Err(SessionError::UnknownSession(_)) => {
                    debug!("session#{sid}: closed by the hub; ignoring further input");
                    return Ok(());
                }
                Err(e @ SessionError::Protocol(_)) => {
                    return Err(e).with_context(|| format!("session#{sid} closed"));
                }
            },
            WsMessage::Text(text) => {
                warn!("session#{sid}: text message ignored ({} bytes)", text.len());
            }
            WsMessage::Ping(data) => trace!("session#{sid}: ping ({} bytes)", data.len()),
            WsMessage::Pong(_) => trace!("session#{sid}: pong"),
            WsMessage::Close(frame) => {
                info!("session#{sid}: peer closed: {}", describe_close(frame.as_ref()));
                return Ok(());
            }
            WsMessage::Frame(_) => debug!("session#{sid}: raw frame ignored"),
        }
    }
}

/// Writes queued frames until told to stop or the socket fails.
async fn write_outbound(
    mut ws_tx: WsSink,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    sid: SessionId,
) {
    while let Some(item) = outbound.recv().await {
        match item {
            Outbound::Frame(bytes) => {
                if let Err(e) = ws_tx.send(WsMessage::Binary(bytes)).await {
                    debug!("session#{sid}: send failed: {e}");
                    return;
                }
            }
            Outbound::Close { code, reason } => {
                info!("session#{sid}: closing with {code} {reason}");
                if let Err(e) = ws_tx.send(close_message(code, reason)).await {
                    debug!("session#{sid}: close frame not sent: {e}");
                }
                return;
            }
            Outbound::Finish => {
                let _ = ws_tx.close().await;
                return;
            }
        }
    }
}

// ── Close frames ──────────────────────────────────────────────────────────────

fn close_message(code: u16, reason: impl Into<Cow<'static, str>>) -> WsMessage {
    WsMessage::Close(Some(CloseFrame {
        code: CloseCode::from(code),
        reason: reason.into(),
    }))
}

/// Name of a well-known WebSocket close code.
pub fn close_code_name(code: u16) -> Option<&'static str> {
    let name = match code {
        1000 => "Normal Closure",
        1001 => "Going Away",
        1002 => "Protocol Error",
        1003 => "Unsupported Data",
        1005 => "No Status Received",
        1006 => "Abnormal Closure",
        1007 => "Invalid Frame Payload Data",
        1008 => "Policy Violation",
        1009 => "Message Too Big",
        1010 => "Mandatory Extension",
        1011 => "Internal Error",
        1012 => "Service Restart",
        1013 => "Try Again Later",
        1014 => "Bad Gateway",
        1015 => "TLS Handshake",
        _ => return None,
    };
    Some(name)
}

/// Renders a received close frame for the log: code plus the peer's reason,
/// or the well-known name when the peer gave none.
fn describe_close(frame: Option<&CloseFrame<'_>>) -> String {
    let Some(frame) = frame else {
        return "1005 No Status Received".to_string();
    };
    let code = u16::from(frame.code);
    if !frame.reason.is_empty() {
        format!("{code} {}", frame.reason)
    } else {
        format!("{code} {}", close_code_name(code).unwrap_or("Unknown"))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
