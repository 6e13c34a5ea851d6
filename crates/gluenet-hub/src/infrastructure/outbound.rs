//! Channel-backed [`FrameSink`] feeding one connection's socket writer.
//!
//! The hub and the devices push onto an unbounded channel from synchronous
//! code; the connection's writer task drains it onto the WebSocket.  Once the
//! writer is gone every push is dropped silently.

use gluenet_core::protocol::sink::FrameSink;
use tokio::sync::mpsc;

/// One item in a connection's outbound queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// A complete frame, sent as one binary WebSocket message.
    Frame(Vec<u8>),
    /// Send a close frame with this code and reason, then stop writing.
    Close { code: u16, reason: String },
    /// Stop writing without sending anything further.
    Finish,
}

#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Tells the writer to stop once everything queued so far is written.
    pub fn finish(&self) {
        let _ = self.tx.send(Outbound::Finish);
    }
}

impl FrameSink for ChannelSink {
    fn send_frame(&self, frame: Vec<u8>) {
        let _ = self.tx.send(Outbound::Frame(frame));
    }

    fn close(&self, code: u16, reason: &str) {
        let _ = self.tx.send(Outbound::Close {
            code,
            reason: reason.to_string(),
        });
    }
}
