//! Outbound frame seam.
//!
//! Devices build COMMAND frames but never own a socket.  They hand finished
//! frames to a [`FrameSink`], which the hub implements on top of the
//! per-session outbound channel.  Delivery is fire-and-forget: a sink whose
//! transport is gone drops the frame silently.

/// Destination for encoded frames travelling from the hub to one peer.
#[cfg_attr(test, mockall::automock)]
pub trait FrameSink: Send + Sync {
    /// Queues one complete frame for sending.  Never blocks, never fails.
    fn send_frame(&self, frame: Vec<u8>);

    /// Asks the transport to close the connection with a WebSocket close code.
    ///
    /// Frames queued before the call are still delivered.  Sinks without a
    /// closable transport ignore it.
    fn close(&self, _code: u16, _reason: &str) {}
}
