//! Application layer: the session state machine and the hub that owns it.
//!
//! Nothing here touches a socket.  The transport feeds raw frames in through
//! [`Hub::dispatch`] and receives outbound frames through the
//! [`FrameSink`](gluenet_core::protocol::sink::FrameSink) it handed to
//! [`Hub::admit`].

pub mod device_table;
pub mod hub;
pub mod session;
pub mod session_table;

pub use hub::{Hub, HubError, SessionError, CLOSE_GOING_AWAY, CLOSE_GOING_AWAY_REASON};
pub use session::{Session, SessionState};
