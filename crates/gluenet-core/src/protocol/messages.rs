//! All GlueNet frame types and protocol constants.
//!
//! Every frame is one transport-level message.  The first byte is the frame
//! kind; the layout of the remaining bytes depends on the kind:
//!
//! ```text
//! 0 HANDSHAKE      [0][sid]                       hub  -> peer
//! 1 ADD_DEVICE     [1][kind][did]                 peer -> hub
//! 2 REMOVE_DEVICE  [2][did]                       peer -> hub
//! 3 EVENT          [3][did][event_id][payload..]  peer -> hub
//! 4 COMMAND        [4][did][cmd_id][payload..]    hub  -> peer
//! ```
//!
//! Multi-byte integers inside payloads are little-endian.

// ── Identifiers ───────────────────────────────────────────────────────────────

/// Session identifier assigned by the hub, unique among live sessions.
pub type SessionId = u8;

/// Device identifier chosen by the peer, unique within its session.
pub type DeviceId = u8;

// ── Protocol constants ────────────────────────────────────────────────────────

/// Maximum number of concurrently live sessions (identifiers are one byte).
pub const MAX_SESSIONS: usize = 256;

/// Maximum number of live devices per session (identifiers are one byte).
pub const MAX_DEVICES_PER_SESSION: usize = 256;

/// Close code sent when the session ceiling has been reached.
pub const CLOSE_TOO_MANY_SESSIONS: u16 = 4000;

/// Close reason paired with [`CLOSE_TOO_MANY_SESSIONS`].
pub const CLOSE_TOO_MANY_SESSIONS_REASON: &str = "Too Many Sessions";

/// Close code sent when a peer sends a frame shorter than its layout.
pub const CLOSE_MALFORMED_FRAME: u16 = 4001;

/// Close reason paired with [`CLOSE_MALFORMED_FRAME`].
pub const CLOSE_MALFORMED_FRAME_REASON: &str = "Malformed Frame";

// ── Frame kind codes ──────────────────────────────────────────────────────────

/// The leading byte of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameKind {
    Handshake = 0x00,
    AddDevice = 0x01,
    RemoveDevice = 0x02,
    Event = 0x03,
    Command = 0x04,
}

impl FrameKind {
    /// Minimum frame length in bytes, including the kind byte.
    pub fn min_len(self) -> usize {
        match self {
            FrameKind::Handshake => 2,
            FrameKind::AddDevice => 3,
            FrameKind::RemoveDevice => 2,
            FrameKind::Event | FrameKind::Command => 3,
        }
    }

    /// Upper-case protocol name, used in log lines and error messages.
    pub fn name(self) -> &'static str {
        match self {
            FrameKind::Handshake => "HANDSHAKE",
            FrameKind::AddDevice => "ADD_DEVICE",
            FrameKind::RemoveDevice => "REMOVE_DEVICE",
            FrameKind::Event => "EVENT",
            FrameKind::Command => "COMMAND",
        }
    }
}

impl TryFrom<u8> for FrameKind {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0x00 => Ok(FrameKind::Handshake),
            0x01 => Ok(FrameKind::AddDevice),
            0x02 => Ok(FrameKind::RemoveDevice),
            0x03 => Ok(FrameKind::Event),
            0x04 => Ok(FrameKind::Command),
            _ => Err(()),
        }
    }
}

// ── Device kind tags ──────────────────────────────────────────────────────────

/// Numeric tag naming a device variant in ADD_DEVICE frames.
///
/// This is an open set: the three built-in tags are associated constants, and
/// further tags can be registered with a
/// [`DeviceRegistry`](crate::device::registry::DeviceRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceKind(pub u8);

impl DeviceKind {
    /// A character-cell display.
    pub const DISPLAY: DeviceKind = DeviceKind(0x00);
    /// A pointer (mouse, touch).
    pub const POINTER: DeviceKind = DeviceKind(0x01);
    /// A keyboard.
    pub const KEYBOARD: DeviceKind = DeviceKind(0x02);
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            DeviceKind::DISPLAY => f.write_str("display"),
            DeviceKind::POINTER => f.write_str("pointer"),
            DeviceKind::KEYBOARD => f.write_str("keyboard"),
            DeviceKind(other) => write!(f, "kind#{other}"),
        }
    }
}

// ── Frames ────────────────────────────────────────────────────────────────────

/// One decoded GlueNet frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// First frame of every session; tells the peer its session id.
    Handshake { sid: SessionId },
    /// The peer announces a new device.
    AddDevice { kind: DeviceKind, did: DeviceId },
    /// The peer withdraws a device.
    RemoveDevice { did: DeviceId },
    /// An input or state event reported by a device on the peer.
    Event {
        did: DeviceId,
        event_id: u8,
        payload: Vec<u8>,
    },
    /// A command the hub sends to a device on the peer.
    Command {
        did: DeviceId,
        command_id: u8,
        payload: Vec<u8>,
    },
}

impl Frame {
    /// Returns the [`FrameKind`] discriminant for this frame.
    pub fn kind(&self) -> FrameKind {
        match self {
            Frame::Handshake { .. } => FrameKind::Handshake,
            Frame::AddDevice { .. } => FrameKind::AddDevice,
            Frame::RemoveDevice { .. } => FrameKind::RemoveDevice,
            Frame::Event { .. } => FrameKind::Event,
            Frame::Command { .. } => FrameKind::Command,
        }
    }
}
