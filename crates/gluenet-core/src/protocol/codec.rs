//! Binary codec for GlueNet frames.
//!
//! Wire format:
//! ```text
//! [kind:1][fixed fields per kind][payload:N]
//! ```
//! There is no length header: the transport delivers each frame as exactly one
//! message, so the frame length is the message length.  Integers wider than one
//! byte inside payloads are little-endian.
//!
//! Decoding checks every frame against the minimum layout of its kind before
//! reading any field.  A short frame is reported as
//! [`ProtocolError::FrameTooShort`]; it is never padded or read past its end.

use thiserror::Error;

use crate::protocol::messages::{DeviceKind, Frame, FrameKind};

/// Errors that can occur while decoding frames or payloads.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The frame or payload is shorter than the layout requires.
    #[error("{context}: need at least {needed} bytes, got {available}")]
    FrameTooShort {
        context: &'static str,
        needed: usize,
        available: usize,
    },

    /// The first byte of the frame is not a known frame kind.
    #[error("unknown frame kind: 0x{0:02X}")]
    UnknownFrameKind(u8),

    /// A payload field holds a value that cannot be interpreted.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

impl ProtocolError {
    /// Whether this error must close the session.
    ///
    /// Unknown frame kinds are tolerated; truncated or garbled layouts are not.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ProtocolError::UnknownFrameKind(_))
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a [`Frame`] into its wire bytes.
///
/// # Examples
///
/// ```rust
/// use gluenet_core::protocol::{decode_frame, encode_frame, Frame};
///
/// let frame = Frame::Handshake { sid: 7 };
/// let bytes = encode_frame(&frame);
/// assert_eq!(bytes, vec![0, 7]);
/// assert_eq!(decode_frame(&bytes).unwrap(), frame);
/// ```
pub fn encode_frame(frame: &Frame) -> Vec<u8> {
    match frame {
        Frame::Handshake { sid } => vec![FrameKind::Handshake as u8, *sid],
        Frame::AddDevice { kind, did } => vec![FrameKind::AddDevice as u8, kind.0, *did],
        Frame::RemoveDevice { did } => vec![FrameKind::RemoveDevice as u8, *did],
        Frame::Event {
            did,
            event_id,
            payload,
        } => encode_addressed(FrameKind::Event, *did, *event_id, payload),
        Frame::Command {
            did,
            command_id,
            payload,
        } => encode_addressed(FrameKind::Command, *did, *command_id, payload),
    }
}

/// Decodes one [`Frame`] from a complete transport message.
///
/// Bytes beyond the fixed fields of ADD_DEVICE, REMOVE_DEVICE and HANDSHAKE
/// are ignored.
///
/// # Errors
///
/// - [`ProtocolError::FrameTooShort`] if `bytes` is empty or shorter than the
///   minimum layout of its kind.
/// - [`ProtocolError::UnknownFrameKind`] if the kind byte is not recognised.
pub fn decode_frame(bytes: &[u8]) -> Result<Frame, ProtocolError> {
    let Some(&kind_byte) = bytes.first() else {
        return Err(ProtocolError::FrameTooShort {
            context: "frame",
            needed: 1,
            available: 0,
        });
    };

    let kind =
        FrameKind::try_from(kind_byte).map_err(|_| ProtocolError::UnknownFrameKind(kind_byte))?;
    require_len(bytes, kind.min_len(), kind.name())?;

    let frame = match kind {
        FrameKind::Handshake => Frame::Handshake { sid: bytes[1] },
        FrameKind::AddDevice => Frame::AddDevice {
            kind: DeviceKind(bytes[1]),
            did: bytes[2],
        },
        FrameKind::RemoveDevice => Frame::RemoveDevice { did: bytes[1] },
        FrameKind::Event => Frame::Event {
            did: bytes[1],
            event_id: bytes[2],
            payload: bytes[3..].to_vec(),
        },
        FrameKind::Command => Frame::Command {
            did: bytes[1],
            command_id: bytes[2],
            payload: bytes[3..].to_vec(),
        },
    };
    Ok(frame)
}

// ── Payload helpers ───────────────────────────────────────────────────────────

fn encode_addressed(kind: FrameKind, did: u8, id: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(3 + payload.len());
    buf.push(kind as u8);
    buf.push(did);
    buf.push(id);
    buf.extend_from_slice(payload);
    buf
}

/// Fails with [`ProtocolError::FrameTooShort`] unless `buf` holds `needed` bytes.
pub fn require_len(buf: &[u8], needed: usize, context: &'static str) -> Result<(), ProtocolError> {
    if buf.len() < needed {
        Err(ProtocolError::FrameTooShort {
            context,
            needed,
            available: buf.len(),
        })
    } else {
        Ok(())
    }
}

/// Reads a little-endian `u16` at `offset`.
pub fn read_u16_le(buf: &[u8], offset: usize, context: &'static str) -> Result<u16, ProtocolError> {
    require_len(buf, offset + 2, context)?;
    Ok(u16::from_le_bytes([buf[offset], buf[offset + 1]]))
}

/// Writes a one-byte length prefix followed by the UTF-8 bytes of `s`.
///
/// Strings longer than 255 bytes are cut at the last character boundary that
/// fits.
pub fn write_length_prefixed_str(buf: &mut Vec<u8>, s: &str) {
    let mut len = s.len().min(u8::MAX as usize);
    while !s.is_char_boundary(len) {
        len -= 1;
    }
    buf.push(len as u8);
    buf.extend_from_slice(&s.as_bytes()[..len]);
}

/// Reads a one-byte length prefix at `offset` and then that many bytes.
///
/// Invalid UTF-8 is replaced rather than rejected; peers send whatever their
/// platform reports as a key name.  Returns the string and the offset of the
/// byte after it.
pub fn read_length_prefixed_str(
    buf: &[u8],
    offset: usize,
    context: &'static str,
) -> Result<(String, usize), ProtocolError> {
    require_len(buf, offset + 1, context)?;
    let len = buf[offset] as usize;
    let start = offset + 1;
    require_len(buf, start + len, context)?;
    let s = String::from_utf8_lossy(&buf[start..start + len]).into_owned();
    Ok((s, start + len))
}

/// Formats bytes as space-separated hex for trace logging.
pub fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
