//! Device capability model.
//!
//! A peer exposes zero or more virtual peripherals over its connection.  Each
//! one is represented on the hub by a value implementing [`Device`], which
//! translates between raw EVENT/COMMAND payloads and typed domain values.
//!
//! # How the pieces fit
//!
//! ```text
//! ADD_DEVICE(kind, did) ──► DeviceRegistry::construct(kind, ctx) ──► DeviceHandle
//! EVENT(did, id, data)  ──► Device::handle_event(id, data)       ──► DeviceEvent
//! Display::write(..)    ──► DeviceContext::send_command(..)       ──► COMMAND frame
//! ```
//!
//! The three built-in variants are held in the closed [`DeviceHandle`] enum so
//! consumers can reach their typed command methods without downcasting.  Kinds
//! registered by third parties travel as [`DeviceHandle::Custom`].

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::protocol::codec::{encode_frame, hex_dump, ProtocolError};
use crate::protocol::messages::{DeviceId, DeviceKind, Frame, SessionId};
use crate::protocol::sink::FrameSink;

pub mod display;
pub mod keyboard;
pub mod pointer;
pub mod registry;

pub use display::{Display, DisplayCommand, DisplayEvent, DisplaySize};
pub use keyboard::{Keyboard, KeyboardEvent};
pub use pointer::{Pointer, PointerButton, PointerEvent};
pub use registry::{DeviceConstructor, DeviceRegistry, RegistryError};

// ── Capability trait ──────────────────────────────────────────────────────────

/// Behaviour shared by every device variant.
pub trait Device: Send + Sync + fmt::Debug {
    /// Identifier of this device within its session.
    fn id(&self) -> DeviceId;

    /// Kind tag this device was constructed for.  Never changes.
    fn kind(&self) -> DeviceKind;

    /// Interprets one inbound event.
    ///
    /// Returns `Ok(None)` for event ids the device does not know; those are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::FrameTooShort`] when the payload is shorter
    /// than the event's layout.
    fn handle_event(&self, event_id: u8, payload: &[u8])
        -> Result<Option<DeviceEvent>, ProtocolError>;
}

/// A domain event produced by a device from an inbound EVENT frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    Display(DisplayEvent),
    Pointer(PointerEvent),
    Keyboard(KeyboardEvent),
    /// Event from a device kind registered outside this crate.
    Custom { event_id: u8, payload: Vec<u8> },
}

// ── Device handle ─────────────────────────────────────────────────────────────

/// Shared reference to a live device, tagged by variant.
#[derive(Debug, Clone)]
pub enum DeviceHandle {
    Display(Arc<Display>),
    Pointer(Arc<Pointer>),
    Keyboard(Arc<Keyboard>),
    Custom(Arc<dyn Device>),
}

impl DeviceHandle {
    /// The capability view of the handle, used for event dispatch.
    pub fn as_device(&self) -> &dyn Device {
        match self {
            DeviceHandle::Display(d) => d.as_ref(),
            DeviceHandle::Pointer(p) => p.as_ref(),
            DeviceHandle::Keyboard(k) => k.as_ref(),
            DeviceHandle::Custom(c) => c.as_ref(),
        }
    }

    pub fn id(&self) -> DeviceId {
        self.as_device().id()
    }

    pub fn kind(&self) -> DeviceKind {
        self.as_device().kind()
    }

    /// Returns the display if this handle holds one.
    pub fn as_display(&self) -> Option<&Arc<Display>> {
        match self {
            DeviceHandle::Display(d) => Some(d),
            _ => None,
        }
    }

    /// Whether both handles point at the same device instance.
    pub fn same_instance(&self, other: &DeviceHandle) -> bool {
        std::ptr::eq(self.instance_ptr(), other.instance_ptr())
    }

    fn instance_ptr(&self) -> *const () {
        match self {
            DeviceHandle::Display(d) => Arc::as_ptr(d).cast(),
            DeviceHandle::Pointer(p) => Arc::as_ptr(p).cast(),
            DeviceHandle::Keyboard(k) => Arc::as_ptr(k).cast(),
            DeviceHandle::Custom(c) => Arc::as_ptr(c).cast(),
        }
    }
}

// ── Device context ────────────────────────────────────────────────────────────

/// Everything a device learns about its owner at construction time.
///
/// Holds the session and device ids and the session's outbound sink, so a
/// device can address COMMAND frames to its remote counterpart.
#[derive(Clone)]
pub struct DeviceContext {
    sid: SessionId,
    did: DeviceId,
    sink: Arc<dyn FrameSink>,
}

impl DeviceContext {
    pub fn new(sid: SessionId, did: DeviceId, sink: Arc<dyn FrameSink>) -> Self {
        Self { sid, did, sink }
    }

    pub fn session_id(&self) -> SessionId {
        self.sid
    }

    pub fn device_id(&self) -> DeviceId {
        self.did
    }

    /// Builds a COMMAND frame addressed to this device and queues it.
    ///
    /// Fire-and-forget: there is no acknowledgement and no error path.
    pub fn send_command(&self, command_id: u8, payload: Vec<u8>) {
        let frame = encode_frame(&Frame::Command {
            did: self.did,
            command_id,
            payload,
        });
        trace!(
            "session#{} <= ({} bytes) {}",
            self.sid,
            frame.len(),
            hex_dump(&frame)
        );
        self.sink.send_frame(frame);
    }
}

impl fmt::Debug for DeviceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceContext")
            .field("sid", &self.sid)
            .field("did", &self.did)
            .finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
