//! Keyboard device (kind 2).
//!
//! Every event carries the key name as a length-prefixed string (one length
//! byte, then UTF-8).  The name is whatever the peer's platform reports, e.g.
//! `"a"`, `"Enter"` or `"ArrowLeft"`.  Keyboards accept no commands.

use crate::device::{Device, DeviceContext, DeviceEvent};
use crate::protocol::codec::{read_length_prefixed_str, ProtocolError};
use crate::protocol::messages::{DeviceId, DeviceKind};

pub const EVENT_KEYDOWN: u8 = 0;
pub const EVENT_KEYUP: u8 = 1;
pub const EVENT_KEYPRESS: u8 = 2;

/// Input reported by a keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyboardEvent {
    KeyDown { key: String },
    KeyUp { key: String },
    /// A key produced a character (after layout and modifiers).
    KeyPress { key: String },
}

impl KeyboardEvent {
    pub fn key(&self) -> &str {
        match self {
            KeyboardEvent::KeyDown { key }
            | KeyboardEvent::KeyUp { key }
            | KeyboardEvent::KeyPress { key } => key,
        }
    }
}

#[derive(Debug)]
pub struct Keyboard {
    ctx: DeviceContext,
}

impl Keyboard {
    pub fn new(ctx: DeviceContext) -> Self {
        Self { ctx }
    }
}

impl Device for Keyboard {
    fn id(&self) -> DeviceId {
        self.ctx.device_id()
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::KEYBOARD
    }

    fn handle_event(
        &self,
        event_id: u8,
        payload: &[u8],
    ) -> Result<Option<DeviceEvent>, ProtocolError> {
        if !matches!(event_id, EVENT_KEYDOWN | EVENT_KEYUP | EVENT_KEYPRESS) {
            return Ok(None);
        }

        let (key, _) = read_length_prefixed_str(payload, 0, "keyboard key name")?;
        let event = match event_id {
            EVENT_KEYDOWN => KeyboardEvent::KeyDown { key },
            EVENT_KEYUP => KeyboardEvent::KeyUp { key },
            _ => KeyboardEvent::KeyPress { key },
        };
        Ok(Some(DeviceEvent::Keyboard(event)))
    }
}
