//! Pointer device (kind 1): mouse or touch input in display cell coordinates.
//!
//! | Event id | Name | Payload              |
//! |----------|------|----------------------|
//! | 0        | DOWN | `x:u8, y:u8, btn:u8` |
//! | 1        | UP   | `x:u8, y:u8, btn:u8` |
//! | 2        | MOVE | `x:u8, y:u8`         |
//!
//! Pointers accept no commands.

use crate::device::{Device, DeviceContext, DeviceEvent};
use crate::protocol::codec::{require_len, ProtocolError};
use crate::protocol::messages::{DeviceId, DeviceKind};

pub const EVENT_DOWN: u8 = 0;
pub const EVENT_UP: u8 = 1;
pub const EVENT_MOVE: u8 = 2;

/// Which button changed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Left,
    Middle,
    Right,
    Other(u8),
}

impl From<u8> for PointerButton {
    fn from(value: u8) -> Self {
        match value {
            0 => PointerButton::Left,
            1 => PointerButton::Middle,
            2 => PointerButton::Right,
            other => PointerButton::Other(other),
        }
    }
}

/// Input reported by a pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    Down { x: u8, y: u8, button: PointerButton },
    Up { x: u8, y: u8, button: PointerButton },
    Move { x: u8, y: u8 },
}

#[derive(Debug)]
pub struct Pointer {
    ctx: DeviceContext,
}

impl Pointer {
    pub fn new(ctx: DeviceContext) -> Self {
        Self { ctx }
    }
}

impl Device for Pointer {
    fn id(&self) -> DeviceId {
        self.ctx.device_id()
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::POINTER
    }

    fn handle_event(
        &self,
        event_id: u8,
        payload: &[u8],
    ) -> Result<Option<DeviceEvent>, ProtocolError> {
        let event = match event_id {
            EVENT_DOWN | EVENT_UP => {
                require_len(payload, 3, "pointer button event")?;
                let (x, y, button) = (payload[0], payload[1], PointerButton::from(payload[2]));
                if event_id == EVENT_DOWN {
                    PointerEvent::Down { x, y, button }
                } else {
                    PointerEvent::Up { x, y, button }
                }
            }
            EVENT_MOVE => {
                require_len(payload, 2, "pointer MOVE")?;
                PointerEvent::Move {
                    x: payload[0],
                    y: payload[1],
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(DeviceEvent::Pointer(event)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::protocol::sink::MockFrameSink;

    fn pointer() -> Pointer {
        Pointer::new(DeviceContext::new(0, 1, Arc::new(MockFrameSink::new())))
    }

    #[test]
    fn test_down_carries_position_and_button() {
        let event = pointer().handle_event(EVENT_DOWN, &[4, 7, 2]).unwrap();
        assert_eq!(
            event,
            Some(DeviceEvent::Pointer(PointerEvent::Down {
                x: 4,
                y: 7,
                button: PointerButton::Right,
            }))
        );
    }

    #[test]
    fn test_up_carries_position_and_button() {
        let event = pointer().handle_event(EVENT_UP, &[0, 1, 0]).unwrap();
        assert_eq!(
            event,
            Some(DeviceEvent::Pointer(PointerEvent::Up {
                x: 0,
                y: 1,
                button: PointerButton::Left,
            }))
        );
    }

    #[test]
    fn test_move_needs_only_two_bytes() {
        let event = pointer().handle_event(EVENT_MOVE, &[9, 3]).unwrap();
        assert_eq!(event, Some(DeviceEvent::Pointer(PointerEvent::Move { x: 9, y: 3 })));
    }

    #[test]
    fn test_truncated_down_is_too_short() {
        let result = pointer().handle_event(EVENT_DOWN, &[4, 7]);
        assert!(matches!(result, Err(ProtocolError::FrameTooShort { needed: 3, .. })));
    }

    #[test]
    fn test_unknown_event_id_is_ignored() {
        assert_eq!(pointer().handle_event(9, &[]).unwrap(), None);
    }

    #[test]
    fn test_unusual_button_numbers_are_preserved() {
        assert_eq!(PointerButton::from(5), PointerButton::Other(5));
    }

    #[test]
    fn test_kind_is_pointer() {
        assert_eq!(pointer().kind(), DeviceKind::POINTER);
        assert_eq!(pointer().id(), 1);
    }
}
