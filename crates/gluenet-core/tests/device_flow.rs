//! Integration tests for gluenet-core's public API.
//!
//! These drive the same path a hub session takes: decode inbound frames,
//! construct devices through the registry, feed them events, and check the
//! COMMAND frames they emit.

use std::sync::{Arc, Mutex};

use gluenet_core::{
    circle, decode_frame, encode_frame, line, DeviceContext, DeviceEvent, DeviceHandle,
    DeviceKind, DeviceRegistry, DisplayEvent, Frame, FrameSink, KeyboardEvent, Point,
    PointerButton, PointerEvent, ProtocolError,
};

#[derive(Default)]
struct CollectingSink {
    frames: Mutex<Vec<Vec<u8>>>,
}

impl FrameSink for CollectingSink {
    fn send_frame(&self, frame: Vec<u8>) {
        self.frames.lock().unwrap().push(frame);
    }
}

fn build(kind: DeviceKind, did: u8) -> (DeviceHandle, Arc<CollectingSink>) {
    let sink = Arc::new(CollectingSink::default());
    let handle = DeviceRegistry::with_builtin()
        .construct(kind, DeviceContext::new(1, did, sink.clone()))
        .expect("built-in kind must construct");
    (handle, sink)
}

fn deliver(handle: &DeviceHandle, bytes: &[u8]) -> Result<Option<DeviceEvent>, ProtocolError> {
    match decode_frame(bytes)? {
        Frame::Event {
            did,
            event_id,
            payload,
        } => {
            assert_eq!(did, handle.id());
            handle.as_device().handle_event(event_id, &payload)
        }
        other => panic!("expected EVENT, got {other:?}"),
    }
}

#[test]
fn test_add_device_frame_builds_a_display_that_draws_after_resize() {
    // Arrange
    let Frame::AddDevice { kind, did } = decode_frame(&[1, 0, 0]).unwrap() else {
        panic!("expected ADD_DEVICE");
    };
    let (handle, sink) = build(kind, did);
    let display = handle.as_display().expect("kind 0 is a display").clone();

    // Act
    let resized = deliver(&handle, &[3, 0, 0, 10, 5]).unwrap();
    display.write(0, 0, "hi");

    // Assert
    assert_eq!(
        resized,
        Some(DeviceEvent::Display(DisplayEvent::Resized { width: 10, height: 5 }))
    );
    let frames = sink.frames.lock().unwrap().clone();
    assert_eq!(frames, vec![vec![4, 0, 3, 0, 0, 0, 0, b'h', b'i']]);
}

#[test]
fn test_display_clips_a_line_drawn_across_its_edge() {
    let (handle, sink) = build(DeviceKind::DISPLAY, 0);
    let display = handle.as_display().unwrap().clone();
    deliver(&handle, &[3, 0, 0, 4, 4]).unwrap();

    for p in line((-2, 0), (6, 0)) {
        display.write(p.x, p.y, "*");
    }

    // Only columns 0..4 land on the grid.
    assert_eq!(sink.frames.lock().unwrap().len(), 4);
}

#[test]
fn test_pointer_and_keyboard_events_decode_through_frames() {
    let (pointer, _) = build(DeviceKind::POINTER, 1);
    let (keyboard, _) = build(DeviceKind::KEYBOARD, 2);

    let down = deliver(&pointer, &[3, 1, 0, 5, 6, 0]).unwrap();
    let key = deliver(&keyboard, &[3, 2, 2, 1, b'q']).unwrap();

    assert_eq!(
        down,
        Some(DeviceEvent::Pointer(PointerEvent::Down {
            x: 5,
            y: 6,
            button: PointerButton::Left,
        }))
    );
    assert_eq!(
        key,
        Some(DeviceEvent::Keyboard(KeyboardEvent::KeyPress {
            key: "q".to_string()
        }))
    );
}

#[test]
fn test_short_event_payload_is_reported_not_padded() {
    let (pointer, _) = build(DeviceKind::POINTER, 1);
    let result = deliver(&pointer, &[3, 1, 2, 5]);
    assert!(matches!(result, Err(ProtocolError::FrameTooShort { .. })));
}

#[test]
fn test_encode_decode_agree_on_command_frames() {
    let frame = Frame::Command {
        did: 9,
        command_id: 2,
        payload: vec![],
    };
    assert_eq!(decode_frame(&encode_frame(&frame)).unwrap(), frame);
}

#[test]
fn test_circle_points_stay_on_radius() {
    let points = circle((0.0, 0.0), 5.0);
    assert!(points.contains(&Point::new(5, 0)));
    assert!(points.contains(&Point::new(0, -5)));
    for p in points {
        let d2 = p.x * p.x + p.y * p.y;
        assert!((16..=36).contains(&d2), "{p:?} is far from the radius");
    }
}
