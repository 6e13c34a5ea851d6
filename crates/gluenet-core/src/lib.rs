//! # gluenet-core
//!
//! Shared library for GlueNet containing the binary frame codec, the device
//! capability model and the coordinate generators used to draw on remote
//! character-cell displays.
//!
//! This crate has no dependency on sockets or an async runtime.  The hub
//! (`gluenet-hub`) plugs a transport in through the [`FrameSink`] trait.
//!
//! # Architecture overview
//!
//! GlueNet lets a program drive peripherals that live inside remote peers,
//! typically browser tabs.  A peer connects to the hub, receives a session
//! id, and then announces virtual devices.  Programs on the hub side draw on
//! the peer's displays and receive its pointer and keyboard input.
//!
//! - **`protocol`** – How bytes travel over the connection.  Each frame is a
//!   one-byte tag followed by fixed fields and an optional payload.
//!
//! - **`device`** – Typed devices built from ADD_DEVICE frames.  A
//!   [`Display`] clips drawing commands against the size its peer last
//!   reported; a [`Pointer`] and a [`Keyboard`] decode input events.
//!
//! - **`domain`** – Pure geometry: [`line`] and [`circle`] produce the grid
//!   cells a shape covers.

pub mod device;
pub mod domain;
pub mod protocol;

pub use device::{
    Device, DeviceContext, DeviceEvent, DeviceHandle, DeviceRegistry, Display, DisplayCommand,
    DisplayEvent, DisplaySize, Keyboard, KeyboardEvent, Pointer, PointerButton, PointerEvent,
    RegistryError,
};
pub use domain::graphics::{circle, line, Point, PointF};
pub use protocol::codec::{decode_frame, encode_frame, ProtocolError};
pub use protocol::messages::{DeviceId, DeviceKind, Frame, FrameKind, SessionId};
pub use protocol::sink::FrameSink;
