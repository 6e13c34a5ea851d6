//! gluenet-hub library crate.
//!
//! Accepts WebSocket connections from GlueNet peers, gives each one a
//! session, and exposes the peers' virtual devices to in-process consumers.
//!
//! # Architecture
//!
//! ```text
//! Peer (binary frames over WebSocket)
//!         ↕
//! [gluenet-hub]
//!   ├── domain/           HubConfig, HubEvent, SessionKey
//!   ├── application/      Session state machine, session table, Hub
//!   └── infrastructure/
//!         ├── ws_server/  Accept loop and per-connection tasks (tokio-tungstenite)
//!         ├── outbound/   Channel-backed FrameSink feeding the socket writer
//!         └── config_file/ Optional TOML configuration
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain` and `gluenet-core`; it is synchronous.
//! - `infrastructure` depends on everything else plus `tokio` and `tungstenite`.
//!
//! # Consuming devices
//!
//! ```rust,no_run
//! use gluenet_core::device::DeviceRegistry;
//! use gluenet_hub::application::Hub;
//! use gluenet_hub::domain::{HubConfig, HubEvent};
//!
//! # async fn demo() {
//! let (hub, mut events) = Hub::new(&HubConfig::default(), DeviceRegistry::with_builtin());
//! while let Some(event) = events.recv().await {
//!     if let HubEvent::DeviceAdded { device, .. } = event {
//!         if let Some(display) = device.as_display() {
//!             display.write(0, 0, "hello");
//!         }
//!     }
//! }
//! # drop(hub);
//! # }
//! ```

/// Domain layer: configuration and notification types.
pub mod domain;

/// Application layer: sessions and the hub.
pub mod application;

/// Infrastructure layer: WebSocket server and configuration file.
pub mod infrastructure;
