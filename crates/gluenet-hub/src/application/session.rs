//! One connected peer.
//!
//! A [`Session`] is a synchronous state machine: the hub feeds it one inbound
//! frame at a time and forwards whatever notification it returns.  It owns
//! the session's devices and its outbound sink but knows nothing about the
//! transport behind that sink.
//!
//! ```text
//! Connecting ──start()──► Handshaking ──HANDSHAKE sent──► Active ──close()──► Closed
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use gluenet_core::device::{DeviceContext, DeviceHandle, DeviceRegistry};
use gluenet_core::protocol::codec::{decode_frame, encode_frame, hex_dump, ProtocolError};
use gluenet_core::protocol::messages::{DeviceId, DeviceKind, Frame, SessionId};
use gluenet_core::protocol::sink::FrameSink;
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::application::device_table::DeviceTable;
use crate::domain::events::{HubEvent, SessionKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Handshaking,
    Active,
    Closed,
}

pub struct Session {
    key: SessionKey,
    peer: SocketAddr,
    state: SessionState,
    sink: Arc<dyn FrameSink>,
    devices: DeviceTable,
}

impl Session {
    pub fn new(sid: SessionId, peer: SocketAddr, sink: Arc<dyn FrameSink>) -> Self {
        Self {
            key: SessionKey {
                sid,
                connection_id: Uuid::new_v4(),
            },
            peer,
            state: SessionState::Connecting,
            sink,
            devices: DeviceTable::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.key.sid
    }

    pub fn key(&self) -> SessionKey {
        self.key
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn device(&self, did: DeviceId) -> Option<&DeviceHandle> {
        self.devices.get(did)
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Sends the HANDSHAKE frame and makes the session active.
    ///
    /// Calling it on a session that already started does nothing.
    pub fn start(&mut self) -> Option<HubEvent> {
        if self.state != SessionState::Connecting {
            return None;
        }
        self.state = SessionState::Handshaking;
        self.send(&Frame::Handshake { sid: self.key.sid });
        self.state = SessionState::Active;

        info!(
            "session#{} opened for {} (connection {})",
            self.key.sid, self.peer, self.key.connection_id
        );
        Some(HubEvent::SessionConnected {
            sid: self.key.sid,
            peer: self.peer,
            connection_id: self.key.connection_id,
        })
    }

    /// Decodes and applies one inbound frame.
    ///
    /// Unknown frame kinds, hub-only frame kinds and frames addressing
    /// unknown devices are ignored.
    ///
    /// # Errors
    ///
    /// Returns the [`ProtocolError`] for frames or event payloads that are
    /// shorter than their layout.  The caller must close the session.
    pub fn handle_frame(
        &mut self,
        bytes: &[u8],
        registry: &DeviceRegistry,
    ) -> Result<Option<HubEvent>, ProtocolError> {
        trace!(
            "session#{} => ({} bytes) {}",
            self.key.sid,
            bytes.len(),
            hex_dump(bytes)
        );

        if self.state != SessionState::Active {
            debug!("session#{}: frame ignored in state {:?}", self.key.sid, self.state);
            return Ok(None);
        }

        let frame = match decode_frame(bytes) {
            Ok(frame) => frame,
            Err(e) if !e.is_fatal() => {
                debug!("session#{}: ignoring frame: {e}", self.key.sid);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        match frame {
            Frame::AddDevice { kind, did } => Ok(self.add_device(kind, did, registry)),
            Frame::RemoveDevice { did } => Ok(self.remove_device(did)),
            Frame::Event {
                did,
                event_id,
                payload,
            } => self.route_event(did, event_id, &payload),
            other @ (Frame::Handshake { .. } | Frame::Command { .. }) => {
                debug!(
                    "session#{}: ignoring {} frame from peer",
                    self.key.sid,
                    other.kind().name()
                );
                Ok(None)
            }
        }
    }

    /// Retires every device and marks the session closed.
    ///
    /// Returns one `DeviceRemoved` per device in ascending id order, followed
    /// by `SessionClosed`.  A closed session returns nothing.
    pub fn close(&mut self) -> Vec<HubEvent> {
        if self.state == SessionState::Closed {
            return Vec::new();
        }
        let sid = self.key.sid;
        let mut events: Vec<HubEvent> = self
            .devices
            .drain()
            .into_iter()
            .map(|device| {
                debug!("session#{sid}: {} #{} retired", device.kind(), device.id());
                HubEvent::DeviceRemoved { sid, device }
            })
            .collect();
        self.state = SessionState::Closed;
        events.push(HubEvent::SessionClosed {
            sid,
            connection_id: self.key.connection_id,
        });
        info!(
            "session#{sid} closed for {} (connection {})",
            self.peer, self.key.connection_id
        );
        events
    }

    /// Asks the transport to close with the given code.  Used before `close`.
    pub fn close_transport(&self, code: u16, reason: &str) {
        self.sink.close(code, reason);
    }

    // ── Frame handlers ────────────────────────────────────────────────────────

    fn add_device(
        &mut self,
        kind: DeviceKind,
        did: DeviceId,
        registry: &DeviceRegistry,
    ) -> Option<HubEvent> {
        if self.devices.contains(did) {
            debug!("session#{}: ADD_DEVICE for live device #{did} ignored", self.key.sid);
            return None;
        }
        let ctx = DeviceContext::new(self.key.sid, did, Arc::clone(&self.sink));
        let Some(device) = registry.construct(kind, ctx) else {
            debug!("session#{}: ADD_DEVICE with unregistered {kind} ignored", self.key.sid);
            return None;
        };
        if device.id() != did {
            debug!(
                "session#{}: {kind} constructor returned #{} for #{did}; ADD_DEVICE ignored",
                self.key.sid,
                device.id()
            );
            return None;
        }
        if self.devices.insert(device.clone()).is_err() {
            return None;
        }
        info!("session#{}: {kind} #{did} added", self.key.sid);
        Some(HubEvent::DeviceAdded {
            sid: self.key.sid,
            device,
        })
    }

    fn remove_device(&mut self, did: DeviceId) -> Option<HubEvent> {
        let Some(device) = self.devices.remove(did) else {
            debug!("session#{}: REMOVE_DEVICE for unknown #{did} ignored", self.key.sid);
            return None;
        };
        info!("session#{}: {} #{did} removed", self.key.sid, device.kind());
        Some(HubEvent::DeviceRemoved {
            sid: self.key.sid,
            device,
        })
    }

    fn route_event(
        &mut self,
        did: DeviceId,
        event_id: u8,
        payload: &[u8],
    ) -> Result<Option<HubEvent>, ProtocolError> {
        let Some(device) = self.devices.get(did) else {
            debug!("session#{}: EVENT for unknown #{did} ignored", self.key.sid);
            return Ok(None);
        };
        match device.as_device().handle_event(event_id, payload)? {
            Some(event) => Ok(Some(HubEvent::Device {
                sid: self.key.sid,
                did,
                event,
            })),
            None => {
                debug!(
                    "session#{}: unknown event {event_id} for {} #{did} ignored",
                    self.key.sid,
                    device.kind()
                );
                Ok(None)
            }
        }
    }

    fn send(&self, frame: &Frame) {
        let bytes = encode_frame(frame);
        trace!(
            "session#{} <= ({} bytes) {}",
            self.key.sid,
            bytes.len(),
            hex_dump(&bytes)
        );
        self.sink.send_frame(bytes);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("key", &self.key)
            .field("peer", &self.peer)
            .field("state", &self.state)
            .field("devices", &self.devices.ids())
            .finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
