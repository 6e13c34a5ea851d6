//! Notifications the hub raises for its consumers.
//!
//! Every notification is sent on one unbounded channel handed out by
//! [`Hub::new`](crate::application::Hub::new).  Notifications for one session
//! arrive in the order the session produced them; in particular, all
//! `DeviceRemoved` notifications of a closing session precede its
//! `SessionClosed`.

use std::net::SocketAddr;

use gluenet_core::device::{DeviceEvent, DeviceHandle};
use gluenet_core::protocol::messages::{DeviceId, SessionId};
use uuid::Uuid;

/// Identifies one connection's session.
///
/// Session ids are reused as soon as a session closes, so the transport
/// addresses its session by id *and* connection id.  A key whose session has
/// been closed never matches a later session that reuses the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub sid: SessionId,
    pub connection_id: Uuid,
}

#[derive(Debug, Clone)]
pub enum HubEvent {
    /// A peer was admitted and sent its handshake.
    SessionConnected {
        sid: SessionId,
        peer: SocketAddr,
        connection_id: Uuid,
    },
    /// The session is gone and its id is free again.
    SessionClosed { sid: SessionId, connection_id: Uuid },
    /// A peer announced a device of a registered kind.
    DeviceAdded { sid: SessionId, device: DeviceHandle },
    /// A device was removed by the peer or retired with its session.
    DeviceRemoved { sid: SessionId, device: DeviceHandle },
    /// A device reported an event.
    Device {
        sid: SessionId,
        did: DeviceId,
        event: DeviceEvent,
    },
}

impl HubEvent {
    /// The session this notification belongs to.
    pub fn session_id(&self) -> SessionId {
        match self {
            HubEvent::SessionConnected { sid, .. }
            | HubEvent::SessionClosed { sid, .. }
            | HubEvent::DeviceAdded { sid, .. }
            | HubEvent::DeviceRemoved { sid, .. }
            | HubEvent::Device { sid, .. } => *sid,
        }
    }
}
