//! The hub: session admission, frame dispatch and teardown.
//!
//! All session-table mutations and every dispatch run under one mutex, so
//! frames from different connections never interleave inside a session and
//! id allocation cannot race.  Nothing awaits while the lock is held.
//!
//! Notifications are pushed onto an unbounded channel while the lock is
//! held, which keeps them in the order the sessions produced them.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use gluenet_core::device::{DeviceHandle, DeviceRegistry};
use gluenet_core::protocol::codec::ProtocolError;
use gluenet_core::protocol::messages::{
    DeviceId, SessionId, CLOSE_MALFORMED_FRAME, CLOSE_MALFORMED_FRAME_REASON,
};
use gluenet_core::protocol::sink::FrameSink;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::application::session::Session;
use crate::application::session_table::SessionTable;
use crate::domain::config::HubConfig;
use crate::domain::events::{HubEvent, SessionKey};

/// WebSocket close code used when the hub shuts down.
pub const CLOSE_GOING_AWAY: u16 = 1001;
/// Close reason sent alongside [`CLOSE_GOING_AWAY`].
pub const CLOSE_GOING_AWAY_REASON: &str = "Hub Shutting Down";

// ── Errors ────────────────────────────────────────────────────────────────────

/// Reasons a connection is refused a session.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HubError {
    #[error("too many sessions (limit {limit})")]
    TooManySessions { limit: usize },

    #[error("hub is shutting down")]
    ShuttingDown,
}

/// Reasons a frame could not be dispatched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The frame violated its layout; the session has been closed.
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolError),

    /// No live session matches the key (it was closed or never existed).
    #[error("no live session #{0} for this connection")]
    UnknownSession(SessionId),
}

// ── Hub ───────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct HubState {
    sessions: SessionTable,
    shutting_down: bool,
}

/// Owns every live session and the device registry they construct from.
#[derive(Debug)]
pub struct Hub {
    state: Mutex<HubState>,
    registry: DeviceRegistry,
    events: mpsc::UnboundedSender<HubEvent>,
}

impl Hub {
    /// Creates a hub and returns it together with the notification receiver.
    ///
    /// The registry is fixed from here on; register custom kinds first.
    pub fn new(
        config: &HubConfig,
        registry: DeviceRegistry,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<HubEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let hub = Self {
            state: Mutex::new(HubState {
                sessions: SessionTable::new(config.session_ceiling()),
                shutting_down: false,
            }),
            registry,
            events: tx,
        };
        (Arc::new(hub), rx)
    }

    /// Admits a new connection: allocates the lowest free id, sends the
    /// handshake through `sink` and raises `SessionConnected`.
    ///
    /// # Errors
    ///
    /// [`HubError::TooManySessions`] when the ceiling is reached and
    /// [`HubError::ShuttingDown`] after [`shutdown`](Self::shutdown).  No
    /// session exists and nothing has been sent in either case.
    pub fn admit(
        &self,
        peer: SocketAddr,
        sink: Arc<dyn FrameSink>,
    ) -> Result<SessionKey, HubError> {
        let mut state = self.lock();
        if state.shutting_down {
            return Err(HubError::ShuttingDown);
        }
        let Some(sid) = state.sessions.lowest_free() else {
            let limit = state.sessions.capacity();
            warn!("rejecting {peer}: {limit} sessions live");
            return Err(HubError::TooManySessions { limit });
        };

        let mut session = Session::new(sid, peer, sink);
        let connected = session.start();
        let key = session.key();
        if state.sessions.insert(session).is_err() {
            // lowest_free just returned this slot as empty
            return Err(HubError::TooManySessions {
                limit: state.sessions.capacity(),
            });
        }
        if let Some(event) = connected {
            self.emit(event);
        }
        Ok(key)
    }

    /// Feeds one inbound frame to the session identified by `key`.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Protocol`] when the frame is too short for its
    ///   layout.  The hub has already asked the transport to close with code
    ///   4001 and torn the session down.
    /// - [`SessionError::UnknownSession`] when the session is gone.
    pub fn dispatch(&self, key: SessionKey, bytes: &[u8]) -> Result<(), SessionError> {
        let mut state = self.lock();
        let session = state
            .sessions
            .get_mut(key.sid)
            .filter(|s| s.key() == key)
            .ok_or(SessionError::UnknownSession(key.sid))?;

        match session.handle_frame(bytes, &self.registry) {
            Ok(Some(event)) => {
                self.emit(event);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => {
                warn!("session#{}: {e}; closing", key.sid);
                self.close_session(
                    &mut state,
                    key.sid,
                    Some((CLOSE_MALFORMED_FRAME, CLOSE_MALFORMED_FRAME_REASON)),
                );
                Err(SessionError::Protocol(e))
            }
        }
    }

    /// Tears down the session identified by `key` after its transport closed.
    ///
    /// Does nothing if the session is already gone.
    pub fn disconnect(&self, key: SessionKey) {
        let mut state = self.lock();
        let matches = state.sessions.get(key.sid).is_some_and(|s| s.key() == key);
        if matches {
            self.close_session(&mut state, key.sid, None);
        } else {
            debug!("session#{}: already closed", key.sid);
        }
    }

    /// Closes every live session and refuses further admissions.
    pub fn shutdown(&self) {
        let mut state = self.lock();
        state.shutting_down = true;
        let sessions = state.sessions.drain();
        info!("shutting down {} session(s)", sessions.len());
        for mut session in sessions {
            session.close_transport(CLOSE_GOING_AWAY, CLOSE_GOING_AWAY_REASON);
            for event in session.close() {
                self.emit(event);
            }
        }
    }

    /// Ids of all live sessions in ascending order.
    pub fn live_sessions(&self) -> Vec<SessionId> {
        self.lock().sessions.ids()
    }

    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }

    /// Looks up a live device.
    pub fn device(&self, sid: SessionId, did: DeviceId) -> Option<DeviceHandle> {
        self.lock().sessions.get(sid)?.device(did).cloned()
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn close_session(
        &self,
        state: &mut HubState,
        sid: SessionId,
        transport_close: Option<(u16, &str)>,
    ) {
        let Some(mut session) = state.sessions.remove(sid) else {
            return;
        };
        if let Some((code, reason)) = transport_close {
            session.close_transport(code, reason);
        }
        for event in session.close() {
            self.emit(event);
        }
    }

    fn emit(&self, event: HubEvent) {
        if self.events.send(event).is_err() {
            debug!("notification dropped: no consumer");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        frames: StdMutex<Vec<Vec<u8>>>,
        closes: StdMutex<Vec<(u16, String)>>,
    }

    impl FrameSink for RecordingSink {
        fn send_frame(&self, frame: Vec<u8>) {
            self.frames.lock().unwrap().push(frame);
        }

        fn close(&self, code: u16, reason: &str) {
            self.closes.lock().unwrap().push((code, reason.to_string()));
        }
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:4000".parse().unwrap()
    }

    fn hub_with_ceiling(max_sessions: usize) -> (Arc<Hub>, mpsc::UnboundedReceiver<HubEvent>) {
        let config = HubConfig {
            max_sessions,
            ..HubConfig::default()
        };
        Hub::new(&config, DeviceRegistry::with_builtin())
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<HubEvent>) -> Vec<HubEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_admit_sends_handshake_with_lowest_id() {
        // Arrange
        let (hub, mut rx) = hub_with_ceiling(4);
        let sink = Arc::new(RecordingSink::default());

        // Act
        let key = hub.admit(peer(), sink.clone()).unwrap();

        // Assert
        assert_eq!(key.sid, 0);
        assert_eq!(*sink.frames.lock().unwrap(), vec![vec![0, 0]]);
        assert!(matches!(
            drain(&mut rx).as_slice(),
            [HubEvent::SessionConnected { sid: 0, .. }]
        ));
    }

    #[test]
    fn test_admit_past_ceiling_is_rejected_without_handshake() {
        let (hub, _rx) = hub_with_ceiling(1);
        hub.admit(peer(), Arc::new(RecordingSink::default())).unwrap();
        let sink = Arc::new(RecordingSink::default());

        let result = hub.admit(peer(), sink.clone());

        assert_eq!(result, Err(HubError::TooManySessions { limit: 1 }));
        assert!(sink.frames.lock().unwrap().is_empty());
        assert_eq!(hub.session_count(), 1);
    }

    #[test]
    fn test_malformed_frame_closes_session_with_4001() {
        // Arrange
        let (hub, mut rx) = hub_with_ceiling(4);
        let sink = Arc::new(RecordingSink::default());
        let key = hub.admit(peer(), sink.clone()).unwrap();
        hub.dispatch(key, &[1, 0, 0]).unwrap();
        drain(&mut rx);

        // Act
        let result = hub.dispatch(key, &[1, 0]);

        // Assert
        assert!(matches!(result, Err(SessionError::Protocol(_))));
        assert_eq!(
            *sink.closes.lock().unwrap(),
            vec![(4001, "Malformed Frame".to_string())]
        );
        let events = drain(&mut rx);
        assert!(matches!(events[0], HubEvent::DeviceRemoved { sid: 0, .. }));
        assert!(matches!(events[1], HubEvent::SessionClosed { sid: 0, .. }));
        assert!(hub.live_sessions().is_empty());
    }

    #[test]
    fn test_stale_key_does_not_reach_session_reusing_id() {
        // Arrange: first connection closes, second one gets the same id
        let (hub, _rx) = hub_with_ceiling(4);
        let old = hub.admit(peer(), Arc::new(RecordingSink::default())).unwrap();
        hub.disconnect(old);
        let new = hub.admit(peer(), Arc::new(RecordingSink::default())).unwrap();
        assert_eq!(old.sid, new.sid);

        // Act
        let result = hub.dispatch(old, &[1, 0, 0]);
        hub.disconnect(old);

        // Assert
        assert_eq!(result, Err(SessionError::UnknownSession(0)));
        assert_eq!(hub.live_sessions(), vec![0]);
        assert!(hub.device(0, 0).is_none());
    }

    #[test]
    fn test_device_lookup_returns_added_device() {
        let (hub, _rx) = hub_with_ceiling(4);
        let key = hub.admit(peer(), Arc::new(RecordingSink::default())).unwrap();

        hub.dispatch(key, &[1, 2, 17]).unwrap();

        let device = hub.device(key.sid, 17).unwrap();
        assert_eq!(device.kind(), gluenet_core::DeviceKind::KEYBOARD);
    }

    #[test]
    fn test_shutdown_closes_everything_and_refuses_new_peers() {
        // Arrange
        let (hub, mut rx) = hub_with_ceiling(4);
        let a = Arc::new(RecordingSink::default());
        let b = Arc::new(RecordingSink::default());
        hub.admit(peer(), a.clone()).unwrap();
        hub.admit(peer(), b.clone()).unwrap();
        drain(&mut rx);

        // Act
        hub.shutdown();

        // Assert
        let closed = drain(&mut rx)
            .iter()
            .filter(|e| matches!(e, HubEvent::SessionClosed { .. }))
            .count();
        assert_eq!(closed, 2);
        assert_eq!(a.closes.lock().unwrap()[0].0, CLOSE_GOING_AWAY);
        assert_eq!(b.closes.lock().unwrap()[0].0, CLOSE_GOING_AWAY);
        assert_eq!(
            hub.admit(peer(), Arc::new(RecordingSink::default())),
            Err(HubError::ShuttingDown)
        );
    }

    #[test]
    fn test_notifications_survive_dropped_receiver() {
        let (hub, rx) = hub_with_ceiling(4);
        drop(rx);
        let key = hub.admit(peer(), Arc::new(RecordingSink::default())).unwrap();
        hub.disconnect(key);
        assert_eq!(hub.session_count(), 0);
    }
}
