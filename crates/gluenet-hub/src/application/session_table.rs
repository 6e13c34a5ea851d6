//! Live sessions indexed by session id.
//!
//! Allocation always hands out the lowest id not held by a live session, so
//! an id freed by a closed session is the next one reused if it is the
//! smallest free value.

use gluenet_core::protocol::messages::{SessionId, MAX_SESSIONS};

use crate::application::session::Session;

#[derive(Debug)]
pub struct SessionTable {
    slots: Vec<Option<Session>>,
    live: usize,
}

impl SessionTable {
    /// Creates a table admitting at most `capacity` sessions (at most 256).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.min(MAX_SESSIONS);
        Self {
            slots: std::iter::repeat_with(|| None).take(capacity).collect(),
            live: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn is_full(&self) -> bool {
        self.live >= self.slots.len()
    }

    /// The lowest free session id, or `None` when the table is full.
    pub fn lowest_free(&self) -> Option<SessionId> {
        self.slots
            .iter()
            .position(Option::is_none)
            .map(|index| index as SessionId)
    }

    /// Stores `session` in the slot named by its id.
    ///
    /// Returns the session back if that slot is taken or out of range.
    pub fn insert(&mut self, session: Session) -> Result<(), Session> {
        let Some(slot) = self.slots.get_mut(usize::from(session.id())) else {
            return Err(session);
        };
        if slot.is_some() {
            return Err(session);
        }
        *slot = Some(session);
        self.live += 1;
        Ok(())
    }

    pub fn get(&self, sid: SessionId) -> Option<&Session> {
        self.slots.get(usize::from(sid))?.as_ref()
    }

    pub fn get_mut(&mut self, sid: SessionId) -> Option<&mut Session> {
        self.slots.get_mut(usize::from(sid))?.as_mut()
    }

    pub fn remove(&mut self, sid: SessionId) -> Option<Session> {
        let session = self.slots.get_mut(usize::from(sid))?.take()?;
        self.live -= 1;
        Some(session)
    }

    /// Live session ids in ascending order.
    pub fn ids(&self) -> Vec<SessionId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(index, _)| index as SessionId)
            .collect()
    }

    /// Removes every session, in ascending id order.
    pub fn drain(&mut self) -> Vec<Session> {
        self.live = 0;
        self.slots.iter_mut().filter_map(Option::take).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use gluenet_core::protocol::sink::FrameSink;

    use super::*;

    struct NullSink;

    impl FrameSink for NullSink {
        fn send_frame(&self, _frame: Vec<u8>) {}
    }

    fn session(sid: SessionId) -> Session {
        let peer: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        Session::new(sid, peer, Arc::new(NullSink))
    }

    fn fill(table: &mut SessionTable, count: usize) {
        for _ in 0..count {
            let sid = table.lowest_free().unwrap();
            table.insert(session(sid)).unwrap();
        }
    }

    #[test]
    fn test_allocation_starts_at_zero() {
        let table = SessionTable::new(MAX_SESSIONS);
        assert_eq!(table.lowest_free(), Some(0));
    }

    #[test]
    fn test_allocation_is_sequential_while_nothing_is_freed() {
        let mut table = SessionTable::new(MAX_SESSIONS);
        fill(&mut table, 3);
        assert_eq!(table.ids(), vec![0, 1, 2]);
        assert_eq!(table.lowest_free(), Some(3));
    }

    #[test]
    fn test_freed_id_is_reused_when_it_is_lowest() {
        // Arrange
        let mut table = SessionTable::new(MAX_SESSIONS);
        fill(&mut table, 5);

        // Act
        table.remove(3).unwrap();
        table.remove(1).unwrap();

        // Assert: 1 comes back before 3, then 5
        assert_eq!(table.lowest_free(), Some(1));
        fill(&mut table, 1);
        assert_eq!(table.lowest_free(), Some(3));
        fill(&mut table, 1);
        assert_eq!(table.lowest_free(), Some(5));
    }

    #[test]
    fn test_full_table_has_no_free_id() {
        let mut table = SessionTable::new(MAX_SESSIONS);
        fill(&mut table, MAX_SESSIONS);
        assert!(table.is_full());
        assert_eq!(table.lowest_free(), None);
        assert_eq!(table.len(), 256);
        assert_eq!(table.ids().last(), Some(&255));
    }

    #[test]
    fn test_capacity_is_capped_at_256() {
        assert_eq!(SessionTable::new(1_000).capacity(), 256);
    }

    #[test]
    fn test_small_capacity_limits_ids() {
        let mut table = SessionTable::new(2);
        fill(&mut table, 2);
        assert!(table.is_full());
        assert!(table.insert(session(2)).is_err());
    }

    #[test]
    fn test_insert_into_taken_slot_is_rejected() {
        let mut table = SessionTable::new(4);
        table.insert(session(0)).unwrap();
        assert!(table.insert(session(0)).is_err());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_remove_missing_session_is_none() {
        let mut table = SessionTable::new(4);
        assert!(table.remove(2).is_none());
        assert!(table.remove(200).is_none());
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_drain_empties_table() {
        let mut table = SessionTable::new(8);
        fill(&mut table, 3);

        let drained: Vec<SessionId> = table.drain().iter().map(Session::id).collect();

        assert_eq!(drained, vec![0, 1, 2]);
        assert!(table.is_empty());
        assert_eq!(table.lowest_free(), Some(0));
    }
}
