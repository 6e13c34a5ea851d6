//! Per-session device arena: 256 slots indexed directly by device id.

use gluenet_core::device::DeviceHandle;
use gluenet_core::protocol::messages::{DeviceId, MAX_DEVICES_PER_SESSION};

#[derive(Debug)]
pub struct DeviceTable {
    slots: Vec<Option<DeviceHandle>>,
    occupied: [u64; MAX_DEVICES_PER_SESSION / 64],
}

impl DeviceTable {
    pub fn new() -> Self {
        Self {
            slots: vec![None; MAX_DEVICES_PER_SESSION],
            occupied: [0; MAX_DEVICES_PER_SESSION / 64],
        }
    }

    pub fn contains(&self, did: DeviceId) -> bool {
        let (word, bit) = position(did);
        self.occupied[word] & bit != 0
    }

    pub fn get(&self, did: DeviceId) -> Option<&DeviceHandle> {
        self.slots[usize::from(did)].as_ref()
    }

    /// Stores `device` in the slot named by its id.
    ///
    /// Returns the device back if the slot is already taken; the existing
    /// device is left in place.
    pub fn insert(&mut self, device: DeviceHandle) -> Result<(), DeviceHandle> {
        let did = device.id();
        if self.contains(did) {
            return Err(device);
        }
        let (word, bit) = position(did);
        self.occupied[word] |= bit;
        self.slots[usize::from(did)] = Some(device);
        Ok(())
    }

    pub fn remove(&mut self, did: DeviceId) -> Option<DeviceHandle> {
        let (word, bit) = position(did);
        self.occupied[word] &= !bit;
        self.slots[usize::from(did)].take()
    }

    pub fn len(&self) -> usize {
        self.occupied.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.occupied.iter().all(|&w| w == 0)
    }

    /// Live device ids in ascending order.
    pub fn ids(&self) -> Vec<DeviceId> {
        let mut ids = Vec::with_capacity(self.len());
        for (index, &word) in self.occupied.iter().enumerate() {
            let mut remaining = word;
            while remaining != 0 {
                let bit = remaining.trailing_zeros() as usize;
                ids.push((index * 64 + bit) as DeviceId);
                remaining &= remaining - 1;
            }
        }
        ids
    }

    /// Removes every device, in ascending id order.
    pub fn drain(&mut self) -> Vec<DeviceHandle> {
        self.ids()
            .into_iter()
            .filter_map(|did| self.remove(did))
            .collect()
    }
}

impl Default for DeviceTable {
    fn default() -> Self {
        Self::new()
    }
}

fn position(did: DeviceId) -> (usize, u64) {
    let did = usize::from(did);
    (did / 64, 1u64 << (did % 64))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use gluenet_core::device::{DeviceContext, Keyboard, Pointer};
    use gluenet_core::protocol::sink::FrameSink;

    use super::*;

    struct NullSink;

    impl FrameSink for NullSink {
        fn send_frame(&self, _frame: Vec<u8>) {}
    }

    fn pointer(did: DeviceId) -> DeviceHandle {
        DeviceHandle::Pointer(Arc::new(Pointer::new(DeviceContext::new(
            0,
            did,
            Arc::new(NullSink),
        ))))
    }

    fn keyboard(did: DeviceId) -> DeviceHandle {
        DeviceHandle::Keyboard(Arc::new(Keyboard::new(DeviceContext::new(
            0,
            did,
            Arc::new(NullSink),
        ))))
    }

    #[test]
    fn test_new_table_is_empty() {
        let table = DeviceTable::new();
        assert!(table.is_empty());
        assert_eq!(table.len(), 0);
        assert!(table.ids().is_empty());
    }

    #[test]
    fn test_insert_and_get_by_id() {
        // Arrange
        let mut table = DeviceTable::new();

        // Act
        table.insert(pointer(200)).unwrap();

        // Assert
        assert!(table.contains(200));
        assert_eq!(table.get(200).map(DeviceHandle::id), Some(200));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_insert_into_taken_slot_keeps_original() {
        let mut table = DeviceTable::new();
        let original = pointer(3);
        table.insert(original.clone()).unwrap();

        let rejected = table.insert(keyboard(3));

        assert!(rejected.is_err());
        assert!(table.get(3).unwrap().same_instance(&original));
    }

    #[test]
    fn test_remove_frees_the_slot() {
        let mut table = DeviceTable::new();
        table.insert(pointer(64)).unwrap();

        assert!(table.remove(64).is_some());
        assert!(!table.contains(64));
        assert!(table.remove(64).is_none());
    }

    #[test]
    fn test_ids_are_ascending_across_words() {
        let mut table = DeviceTable::new();
        for did in [255, 0, 130, 63, 64] {
            table.insert(pointer(did)).unwrap();
        }
        assert_eq!(table.ids(), vec![0, 63, 64, 130, 255]);
    }

    #[test]
    fn test_drain_empties_table_in_id_order() {
        let mut table = DeviceTable::new();
        table.insert(keyboard(9)).unwrap();
        table.insert(pointer(2)).unwrap();

        let drained: Vec<DeviceId> = table.drain().iter().map(DeviceHandle::id).collect();

        assert_eq!(drained, vec![2, 9]);
        assert!(table.is_empty());
    }

    #[test]
    fn test_all_256_ids_fit() {
        let mut table = DeviceTable::new();
        for did in 0..=u8::MAX {
            table.insert(pointer(did)).unwrap();
        }
        assert_eq!(table.len(), 256);
    }
}
