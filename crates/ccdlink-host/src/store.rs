//! Persistence collaborator for CCD operations.

use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::operation::CcdOperation;

/// Storage for completed operations.
///
/// Ids are handed out by the store so that a request can carry the id its
/// result will be saved under.
pub trait ResultStore {
    /// Id the next created operation should use: largest stored id + 1.
    fn next_id(&self) -> StoreResult<u32>;

    /// Persist a new operation. Returns the id it was stored under.
    fn create(&mut self, operation: &CcdOperation) -> StoreResult<u32>;

    fn update_name(&mut self, id: u32, name: &str) -> StoreResult<()>;

    fn update_note(&mut self, id: u32, note: &str) -> StoreResult<()>;

    /// Operations with `start <= timestamp <= end`, oldest first.
    fn query_range(&self, start: i64, end: i64) -> StoreResult<Vec<CcdOperation>>;
}

/// A [`ResultStore`] kept entirely in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    operations: Vec<CcdOperation>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with existing operations.
    pub fn with_operations(operations: Vec<CcdOperation>) -> Self {
        Self { operations }
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&CcdOperation> {
        self.operations.iter().find(|op| op.id == id)
    }

    fn get_mut(&mut self, id: u32) -> StoreResult<&mut CcdOperation> {
        self.operations
            .iter_mut()
            .find(|op| op.id == id)
            .ok_or(StoreError::NotFound(id))
    }
}

impl ResultStore for MemoryStore {
    fn next_id(&self) -> StoreResult<u32> {
        let max = self.operations.iter().map(|op| op.id).max().unwrap_or(0);
        max.checked_add(1)
            .ok_or_else(|| StoreError::Backend("operation ids exhausted".to_string()))
    }

    fn create(&mut self, operation: &CcdOperation) -> StoreResult<u32> {
        if self.get(operation.id).is_some() {
            return Err(StoreError::Duplicate(operation.id));
        }
        self.operations.push(operation.clone());
        debug!(id = operation.id, samples = operation.samples.len(), "stored operation");
        Ok(operation.id)
    }

    fn update_name(&mut self, id: u32, name: &str) -> StoreResult<()> {
        self.get_mut(id)?.name = name.to_string();
        Ok(())
    }

    fn update_note(&mut self, id: u32, note: &str) -> StoreResult<()> {
        self.get_mut(id)?.note = note.to_string();
        Ok(())
    }

    fn query_range(&self, start: i64, end: i64) -> StoreResult<Vec<CcdOperation>> {
        let mut found: Vec<CcdOperation> = self
            .operations
            .iter()
            .filter(|op| (start..=end).contains(&op.timestamp))
            .cloned()
            .collect();
        found.sort_by_key(|op| (op.timestamp, op.id));
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(id: u32, timestamp: i64) -> CcdOperation {
        CcdOperation {
            id,
            timestamp,
            exposure: 100,
            iterations: 1,
            samples: vec![id],
            name: String::new(),
            note: String::new(),
        }
    }

    #[test]
    fn next_id_is_max_plus_one() {
        let mut store = MemoryStore::new();
        assert_eq!(store.next_id().unwrap(), 1);

        store.create(&op(7, 10)).unwrap();
        store.create(&op(3, 20)).unwrap();
        assert_eq!(store.next_id().unwrap(), 8);
    }

    #[test]
    fn duplicate_id_rejected() {
        let mut store = MemoryStore::new();
        store.create(&op(1, 10)).unwrap();
        assert!(matches!(
            store.create(&op(1, 11)),
            Err(StoreError::Duplicate(1))
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn updates_touch_only_target() {
        let mut store = MemoryStore::with_operations(vec![op(1, 10), op(2, 20)]);
        store.update_name(2, "flat").unwrap();
        store.update_note(2, "lamp on").unwrap();

        assert_eq!(store.get(2).unwrap().name, "flat");
        assert_eq!(store.get(2).unwrap().note, "lamp on");
        assert!(store.get(1).unwrap().name.is_empty());
        assert!(matches!(
            store.update_name(9, "x"),
            Err(StoreError::NotFound(9))
        ));
    }

    #[test]
    fn range_is_inclusive_and_ordered() {
        let store = MemoryStore::with_operations(vec![op(3, 30), op(1, 10), op(2, 20), op(4, 40)]);

        let ids: Vec<u32> = store
            .query_range(10, 30)
            .unwrap()
            .iter()
            .map(|op| op.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(store.query_range(0, i64::MAX).unwrap().len(), 4);
        assert!(store.query_range(41, 50).unwrap().is_empty());
    }
}
