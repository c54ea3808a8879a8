use dashmap::DashMap;
use tracing::debug;

use crate::Path;
use crate::Record;
use crate::RecordStore;

/// In-memory record store backed by a concurrent map.
///
/// Listing operations return deterministic (path-sorted) orderings so that
/// cascade traversal and tests are stable.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: DashMap<Path, Record>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordStore for InMemoryRecordStore {
    fn get(
        &self,
        path: &Path,
    ) -> Option<Record> {
        self.records.get(path).map(|entry| entry.value().clone())
    }

    fn put(
        &self,
        path: &Path,
        record: Record,
    ) {
        debug!("store record at '{path}'");
        self.records.insert(path.clone(), record);
    }

    fn remove(
        &self,
        path: &Path,
    ) -> Option<Record> {
        debug!("remove record at '{path}'");
        self.records.remove(path).map(|(_, record)| record)
    }

    fn contains(
        &self,
        path: &Path,
    ) -> bool {
        self.records.contains_key(path)
    }

    fn children(
        &self,
        path: &Path,
    ) -> Vec<Path> {
        let mut paths: Vec<Path> = self
            .records
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|candidate| candidate.len() == path.len() + 1 && path.is_ancestor_of(candidate))
            .collect();
        paths.sort();
        paths
    }

    fn subtree(
        &self,
        path: &Path,
    ) -> Vec<(Path, Record)> {
        let mut entries: Vec<(Path, Record)> = self
            .records
            .iter()
            .filter(|entry| entry.key() == path || path.is_ancestor_of(entry.key()))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}
