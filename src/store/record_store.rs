#[cfg(test)]
use mockall::automock;

use crate::Path;
use crate::Record;

/// Keyed record storage primitives.
///
/// Each call is atomic on its own; multi-step transactional behavior
/// (commit/rollback of a cascading operation) is layered on top by the
/// configuration template manager. Durability and timeouts are a store
/// concern, not the engine's.
#[cfg_attr(test, automock)]
pub trait RecordStore: Send + Sync + 'static {
    fn get(
        &self,
        path: &Path,
    ) -> Option<Record>;

    fn put(
        &self,
        path: &Path,
        record: Record,
    );

    fn remove(
        &self,
        path: &Path,
    ) -> Option<Record>;

    fn contains(
        &self,
        path: &Path,
    ) -> bool;

    /// Paths stored exactly one level below the given path, sorted.
    fn children(
        &self,
        path: &Path,
    ) -> Vec<Path>;

    /// The record at the path (if any) plus every record stored beneath it,
    /// sorted by path.
    fn subtree(
        &self,
        path: &Path,
    ) -> Vec<(Path, Record)>;
}
