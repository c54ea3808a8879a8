use crate::Path;

/// Lifecycle event kinds.
///
/// The `Insert`/`Update`/`Delete` kinds fire pre-commit: the mutation may
/// still fail and be rolled back, so they are most useful when a handler
/// makes changes that should only stick if the mutation goes ahead. To react
/// only once the change is certain, handle the matching post kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Insert,
    Update,
    Delete,
    PostInsert,
    PostUpdate,
    PostDelete,
}

impl EventKind {
    pub fn is_post(&self) -> bool {
        matches!(
            self,
            EventKind::PostInsert | EventKind::PostUpdate | EventKind::PostDelete
        )
    }

    /// The post-commit kind paired with this pre-commit kind.
    pub fn post(&self) -> EventKind {
        match self {
            EventKind::Insert => EventKind::PostInsert,
            EventKind::Update => EventKind::PostUpdate,
            EventKind::Delete => EventKind::PostDelete,
            post => *post,
        }
    }
}

/// A lifecycle notification.
///
/// `cascaded` records whether this is a direct operation on the target path
/// or a side effect of an ancestor's cascade, so listeners can distinguish
/// "this changed" from "an ancestor of mine changed".
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigEvent {
    pub kind: EventKind,
    pub path: Path,
    /// Field touched by an update, when applicable
    pub field: Option<String>,
    pub cascaded: bool,
}

impl ConfigEvent {
    pub fn new(
        kind: EventKind,
        path: Path,
        field: Option<String>,
        cascaded: bool,
    ) -> Self {
        Self {
            kind,
            path,
            field,
            cascaded,
        }
    }
}
