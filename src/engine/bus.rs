use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;
use tracing::debug;
use tracing::warn;

use crate::CascadeFailure;
use crate::ConfigEvent;
use crate::EventKind;

/// A pre-commit handler's refusal, aborting the enclosing mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection(pub String);

impl Rejection {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

impl fmt::Display for Rejection {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub type HandlerResult = std::result::Result<(), Rejection>;

type Handler = Box<dyn Fn(&ConfigEvent) -> HandlerResult + Send + Sync>;

/// Synchronous event bus.
///
/// Dispatch runs on the mutating thread, in subscription order. A
/// pre-commit handler signalling failure aborts the enclosing transaction;
/// a post-commit handler's failure is reported to the diagnostic sink but
/// never rolls back a committed change.
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<HashMap<EventKind, Vec<Handler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &self,
        kind: EventKind,
        handler: impl Fn(&ConfigEvent) -> HandlerResult + Send + Sync + 'static,
    ) {
        self.handlers
            .write()
            .entry(kind)
            .or_default()
            .push(Box::new(handler));
    }

    /// Dispatch a pre-commit event; the first rejection aborts.
    ///
    /// # Errors
    ///
    /// - Return [`CascadeFailure::OperationRejected`] when a handler refuses
    ///   the direct operation, [`CascadeFailure::CascadeRejected`] when it
    ///   refuses a cascaded change; both name the event's path.
    pub(crate) fn publish_pre(
        &self,
        event: &ConfigEvent,
    ) -> std::result::Result<(), CascadeFailure> {
        debug!("dispatch {:?} at '{}' (cascaded={})", event.kind, event.path, event.cascaded);

        let handlers = self.handlers.read();
        if let Some(subscribed) = handlers.get(&event.kind) {
            for handler in subscribed {
                if let Err(rejection) = handler(event) {
                    let path = event.path.to_string();
                    let reason = rejection.to_string();
                    return Err(if event.cascaded {
                        CascadeFailure::CascadeRejected { path, reason }
                    } else {
                        CascadeFailure::OperationRejected { path, reason }
                    });
                }
            }
        }

        Ok(())
    }

    /// Dispatch a post-commit event; handler failures are logged only.
    pub(crate) fn publish_post(
        &self,
        event: &ConfigEvent,
    ) {
        debug!("dispatch {:?} at '{}' (cascaded={})", event.kind, event.path, event.cascaded);

        let handlers = self.handlers.read();
        if let Some(subscribed) = handlers.get(&event.kind) {
            for handler in subscribed {
                if let Err(rejection) = handler(event) {
                    warn!(
                        "post-commit listener failed for {:?} at '{}': {}",
                        event.kind, event.path, rejection
                    );
                }
            }
        }
    }
}
