use tracing::debug;

use crate::Result;
use crate::ValidationError;

/// State of one mutating operation.
///
/// Legal flow is `Requested -> Validated -> Applied -> Cascading ->
/// Committed`, with failure exits `Rejected` (validation failed before any
/// storage mutation) and `Cascading -> CascadeFailed -> RolledBack`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    Requested,
    Validated,
    Applied,
    Cascading,
    Committed,
    CascadeFailed,
    RolledBack,
    Rejected,
}

impl MutationState {
    pub fn name(&self) -> &'static str {
        match self {
            MutationState::Requested => "Requested",
            MutationState::Validated => "Validated",
            MutationState::Applied => "Applied",
            MutationState::Cascading => "Cascading",
            MutationState::Committed => "Committed",
            MutationState::CascadeFailed => "CascadeFailed",
            MutationState::RolledBack => "RolledBack",
            MutationState::Rejected => "Rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MutationState::Committed | MutationState::RolledBack | MutationState::Rejected
        )
    }

    fn can_transition_to(
        &self,
        next: MutationState,
    ) -> bool {
        matches!(
            (self, next),
            (MutationState::Requested, MutationState::Validated)
                | (MutationState::Requested, MutationState::Rejected)
                | (MutationState::Validated, MutationState::Applied)
                | (MutationState::Validated, MutationState::Rejected)
                | (MutationState::Applied, MutationState::Cascading)
                | (MutationState::Cascading, MutationState::Committed)
                | (MutationState::Cascading, MutationState::CascadeFailed)
                | (MutationState::CascadeFailed, MutationState::RolledBack)
        )
    }
}

/// Final status handed to completion callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
    Committed,
    RolledBack,
}

type Synchronization = Box<dyn FnOnce(CompletionStatus) + Send>;

/// One mutating operation: its state machine plus one-shot completion
/// callbacks.
///
/// Callbacks registered via [`UnitOfWork::post_completion`] fire exactly
/// once when the unit of work finishes, with the final status, regardless
/// of how many intermediate cascaded events occurred.
pub struct UnitOfWork {
    state: MutationState,
    synchronizations: Vec<Synchronization>,
}

impl Default for UnitOfWork {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self {
            state: MutationState::Requested,
            synchronizations: Vec::new(),
        }
    }

    pub fn state(&self) -> MutationState {
        self.state
    }

    /// Register a one-shot callback for the end of this unit of work.
    pub fn post_completion(
        &mut self,
        callback: impl FnOnce(CompletionStatus) + Send + 'static,
    ) {
        self.synchronizations.push(Box::new(callback));
    }

    /// # Errors
    ///
    /// - Return [`ValidationError::IllegalTransition`] for a transition the
    ///   state machine does not allow.
    pub fn transition(
        &mut self,
        next: MutationState,
    ) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(ValidationError::IllegalTransition {
                from: self.state.name(),
                to: next.name(),
            }
            .into());
        }
        debug!("mutation {} -> {}", self.state.name(), next.name());
        self.state = next;
        Ok(())
    }

    /// Finish as committed and fire completion callbacks.
    pub fn commit(mut self) -> Result<()> {
        self.transition(MutationState::Committed)?;
        self.complete(CompletionStatus::Committed);
        Ok(())
    }

    /// Finish as rolled back after a cascade failure and fire completion
    /// callbacks.
    pub fn rollback(mut self) -> Result<()> {
        self.transition(MutationState::CascadeFailed)?;
        self.transition(MutationState::RolledBack)?;
        self.complete(CompletionStatus::RolledBack);
        Ok(())
    }

    /// Finish as rejected before any storage mutation; completion callbacks
    /// observe a rolled-back outcome.
    pub fn reject(mut self) -> Result<()> {
        self.transition(MutationState::Rejected)?;
        self.complete(CompletionStatus::RolledBack);
        Ok(())
    }

    fn complete(
        &mut self,
        status: CompletionStatus,
    ) {
        for synchronization in self.synchronizations.drain(..) {
            synchronization(status);
        }
    }
}
