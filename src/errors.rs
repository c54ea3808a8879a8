//! Template Configuration Engine Error Hierarchy
//!
//! Defines comprehensive error types for the hierarchical configuration
//! engine, categorized by the stage of a mutation at which they arise.

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Engine settings loading or validation failures
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    /// Path or scope absent from the record store
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    /// Value or record fails its type schema
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Malformed canonical wire value
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Inheritance chain exceeds the configured bound or contains a cycle
    #[error(transparent)]
    CycleOrDepth(#[from] CycleOrDepthError),

    /// A pre-commit listener rejected a mutation or its cascade
    #[error(transparent)]
    Cascade(#[from] CascadeFailure),

    /// Concurrent mutation detected on the same scope
    #[error(transparent)]
    Conflict(#[from] ConflictError),
}

#[derive(Debug, thiserror::Error)]
pub enum NotFoundError {
    /// No record stored at the requested path
    #[error("no record found at path '{0}'")]
    Path(String),

    /// Scope is not declared in the engine settings
    #[error("scope '{0}' is not declared")]
    Scope(String),

    /// Symbolic type name was never registered
    #[error("type '{0}' is not registered")]
    Type(String),

    /// A parent named in a template chain does not exist
    #[error("ancestor '{ancestor}' of '{id}' does not exist in scope '{scope}'")]
    Ancestor {
        scope: String,
        id: String,
        ancestor: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// Path text is empty or contains empty segments
    #[error("illegal path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Record carries a field its schema does not declare
    #[error("type '{symbolic_name}' has no field '{field}'")]
    UnknownField { symbolic_name: String, field: String },

    /// Stored value shape disagrees with the declared field kind
    #[error("field '{field}' expects a {expected} value")]
    FieldTypeMismatch { field: String, expected: String },

    /// Required field absent or empty
    #[error("field '{field}' requires a value")]
    MissingRequired { field: String },

    /// Insert would overwrite an existing record
    #[error("record already exists at path '{0}'")]
    RecordExists(String),

    /// Template operation attempted in a scope not declared templated
    #[error("scope '{0}' is not templated")]
    NotTemplated(String),

    /// Delete refused because the restrict policy forbids orphaning children
    #[error("cannot delete '{path}': {children} template children depend on it")]
    DeleteRestricted { path: String, children: usize },

    /// Unit of work driven through an illegal state transition
    #[error("illegal mutation state transition: {from} -> {to}")]
    IllegalTransition {
        from: &'static str,
        to: &'static str,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Canonical text does not parse into the target domain
    #[error("'{text}' is not a valid {kind}")]
    Malformed { text: String, kind: String },
}

#[derive(Debug, thiserror::Error)]
pub enum CycleOrDepthError {
    /// Parent-of relation revisits an id while walking upward
    #[error("template parent links for '{id}' in scope '{scope}' form a cycle")]
    CycleDetected { scope: String, id: String },

    /// Defensive bound against accidental cycles
    #[error("inheritance chain for '{id}' in scope '{scope}' exceeds maximum depth {max}")]
    DepthExceeded { scope: String, id: String, max: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum CascadeFailure {
    /// A pre-commit listener rejected the direct operation at the named path
    #[error("listener rejected mutation at '{path}': {reason}")]
    OperationRejected { path: String, reason: String },

    /// A pre-commit listener rejected a cascaded change at the named path
    #[error("listener rejected cascade at '{path}': {reason}")]
    CascadeRejected { path: String, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ConflictError {
    /// Another mutation holds the scope's write lock
    #[error("scope '{0}' has a mutation in flight")]
    ScopeBusy(String),
}
