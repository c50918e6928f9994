//! Error types for `plugchain`

use thiserror::Error;

/// Errors raised while building or ordering a plugin chain.
///
/// All variants are construction-time failures: they surface from
/// registration or from the first sort and are meant to abort startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// Two registered plugins share an id
    #[error("Duplicate plugin id: \"{0}\"")]
    DuplicateId(String),

    /// The before/after constraints form a cycle
    #[error("Cyclic dependency, node was: {0}")]
    CyclicDependency(String),

    /// An edge references a node that was not supplied to the sorter
    #[error("Unknown node. Make sure to provide all involved nodes. Unknown node: {0}")]
    UnknownNode(String),

    /// A constraint names an unregistered plugin (strict mode only)
    #[error("Plugin \"{plugin}\" declares a constraint on unknown plugin \"{target}\"")]
    UnknownConstraint { plugin: String, target: String },

    /// The chain is longer than the configured maximum depth
    #[error("Chain of {len} plugins exceeds the maximum depth of {max}")]
    ChainTooDeep { len: usize, max: usize },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ChainError>;
