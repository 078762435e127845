//! Error types for network manipulation and extraction

use std::time::Duration;

/// Errors raised while unfolding or reshaping a network.
///
/// These indicate a network that violates the well-formedness precondition
/// of extraction (undefined procedures, unguarded recursion, and so on).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
    /// A call to a procedure the process does not define
    #[error("Process {process} calls undefined procedure {procedure}")]
    UndefinedProcedure { process: String, procedure: String },

    /// A call whose argument count differs from the parameter count
    #[error("Process {process} calls {procedure} with {found} arguments, but it takes {expected}")]
    ArityMismatch {
        process: String,
        procedure: String,
        expected: usize,
        found: usize,
    },

    /// A procedure that reaches itself again through calls alone
    #[error("Process {process} unfolds {procedure} without performing any action")]
    UnguardedRecursion { process: String, procedure: String },

    /// A name that is not a process of the network
    #[error("Unknown process: {0}")]
    UnknownProcess(String),
}

/// Errors that abort an extraction.
///
/// A network without a choreography is not an error; it is reported as
/// [`ExtractionResult::NotExtractable`](crate::ExtractionResult::NotExtractable).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    /// The input network is not well formed
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// The configured deadline passed
    #[error("Extraction deadline exceeded after {elapsed:?}")]
    DeadlineExceeded { elapsed: Duration },

    /// The configured node limit was reached
    #[error("Exploration graph exceeded {limit} nodes")]
    NodeLimitExceeded { limit: usize },

    /// A graph that cannot be turned into a choreography
    #[error("Inconsistent exploration graph: {0}")]
    InconsistentGraph(String),

    /// The exploration thread could not be started
    #[error("Failed to start exploration thread: {0}")]
    Thread(String),
}

/// Result type for extraction operations
pub type Result<T, E = ExtractionError> = std::result::Result<T, E>;
