//! Validation errors and utilities

/// Errors found when validating an extracted choreography
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Undefined procedure: {0}")]
    UndefinedProcedure(String),

    #[error("Duplicate procedure definition: {0}")]
    DuplicateProcedure(String),

    #[error("Procedure {procedure} expects {expected} arguments but is called with {found}")]
    ArityMismatch {
        procedure: String,
        expected: usize,
        found: usize,
    },
}
