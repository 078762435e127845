//! Abstract Syntax Tree for extracted choreographies
//!
//! This module defines the global program produced by extraction: single
//! interactions, the statements built from them, and procedure definitions.

/// Choreographies and procedure definitions
pub mod choreography;

/// Choreography statements
pub mod body;

/// Atomic interactions between processes
pub mod interaction;

/// Validation errors and utilities
pub mod validation;

pub use body::*;
pub use choreography::*;
pub use interaction::*;
pub use validation::*;
