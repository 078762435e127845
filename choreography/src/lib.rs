//! Choreography AST for Rumpsteak extraction
//!
//! A choreography is a global, structured description of a protocol: a main
//! body plus a flat list of named procedures. This crate holds the data types
//! produced by `rumpsteak-extraction` when it recovers a choreography from a
//! network of local behaviours, together with their canonical printed form.
//!
//! ```
//! use rumpsteak_extraction_choreography::{Choreography, ChoreographyBody, Interaction};
//!
//! let main = ChoreographyBody::prefixed(
//!     Interaction::communication("p", "q", "e"),
//!     ChoreographyBody::Termination,
//! );
//! assert_eq!(Choreography::new(main, vec![]).to_string(), "main {p.e->q; stop}");
//! ```

pub mod ast;

pub use ast::{Choreography, ChoreographyBody, Interaction, ProcedureDefinition, ValidationError};
