//! Choreography extraction for Rumpsteak
//!
//! Extraction is the inverse of projection: given a network of processes,
//! each described only by its own local behaviour, it recovers a single
//! global choreography describing how they interact, when one exists.
//!
//! The engine explores every way the network can evolve, one interaction at
//! a time, recording configurations in an exploration graph. A cycle in that
//! graph is only accepted as recursion once every process has made progress
//! around it; otherwise the search backtracks and tries another order. The
//! finished graph is then folded back into structured code with named
//! procedures at its recursion points.
//!
//! ```
//! use rumpsteak_extraction::{Behaviour, Extractor, Network, ProcessTerm};
//!
//! let network = Network::new([
//!     ("p", ProcessTerm::new(Behaviour::send("q", "e", Behaviour::Terminate))),
//!     ("q", ProcessTerm::new(Behaviour::receive("p", Behaviour::Terminate))),
//! ]);
//! let program = Extractor::default().extract(&network)?;
//! assert_eq!(program.to_string(), "main {p.e->q; stop}");
//! # Ok::<(), rumpsteak_extraction::ExtractionError>(())
//! ```

pub mod config;
pub mod error;
pub mod extraction;
pub mod graph;
pub mod label;
pub mod network;
pub mod reconstruct;
pub mod strategy;

mod search;

pub use rumpsteak_extraction_choreography as choreography;

// Re-export main APIs
pub use choreography::{Choreography, ChoreographyBody, Interaction, ProcedureDefinition};
pub use config::ExtractionConfig;
pub use error::{ExtractionError, NetworkError, Result};
pub use extraction::{extract, Exploration, ExtractionResult, Extractor, Program, Statistics};
pub use graph::{Dot, ExplorationGraph, Marking};
pub use label::{Label, LabelKind};
pub use network::{Acquaintance, Advancement, Behaviour, Network, ProcessTerm};
pub use reconstruct::reconstruct;
pub use strategy::{OrderingStrategy, Strategy};
