//! Extraction entry points
//!
//! An [`Extractor`] purges the input network, splits it into independent
//! components, explores each one and reconstructs a choreography from every
//! component that turned out to be extractable.

use crate::config::ExtractionConfig;
use crate::error::{ExtractionError, Result};
use crate::graph::ExplorationGraph;
use crate::network::Network;
use crate::reconstruct::reconstruct;
use crate::search::{BuildResult, GraphBuilder};
use crate::strategy::{OrderingStrategy, Strategy};
use rumpsteak_extraction_choreography::Choreography;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};
use std::thread;
use tracing::{debug, Dispatch, Span};

/// Size of the exploration behind one extraction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    /// Configurations in the final exploration graph
    pub nodes: usize,
    /// Edges rejected because they closed a loop too early
    pub bad_loops: usize,
}

impl Statistics {
    fn of(graph: &ExplorationGraph) -> Self {
        Statistics {
            nodes: graph.node_count(),
            bad_loops: graph.bad_loops(),
        }
    }
}

/// The outcome of extracting one component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractionResult {
    /// The component behaves as `choreography`
    Extracted {
        choreography: Choreography,
        statistics: Statistics,
    },
    /// The component has no choreography
    NotExtractable { statistics: Statistics },
}

impl ExtractionResult {
    /// The extracted choreography, if there is one.
    pub fn choreography(&self) -> Option<&Choreography> {
        match self {
            ExtractionResult::Extracted { choreography, .. } => Some(choreography),
            ExtractionResult::NotExtractable { .. } => None,
        }
    }

    /// Size of the exploration behind this result.
    pub fn statistics(&self) -> Statistics {
        match self {
            ExtractionResult::Extracted { statistics, .. }
            | ExtractionResult::NotExtractable { statistics } => *statistics,
        }
    }

    /// Check whether a choreography was found.
    pub fn is_extracted(&self) -> bool {
        matches!(self, ExtractionResult::Extracted { .. })
    }
}

impl Display for ExtractionResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionResult::Extracted { choreography, .. } => write!(f, "{}", choreography),
            ExtractionResult::NotExtractable { .. } => write!(f, "<not extractable>"),
        }
    }
}

/// Choreographies of all independent components of a network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    /// One result per component, in the order the components were split off
    pub components: Vec<ExtractionResult>,
}

impl Program {
    /// Check whether every component was extracted.
    pub fn is_extracted(&self) -> bool {
        self.components.iter().all(ExtractionResult::is_extracted)
    }

    /// The choreographies of the extracted components.
    pub fn choreographies(&self) -> impl Iterator<Item = &Choreography> {
        self.components.iter().filter_map(ExtractionResult::choreography)
    }

    /// Statistics summed over all components.
    pub fn statistics(&self) -> Statistics {
        self.components
            .iter()
            .map(ExtractionResult::statistics)
            .fold(Statistics::default(), |total, s| Statistics {
                nodes: total.nodes + s.nodes,
                bad_loops: total.bad_loops + s.bad_loops,
            })
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, component) in self.components.iter().enumerate() {
            if i > 0 {
                write!(f, " || ")?;
            }
            write!(f, "{}", component)?;
        }
        Ok(())
    }
}

/// The exploration graph of one component, kept for inspection
#[derive(Debug, Clone)]
pub struct Exploration {
    /// The graph as the search left it
    pub graph: ExplorationGraph,
    /// Whether the search succeeded
    pub extractable: bool,
}

/// Extracts choreographies using a configuration and an ordering strategy
#[derive(Debug, Clone)]
pub struct Extractor<S = Strategy> {
    config: ExtractionConfig,
    strategy: S,
}

impl Extractor<Strategy> {
    /// Creates an extractor using the configured built-in strategy.
    pub fn new(config: ExtractionConfig) -> Self {
        let strategy = config.strategy;
        Extractor { config, strategy }
    }
}

impl Default for Extractor<Strategy> {
    fn default() -> Self {
        Self::new(ExtractionConfig::default())
    }
}

impl<S: OrderingStrategy + Sync> Extractor<S> {
    /// Creates an extractor with a custom ordering strategy.
    pub fn with_strategy(config: ExtractionConfig, strategy: S) -> Self {
        Extractor { config, strategy }
    }

    /// The settings this extractor runs with.
    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract every independent component of `network`.
    pub fn extract(&self, network: &Network) -> Result<Program> {
        let network = network.clone();
        self.on_search_stack(move || {
            let network = if self.config.purge {
                network.purged()
            } else {
                network
            };
            let mut parts = if self.config.split {
                network.split()?
            } else {
                Vec::new()
            };
            if parts.is_empty() {
                parts.push(network);
            }

            let components = parts
                .into_iter()
                .map(|part| self.extract_part(part))
                .collect::<Result<Vec<_>>>()?;
            Ok(Program { components })
        })
    }

    /// Extract `network` as a single component, without purging or splitting.
    pub fn extract_component(&self, network: Network) -> Result<ExtractionResult> {
        self.on_search_stack(move || self.extract_part(network))
    }

    fn extract_part(&self, network: Network) -> Result<ExtractionResult> {
        let names: Vec<String> = network.names().map(str::to_string).collect();
        debug!(processes = ?names, "extraction: start");

        let Exploration { graph, extractable } = self.search(network)?;
        let statistics = Statistics::of(&graph);
        let result = if extractable {
            ExtractionResult::Extracted {
                choreography: reconstruct(&graph)?,
                statistics,
            }
        } else {
            ExtractionResult::NotExtractable { statistics }
        };

        debug!(
            processes = ?names,
            nodes = statistics.nodes,
            bad_loops = statistics.bad_loops,
            extracted = result.is_extracted(),
            "extraction: done"
        );
        Ok(result)
    }

    /// Build the exploration graph of `network` without reconstructing.
    pub fn explore(&self, network: Network) -> Result<Exploration> {
        self.on_search_stack(move || self.search(network))
    }

    fn search(&self, network: Network) -> Result<Exploration> {
        let (result, graph) = GraphBuilder::new(network, &self.config, &self.strategy).build()?;
        Ok(Exploration {
            graph,
            extractable: result == BuildResult::Ok,
        })
    }

    /// Run `task` on a thread with the configured stack, under the caller's
    /// subscriber and span. A panic in `task` resumes on the caller.
    fn on_search_stack<T, F>(&self, task: F) -> Result<T>
    where
        T: Send,
        F: FnOnce() -> Result<T> + Send,
    {
        let dispatch = tracing::dispatcher::get_default(Dispatch::clone);
        let span = Span::current();
        thread::scope(|scope| {
            let worker = thread::Builder::new()
                .name("extraction".to_string())
                .stack_size(self.config.stack_size)
                .spawn_scoped(scope, move || {
                    tracing::dispatcher::with_default(&dispatch, || span.in_scope(task))
                })
                .map_err(|error| ExtractionError::Thread(error.to_string()))?;
            match worker.join() {
                Ok(result) => result,
                Err(panic) => std::panic::resume_unwind(panic),
            }
        })
    }
}

/// Extract `network` with default settings and the given services.
pub fn extract(network: &Network, services: &BTreeSet<String>) -> Result<Program> {
    let config = ExtractionConfig::default().with_services(services.iter().cloned());
    Extractor::new(config).extract(network)
}
