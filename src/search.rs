//! Depth-first construction of the exploration graph
//!
//! The search recurses once per step of the protocol. Per-configuration
//! state lives on the heap so that each level stays small; the extractor
//! runs the search on a thread with a configurable stack.

use crate::config::ExtractionConfig;
use crate::error::{ExtractionError, Result};
use crate::graph::{ExplorationGraph, Marking, Recurrence};
use crate::label::Label;
use crate::network::{Advancement, Network};
use crate::strategy::OrderingStrategy;
use petgraph::stable_graph::NodeIndex;
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::{debug, trace, warn};

/// Outcome of exploring from one configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BuildResult {
    /// Every path from here terminates or closes a loop
    Ok,
    /// The step would close a loop before every process has acted
    BadLoop,
    /// No step leads to an extractable continuation
    Fail,
}

/// An edge added (or attempted) during the search
struct Extension {
    target: Option<NodeIndex>,
    label: Label,
    created: bool,
    result: BuildResult,
}

/// A configuration to link to, with the label of the step that reaches it
struct Successor {
    network: Network,
    marking: Marking,
    label: Label,
}

/// Marking right after a loop closure: only terminated processes and
/// services count as having acted.
pub(crate) fn reset_marking(network: &Network, services: &BTreeSet<String>) -> Marking {
    network
        .processes()
        .iter()
        .map(|(name, term)| (name.clone(), term.is_terminated() || services.contains(name)))
        .collect()
}

/// The steps available from one configuration, in the order they are tried
struct Candidates {
    network: Network,
    unfolded: Network,
    unfolded_names: BTreeSet<String>,
    order: Vec<String>,
}

impl Candidates {
    fn interaction(&self, process: &str) -> Option<Box<Advancement>> {
        let advancement = self
            .unfolded
            .interaction_advance(process)
            .or_else(|| self.unfolded.conditional_advance(process))?;
        trace!(%process, label = %advancement.label, "prospect: candidate");
        Some(self.folded(advancement))
    }

    fn multicom(&self, process: &str) -> Result<Option<Box<Advancement>>> {
        let Some(advancement) = self.unfolded.multicom_advance(process)? else {
            return Ok(None);
        };
        trace!(%process, label = %advancement.label, "prospect: multicom candidate");
        Ok(Some(self.folded(advancement)))
    }

    fn spawn(&self, process: &str) -> Option<Box<Advancement>> {
        let advancement = self.unfolded.spawn_advance(process)?;
        trace!(%process, label = %advancement.label, "prospect: spawn candidate");
        Some(self.folded(advancement))
    }

    fn folded(&self, advancement: Advancement) -> Box<Advancement> {
        Box::new(advancement.fold_back(&self.network, &self.unfolded_names))
    }
}

/// Explores a network, building its exploration graph as it goes
pub(crate) struct GraphBuilder<'a> {
    graph: ExplorationGraph,
    strategy: &'a dyn OrderingStrategy,
    config: &'a ExtractionConfig,
    started: Instant,
}

impl<'a> GraphBuilder<'a> {
    pub(crate) fn new(
        network: Network,
        config: &'a ExtractionConfig,
        strategy: &'a dyn OrderingStrategy,
    ) -> Self {
        let marking = reset_marking(&network, &config.services);
        GraphBuilder {
            graph: ExplorationGraph::new(network, marking),
            strategy,
            config,
            started: Instant::now(),
        }
    }

    /// Explore from the root and hand back the finished graph.
    pub(crate) fn build(mut self) -> Result<(BuildResult, ExplorationGraph)> {
        let root = self.graph.root();
        let result = self.prospect(root)?;
        Ok((result, self.graph))
    }

    fn candidates(&self, node: NodeIndex) -> Result<Box<Candidates>> {
        let current = self.graph.concrete(node).ok_or_else(|| {
            ExtractionError::InconsistentGraph(format!("node {} is not a configuration", node.index()))
        })?;
        let (unfolded, unfolded_names) = current.network.unfolded()?;
        let order = self.strategy.order(&unfolded, &current.marking);
        Ok(Box::new(Candidates {
            network: current.network.clone(),
            unfolded,
            unfolded_names,
            order,
        }))
    }

    /// Find a step out of `node` that leads to a complete exploration.
    fn prospect(&mut self, node: NodeIndex) -> Result<BuildResult> {
        let candidates = self.candidates(node)?;

        for process in &candidates.order {
            let Some(advancement) = candidates.interaction(process) else {
                continue;
            };
            match self.advance(node, advancement)? {
                BuildResult::BadLoop => continue,
                result => return Ok(result),
            }
        }

        if candidates.network.all_terminated() {
            return Ok(BuildResult::Ok);
        }

        if self.config.multicom {
            for process in &candidates.order {
                let Some(advancement) = candidates.multicom(process)? else {
                    continue;
                };
                match self.advance(node, advancement)? {
                    BuildResult::BadLoop => continue,
                    result => return Ok(result),
                }
            }
        }

        for process in &candidates.order {
            let Some(advancement) = candidates.spawn(process) else {
                continue;
            };
            match self.advance(node, advancement)? {
                BuildResult::BadLoop => continue,
                result => return Ok(result),
            }
        }

        debug!(node = node.index(), "prospect: no step applies");
        Ok(BuildResult::Fail)
    }

    /// Mark the actors of `advancement` and split it into the successor(s)
    /// of `node`. Closing a loop resets the marking of each successor.
    fn successors(&self, node: NodeIndex, advancement: Advancement) -> Option<(Successor, Option<Successor>)> {
        let mut marking = self.graph.concrete(node)?.marking.clone();
        for actor in advancement.actors() {
            marking.insert(actor, true);
        }
        let closes_loop = marking.values().all(|&acted| acted);
        let successor = |label, network: Network, marking: &Marking| {
            let marking = if closes_loop {
                reset_marking(&network, &self.config.services)
            } else {
                marking.clone()
            };
            Successor {
                network,
                marking,
                label: Label::closing(label, closes_loop),
            }
        };

        let Advancement {
            label,
            network,
            otherwise,
        } = advancement;
        let otherwise = otherwise.map(|(label, network)| successor(label, network, &marking));
        Some((successor(label, network, &marking), otherwise))
    }

    /// Record `advancement` as the step out of `node` and explore its
    /// successor(s). A conditional only stands if both sides succeed.
    fn advance(&mut self, node: NodeIndex, advancement: Box<Advancement>) -> Result<BuildResult> {
        let Some((then, otherwise)) = self.successors(node, *advancement) else {
            return Ok(BuildResult::Fail);
        };

        let then = self.extend(node, then)?;
        let Some(otherwise) = otherwise else {
            return Ok(then.result);
        };
        if then.result != BuildResult::Ok {
            return Ok(then.result);
        }

        let otherwise = self.extend(node, otherwise)?;
        if otherwise.result == BuildResult::Ok {
            return Ok(BuildResult::Ok);
        }

        debug!(node = node.index(), result = ?otherwise.result, "conditional: else-branch failed");
        self.roll_back(node, then);
        Ok(otherwise.result)
    }

    /// Undo the then-side of a conditional whose else-side failed.
    fn roll_back(&mut self, node: NodeIndex, then: Extension) {
        let Some(target) = then.target else {
            return;
        };
        if then.created {
            let path = self.graph.concrete(target).map(|n| n.branch_path.clone());
            if let Some(path) = path {
                self.graph.remove_branch(&path);
            }
        } else {
            self.graph.disconnect(node, target, &then.label);
        }
    }

    /// Link `from` to `successor`, creating and exploring a new node if no
    /// earlier configuration recurs.
    fn extend(&mut self, from: NodeIndex, successor: Successor) -> Result<Extension> {
        let Successor {
            network,
            marking,
            label,
        } = successor;

        match self.graph.find(&network, &marking, from, label.closes_loop) {
            Some(Recurrence::Leak { .. }) => {
                return Ok(Extension {
                    target: None,
                    label,
                    created: false,
                    result: BuildResult::Fail,
                })
            }
            Some(Recurrence::Loop { target, renaming }) => {
                let label = label.with_renaming(renaming);
                let result = if self.graph.connect(from, target, label.clone()) {
                    BuildResult::Ok
                } else {
                    BuildResult::BadLoop
                };
                return Ok(Extension {
                    target: Some(target),
                    label,
                    created: false,
                    result,
                });
            }
            None => {}
        }

        self.check_budget()?;
        let Some(target) = self.graph.create(from, network, marking, label.clone()) else {
            return Ok(Extension {
                target: None,
                label,
                created: false,
                result: BuildResult::Fail,
            });
        };
        let result = self.prospect(target)?;
        if result != BuildResult::Ok {
            self.graph.remove(target);
        }
        Ok(Extension {
            target: Some(target),
            label,
            created: true,
            result,
        })
    }

    fn check_budget(&self) -> Result<()> {
        if let Some(deadline) = self.config.deadline {
            let elapsed = self.started.elapsed();
            if elapsed > deadline {
                warn!(?elapsed, nodes = self.graph.node_count(), "extraction: deadline exceeded");
                return Err(ExtractionError::DeadlineExceeded { elapsed });
            }
        }
        if let Some(limit) = self.config.max_nodes {
            if self.graph.node_count() >= limit {
                warn!(limit, "extraction: node limit exceeded");
                return Err(ExtractionError::NodeLimitExceeded { limit });
            }
        }
        Ok(())
    }
}
