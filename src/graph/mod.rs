//! The exploration graph
//!
//! Vertices are explored configurations, edges are the steps between them.
//! [`ExplorationGraph`] keeps the multigraph together with two indices:
//! configurations by hash, for finding loop targets, and nodes by branch
//! path, for rolling back the then-side of a failed conditional. Nodes are
//! only ever added or removed through the graph, which keeps all three in
//! agreement.

mod dot;

pub use self::dot::Dot;

use crate::label::{Label, LabelKind};
use crate::network::{Network, Renaming};
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::Direction;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};
use tracing::{debug, trace};

/// Whether each process has acted since the last loop closure
pub type Marking = BTreeMap<String, bool>;

/// Hash identifying a configuration exactly: every process term, together
/// with the marking.
pub fn configuration_hash(network: &Network, marking: &Marking) -> u64 {
    let mut hasher = DefaultHasher::new();
    network.hash(&mut hasher);
    marking.hash(&mut hasher);
    hasher.finish()
}

/// Key under which a configuration is filed for loop closure.
///
/// Only the distinct shapes of live processes count, so networks that match
/// up to a renaming of processes, or differ in terminated processes or in
/// how many copies of a behaviour run, share a key.
pub fn recurrence_key(network: &Network) -> u64 {
    let shapes: BTreeSet<u64> = network.live().map(|(_, term)| term.shape()).collect();
    let mut hasher = DefaultHasher::new();
    shapes.hash(&mut hasher);
    hasher.finish()
}

/// An explored configuration
#[derive(Debug, Clone)]
pub struct ConcreteNode {
    /// Process terms and acquaintance of the configuration
    pub network: Network,
    /// `1` for every then-branch and `0` for every else-branch taken to
    /// reach this node
    pub branch_path: String,
    /// Creation order, starting at `0` for the root
    pub id: usize,
    /// Ids of the ancestors since the last loop closure
    pub unresolved: HashSet<usize>,
    /// Which processes acted since the last loop closure
    pub marking: Marking,
    /// Loop closures on the path from the root
    pub loops: usize,
}

/// A call to the procedure starting at `target`
#[derive(Debug, Clone)]
pub struct InvocationNode {
    /// Name of the invoked procedure
    pub procedure: String,
    /// Processes passed for the procedure's parameters
    pub arguments: Vec<String>,
    /// Head of the procedure
    pub target: NodeIndex,
}

/// A vertex of the exploration graph
#[derive(Debug, Clone)]
pub enum Node {
    /// A configuration reached by the search
    Concrete(ConcreteNode),
    /// A recursive call, introduced when a graph is turned into a choreography
    Invocation(InvocationNode),
}

impl Node {
    /// The configuration, unless this is an invocation.
    pub fn as_concrete(&self) -> Option<&ConcreteNode> {
        match self {
            Node::Concrete(node) => Some(node),
            Node::Invocation(_) => None,
        }
    }
}

impl Display for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Node::Concrete(node) => write!(f, "{}: {}", node.id, node.network),
            Node::Invocation(node) => {
                write!(f, "{}", node.procedure)?;
                if !node.arguments.is_empty() {
                    write!(f, "({})", node.arguments.join(", "))?;
                }
                Ok(())
            }
        }
    }
}

/// An earlier configuration that a new one recurs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recurrence {
    /// The configuration is `target` under `renaming`, which maps current
    /// process names to the names they have at `target`
    Loop {
        target: NodeIndex,
        renaming: Renaming,
    },
    /// The configuration runs more copies of the behaviours live at
    /// `target`, an ancestor at least one loop closure back, and nothing
    /// else; following it would spawn processes forever
    Leak { target: NodeIndex },
}

/// The graph of configurations explored during extraction
#[derive(Debug, Clone)]
pub struct ExplorationGraph {
    graph: StableDiGraph<Node, Label>,
    root: NodeIndex,
    configurations: HashMap<u64, Vec<NodeIndex>>,
    branches: HashMap<String, Vec<NodeIndex>>,
    next_id: usize,
    bad_loops: usize,
}

impl ExplorationGraph {
    /// Creates a graph holding only the root configuration.
    pub fn new(network: Network, marking: Marking) -> Self {
        let mut graph = ExplorationGraph {
            graph: StableDiGraph::new(),
            root: NodeIndex::new(0),
            configurations: HashMap::new(),
            branches: HashMap::new(),
            next_id: 0,
            bad_loops: 0,
        };
        graph.root = graph.insert(network, String::new(), HashSet::new(), marking, 0);
        graph
    }

    /// The initial configuration.
    pub fn root(&self) -> NodeIndex {
        self.root
    }

    /// Look up a vertex.
    pub fn node(&self, index: NodeIndex) -> Option<&Node> {
        self.graph.node_weight(index)
    }

    /// Look up a vertex that is a configuration.
    pub fn concrete(&self, index: NodeIndex) -> Option<&ConcreteNode> {
        self.node(index).and_then(Node::as_concrete)
    }

    /// Number of explored configurations currently in the graph.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of steps currently in the graph.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Number of edges rejected because they would close a bad loop.
    pub fn bad_loops(&self) -> usize {
        self.bad_loops
    }

    /// Every vertex with its index.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &Node)> {
        self.graph
            .node_indices()
            .filter_map(move |index| self.graph.node_weight(index).map(|node| (index, node)))
    }

    /// Every edge as source, target and label.
    pub fn edges(&self) -> impl Iterator<Item = (NodeIndex, NodeIndex, &Label)> {
        self.graph
            .edge_references()
            .map(|edge| (edge.source(), edge.target(), edge.weight()))
    }

    /// Steps out of one vertex, with their targets.
    pub fn outgoing(&self, index: NodeIndex) -> impl Iterator<Item = (NodeIndex, &Label)> {
        self.graph
            .edges_directed(index, Direction::Outgoing)
            .map(|edge| (edge.target(), edge.weight()))
    }

    fn insert(
        &mut self,
        network: Network,
        branch_path: String,
        unresolved: HashSet<usize>,
        marking: Marking,
        loops: usize,
    ) -> NodeIndex {
        let key = recurrence_key(&network);
        let id = self.next_id;
        self.next_id += 1;
        trace!(id, branch_path = %branch_path, "node: create");

        let node = ConcreteNode {
            network,
            branch_path: branch_path.clone(),
            id,
            unresolved,
            marking,
            loops,
        };
        let index = self.graph.add_node(Node::Concrete(node));
        self.configurations.entry(key).or_default().push(index);
        self.branches.entry(branch_path).or_default().push(index);
        index
    }

    /// Find an earlier configuration that `(network, marking)`, reached from
    /// `current` by a step that does or does not close a loop, recurs to.
    ///
    /// Candidates lie on a branch path that is a prefix of the current one.
    /// A candidate is a loop target if its live processes correspond to the
    /// live processes of `network` and every live process has the same
    /// marking as its counterpart. Fully terminated configurations are never
    /// reused.
    pub fn find(
        &self,
        network: &Network,
        marking: &Marking,
        current: NodeIndex,
        closes_loop: bool,
    ) -> Option<Recurrence> {
        if network.all_terminated() {
            return None;
        }
        let source = self.concrete(current)?;
        let loops = source.loops + usize::from(closes_loop);
        let candidates = self.configurations.get(&recurrence_key(network))?;

        for &candidate in candidates {
            let Some(node) = self.concrete(candidate) else {
                continue;
            };
            if !source.branch_path.starts_with(node.branch_path.as_str()) {
                continue;
            }
            if loops > node.loops && leaks(network, &node.network) {
                debug!(target = node.id, "recurrence: resource leak");
                return Some(Recurrence::Leak { target: candidate });
            }
            let Some(renaming) = network.correspondence(&node.network) else {
                continue;
            };
            let compatible = network.live().all(|(name, _)| {
                let counterpart = renaming.get(name).unwrap_or(name);
                marking.get(name) == node.marking.get(counterpart)
            });
            if compatible {
                return Some(Recurrence::Loop {
                    target: candidate,
                    renaming,
                });
            }
        }
        None
    }

    /// Create a node for a new configuration reached from `from` by `label`.
    ///
    /// Its branch path extends `from`'s for then/else labels, and its
    /// unresolved set is `from`'s plus `from` itself, or empty if the label
    /// closes a loop.
    pub fn create(&mut self, from: NodeIndex, network: Network, marking: Marking, label: Label) -> Option<NodeIndex> {
        let source = self.concrete(from)?;
        let mut branch_path = source.branch_path.clone();
        match label.kind {
            LabelKind::Then { .. } => branch_path.push('1'),
            LabelKind::Else { .. } => branch_path.push('0'),
            _ => {}
        }
        let unresolved = if label.closes_loop {
            HashSet::new()
        } else {
            let mut unresolved = source.unresolved.clone();
            unresolved.insert(source.id);
            unresolved
        };
        let loops = source.loops + usize::from(label.closes_loop);

        let index = self.insert(network, branch_path, unresolved, marking, loops);
        self.graph.add_edge(from, index, label);
        Some(index)
    }

    /// Add an edge to an existing node, unless it would close a bad loop.
    ///
    /// Returns `false`, and counts a bad loop, if the label does not close a
    /// loop and `to` is `from` itself or one of its unresolved ancestors.
    pub fn connect(&mut self, from: NodeIndex, to: NodeIndex, label: Label) -> bool {
        let legal = label.closes_loop
            || match (self.concrete(from), self.concrete(to)) {
                (Some(source), Some(target)) => from != to && !source.unresolved.contains(&target.id),
                _ => false,
            };
        if !legal {
            self.bad_loops += 1;
            debug!(?from, ?to, label = %label, "edge: bad loop");
            return false;
        }
        trace!(?from, ?to, label = %label, "edge: connect");
        self.graph.add_edge(from, to, label);
        true
    }

    /// Remove one edge from `from` to `to` carrying `label`.
    pub fn disconnect(&mut self, from: NodeIndex, to: NodeIndex, label: &Label) -> bool {
        let edge = self
            .graph
            .edges_directed(from, Direction::Outgoing)
            .find(|edge| edge.target() == to && edge.weight() == label)
            .map(|edge| edge.id());
        match edge {
            Some(edge) => self.graph.remove_edge(edge).is_some(),
            None => false,
        }
    }

    /// Remove a node, its edges, and its index entries.
    pub fn remove(&mut self, index: NodeIndex) {
        let Some(Node::Concrete(node)) = self.graph.remove_node(index) else {
            return;
        };
        let key = recurrence_key(&node.network);
        if let Some(entries) = self.configurations.get_mut(&key) {
            entries.retain(|&entry| entry != index);
            if entries.is_empty() {
                self.configurations.remove(&key);
            }
        }
        if let Some(entries) = self.branches.get_mut(&node.branch_path) {
            entries.retain(|&entry| entry != index);
            if entries.is_empty() {
                self.branches.remove(&node.branch_path);
            }
        }
        trace!(id = node.id, "node: remove");
    }

    /// Remove every node whose branch path starts with `prefix`.
    pub fn remove_branch(&mut self, prefix: &str) {
        let doomed: Vec<NodeIndex> = self
            .branches
            .iter()
            .filter(|(path, _)| path.starts_with(prefix))
            .flat_map(|(_, nodes)| nodes.iter().copied())
            .collect();
        debug!(prefix, nodes = doomed.len(), "branch: roll back");
        for index in doomed {
            self.remove(index);
        }
    }

    pub(crate) fn into_parts(self) -> (StableDiGraph<Node, Label>, NodeIndex) {
        (self.graph, self.root)
    }
}

/// Check whether `current` runs strictly more live processes than
/// `previous` while every one of them behaves like some live process of
/// `previous`, up to process names.
fn leaks(current: &Network, previous: &Network) -> bool {
    let before: HashSet<u64> = previous.live().map(|(_, term)| term.shape()).collect();
    current.live().count() > previous.live().count()
        && current.live().all(|(_, term)| before.contains(&term.shape()))
}
