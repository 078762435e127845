//! DOT format export for exploration graphs.
//!
//! DOT files can be visualized using Graphviz tools, which is the quickest
//! way to see why a network did or did not extract.

use super::{ExplorationGraph, Node};
use std::fmt::{self, Display, Formatter};

/// Wrapper for exporting an exploration graph in DOT format.
///
/// # Example
///
/// ```rust
/// use rumpsteak_extraction::graph::{Dot, ExplorationGraph, Marking};
/// use rumpsteak_extraction::network::{Behaviour, Network, ProcessTerm};
///
/// let network = Network::new([("p", ProcessTerm::new(Behaviour::Terminate))]);
/// let graph = ExplorationGraph::new(network, Marking::new());
/// println!("{}", Dot::new(&graph));
/// ```
pub struct Dot<'a>(&'a ExplorationGraph);

impl<'a> Dot<'a> {
    /// Creates a new DOT exporter for the given graph.
    pub fn new(graph: &'a ExplorationGraph) -> Self {
        Self(graph)
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

impl<'a> Display for Dot<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "digraph \"exploration\" {{")?;

        if self.0.node_count() > 0 {
            writeln!(f)?;
        }

        for (index, node) in self.0.nodes() {
            let shape = match node {
                Node::Concrete(_) => "box",
                Node::Invocation(_) => "ellipse",
            };
            writeln!(
                f,
                "    {} [shape={}, label=\"{}\"];",
                index.index(),
                shape,
                escape(&node.to_string())
            )?;
        }

        if self.0.edge_count() > 0 {
            writeln!(f)?;
        }

        for (from, to, label) in self.0.edges() {
            let (from, to) = (from.index(), to.index());
            writeln!(f, "    {} -> {} [label=\"{}\"];", from, to, escape(&label.to_string()))?;
        }

        write!(f, "}}")
    }
}
