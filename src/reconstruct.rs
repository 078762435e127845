//! Reconstruction of a choreography from a finished exploration graph
//!
//! Every configuration with more than one incoming edge, and the root if it
//! has any, becomes a procedure `X1`, `X2`, … (numbered in exploration
//! order). Its incoming edges are redirected to invocation nodes, which turns
//! the rest of the graph into trees that render directly as structured code.
//!
//! A procedure takes as parameters the processes that some incoming edge
//! renames. Each invocation passes the processes that play those parts on
//! its own edge.

use crate::error::{ExtractionError, Result};
use crate::graph::{ExplorationGraph, InvocationNode, Node};
use crate::label::{Label, LabelKind};
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rumpsteak_extraction_choreography::{Choreography, ChoreographyBody, ProcedureDefinition};
use std::collections::{BTreeMap, BTreeSet};

/// Build the choreography described by a successfully explored graph.
///
/// Fails with [`ExtractionError::InconsistentGraph`] if the graph has a
/// configuration with more than two successors, an unpaired then/else edge,
/// or a dead end that is not a terminated configuration.
pub fn reconstruct(graph: &ExplorationGraph) -> Result<Choreography> {
    let (mut graph, root) = graph.clone().into_parts();

    let mut heads: Vec<(usize, NodeIndex)> = graph
        .node_indices()
        .filter_map(|index| {
            let node = graph.node_weight(index)?.as_concrete()?;
            let incoming = graph.edges_directed(index, Direction::Incoming).count();
            let is_head = if index == root { incoming > 0 } else { incoming > 1 };
            is_head.then_some((node.id, index))
        })
        .collect();
    heads.sort_unstable();

    let mut procedures = Vec::with_capacity(heads.len());
    for (number, &(_, head)) in heads.iter().enumerate() {
        let name = format!("X{}", number + 1);
        let incoming: Vec<_> = graph
            .edges_directed(head, Direction::Incoming)
            .map(|edge| (edge.id(), edge.source()))
            .collect();
        let parameters: Vec<String> = graph
            .edges_directed(head, Direction::Incoming)
            .flat_map(|edge| edge.weight().renaming.values().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        for (edge, source) in incoming {
            let Some(label) = graph.remove_edge(edge) else {
                continue;
            };
            let arguments = arguments(&name, &parameters, &label.renaming)?;
            let invocation = graph.add_node(Node::Invocation(InvocationNode {
                procedure: name.clone(),
                arguments,
                target: head,
            }));
            graph.add_edge(source, invocation, label);
        }
        procedures.push((name, parameters, head));
    }

    let renderer = Renderer { graph: &graph };
    let main = match procedures.iter().find(|(_, _, head)| *head == root) {
        Some((name, parameters, _)) => ChoreographyBody::Call {
            procedure: name.clone(),
            arguments: parameters.clone(),
        },
        None => renderer.render(root)?,
    };
    let definitions = procedures
        .iter()
        .map(|(name, parameters, head)| {
            Ok(ProcedureDefinition::with_parameters(
                name.as_str(),
                parameters.iter().cloned(),
                renderer.render(*head)?,
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Choreography::new(main, definitions))
}

/// The processes an invocation passes for `parameters`, given the renaming
/// on its edge. A parameter nobody is renamed to is passed as itself.
fn arguments(procedure: &str, parameters: &[String], renaming: &BTreeMap<String, String>) -> Result<Vec<String>> {
    let mut sources: BTreeMap<&str, &str> = BTreeMap::new();
    for (source, parameter) in renaming {
        if sources.insert(parameter.as_str(), source.as_str()).is_some() {
            return Err(ExtractionError::InconsistentGraph(format!(
                "two processes passed as {} of {}",
                parameter, procedure
            )));
        }
    }
    Ok(parameters
        .iter()
        .map(|parameter| sources.get(parameter.as_str()).copied().unwrap_or(parameter).to_string())
        .collect())
}

struct Renderer<'a> {
    graph: &'a StableDiGraph<Node, Label>,
}

impl<'a> Renderer<'a> {
    fn render(&self, index: NodeIndex) -> Result<ChoreographyBody> {
        let node = self.graph.node_weight(index).ok_or_else(|| {
            ExtractionError::InconsistentGraph(format!("missing node {}", index.index()))
        })?;
        let outgoing: Vec<(NodeIndex, &Label)> = self
            .graph
            .edges_directed(index, Direction::Outgoing)
            .map(|edge| (edge.target(), edge.weight()))
            .collect();

        match outgoing.as_slice() {
            [] => match node {
                Node::Invocation(invocation) => Ok(ChoreographyBody::Call {
                    procedure: invocation.procedure.clone(),
                    arguments: invocation.arguments.clone(),
                }),
                Node::Concrete(node) if node.network.all_terminated() => Ok(ChoreographyBody::Termination),
                Node::Concrete(node) => Err(ExtractionError::InconsistentGraph(format!(
                    "configuration {} has no successor but is not terminated",
                    node.id
                ))),
            },
            [(target, label)] => self.render_step(&label.kind, *target),
            [first, second] => self.render_condition(first, second),
            edges => Err(ExtractionError::InconsistentGraph(format!(
                "node {} has {} successors",
                node,
                edges.len()
            ))),
        }
    }

    fn render_step(&self, kind: &LabelKind, target: NodeIndex) -> Result<ChoreographyBody> {
        let continuation = self.render(target)?;
        let body = match kind {
            LabelKind::Multicom(interactions) => ChoreographyBody::Multicom {
                interactions: interactions.clone(),
                continuation: Box::new(continuation),
            },
            LabelKind::Spawn { parent, child } => ChoreographyBody::Spawn {
                parent: parent.clone(),
                child: child.clone(),
                continuation: Box::new(continuation),
            },
            LabelKind::Then { process, .. } | LabelKind::Else { process, .. } => {
                return Err(ExtractionError::InconsistentGraph(format!(
                    "conditional of {} has a single branch",
                    process
                )))
            }
            kind => match kind.as_interaction() {
                Some(interaction) => ChoreographyBody::prefixed(interaction, continuation),
                None => {
                    return Err(ExtractionError::InconsistentGraph(format!(
                        "cannot render step {}",
                        kind
                    )))
                }
            },
        };
        Ok(body)
    }

    fn render_condition(
        &self,
        first: &(NodeIndex, &Label),
        second: &(NodeIndex, &Label),
    ) -> Result<ChoreographyBody> {
        let ((then, then_label), (otherwise, _)) = match (&first.1.kind, &second.1.kind) {
            (LabelKind::Then { .. }, LabelKind::Else { .. }) => (first, second),
            (LabelKind::Else { .. }, LabelKind::Then { .. }) => (second, first),
            _ => {
                return Err(ExtractionError::InconsistentGraph(format!(
                    "two successors that are not a conditional: {} and {}",
                    first.1, second.1
                )))
            }
        };
        let LabelKind::Then { process, condition } = &then_label.kind else {
            return Err(ExtractionError::InconsistentGraph("missing then-branch".to_string()));
        };
        Ok(ChoreographyBody::Condition {
            process: process.clone(),
            expression: condition.clone(),
            then: Box::new(self.render(*then)?),
            otherwise: Box::new(self.render(*otherwise)?),
        })
    }
}
