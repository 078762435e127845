//! Single-step advancement of a network
//!
//! Every operation here is a pure function of the network it is called on:
//! it returns the successor configuration(s) together with the label of the
//! step, or `None` when the chosen process cannot drive that kind of step.
//! Processes whose main is a procedure call never advance; unfold the
//! network first with [`Network::unfolded`].

use super::behaviour::{Behaviour, Renaming};
use super::{Network, ProcessTerm};
use crate::error::NetworkError;
use crate::label::LabelKind;
use rumpsteak_extraction_choreography::Interaction;
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::Arc;
use tracing::trace;

/// The outcome of advancing a network by one step
///
/// Conditionals produce two successors: `network` for the then-branch and
/// `otherwise` for the else-branch.
#[derive(Debug, Clone)]
pub struct Advancement {
    /// What happened in the step
    pub label: LabelKind,
    /// The successor, or the then-branch successor of a conditional
    pub network: Network,
    /// The else-branch of a conditional
    pub otherwise: Option<(LabelKind, Network)>,
}

impl Advancement {
    fn step(label: LabelKind, network: Network) -> Self {
        Advancement {
            label,
            network,
            otherwise: None,
        }
    }

    /// Processes that took part in the step.
    pub fn actors(&self) -> BTreeSet<String> {
        self.label.actors()
    }

    /// Restore the processes in `unfolded` that did not act to their terms
    /// in `original`.
    pub(crate) fn fold_back(mut self, original: &Network, unfolded: &BTreeSet<String>) -> Self {
        let actors = self.actors();
        let idle: Vec<&String> = unfolded.difference(&actors).collect();
        self.network.fold_back(original, idle.iter().copied());
        if let Some((_, otherwise)) = &mut self.otherwise {
            otherwise.fold_back(original, idle.iter().copied());
        }
        self
    }
}

fn single(variable: &str, process: &str) -> Renaming {
    let mut renaming = Renaming::new();
    renaming.insert(variable.to_string(), process.to_string());
    renaming
}

/// An output waiting for its receiver during a multicom search
#[derive(Debug)]
struct Pending {
    sender: String,
    receiver: String,
    kind: PendingKind,
}

#[derive(Debug)]
enum PendingKind {
    Communication(String),
    Selection(String),
    /// One half of an introduction; `peer` is the process the receiver
    /// learns about. The `complete` half is delivered second.
    Introduction { peer: String, complete: bool },
}

impl Network {
    fn partner(&self, process: &str, partner: &str) -> Option<&ProcessTerm> {
        if process == partner || !self.acquaintance.knows(process, partner) {
            return None;
        }
        self.processes.get(partner)
    }

    /// A two-party communication or selection, or an introduction, driven
    /// by `process` as the sender.
    pub fn interaction_advance(&self, process: &str) -> Option<Advancement> {
        let term = self.processes.get(process)?;
        match term.main() {
            Behaviour::Send {
                to,
                expression,
                continuation,
            } => {
                let Behaviour::Receive {
                    from,
                    continuation: received,
                } = self.partner(process, to)?.main()
                else {
                    return None;
                };
                if from != process {
                    return None;
                }
                let mut network = self.clone();
                network.set_main(process, Arc::clone(continuation));
                network.set_main(to, Arc::clone(received));
                let label = LabelKind::Communication {
                    sender: process.to_string(),
                    receiver: to.clone(),
                    expression: expression.clone(),
                };
                Some(Advancement::step(label, network))
            }
            Behaviour::Select {
                to,
                label,
                continuation,
            } => {
                let Behaviour::Offer {
                    from,
                    branches,
                    continuation: after,
                } = self.partner(process, to)?.main()
                else {
                    return None;
                };
                if from != process {
                    return None;
                }
                let branch = branches.get(label)?;
                let mut network = self.clone();
                network.set_main(process, Arc::clone(continuation));
                network.set_main(to, Behaviour::sequenced(branch, after));
                let label = LabelKind::Selection {
                    sender: process.to_string(),
                    receiver: to.clone(),
                    label: label.clone(),
                };
                Some(Advancement::step(label, network))
            }
            Behaviour::Introduce {
                left,
                right,
                continuation,
            } => {
                if left == right {
                    return None;
                }
                let Behaviour::Introductee {
                    sender: left_sender,
                    peer: left_peer,
                    continuation: left_continuation,
                } = self.partner(process, left)?.main()
                else {
                    return None;
                };
                let Behaviour::Introductee {
                    sender: right_sender,
                    peer: right_peer,
                    continuation: right_continuation,
                } = self.partner(process, right)?.main()
                else {
                    return None;
                };
                if left_sender != process || right_sender != process {
                    return None;
                }
                let mut network = self.clone();
                network.set_main(process, Arc::clone(continuation));
                network.set_main(left, Behaviour::renamed(left_continuation, &single(left_peer, right)));
                network.set_main(right, Behaviour::renamed(right_continuation, &single(right_peer, left)));
                network.acquaintance.introduce(left, right);
                let label = LabelKind::Introduction {
                    introducer: process.to_string(),
                    left: left.clone(),
                    right: right.clone(),
                };
                Some(Advancement::step(label, network))
            }
            _ => None,
        }
    }

    /// Both outcomes of a local decision by `process`.
    pub fn conditional_advance(&self, process: &str) -> Option<Advancement> {
        let Behaviour::Branch {
            condition,
            then,
            otherwise,
            continuation,
        } = self.processes.get(process)?.main()
        else {
            return None;
        };

        let mut then_network = self.clone();
        then_network.set_main(process, Behaviour::sequenced(then, continuation));
        let mut else_network = self.clone();
        else_network.set_main(process, Behaviour::sequenced(otherwise, continuation));

        let then_label = LabelKind::Then {
            process: process.to_string(),
            condition: condition.clone(),
        };
        let else_label = LabelKind::Else {
            process: process.to_string(),
            condition: condition.clone(),
        };
        Some(Advancement {
            label: then_label,
            network: then_network,
            otherwise: Some((else_label, else_network)),
        })
    }

    /// Creation of a new process by `process`.
    ///
    /// The child is named `<parent>/<variable><n>` with a per-network counter
    /// and knows only itself and its parent.
    pub fn spawn_advance(&self, process: &str) -> Option<Advancement> {
        let term = self.processes.get(process)?;
        let Behaviour::Spawn {
            child: variable,
            behaviour,
            continuation,
        } = term.main()
        else {
            return None;
        };

        let mut network = self.clone();
        let child = loop {
            let candidate = format!("{}/{}{}", process, variable, network.spawned);
            network.spawned += 1;
            if !network.processes.contains_key(&candidate) {
                break candidate;
            }
        };
        let renaming = single(variable, &child);
        network.set_main(process, Behaviour::renamed(continuation, &renaming));
        network.insert(child.clone(), term.with_main(Behaviour::renamed(behaviour, &renaming)));
        network.acquaintance.spawn(process, &child);

        let label = LabelKind::Spawn {
            parent: process.to_string(),
            child,
        };
        Some(Advancement::step(label, network))
    }

    /// A bundle of interactions that can only happen together, started by
    /// an output of `process`.
    ///
    /// Each receiver first performs its own pending outputs before it must
    /// accept the queued one. Bundles of fewer than two interactions are not
    /// multicoms and yield `None`.
    pub fn multicom_advance(&self, process: &str) -> Result<Option<Advancement>, NetworkError> {
        let mut network = self.clone();
        let mut queue = VecDeque::new();
        if !network.emit(process, &mut queue)? {
            return Ok(None);
        }

        let mut interactions = Vec::new();
        while let Some(pending) = queue.pop_front() {
            if pending.sender == pending.receiver
                || !network.acquaintance.knows(&pending.sender, &pending.receiver)
            {
                return Ok(None);
            }

            let mut seen = HashSet::new();
            loop {
                let Some(term) = network.processes.get(&pending.receiver) else {
                    return Ok(None);
                };
                if !seen.insert(Arc::clone(&term.main)) {
                    trace!(receiver = %pending.receiver, "multicom: receiver never blocks");
                    return Ok(None);
                }
                if !network.emit(&pending.receiver, &mut queue)? {
                    break;
                }
            }

            match network.deliver(pending) {
                Some(Some(interaction)) => interactions.push(interaction),
                Some(None) => {}
                None => return Ok(None),
            }
        }

        if interactions.len() < 2 {
            return Ok(None);
        }
        Ok(Some(Advancement::step(LabelKind::Multicom(interactions), network)))
    }

    /// Unfold `process` and, if it is blocked on an output, queue that output
    /// and reduce the process past it.
    fn emit(&mut self, process: &str, queue: &mut VecDeque<Pending>) -> Result<bool, NetworkError> {
        let Some(term) = self.processes.get(process) else {
            return Ok(false);
        };
        let term = term.unfold(process)?;
        let sender = process.to_string();
        let continuation = match term.main() {
            Behaviour::Send {
                to,
                expression,
                continuation,
            } => {
                queue.push_back(Pending {
                    sender,
                    receiver: to.clone(),
                    kind: PendingKind::Communication(expression.clone()),
                });
                Arc::clone(continuation)
            }
            Behaviour::Select {
                to,
                label,
                continuation,
            } => {
                queue.push_back(Pending {
                    sender,
                    receiver: to.clone(),
                    kind: PendingKind::Selection(label.clone()),
                });
                Arc::clone(continuation)
            }
            Behaviour::Introduce {
                left,
                right,
                continuation,
            } => {
                queue.push_back(Pending {
                    sender: sender.clone(),
                    receiver: right.clone(),
                    kind: PendingKind::Introduction {
                        peer: left.clone(),
                        complete: false,
                    },
                });
                queue.push_back(Pending {
                    sender,
                    receiver: left.clone(),
                    kind: PendingKind::Introduction {
                        peer: right.clone(),
                        complete: true,
                    },
                });
                Arc::clone(continuation)
            }
            _ => {
                self.processes.insert(process.to_string(), term);
                return Ok(false);
            }
        };
        self.processes.insert(process.to_string(), term.with_main(continuation));
        Ok(true)
    }

    /// Hand a pending output to its receiver. `None` if the receiver is not
    /// blocked on the matching input; otherwise the completed interaction,
    /// if this delivery completes one.
    fn deliver(&mut self, pending: Pending) -> Option<Option<Interaction>> {
        let term = self.processes.get(&pending.receiver)?;
        let (main, interaction) = match (term.main(), pending.kind) {
            (Behaviour::Receive { from, continuation }, PendingKind::Communication(expression))
                if *from == pending.sender =>
            {
                let interaction = Interaction::communication(&pending.sender, &pending.receiver, expression);
                (Arc::clone(continuation), Some(interaction))
            }
            (
                Behaviour::Offer {
                    from,
                    branches,
                    continuation,
                },
                PendingKind::Selection(label),
            ) if *from == pending.sender => {
                let branch = branches.get(&label)?;
                let interaction = Interaction::selection(&pending.sender, &pending.receiver, label);
                (Behaviour::sequenced(branch, continuation), Some(interaction))
            }
            (
                Behaviour::Introductee {
                    sender,
                    peer: variable,
                    continuation,
                },
                PendingKind::Introduction { peer, complete },
            ) if *sender == pending.sender => {
                let main = Behaviour::renamed(continuation, &single(variable, &peer));
                let interaction = complete.then(|| {
                    Interaction::introduction(&pending.sender, &pending.receiver, &peer)
                });
                (main, interaction)
            }
            _ => return None,
        };

        if let Some(Interaction::Introduction { left, right, .. }) = &interaction {
            self.acquaintance.introduce(left, right);
        }
        self.set_main(&pending.receiver, main);
        Some(interaction)
    }
}
