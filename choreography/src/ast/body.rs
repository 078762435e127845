// Choreography statements

use super::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

/// A structured choreography statement
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChoreographyBody {
    /// Value transfer: `p.e->q; C`
    Communication {
        sender: String,
        receiver: String,
        expression: String,
        continuation: Box<ChoreographyBody>,
    },

    /// Branch selection: `p->q[l]; C`
    Selection {
        sender: String,
        receiver: String,
        label: String,
        continuation: Box<ChoreographyBody>,
    },

    /// Introduction of two processes by a third: `i.p<->q; C`
    Introduction {
        introducer: String,
        left: String,
        right: String,
        continuation: Box<ChoreographyBody>,
    },

    /// Several independent interactions performed at once: `(i1, i2); C`
    Multicom {
        interactions: Vec<Interaction>,
        continuation: Box<ChoreographyBody>,
    },

    /// Local decision by one process: `if p.e then C1 else C2`
    Condition {
        process: String,
        expression: String,
        then: Box<ChoreographyBody>,
        otherwise: Box<ChoreographyBody>,
    },

    /// Creation of a new process: `p spawns q; C`
    Spawn {
        parent: String,
        child: String,
        continuation: Box<ChoreographyBody>,
    },

    /// Procedure invocation
    Call {
        procedure: String,
        arguments: Vec<String>,
    },

    /// Every process has terminated
    Termination,
}

impl ChoreographyBody {
    /// Prefix `continuation` with a single interaction.
    pub fn prefixed(interaction: Interaction, continuation: ChoreographyBody) -> Self {
        let continuation = Box::new(continuation);
        match interaction {
            Interaction::Communication {
                sender,
                receiver,
                expression,
            } => ChoreographyBody::Communication {
                sender,
                receiver,
                expression,
                continuation,
            },
            Interaction::Selection {
                sender,
                receiver,
                label,
            } => ChoreographyBody::Selection {
                sender,
                receiver,
                label,
                continuation,
            },
            Interaction::Introduction {
                introducer,
                left,
                right,
            } => ChoreographyBody::Introduction {
                introducer,
                left,
                right,
                continuation,
            },
        }
    }

    /// Invocation of a procedure without arguments.
    pub fn call(procedure: impl Into<String>) -> Self {
        ChoreographyBody::Call {
            procedure: procedure.into(),
            arguments: Vec::new(),
        }
    }

    /// Check whether `process` appears anywhere in this body.
    pub fn mentions_process(&self, process: &str) -> bool {
        match self {
            ChoreographyBody::Communication {
                sender,
                receiver,
                continuation,
                ..
            }
            | ChoreographyBody::Selection {
                sender,
                receiver,
                continuation,
                ..
            } => sender == process || receiver == process || continuation.mentions_process(process),
            ChoreographyBody::Introduction {
                introducer,
                left,
                right,
                continuation,
            } => {
                introducer == process
                    || left == process
                    || right == process
                    || continuation.mentions_process(process)
            }
            ChoreographyBody::Multicom {
                interactions,
                continuation,
            } => {
                interactions.iter().any(|i| i.involves(process))
                    || continuation.mentions_process(process)
            }
            ChoreographyBody::Condition {
                process: decider,
                then,
                otherwise,
                ..
            } => {
                decider == process
                    || then.mentions_process(process)
                    || otherwise.mentions_process(process)
            }
            ChoreographyBody::Spawn {
                parent,
                child,
                continuation,
            } => parent == process || child == process || continuation.mentions_process(process),
            ChoreographyBody::Call { arguments, .. } => arguments.iter().any(|a| a == process),
            ChoreographyBody::Termination => false,
        }
    }

    /// All process names used by this statement, call arguments included.
    pub fn processes(&self) -> BTreeSet<String> {
        let mut processes = BTreeSet::new();
        self.collect_processes(&mut processes);
        processes
    }

    fn collect_processes(&self, into: &mut BTreeSet<String>) {
        match self {
            ChoreographyBody::Communication {
                sender,
                receiver,
                continuation,
                ..
            }
            | ChoreographyBody::Selection {
                sender,
                receiver,
                continuation,
                ..
            } => {
                into.insert(sender.clone());
                into.insert(receiver.clone());
                continuation.collect_processes(into);
            }
            ChoreographyBody::Introduction {
                introducer,
                left,
                right,
                continuation,
            } => {
                into.extend([introducer.clone(), left.clone(), right.clone()]);
                continuation.collect_processes(into);
            }
            ChoreographyBody::Multicom {
                interactions,
                continuation,
            } => {
                for interaction in interactions {
                    into.extend(interaction.processes().into_iter().map(str::to_owned));
                }
                continuation.collect_processes(into);
            }
            ChoreographyBody::Condition {
                process,
                then,
                otherwise,
                ..
            } => {
                into.insert(process.clone());
                then.collect_processes(into);
                otherwise.collect_processes(into);
            }
            ChoreographyBody::Spawn {
                parent,
                child,
                continuation,
            } => {
                into.insert(parent.clone());
                into.insert(child.clone());
                continuation.collect_processes(into);
            }
            ChoreographyBody::Call { arguments, .. } => into.extend(arguments.iter().cloned()),
            ChoreographyBody::Termination => {}
        }
    }

    /// Procedure invocations reachable in this statement, with their arities.
    pub fn calls(&self) -> Vec<(&str, usize)> {
        let mut calls = Vec::new();
        let mut pending = vec![self];
        while let Some(body) = pending.pop() {
            match body {
                ChoreographyBody::Communication { continuation, .. }
                | ChoreographyBody::Selection { continuation, .. }
                | ChoreographyBody::Introduction { continuation, .. }
                | ChoreographyBody::Multicom { continuation, .. }
                | ChoreographyBody::Spawn { continuation, .. } => pending.push(continuation),
                ChoreographyBody::Condition {
                    then, otherwise, ..
                } => {
                    pending.push(otherwise);
                    pending.push(then);
                }
                ChoreographyBody::Call {
                    procedure,
                    arguments,
                } => calls.push((procedure.as_str(), arguments.len())),
                ChoreographyBody::Termination => {}
            }
        }
        calls
    }
}

impl Display for ChoreographyBody {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ChoreographyBody::Communication {
                sender,
                receiver,
                expression,
                continuation,
            } => write!(f, "{}.{}->{}; {}", sender, expression, receiver, continuation),
            ChoreographyBody::Selection {
                sender,
                receiver,
                label,
                continuation,
            } => write!(f, "{}->{}[{}]; {}", sender, receiver, label, continuation),
            ChoreographyBody::Introduction {
                introducer,
                left,
                right,
                continuation,
            } => write!(f, "{}.{}<->{}; {}", introducer, left, right, continuation),
            ChoreographyBody::Multicom {
                interactions,
                continuation,
            } => {
                write!(f, "(")?;
                for (i, interaction) in interactions.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", interaction)?;
                }
                write!(f, "); {}", continuation)
            }
            ChoreographyBody::Condition {
                process,
                expression,
                then,
                otherwise,
            } => write!(
                f,
                "if {}.{} then {} else {}",
                process, expression, then, otherwise
            ),
            ChoreographyBody::Spawn {
                parent,
                child,
                continuation,
            } => write!(f, "{} spawns {}; {}", parent, child, continuation),
            ChoreographyBody::Call {
                procedure,
                arguments,
            } => {
                write!(f, "{}", procedure)?;
                if !arguments.is_empty() {
                    write!(f, "({})", arguments.join(", "))?;
                }
                Ok(())
            }
            ChoreographyBody::Termination => write!(f, "stop"),
        }
    }
}
