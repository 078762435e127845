//! Process behaviours

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Substitution from variable names to process names
pub type Renaming = BTreeMap<String, String>;

/// The pending actions of a single process
///
/// Behaviours are immutable trees. Continuations are shared through [`Arc`],
/// so advancing a process only allocates the nodes on the path that changed.
/// Equality and hashing are structural.
///
/// `Offer` branches and `Branch` arms are blocks: reaching [`Behaviour::Terminate`]
/// inside one continues with the enclosing continuation. Calls are tail
/// positions and discard it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Behaviour {
    /// Send the value of `expression` to `to`
    Send {
        to: String,
        expression: String,
        continuation: Arc<Behaviour>,
    },

    /// Receive a value from `from`
    Receive {
        from: String,
        continuation: Arc<Behaviour>,
    },

    /// Select branch `label` of `to`
    Select {
        to: String,
        label: String,
        continuation: Arc<Behaviour>,
    },

    /// Offer labelled branches to `from`
    Offer {
        from: String,
        branches: BTreeMap<String, Arc<Behaviour>>,
        continuation: Arc<Behaviour>,
    },

    /// Decide locally on `condition`
    Branch {
        condition: String,
        then: Arc<Behaviour>,
        otherwise: Arc<Behaviour>,
        continuation: Arc<Behaviour>,
    },

    /// Invoke a procedure with process arguments
    Call {
        procedure: String,
        arguments: Vec<String>,
    },

    /// No further actions
    Terminate,

    /// Tell `left` and `right` about each other
    Introduce {
        left: String,
        right: String,
        continuation: Arc<Behaviour>,
    },

    /// Learn from `sender` about a new peer, bound to `peer` in the continuation
    Introductee {
        sender: String,
        peer: String,
        continuation: Arc<Behaviour>,
    },

    /// Start a new process running `behaviour`, bound to `child` in both the
    /// child's behaviour and the continuation
    Spawn {
        child: String,
        behaviour: Arc<Behaviour>,
        continuation: Arc<Behaviour>,
    },
}

impl Behaviour {
    /// `to!<expression>; continuation`
    pub fn send(to: impl Into<String>, expression: impl Into<String>, continuation: Behaviour) -> Self {
        Behaviour::Send {
            to: to.into(),
            expression: expression.into(),
            continuation: Arc::new(continuation),
        }
    }

    /// `from?; continuation`
    pub fn receive(from: impl Into<String>, continuation: Behaviour) -> Self {
        Behaviour::Receive {
            from: from.into(),
            continuation: Arc::new(continuation),
        }
    }

    /// `to+label; continuation`
    pub fn select(to: impl Into<String>, label: impl Into<String>, continuation: Behaviour) -> Self {
        Behaviour::Select {
            to: to.into(),
            label: label.into(),
            continuation: Arc::new(continuation),
        }
    }

    /// Offer `branches` to `from`. Each branch runs on into `continuation`.
    pub fn offer<L, I>(from: impl Into<String>, branches: I, continuation: Behaviour) -> Self
    where
        L: Into<String>,
        I: IntoIterator<Item = (L, Behaviour)>,
    {
        Behaviour::Offer {
            from: from.into(),
            branches: branches
                .into_iter()
                .map(|(label, branch)| (label.into(), Arc::new(branch)))
                .collect(),
            continuation: Arc::new(continuation),
        }
    }

    /// `if condition then .. else ..; continuation`
    pub fn branch(
        condition: impl Into<String>,
        then: Behaviour,
        otherwise: Behaviour,
        continuation: Behaviour,
    ) -> Self {
        Behaviour::Branch {
            condition: condition.into(),
            then: Arc::new(then),
            otherwise: Arc::new(otherwise),
            continuation: Arc::new(continuation),
        }
    }

    /// Call `procedure`, binding its parameters to `arguments` in order.
    pub fn call<A: Into<String>>(procedure: impl Into<String>, arguments: impl IntoIterator<Item = A>) -> Self {
        Behaviour::Call {
            procedure: procedure.into(),
            arguments: arguments.into_iter().map(Into::into).collect(),
        }
    }

    /// `left<->right; continuation`
    pub fn introduce(left: impl Into<String>, right: impl Into<String>, continuation: Behaviour) -> Self {
        Behaviour::Introduce {
            left: left.into(),
            right: right.into(),
            continuation: Arc::new(continuation),
        }
    }

    /// `sender?peer; continuation`
    pub fn introductee(sender: impl Into<String>, peer: impl Into<String>, continuation: Behaviour) -> Self {
        Behaviour::Introductee {
            sender: sender.into(),
            peer: peer.into(),
            continuation: Arc::new(continuation),
        }
    }

    /// `spawn child with behaviour continue continuation`
    pub fn spawn(child: impl Into<String>, behaviour: Behaviour, continuation: Behaviour) -> Self {
        Behaviour::Spawn {
            child: child.into(),
            behaviour: Arc::new(behaviour),
            continuation: Arc::new(continuation),
        }
    }

    /// Check whether this behaviour waits for input from another process.
    pub fn is_input(&self) -> bool {
        matches!(
            self,
            Behaviour::Receive { .. } | Behaviour::Offer { .. } | Behaviour::Introductee { .. }
        )
    }

    /// Check whether this behaviour starts an interaction with another process.
    pub fn is_output(&self) -> bool {
        matches!(
            self,
            Behaviour::Send { .. } | Behaviour::Select { .. } | Behaviour::Introduce { .. }
        )
    }

    /// Number of behaviour nodes in this tree.
    pub fn size(&self) -> usize {
        match self {
            Behaviour::Send { continuation, .. }
            | Behaviour::Receive { continuation, .. }
            | Behaviour::Select { continuation, .. }
            | Behaviour::Introduce { continuation, .. }
            | Behaviour::Introductee { continuation, .. } => 1 + continuation.size(),
            Behaviour::Offer {
                branches,
                continuation,
                ..
            } => 1 + continuation.size() + branches.values().map(|b| b.size()).sum::<usize>(),
            Behaviour::Branch {
                then,
                otherwise,
                continuation,
                ..
            } => 1 + then.size() + otherwise.size() + continuation.size(),
            Behaviour::Spawn {
                behaviour,
                continuation,
                ..
            } => 1 + behaviour.size() + continuation.size(),
            Behaviour::Call { .. } | Behaviour::Terminate => 1,
        }
    }

    /// Names this behaviour refers to as interaction partners or arguments.
    ///
    /// Bound variables are included; callers filter against the names that
    /// actually exist in a network.
    pub fn mentioned_processes(&self, into: &mut BTreeSet<String>) {
        match self {
            Behaviour::Send { to, continuation, .. } | Behaviour::Select { to, continuation, .. } => {
                into.insert(to.clone());
                continuation.mentioned_processes(into);
            }
            Behaviour::Receive { from, continuation } => {
                into.insert(from.clone());
                continuation.mentioned_processes(into);
            }
            Behaviour::Offer {
                from,
                branches,
                continuation,
            } => {
                into.insert(from.clone());
                for branch in branches.values() {
                    branch.mentioned_processes(into);
                }
                continuation.mentioned_processes(into);
            }
            Behaviour::Branch {
                then,
                otherwise,
                continuation,
                ..
            } => {
                then.mentioned_processes(into);
                otherwise.mentioned_processes(into);
                continuation.mentioned_processes(into);
            }
            Behaviour::Call { arguments, .. } => into.extend(arguments.iter().cloned()),
            Behaviour::Terminate => {}
            Behaviour::Introduce {
                left,
                right,
                continuation,
            } => {
                into.insert(left.clone());
                into.insert(right.clone());
                continuation.mentioned_processes(into);
            }
            Behaviour::Introductee {
                sender,
                continuation,
                ..
            } => {
                into.insert(sender.clone());
                continuation.mentioned_processes(into);
            }
            Behaviour::Spawn {
                behaviour,
                continuation,
                ..
            } => {
                behaviour.mentioned_processes(into);
                continuation.mentioned_processes(into);
            }
        }
    }

    /// Feed the structure of this behaviour to `state`, leaving out every
    /// process name and bound variable.
    ///
    /// Behaviours that differ only by a renaming of processes hash alike.
    pub(crate) fn hash_shape<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Behaviour::Send {
                expression,
                continuation,
                ..
            } => {
                expression.hash(state);
                continuation.hash_shape(state);
            }
            Behaviour::Select {
                label,
                continuation,
                ..
            } => {
                label.hash(state);
                continuation.hash_shape(state);
            }
            Behaviour::Receive { continuation, .. }
            | Behaviour::Introduce { continuation, .. }
            | Behaviour::Introductee { continuation, .. } => continuation.hash_shape(state),
            Behaviour::Offer {
                branches,
                continuation,
                ..
            } => {
                for (label, branch) in branches {
                    label.hash(state);
                    branch.hash_shape(state);
                }
                continuation.hash_shape(state);
            }
            Behaviour::Branch {
                condition,
                then,
                otherwise,
                continuation,
            } => {
                condition.hash(state);
                then.hash_shape(state);
                otherwise.hash_shape(state);
                continuation.hash_shape(state);
            }
            Behaviour::Call {
                procedure,
                arguments,
            } => {
                procedure.hash(state);
                arguments.len().hash(state);
            }
            Behaviour::Terminate => {}
            Behaviour::Spawn {
                behaviour,
                continuation,
                ..
            } => {
                behaviour.hash_shape(state);
                continuation.hash_shape(state);
            }
        }
    }

    /// Apply a simultaneous renaming of process references.
    ///
    /// Variables bound by `Introductee` and `Spawn` shadow the renaming in
    /// their scope.
    pub(crate) fn renamed(this: &Arc<Behaviour>, renaming: &Renaming) -> Arc<Behaviour> {
        if renaming.is_empty() {
            return Arc::clone(this);
        }
        let rename = |name: &String| renaming.get(name).unwrap_or(name).clone();

        let renamed = match &**this {
            Behaviour::Send {
                to,
                expression,
                continuation,
            } => Behaviour::Send {
                to: rename(to),
                expression: expression.clone(),
                continuation: Self::renamed(continuation, renaming),
            },
            Behaviour::Receive { from, continuation } => Behaviour::Receive {
                from: rename(from),
                continuation: Self::renamed(continuation, renaming),
            },
            Behaviour::Select {
                to,
                label,
                continuation,
            } => Behaviour::Select {
                to: rename(to),
                label: label.clone(),
                continuation: Self::renamed(continuation, renaming),
            },
            Behaviour::Offer {
                from,
                branches,
                continuation,
            } => Behaviour::Offer {
                from: rename(from),
                branches: branches
                    .iter()
                    .map(|(label, branch)| (label.clone(), Self::renamed(branch, renaming)))
                    .collect(),
                continuation: Self::renamed(continuation, renaming),
            },
            Behaviour::Branch {
                condition,
                then,
                otherwise,
                continuation,
            } => Behaviour::Branch {
                condition: condition.clone(),
                then: Self::renamed(then, renaming),
                otherwise: Self::renamed(otherwise, renaming),
                continuation: Self::renamed(continuation, renaming),
            },
            Behaviour::Call {
                procedure,
                arguments,
            } => Behaviour::Call {
                procedure: procedure.clone(),
                arguments: arguments.iter().map(rename).collect(),
            },
            Behaviour::Terminate => return Arc::clone(this),
            Behaviour::Introduce {
                left,
                right,
                continuation,
            } => Behaviour::Introduce {
                left: rename(left),
                right: rename(right),
                continuation: Self::renamed(continuation, renaming),
            },
            Behaviour::Introductee {
                sender,
                peer,
                continuation,
            } => Behaviour::Introductee {
                sender: rename(sender),
                peer: peer.clone(),
                continuation: Self::renamed(continuation, &shadow(renaming, peer)),
            },
            Behaviour::Spawn {
                child,
                behaviour,
                continuation,
            } => {
                let inner = shadow(renaming, child);
                Behaviour::Spawn {
                    child: child.clone(),
                    behaviour: Self::renamed(behaviour, &inner),
                    continuation: Self::renamed(continuation, &inner),
                }
            }
        };
        Arc::new(renamed)
    }

    /// Sequential composition: run `this`, then `next`.
    ///
    /// Every `Terminate` reachable in `this` is replaced by `next`. Calls are
    /// left untouched.
    pub(crate) fn sequenced(this: &Arc<Behaviour>, next: &Arc<Behaviour>) -> Arc<Behaviour> {
        if matches!(**next, Behaviour::Terminate) {
            return Arc::clone(this);
        }
        let then = |continuation: &Arc<Behaviour>| Self::sequenced(continuation, next);

        let sequenced = match &**this {
            Behaviour::Terminate => return Arc::clone(next),
            Behaviour::Call { .. } => return Arc::clone(this),
            Behaviour::Send {
                to,
                expression,
                continuation,
            } => Behaviour::Send {
                to: to.clone(),
                expression: expression.clone(),
                continuation: then(continuation),
            },
            Behaviour::Receive { from, continuation } => Behaviour::Receive {
                from: from.clone(),
                continuation: then(continuation),
            },
            Behaviour::Select {
                to,
                label,
                continuation,
            } => Behaviour::Select {
                to: to.clone(),
                label: label.clone(),
                continuation: then(continuation),
            },
            Behaviour::Offer {
                from,
                branches,
                continuation,
            } => Behaviour::Offer {
                from: from.clone(),
                branches: branches.clone(),
                continuation: then(continuation),
            },
            Behaviour::Branch {
                condition,
                then: yes,
                otherwise,
                continuation,
            } => Behaviour::Branch {
                condition: condition.clone(),
                then: Arc::clone(yes),
                otherwise: Arc::clone(otherwise),
                continuation: then(continuation),
            },
            Behaviour::Introduce {
                left,
                right,
                continuation,
            } => Behaviour::Introduce {
                left: left.clone(),
                right: right.clone(),
                continuation: then(continuation),
            },
            Behaviour::Introductee {
                sender,
                peer,
                continuation,
            } => Behaviour::Introductee {
                sender: sender.clone(),
                peer: peer.clone(),
                continuation: then(continuation),
            },
            Behaviour::Spawn {
                child,
                behaviour,
                continuation,
            } => Behaviour::Spawn {
                child: child.clone(),
                behaviour: Arc::clone(behaviour),
                continuation: then(continuation),
            },
        };
        Arc::new(sequenced)
    }
}

fn shadow<'a>(renaming: &'a Renaming, variable: &str) -> Cow<'a, Renaming> {
    if renaming.contains_key(variable) {
        let mut inner = renaming.clone();
        inner.remove(variable);
        Cow::Owned(inner)
    } else {
        Cow::Borrowed(renaming)
    }
}

impl Display for Behaviour {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Behaviour::Send {
                to,
                expression,
                continuation,
            } => write!(f, "{}!<{}>; {}", to, expression, continuation),
            Behaviour::Receive { from, continuation } => write!(f, "{}?; {}", from, continuation),
            Behaviour::Select {
                to,
                label,
                continuation,
            } => write!(f, "{}+{}; {}", to, label, continuation),
            Behaviour::Offer {
                from,
                branches,
                continuation,
            } => {
                write!(f, "{}&{{", from)?;
                for (i, (label, branch)) in branches.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", label, branch)?;
                }
                write!(f, "}}")?;
                write_block_continuation(f, continuation)
            }
            Behaviour::Branch {
                condition,
                then,
                otherwise,
                continuation,
            } => {
                write!(f, "if {} then {} else {}", condition, then, otherwise)?;
                write_block_continuation(f, continuation)
            }
            Behaviour::Call {
                procedure,
                arguments,
            } => {
                write!(f, "{}", procedure)?;
                if !arguments.is_empty() {
                    write!(f, "({})", arguments.join(", "))?;
                }
                Ok(())
            }
            Behaviour::Terminate => write!(f, "stop"),
            Behaviour::Introduce {
                left,
                right,
                continuation,
            } => write!(f, "{}<->{}; {}", left, right, continuation),
            Behaviour::Introductee {
                sender,
                peer,
                continuation,
            } => write!(f, "{}?{}; {}", sender, peer, continuation),
            Behaviour::Spawn {
                child,
                behaviour,
                continuation,
            } => write!(f, "spawn {} with {} continue {}", child, behaviour, continuation),
        }
    }
}

fn write_block_continuation(f: &mut Formatter<'_>, continuation: &Behaviour) -> fmt::Result {
    match continuation {
        Behaviour::Terminate => Ok(()),
        continuation => write!(f, "; {}", continuation),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renaming(pairs: &[(&str, &str)]) -> Renaming {
        pairs
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect()
    }

    #[test]
    fn test_structural_equality() {
        let a = Behaviour::send("q", "e", Behaviour::receive("q", Behaviour::Terminate));
        let b = Behaviour::send("q", "e", Behaviour::receive("q", Behaviour::Terminate));
        assert_eq!(a, b);
        assert_ne!(a, Behaviour::send("q", "e", Behaviour::Terminate));
    }

    #[test]
    fn test_display() {
        let behaviour = Behaviour::offer(
            "p",
            [
                ("L", Behaviour::send("p", "x", Behaviour::Terminate)),
                ("R", Behaviour::call("X", ["p"])),
            ],
            Behaviour::Terminate,
        );
        assert_eq!(behaviour.to_string(), "p&{L: p!<x>; stop, R: X(p)}");

        let branch = Behaviour::branch(
            "e",
            Behaviour::select("q", "L", Behaviour::Terminate),
            Behaviour::select("q", "R", Behaviour::Terminate),
            Behaviour::receive("q", Behaviour::Terminate),
        );
        assert_eq!(branch.to_string(), "if e then q+L; stop else q+R; stop; q?; stop");
    }

    #[test]
    fn test_rename_respects_binders() {
        let behaviour = Arc::new(Behaviour::introductee(
            "x",
            "y",
            Behaviour::send("y", "e", Behaviour::send("x", "f", Behaviour::Terminate)),
        ));
        let renamed = Behaviour::renamed(&behaviour, &renaming(&[("x", "a"), ("y", "b")]));
        assert_eq!(
            *renamed,
            Behaviour::introductee(
                "a",
                "y",
                Behaviour::send("y", "e", Behaviour::send("a", "f", Behaviour::Terminate)),
            )
        );
    }

    #[test]
    fn test_rename_spawn_shadowing() {
        let behaviour = Arc::new(Behaviour::spawn(
            "c",
            Behaviour::send("p", "hello", Behaviour::Terminate),
            Behaviour::receive("c", Behaviour::call("X", ["c", "p"])),
        ));
        let renamed = Behaviour::renamed(&behaviour, &renaming(&[("c", "z"), ("p", "q")]));
        assert_eq!(
            *renamed,
            Behaviour::spawn(
                "c",
                Behaviour::send("q", "hello", Behaviour::Terminate),
                Behaviour::receive("c", Behaviour::call("X", ["c", "q"])),
            )
        );
    }

    #[test]
    fn test_sequenced_replaces_terminate_leaves() {
        let block = Arc::new(Behaviour::branch(
            "e",
            Behaviour::send("q", "1", Behaviour::Terminate),
            Behaviour::call("X", Vec::<String>::new()),
            Behaviour::Terminate,
        ));
        let next = Arc::new(Behaviour::receive("q", Behaviour::Terminate));
        let sequenced = Behaviour::sequenced(&block, &next);
        assert_eq!(
            *sequenced,
            Behaviour::branch(
                "e",
                Behaviour::send("q", "1", Behaviour::Terminate),
                Behaviour::call("X", Vec::<String>::new()),
                Behaviour::receive("q", Behaviour::Terminate),
            )
        );

        let terminated = Arc::new(Behaviour::Terminate);
        assert!(Arc::ptr_eq(&Behaviour::sequenced(&block, &terminated), &block));
    }

    #[test]
    fn test_size_and_mentions() {
        let behaviour = Behaviour::send(
            "q",
            "e",
            Behaviour::introduce("r", "s", Behaviour::call("X", ["t"])),
        );
        assert_eq!(behaviour.size(), 3);

        let mut mentioned = BTreeSet::new();
        behaviour.mentioned_processes(&mut mentioned);
        assert_eq!(
            mentioned.into_iter().collect::<Vec<_>>(),
            vec!["q", "r", "s", "t"]
        );
    }
}
