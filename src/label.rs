//! Transition labels of the exploration graph

use rumpsteak_extraction_choreography::Interaction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display, Formatter};

/// What happened in one step of a network
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabelKind {
    /// A value sent from `sender` to `receiver`
    Communication {
        sender: String,
        receiver: String,
        expression: String,
    },
    /// A branch label chosen by `sender` for `receiver`
    Selection {
        sender: String,
        receiver: String,
        label: String,
    },
    /// The then-side of a local decision
    Then { process: String, condition: String },
    /// The else-side of a local decision
    Else { process: String, condition: String },
    /// Several interactions performed as one step
    Multicom(Vec<Interaction>),
    /// `introducer` makes `left` and `right` acquainted
    Introduction {
        introducer: String,
        left: String,
        right: String,
    },
    /// `parent` starts the new process `child`
    Spawn { parent: String, child: String },
}

impl LabelKind {
    /// Processes that take part in the step.
    pub fn actors(&self) -> BTreeSet<String> {
        let mut actors = BTreeSet::new();
        match self {
            LabelKind::Communication {
                sender, receiver, ..
            }
            | LabelKind::Selection {
                sender, receiver, ..
            } => {
                actors.insert(sender.clone());
                actors.insert(receiver.clone());
            }
            LabelKind::Then { process, .. } | LabelKind::Else { process, .. } => {
                actors.insert(process.clone());
            }
            LabelKind::Multicom(interactions) => {
                for interaction in interactions {
                    actors.extend(interaction.processes().into_iter().map(str::to_owned));
                }
            }
            LabelKind::Introduction {
                introducer,
                left,
                right,
            } => {
                actors.extend([introducer.clone(), left.clone(), right.clone()]);
            }
            LabelKind::Spawn { parent, child } => {
                actors.insert(parent.clone());
                actors.insert(child.clone());
            }
        }
        actors
    }

    /// The label as a single choreography interaction, if it is one.
    pub fn as_interaction(&self) -> Option<Interaction> {
        match self {
            LabelKind::Communication {
                sender,
                receiver,
                expression,
            } => Some(Interaction::communication(sender, receiver, expression)),
            LabelKind::Selection {
                sender,
                receiver,
                label,
            } => Some(Interaction::selection(sender, receiver, label)),
            LabelKind::Introduction {
                introducer,
                left,
                right,
            } => Some(Interaction::introduction(introducer, left, right)),
            _ => None,
        }
    }
}

impl From<Interaction> for LabelKind {
    fn from(interaction: Interaction) -> Self {
        match interaction {
            Interaction::Communication {
                sender,
                receiver,
                expression,
            } => LabelKind::Communication {
                sender,
                receiver,
                expression,
            },
            Interaction::Selection {
                sender,
                receiver,
                label,
            } => LabelKind::Selection {
                sender,
                receiver,
                label,
            },
            Interaction::Introduction {
                introducer,
                left,
                right,
            } => LabelKind::Introduction {
                introducer,
                left,
                right,
            },
        }
    }
}

impl Display for LabelKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(interaction) = self.as_interaction() {
            return write!(f, "{}", interaction);
        }
        match self {
            LabelKind::Then { process, condition } => write!(f, "if {}.{} then", process, condition),
            LabelKind::Else { process, condition } => write!(f, "if {}.{} else", process, condition),
            LabelKind::Multicom(interactions) => {
                write!(f, "(")?;
                for (i, interaction) in interactions.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", interaction)?;
                }
                write!(f, ")")
            }
            LabelKind::Spawn { parent, child } => write!(f, "{} spawns {}", parent, child),
            _ => Ok(()),
        }
    }
}

/// An edge of the exploration graph
///
/// `closes_loop` is set when every process has acted since the last loop
/// closure on the path leading to this edge. An edge into an existing
/// configuration carries the `renaming` under which the configuration was
/// matched: current process names to the names they have at the target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label {
    /// The step taken
    pub kind: LabelKind,
    /// Whether the step completes a round in which every process acted
    pub closes_loop: bool,
    /// Process names at the source mapped to their names at the target
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub renaming: BTreeMap<String, String>,
}

impl Label {
    /// A step that does not close a loop.
    pub fn new(kind: LabelKind) -> Self {
        Label::closing(kind, false)
    }

    /// A step that closes a loop if `closes_loop` is set.
    pub fn closing(kind: LabelKind, closes_loop: bool) -> Self {
        Label {
            kind,
            closes_loop,
            renaming: BTreeMap::new(),
        }
    }

    /// This label with the renaming of the configuration it leads to.
    pub fn with_renaming(mut self, renaming: BTreeMap<String, String>) -> Self {
        self.renaming = renaming;
        self
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.renaming.is_empty() {
            let pairs: Vec<String> = self
                .renaming
                .iter()
                .map(|(from, to)| format!("{} as {}", from, to))
                .collect();
            write!(f, " [{}]", pairs.join(", "))?;
        }
        if self.closes_loop {
            write!(f, " (closes loop)")?;
        }
        Ok(())
    }
}
