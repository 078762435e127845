//! Atomic interactions between processes

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// A single synchronous step between two (or, for introductions, three)
/// processes.
///
/// Interactions appear both as stand-alone choreography statements and as
/// members of a multicom bundle, where several of them happen at once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Interaction {
    /// `sender.expression->receiver`
    Communication {
        /// Process evaluating and sending the expression
        sender: String,
        /// Process receiving the value
        receiver: String,
        /// The transmitted expression, kept opaque
        expression: String,
    },

    /// `sender->receiver[label]`
    Selection {
        /// Process making the choice
        sender: String,
        /// Process offering the branches
        receiver: String,
        /// The selected branch label
        label: String,
    },

    /// `introducer.left<->right`
    Introduction {
        /// Process that knows both `left` and `right`
        introducer: String,
        /// First introduced process
        left: String,
        /// Second introduced process
        right: String,
    },
}

impl Interaction {
    /// Creates a communication interaction.
    pub fn communication(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        Interaction::Communication {
            sender: sender.into(),
            receiver: receiver.into(),
            expression: expression.into(),
        }
    }

    /// Creates a selection interaction.
    pub fn selection(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Interaction::Selection {
            sender: sender.into(),
            receiver: receiver.into(),
            label: label.into(),
        }
    }

    /// Creates an introduction interaction.
    pub fn introduction(
        introducer: impl Into<String>,
        left: impl Into<String>,
        right: impl Into<String>,
    ) -> Self {
        Interaction::Introduction {
            introducer: introducer.into(),
            left: left.into(),
            right: right.into(),
        }
    }

    /// Processes taking part in this interaction.
    pub fn processes(&self) -> Vec<&str> {
        match self {
            Interaction::Communication {
                sender, receiver, ..
            }
            | Interaction::Selection {
                sender, receiver, ..
            } => vec![sender.as_str(), receiver.as_str()],
            Interaction::Introduction {
                introducer,
                left,
                right,
            } => vec![introducer.as_str(), left.as_str(), right.as_str()],
        }
    }

    /// Check whether `process` takes part in this interaction.
    pub fn involves(&self, process: &str) -> bool {
        self.processes().contains(&process)
    }
}

impl Display for Interaction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Interaction::Communication {
                sender,
                receiver,
                expression,
            } => write!(f, "{}.{}->{}", sender, expression, receiver),
            Interaction::Selection {
                sender,
                receiver,
                label,
            } => write!(f, "{}->{}[{}]", sender, receiver, label),
            Interaction::Introduction {
                introducer,
                left,
                right,
            } => write!(f, "{}.{}<->{}", introducer, left, right),
        }
    }
}
