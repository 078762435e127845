//! Networks of communicating processes
//!
//! A [`Network`] is a configuration of the system: every process's current
//! behaviour plus the acquaintance relation. Networks are values; advancing a
//! network produces a new one and leaves the original untouched, so the
//! search can retry another move from the same configuration at no cost.

/// Acquaintance relation
pub mod acquaintance;

/// Single-step advancement
pub mod advance;

/// Behaviour trees
pub mod behaviour;

/// Process terms and procedures
pub mod process;

/// Purging and splitting into independent components
pub mod split;

pub use acquaintance::Acquaintance;
pub use advance::Advancement;
pub use behaviour::{Behaviour, Renaming};
pub use process::{Procedure, ProcessTerm};

use crate::error::NetworkError;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A configuration of named processes
///
/// Two networks are equal, and hash alike, when their processes are equal.
/// The acquaintance relation and the spawn counter are not part of a
/// configuration's identity.
#[derive(Debug, Clone)]
pub struct Network {
    processes: BTreeMap<String, ProcessTerm>,
    acquaintance: Acquaintance,
    spawned: usize,
}

impl Network {
    /// Creates a network in which every process knows every other.
    pub fn new<S: Into<String>>(processes: impl IntoIterator<Item = (S, ProcessTerm)>) -> Self {
        let processes: BTreeMap<String, ProcessTerm> =
            processes.into_iter().map(|(name, term)| (name.into(), term)).collect();
        let acquaintance = Acquaintance::complete(processes.keys().cloned());
        Network {
            processes,
            acquaintance,
            spawned: 0,
        }
    }

    /// Creates a network in which processes know nobody but themselves.
    ///
    /// Use [`Network::introduce`] to set up the initial acquaintances.
    pub fn strangers<S: Into<String>>(processes: impl IntoIterator<Item = (S, ProcessTerm)>) -> Self {
        let processes: BTreeMap<String, ProcessTerm> =
            processes.into_iter().map(|(name, term)| (name.into(), term)).collect();
        let acquaintance = Acquaintance::strangers(processes.keys().cloned());
        Network {
            processes,
            acquaintance,
            spawned: 0,
        }
    }

    /// Make two processes acquainted. Returns `false` if either is unknown.
    pub fn introduce(&mut self, p: &str, q: &str) -> bool {
        self.acquaintance.introduce(p, q)
    }

    /// Every process of the network, by name.
    pub fn processes(&self) -> &BTreeMap<String, ProcessTerm> {
        &self.processes
    }

    /// The term of one process.
    pub fn process(&self, name: &str) -> Option<&ProcessTerm> {
        self.processes.get(name)
    }

    /// Process names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.processes.keys().map(String::as_str)
    }

    /// Processes that still have actions left.
    pub fn live(&self) -> impl Iterator<Item = (&String, &ProcessTerm)> {
        self.processes.iter().filter(|(_, term)| !term.is_terminated())
    }

    /// Who knows whom.
    pub fn acquaintance(&self) -> &Acquaintance {
        &self.acquaintance
    }

    /// Number of processes, terminated ones included.
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    /// Check whether the network has no processes at all.
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Check whether every process has terminated.
    pub fn all_terminated(&self) -> bool {
        self.processes.values().all(ProcessTerm::is_terminated)
    }

    /// The sub-network of the given processes, keeping their acquaintances.
    pub fn restrict(&self, names: &BTreeSet<String>) -> Result<Network, NetworkError> {
        let mut processes = BTreeMap::new();
        for name in names {
            let term = self
                .processes
                .get(name)
                .ok_or_else(|| NetworkError::UnknownProcess(name.clone()))?;
            processes.insert(name.clone(), term.clone());
        }
        Ok(Network {
            processes,
            acquaintance: self.acquaintance.restrict(names.iter().map(String::as_str)),
            spawned: self.spawned,
        })
    }

    pub(crate) fn set_main(&mut self, process: &str, main: Arc<Behaviour>) {
        if let Some(term) = self.processes.get_mut(process) {
            term.main = main;
        }
    }

    pub(crate) fn insert(&mut self, name: String, term: ProcessTerm) {
        self.processes.insert(name, term);
    }

    /// Unfold every process whose main is a procedure call.
    ///
    /// Returns the unfolded network and the names of the processes that were
    /// unfolded, so that non-participants can be folded back afterwards.
    pub fn unfolded(&self) -> Result<(Network, BTreeSet<String>), NetworkError> {
        let mut network = self.clone();
        let mut unfolded = BTreeSet::new();
        for (name, term) in &self.processes {
            if let Behaviour::Call { .. } = term.main() {
                network.processes.insert(name.clone(), term.unfold(name)?);
                unfolded.insert(name.clone());
            }
        }
        Ok((network, unfolded))
    }

    /// Restore the terms of `processes` to the ones they have in `original`.
    pub(crate) fn fold_back<'a>(&mut self, original: &Network, processes: impl IntoIterator<Item = &'a String>) {
        for name in processes {
            if let Some(term) = original.processes.get(name) {
                self.processes.insert(name.clone(), term.clone());
            }
        }
    }
}

impl Network {
    /// A bijection from the live processes of this network onto those of
    /// `other` under which every term becomes the term it is mapped to.
    ///
    /// Terminated processes play no part. The returned renaming leaves out
    /// processes mapped to themselves, so an empty renaming means the live
    /// parts of both networks are equal. Identity pairs are tried first.
    pub fn correspondence(&self, other: &Network) -> Option<Renaming> {
        let from: Vec<(&String, &ProcessTerm, u64)> =
            self.live().map(|(name, term)| (name, term, term.shape())).collect();
        let to: Vec<(&String, &ProcessTerm, u64)> =
            other.live().map(|(name, term)| (name, term, term.shape())).collect();
        if from.len() != to.len() {
            return None;
        }

        let candidates: Vec<Vec<usize>> = from
            .iter()
            .map(|(name, _, shape)| {
                let mut matches: Vec<usize> = (0..to.len()).filter(|&j| to[j].2 == *shape).collect();
                matches.sort_by_key(|&j| to[j].0 != *name);
                matches
            })
            .collect();
        if candidates.iter().any(Vec::is_empty) {
            return None;
        }

        let mut assignment = Vec::with_capacity(from.len());
        let mut used = vec![false; to.len()];
        let search = Correspondence {
            from: &from,
            to: &to,
            candidates: &candidates,
        };
        search.assign(&mut assignment, &mut used)
    }
}

type Entry<'a> = (&'a String, &'a ProcessTerm, u64);

/// Backtracking over shape-compatible pairings of live processes
struct Correspondence<'s, 'a> {
    from: &'s [Entry<'a>],
    to: &'s [Entry<'a>],
    candidates: &'s [Vec<usize>],
}

impl Correspondence<'_, '_> {
    fn assign(&self, assignment: &mut Vec<usize>, used: &mut [bool]) -> Option<Renaming> {
        let next = assignment.len();
        if next == self.from.len() {
            return self.verify(assignment);
        }
        for &j in &self.candidates[next] {
            if used[j] {
                continue;
            }
            used[j] = true;
            assignment.push(j);
            if let Some(renaming) = self.assign(assignment, used) {
                return Some(renaming);
            }
            assignment.pop();
            used[j] = false;
        }
        None
    }

    fn verify(&self, assignment: &[usize]) -> Option<Renaming> {
        let pairs = || self.from.iter().zip(assignment.iter().map(|&j| &self.to[j]));
        let renaming: Renaming = pairs()
            .filter(|(from, to)| from.0 != to.0)
            .map(|(from, to)| (from.0.clone(), to.0.clone()))
            .collect();
        let consistent = pairs().all(|(from, to)| from.1.renamed(&renaming) == *to.1);
        consistent.then_some(renaming)
    }
}

impl PartialEq for Network {
    fn eq(&self, other: &Self) -> bool {
        self.processes == other.processes
    }
}

impl Eq for Network {}

impl Hash for Network {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.processes.hash(state);
    }
}

impl Display for Network {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, (name, term)) in self.processes.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{} {}", name, term)?;
        }
        Ok(())
    }
}
