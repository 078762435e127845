//! Process ordering strategies
//!
//! A strategy decides in which order the search tries the processes of a
//! configuration. It changes which choreography is found first, never
//! whether one is found.

use crate::graph::{configuration_hash, Marking};
use crate::network::{Behaviour, Network};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// Orders the processes of a configuration, highest priority first
pub trait OrderingStrategy {
    /// Process names of `network` in the order their steps are tried.
    fn order(&self, network: &Network, marking: &Marking) -> Vec<String>;
}

impl<F> OrderingStrategy for F
where
    F: Fn(&Network, &Marking) -> Vec<String>,
{
    fn order(&self, network: &Network, marking: &Marking) -> Vec<String> {
        self(network, marking)
    }
}

/// Built-in ordering strategies
///
/// Processes with equal priority keep their name order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    /// Processes ready to interact come first
    #[default]
    InteractionsFirst,
    /// Processes about to make a local decision come first
    ConditionsFirst,
    /// Processes that have not acted since the last loop closure come first
    UnmarkedFirst,
    /// Unmarked processes first, interactions first within each group
    UnmarkedThenInteractions,
    /// Processes with the largest remaining behaviour come first
    LongestFirst,
    /// Processes with the smallest remaining behaviour come first
    ShortestFirst,
    /// A shuffle determined by the seed and the configuration
    Random { seed: u64 },
}

fn is_interaction(behaviour: &Behaviour) -> bool {
    behaviour.is_input() || behaviour.is_output()
}

impl OrderingStrategy for Strategy {
    fn order(&self, network: &Network, marking: &Marking) -> Vec<String> {
        let mut entries: Vec<(&str, &Behaviour)> = network
            .processes()
            .iter()
            .map(|(name, term)| (name.as_str(), term.main()))
            .collect();
        let marked = |name: &str| marking.get(name).copied().unwrap_or(false);

        match self {
            Strategy::InteractionsFirst => entries.sort_by_key(|(_, main)| !is_interaction(main)),
            Strategy::ConditionsFirst => {
                entries.sort_by_key(|(_, main)| !matches!(main, Behaviour::Branch { .. }))
            }
            Strategy::UnmarkedFirst => entries.sort_by_key(|(name, _)| marked(name)),
            Strategy::UnmarkedThenInteractions => {
                entries.sort_by_key(|(name, main)| (marked(name), !is_interaction(main)))
            }
            Strategy::LongestFirst => entries.sort_by_key(|(_, main)| Reverse(main.size())),
            Strategy::ShortestFirst => entries.sort_by_key(|(_, main)| main.size()),
            Strategy::Random { seed } => {
                let mut rng = StdRng::seed_from_u64(seed ^ configuration_hash(network, marking));
                entries.shuffle(&mut rng);
            }
        }

        entries.into_iter().map(|(name, _)| name.to_string()).collect()
    }
}
