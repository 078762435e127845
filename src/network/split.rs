//! Purging and splitting into independent components

use super::Network;
use crate::error::NetworkError;
use std::collections::{BTreeMap, BTreeSet};

impl Network {
    /// Drop processes that terminate before doing anything.
    ///
    /// If every process would be dropped, the first one by name is kept so
    /// that the network is not empty.
    pub fn purged(&self) -> Network {
        let keep: BTreeSet<String> = self
            .processes
            .iter()
            .filter(|(_, term)| !term.is_terminated())
            .map(|(name, _)| name.clone())
            .collect();
        let keep = if keep.is_empty() {
            self.processes.keys().take(1).cloned().collect()
        } else {
            keep
        };
        match self.restrict(&keep) {
            Ok(network) => network,
            Err(_) => self.clone(),
        }
    }

    /// Partition the processes into components that never refer to each
    /// other, ordered by their smallest process name.
    pub fn components(&self) -> Vec<BTreeSet<String>> {
        let mut parents: BTreeMap<&str, &str> = self.names().map(|name| (name, name)).collect();

        fn root<'a>(parents: &BTreeMap<&'a str, &'a str>, mut name: &'a str) -> &'a str {
            while let Some(&parent) = parents.get(name) {
                if parent == name {
                    break;
                }
                name = parent;
            }
            name
        }

        for (name, term) in &self.processes {
            for mentioned in term.mentioned_processes() {
                let Some((&other, _)) = parents.get_key_value(mentioned.as_str()) else {
                    continue;
                };
                let (a, b) = (root(&parents, name), root(&parents, other));
                if a != b {
                    let (low, high) = if a < b { (a, b) } else { (b, a) };
                    parents.insert(high, low);
                }
            }
        }

        let mut components: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
        for name in self.names() {
            components
                .entry(root(&parents, name))
                .or_default()
                .insert(name.to_string());
        }
        components.into_values().collect()
    }

    /// The independent sub-networks of this network.
    pub fn split(&self) -> Result<Vec<Network>, NetworkError> {
        self.components()
            .iter()
            .map(|component| self.restrict(component))
            .collect()
    }
}
