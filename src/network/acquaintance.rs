//! Acquaintance tracking between processes

use bitvec::vec::BitVec;
use std::collections::BTreeMap;

/// Symmetric "may interact" relation over processes
///
/// Stored as a lower-triangular bit matrix indexed by a per-process id that is
/// assigned when the process is registered. The relation only ever grows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Acquaintance {
    ids: BTreeMap<String, usize>,
    bits: BitVec,
}

fn slot(a: usize, b: usize) -> usize {
    let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
    hi * (hi + 1) / 2 + lo
}

impl Acquaintance {
    /// An empty relation with no registered processes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every listed process knows every other.
    pub fn complete<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        let mut acquaintance = Self::new();
        for name in names {
            acquaintance.register(name, true);
        }
        acquaintance
    }

    /// Every listed process knows only itself.
    pub fn strangers<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        let mut acquaintance = Self::new();
        for name in names {
            acquaintance.register(name, false);
        }
        acquaintance
    }

    /// Register a process, acquainted either with every known process or
    /// with nobody but itself. Registering a known name is a no-op.
    pub fn register(&mut self, name: impl Into<String>, acquainted: bool) {
        let name = name.into();
        if self.ids.contains_key(&name) {
            return;
        }
        let id = self.ids.len();
        for _ in 0..id {
            self.bits.push(acquainted);
        }
        self.bits.push(true);
        self.ids.insert(name, id);
    }

    /// Check whether `name` is tracked.
    pub fn contains(&self, name: &str) -> bool {
        self.ids.contains_key(name)
    }

    /// Make `p` and `q` acquainted. Returns `false` if either is unknown.
    pub fn introduce(&mut self, p: &str, q: &str) -> bool {
        match (self.ids.get(p), self.ids.get(q)) {
            (Some(&a), Some(&b)) => {
                self.bits.set(slot(a, b), true);
                true
            }
            _ => false,
        }
    }

    /// Check whether `p` and `q` may interact.
    pub fn knows(&self, p: &str, q: &str) -> bool {
        match (self.ids.get(p), self.ids.get(q)) {
            (Some(&a), Some(&b)) => self.bits.get(slot(a, b)).map_or(false, |bit| *bit),
            _ => false,
        }
    }

    /// Register a freshly spawned `child` that knows only itself and `parent`.
    pub fn spawn(&mut self, parent: &str, child: &str) {
        self.register(child, false);
        self.introduce(parent, child);
    }

    /// The relation restricted to the given processes, with fresh ids.
    pub fn restrict<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Self {
        let names: Vec<&str> = names.into_iter().filter(|n| self.contains(n)).collect();
        let mut restricted = Self::strangers(names.iter().copied());
        for (i, p) in names.iter().enumerate() {
            for q in &names[..i] {
                if self.knows(p, q) {
                    restricted.introduce(p, q);
                }
            }
        }
        restricted
    }
}
