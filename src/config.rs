//! Extraction configuration

use crate::strategy::Strategy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// Options controlling a single extraction
///
/// # Example
///
/// ```rust
/// use rumpsteak_extraction::{ExtractionConfig, Strategy};
/// use std::time::Duration;
///
/// let config = ExtractionConfig::default()
///     .with_strategy(Strategy::ConditionsFirst)
///     .with_service("logger")
///     .with_deadline(Duration::from_secs(5));
/// assert!(config.services.contains("logger"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Order in which processes are tried
    pub strategy: Strategy,
    /// Processes that never hold back a loop closure
    pub services: BTreeSet<String>,
    /// Try bundles of interactions when no single one applies
    pub multicom: bool,
    /// Drop processes that terminate immediately
    pub purge: bool,
    /// Extract independent components separately
    pub split: bool,
    /// Wall-clock budget per component
    pub deadline: Option<Duration>,
    /// Maximum number of configurations explored per component
    pub max_nodes: Option<usize>,
    /// Stack size in bytes of the thread that explores a component; the
    /// search recurses once per step of the protocol
    pub stack_size: usize,
}

/// Default stack of the exploration thread: 64 MiB
pub const DEFAULT_STACK_SIZE: usize = 64 * 1024 * 1024;

impl Default for ExtractionConfig {
    fn default() -> Self {
        ExtractionConfig {
            strategy: Strategy::default(),
            services: BTreeSet::new(),
            multicom: true,
            purge: true,
            split: true,
            deadline: None,
            max_nodes: None,
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl ExtractionConfig {
    /// Use `strategy` to order processes.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Add one service.
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.services.insert(service.into());
        self
    }

    /// Add several services.
    pub fn with_services<S: Into<String>>(mut self, services: impl IntoIterator<Item = S>) -> Self {
        self.services.extend(services.into_iter().map(Into::into));
        self
    }

    /// Enable or disable multicom steps.
    pub fn with_multicom(mut self, multicom: bool) -> Self {
        self.multicom = multicom;
        self
    }

    /// Enable or disable purging before extraction.
    pub fn with_purge(mut self, purge: bool) -> Self {
        self.purge = purge;
        self
    }

    /// Enable or disable splitting into components.
    pub fn with_split(mut self, split: bool) -> Self {
        self.split = split;
        self
    }

    /// Abort a component after `deadline`.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Abort a component once it has `max_nodes` configurations.
    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = Some(max_nodes);
        self
    }

    /// Explore on a thread with a stack of `stack_size` bytes.
    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = stack_size;
        self
    }
}
