//! The forest comparison engine and its configuration.

use tracing::Level;

use crate::classify::{ActionMap, MatchStrategy};
use crate::compare::{CompareOptions, DomComparer, TreeComparer};
use crate::difference::{CriticalFields, RelatedPaths};
use crate::error::Result;
use crate::log::{Logger, TracingLogger};
use crate::node::NodeRef;
use crate::path::{PathSelector, XPathSelector};

/// Settings for a [`ForestDiff`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffConfig {
    /// How modified nodes are paired with existing ones.
    pub strategy: MatchStrategy,
    /// What the default comparer treats as significant.
    pub compare: CompareOptions,
}

impl DiffConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the match strategy.
    pub fn with_strategy(mut self, strategy: MatchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the comparison options.
    pub fn with_compare_options(mut self, compare: CompareOptions) -> Self {
        self.compare = compare;
        self
    }

    /// Enables or disables comparison of comment nodes.
    pub fn with_comments(mut self, enabled: bool) -> Self {
        self.compare.set(CompareOptions::COMPARE_COMMENTS, enabled);
        self
    }
}

/// Classifies changes between an existing and a modified forest.
///
/// The engine owns its collaborators: a [`TreeComparer`] for structural
/// equality, a [`PathSelector`] for related nodes and a [`Logger`] for
/// diagnostics. It keeps no state between calls.
#[derive(Debug)]
pub struct ForestDiff<C = DomComparer, S = XPathSelector, L = TracingLogger> {
    comparer: C,
    selector: S,
    logger: L,
    strategy: MatchStrategy,
}

impl ForestDiff {
    /// Creates an engine with the default collaborators and configuration.
    pub fn new() -> Self {
        Self::with_config(DiffConfig::default())
    }

    /// Creates an engine with the default collaborators.
    pub fn with_config(config: DiffConfig) -> Self {
        ForestDiff {
            comparer: DomComparer::with_options(config.compare),
            selector: XPathSelector::new(),
            logger: TracingLogger,
            strategy: config.strategy,
        }
    }
}

impl Default for ForestDiff {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: TreeComparer, S: PathSelector, L: Logger> ForestDiff<C, S, L> {
    /// Creates an engine from explicit collaborators, using first-fit matching.
    pub fn with_parts(comparer: C, selector: S, logger: L) -> Self {
        ForestDiff {
            comparer,
            selector,
            logger,
            strategy: MatchStrategy::default(),
        }
    }

    /// Replaces the match strategy.
    pub fn with_strategy(mut self, strategy: MatchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Replaces the logger.
    pub fn with_logger<L2: Logger>(self, logger: L2) -> ForestDiff<C, S, L2> {
        ForestDiff {
            comparer: self.comparer,
            selector: self.selector,
            logger,
            strategy: self.strategy,
        }
    }

    pub fn comparer(&self) -> &C {
        &self.comparer
    }

    pub fn selector(&self) -> &S {
        &self.selector
    }

    pub fn logger(&self) -> &L {
        &self.logger
    }

    pub fn strategy(&self) -> MatchStrategy {
        self.strategy
    }

    /// Removes identical pairs, then classifies what is left.
    pub fn diff_forests(
        &self,
        existing: &[NodeRef],
        modified: &[NodeRef],
        related_paths: &RelatedPaths,
        critical_fields: &CriticalFields,
    ) -> Result<ActionMap> {
        let outcome = self.exact_match_filter(existing, modified, related_paths)?;
        self.logger.log(
            Level::DEBUG,
            &format!(
                "{} identical pair(s) removed, {} difference(s) left to classify",
                outcome.eliminated,
                outcome.difference_count()
            ),
        );
        self.classify_actions(
            &outcome.unique_existing,
            &outcome.unique_modified,
            related_paths,
            critical_fields,
        )
    }
}
