//! Action classification.
//!
//! Every modified node left after exact matching is paired, greedily, with
//! an existing node it can be an update of. Modified nodes that find no
//! partner are creations; existing nodes nobody picked are deletions.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use tracing::Level;

use crate::compare::TreeComparer;
use crate::difference::{CriticalFields, DifferenceReport, RelatedPaths};
use crate::engine::ForestDiff;
use crate::error::{Error, Result};
use crate::log::Logger;
use crate::node::NodeRef;
use crate::path::PathSelector;

/// What should happen to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActionKind {
    /// The modified node is new.
    Create,
    /// The modified node replaces an existing one.
    Update,
    /// The existing node is gone.
    Delete,
}

impl ActionKind {
    /// All kinds, in report order.
    pub const ALL: [ActionKind; 3] = [ActionKind::Create, ActionKind::Update, ActionKind::Delete];

    /// Lower-case name, as used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Create => "create",
            ActionKind::Update => "update",
            ActionKind::Delete => "delete",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a modified node picks its existing partner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MatchStrategy {
    /// The first non-critical candidate in scan order wins.
    #[default]
    FirstFit,
    /// The non-critical candidate with the lowest aggregate degree wins;
    /// ties go to the candidate seen first.
    MinimumDegree,
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStrategy::FirstFit => f.write_str("first-fit"),
            MatchStrategy::MinimumDegree => f.write_str("minimum-degree"),
        }
    }
}

/// Classified nodes, grouped by action.
///
/// Only kinds with at least one node are present. Update entries hold the
/// modified version of the node.
#[derive(Debug, Clone, Default)]
pub struct ActionMap {
    actions: BTreeMap<ActionKind, Vec<NodeRef>>,
}

impl ActionMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a node to the list of `kind`.
    pub fn push(&mut self, kind: ActionKind, node: NodeRef) {
        self.actions.entry(kind).or_default().push(node);
    }

    /// Nodes flagged with `kind`, empty if there are none.
    pub fn get(&self, kind: ActionKind) -> &[NodeRef] {
        self.actions.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns true if some node was flagged with `kind`.
    pub fn contains(&self, kind: ActionKind) -> bool {
        self.actions.contains_key(&kind)
    }

    /// Returns true if no node was flagged at all.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Total number of flagged nodes.
    pub fn node_count(&self) -> usize {
        self.actions.values().map(Vec::len).sum()
    }

    /// Iterates over the non-empty lists in kind order.
    pub fn iter(&self) -> impl Iterator<Item = (ActionKind, &[NodeRef])> {
        self.actions.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// One-line count summary.
    pub fn summary(&self) -> String {
        format!(
            "Action Summary: {} flagged for CREATE, {} flagged for UPDATE, {} flagged for DELETE",
            self.get(ActionKind::Create).len(),
            self.get(ActionKind::Update).len(),
            self.get(ActionKind::Delete).len()
        )
    }
}

impl<C: TreeComparer, S: PathSelector, L: Logger> ForestDiff<C, S, L> {
    /// Assigns an action to every node of both forests.
    ///
    /// Modified nodes are taken from last to first. Each one is compared
    /// with every still unpaired existing node, again from last to first,
    /// and paired according to the configured [`MatchStrategy`]. A pair
    /// whose differences touch a critical field is never eligible.
    pub fn classify_actions(
        &self,
        existing: &[NodeRef],
        modified: &[NodeRef],
        related_paths: &RelatedPaths,
        critical_fields: &CriticalFields,
    ) -> Result<ActionMap> {
        let mut existing_taken = vec![false; existing.len()];
        let mut modified_taken = vec![false; modified.len()];
        let mut actions = ActionMap::new();

        for (mi, m) in modified.iter().enumerate().rev() {
            if modified_taken[mi] {
                continue;
            }
            let partner =
                self.find_partner(m, existing, &existing_taken, related_paths, critical_fields)?;
            match partner {
                Some(ei) => {
                    existing_taken[ei] = true;
                    self.logger().log(
                        Level::DEBUG,
                        &format!("U: modified node {} updates existing node {}", mi, ei),
                    );
                    actions.push(ActionKind::Update, Rc::clone(m));
                }
                None => {
                    self.logger()
                        .log(Level::DEBUG, &format!("C: modified node {} is new", mi));
                    actions.push(ActionKind::Create, Rc::clone(m));
                }
            }
            modified_taken[mi] = true;
        }

        let remaining = modified_taken.iter().filter(|&&t| !t).count();
        if remaining > 0 {
            let error = Error::UnclassifiedNodes { remaining };
            self.logger().log(Level::ERROR, &error.to_string());
            return Err(error);
        }

        for (ei, e) in existing.iter().enumerate() {
            if !existing_taken[ei] {
                self.logger()
                    .log(Level::DEBUG, &format!("R: existing node {} was removed", ei));
                actions.push(ActionKind::Delete, Rc::clone(e));
            }
        }

        self.logger().log(Level::INFO, &actions.summary());
        Ok(actions)
    }

    /// Index of the existing node `m` should update, if any.
    fn find_partner(
        &self,
        m: &NodeRef,
        existing: &[NodeRef],
        existing_taken: &[bool],
        related_paths: &RelatedPaths,
        critical_fields: &CriticalFields,
    ) -> Result<Option<usize>> {
        let mut best: Option<(usize, DifferenceReport)> = None;

        for (ei, e) in existing.iter().enumerate().rev() {
            if existing_taken[ei] {
                continue;
            }
            let report = self.aggregate_difference(e, m, related_paths, critical_fields)?;
            if report.diff_is_in_critical_nodes {
                continue;
            }
            match self.strategy() {
                MatchStrategy::FirstFit => return Ok(Some(ei)),
                MatchStrategy::MinimumDegree => {
                    let better = match &best {
                        Some((_, current)) => report.diff_degree < current.diff_degree,
                        None => true,
                    };
                    if better {
                        best = Some((ei, report));
                    }
                }
            }
        }
        Ok(best.map(|(ei, _)| ei))
    }
}
