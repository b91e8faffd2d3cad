//! Removal of identical node pairs.
//!
//! Before any scoring, nodes that are fully equal across both forests are
//! paired off and dropped: primary trees must be structurally equal and so
//! must every related node. Only the nodes left over go on to classification.

use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::Level;

use crate::compare::TreeComparer;
use crate::difference::{resolve_related, RelatedPaths};
use crate::engine::ForestDiff;
use crate::error::Result;
use crate::log::Logger;
use crate::node::{ContentDigest, Forest, NodeRef};
use crate::path::PathSelector;

/// Forests left after identical pairs were removed.
#[derive(Debug, Clone, Default)]
pub struct ExactMatchOutcome {
    /// Existing nodes without an identical modified node, in forest order.
    pub unique_existing: Forest,
    /// Modified nodes without an identical existing node, in forest order.
    pub unique_modified: Forest,
    /// Number of identical pairs removed.
    pub eliminated: usize,
}

impl ExactMatchOutcome {
    /// Number of nodes, on both sides, that still need a decision.
    pub fn difference_count(&self) -> usize {
        self.unique_existing.len() + self.unique_modified.len()
    }

    /// Returns true when both forests were fully paired off.
    pub fn is_exhausted(&self) -> bool {
        self.difference_count() == 0
    }
}

/// Lazily computed comparer fingerprints, keyed by node id.
struct FingerprintMemo<'a, C> {
    comparer: &'a C,
    digests: FxHashMap<u64, Option<ContentDigest>>,
}

impl<'a, C: TreeComparer> FingerprintMemo<'a, C> {
    fn new(comparer: &'a C) -> Self {
        FingerprintMemo {
            comparer,
            digests: FxHashMap::default(),
        }
    }

    fn get(&mut self, node: &NodeRef) -> Option<ContentDigest> {
        let id = node.borrow().id();
        let comparer = self.comparer;
        *self
            .digests
            .entry(id)
            .or_insert_with(|| comparer.fingerprint(node))
    }

    /// False only when both fingerprints exist and differ.
    fn may_be_equal(&mut self, a: &NodeRef, b: &NodeRef) -> bool {
        match (self.get(a), self.get(b)) {
            (Some(x), Some(y)) => x == y,
            _ => true,
        }
    }
}

impl<C: TreeComparer, S: PathSelector, L: Logger> ForestDiff<C, S, L> {
    /// Pairs off fully identical nodes between the two forests.
    ///
    /// Modified nodes are scanned from last to first; each one is paired
    /// with the first identical, still unpaired existing node, also scanning
    /// from last to first. A pair is identical when the primary trees are
    /// equal and, for every related path, the related nodes resolved from
    /// each side are equal (absent on both sides counts as equal).
    pub fn exact_match_filter(
        &self,
        existing: &[NodeRef],
        modified: &[NodeRef],
        related_paths: &RelatedPaths,
    ) -> Result<ExactMatchOutcome> {
        let mut existing_taken = vec![false; existing.len()];
        let mut modified_taken = vec![false; modified.len()];
        let mut memo = FingerprintMemo::new(self.comparer());
        let mut eliminated = 0;

        for (mi, m) in modified.iter().enumerate().rev() {
            for (ei, e) in existing.iter().enumerate().rev() {
                if existing_taken[ei] || !memo.may_be_equal(e, m) {
                    continue;
                }
                if self.fully_equal(e, m, related_paths)? {
                    existing_taken[ei] = true;
                    modified_taken[mi] = true;
                    eliminated += 1;
                    self.logger().log(
                        Level::TRACE,
                        &format!("modified node {} is identical to existing node {}", mi, ei),
                    );
                    break;
                }
            }
        }

        let outcome = ExactMatchOutcome {
            unique_existing: untaken(existing, &existing_taken),
            unique_modified: untaken(modified, &modified_taken),
            eliminated,
        };
        self.logger().log(
            Level::DEBUG,
            &format!(
                "exact match removed {} pair(s): {} existing and {} modified node(s) remain",
                outcome.eliminated,
                outcome.unique_existing.len(),
                outcome.unique_modified.len()
            ),
        );
        Ok(outcome)
    }

    fn fully_equal(&self, e: &NodeRef, m: &NodeRef, related_paths: &RelatedPaths) -> Result<bool> {
        if !self.comparer().compare(Some(e), Some(m)).is_equal() {
            return Ok(false);
        }
        for path in related_paths.iter() {
            let related_e = resolve_related(self.selector(), path, e)?;
            let related_m = resolve_related(self.selector(), path, m)?;
            if !self
                .comparer()
                .compare(related_e.as_ref(), related_m.as_ref())
                .is_equal()
            {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn untaken(forest: &[NodeRef], taken: &[bool]) -> Forest {
    forest
        .iter()
        .zip(taken)
        .filter(|(_, &t)| !t)
        .map(|(n, _)| Rc::clone(n))
        .collect()
}
