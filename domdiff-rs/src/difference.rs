//! Difference degree between candidate nodes.
//!
//! The degree of a pair is the share of their children touched by a
//! difference: `diff_count * 2 / (children(exist) + children(modified))`,
//! capped at [`MAX_DEGREE`]. A pair whose differences name a critical field
//! is flagged and can never be treated as the same entity.
//!
//! The aggregate degree extends a primary pair with related nodes found
//! elsewhere in each document. Related degrees are folded in with a running
//! average, one path at a time, so later paths weigh more than earlier ones.

use std::fmt;

use tracing::Level;

use crate::compare::{Comparison, DifferenceRecord, TreeComparer};
use crate::constants::{MAX_DEGREE, ZERO_CHILDREN_DIFFERENT, ZERO_CHILDREN_EQUAL};
use crate::engine::ForestDiff;
use crate::error::{Error, Result};
use crate::log::Logger;
use crate::node::NodeRef;
use crate::path::PathSelector;

/// How different two nodes (and optionally their related nodes) are.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifferenceReport {
    /// Number of differences found.
    pub diff_count: usize,
    /// Relative amount of difference, in `[0, 1]`.
    pub diff_degree: f64,
    /// True if any difference touched a critical field.
    pub diff_is_in_critical_nodes: bool,
}

impl DifferenceReport {
    /// Report for two identical (or two absent) trees.
    pub fn identical() -> Self {
        DifferenceReport {
            diff_count: 0,
            diff_degree: ZERO_CHILDREN_EQUAL,
            diff_is_in_critical_nodes: false,
        }
    }

    /// Builds a report from a comparison of trees with `child_total` children
    /// between them.
    pub fn from_comparison(
        comparison: &Comparison,
        child_total: usize,
        critical_fields: &CriticalFields,
    ) -> Self {
        let diff_count = comparison.len();
        DifferenceReport {
            diff_count,
            diff_degree: degree(diff_count, child_total),
            diff_is_in_critical_nodes: critical_fields.any_critical(&comparison.differences),
        }
    }

    /// Folds the report of one related node into this aggregate.
    ///
    /// Counts add up, critical flags are OR-ed, and the degree becomes the
    /// mean of the aggregate so far and the related degree.
    pub fn absorb(&mut self, related: &DifferenceReport) {
        self.diff_count += related.diff_count;
        self.diff_degree = (self.diff_degree + related.diff_degree) / 2.0;
        self.diff_is_in_critical_nodes |= related.diff_is_in_critical_nodes;
    }

    /// Returns true if no difference was found.
    pub fn is_identical(&self) -> bool {
        self.diff_count == 0
    }
}

impl Default for DifferenceReport {
    fn default() -> Self {
        Self::identical()
    }
}

impl fmt::Display for DifferenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "degree {:.3} ({} difference(s){})",
            self.diff_degree,
            self.diff_count,
            if self.diff_is_in_critical_nodes {
                ", critical"
            } else {
                ""
            }
        )
    }
}

/// Degree for `diff_count` differences spread over `child_total` children.
///
/// Childless pairs get [`ZERO_CHILDREN_EQUAL`] when nothing differs and
/// [`ZERO_CHILDREN_DIFFERENT`] otherwise.
pub fn degree(diff_count: usize, child_total: usize) -> f64 {
    if child_total == 0 {
        return if diff_count == 0 {
            ZERO_CHILDREN_EQUAL
        } else {
            ZERO_CHILDREN_DIFFERENT
        };
    }
    let raw = (diff_count as f64 * 2.0) / child_total as f64;
    raw.min(MAX_DEGREE)
}

/// Ordered, de-duplicated set of field names whose change means "different entity".
///
/// A field is an element or attribute name. A difference is critical when
/// the last segment of its path is the field (`/food/mfr`) or the field as
/// an attribute (`/food/@mfr`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CriticalFields {
    fields: Vec<String>,
}

impl CriticalFields {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, keeping the first occurrence of duplicates.
    pub fn insert(&mut self, field: impl Into<String>) {
        let field = field.into();
        if !field.is_empty() && !self.fields.contains(&field) {
            self.fields.push(field);
        }
    }

    /// Returns true if the difference names one of the fields.
    pub fn is_critical(&self, record: &DifferenceRecord) -> bool {
        self.fields.iter().any(|f| record.names_field(f))
    }

    /// Returns true if any of the differences is critical.
    pub fn any_critical(&self, records: &[DifferenceRecord]) -> bool {
        records.iter().any(|r| self.is_critical(r))
    }

    /// Iterates over the fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for CriticalFields {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = CriticalFields::new();
        for field in iter {
            set.insert(field);
        }
        set
    }
}

/// Ordered relative paths leading from a primary node to its related nodes.
///
/// Order matters: it decides the weighting of the running average.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelatedPaths {
    paths: Vec<String>,
}

impl RelatedPaths {
    /// Creates an empty path list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a path.
    pub fn push(&mut self, path: impl Into<String>) {
        self.paths.push(path.into());
    }

    /// Iterates over the paths in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for RelatedPaths {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        RelatedPaths {
            paths: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Resolves a related path from `node`, requiring at most one match.
pub fn resolve_related<S: PathSelector + ?Sized>(
    selector: &S,
    path: &str,
    node: &NodeRef,
) -> Result<Option<NodeRef>> {
    let mut selected = selector.select_all(path, node)?;
    if selected.len() > 1 {
        return Err(Error::AmbiguousRelatedNode {
            path: path.to_string(),
            count: selected.len(),
        });
    }
    Ok(selected.pop())
}

fn label(node: Option<&NodeRef>) -> String {
    match node {
        Some(n) => match n.borrow().name() {
            Some(name) => format!("<{}>", name),
            None => "node".to_string(),
        },
        None => "nothing".to_string(),
    }
}

impl<C: TreeComparer, S: PathSelector, L: Logger> ForestDiff<C, S, L> {
    /// Measures how different two candidate nodes are.
    ///
    /// Either side may be absent, in which case the present node is compared
    /// against nothing.
    pub fn difference_degree(
        &self,
        exist: Option<&NodeRef>,
        modified: Option<&NodeRef>,
        critical_fields: &CriticalFields,
    ) -> DifferenceReport {
        let comparison = self.comparer().compare(exist, modified);
        let child_count =
            |node: Option<&NodeRef>| node.map_or(0, |n| self.comparer().child_count(n));
        let child_total = child_count(exist) + child_count(modified);
        let report = DifferenceReport::from_comparison(&comparison, child_total, critical_fields);

        if self.logger().enabled(Level::DEBUG) {
            self.logger().log(
                Level::DEBUG,
                &format!(
                    "{} between existing {} and modified {}",
                    report,
                    label(exist),
                    label(modified)
                ),
            );
        }
        report
    }

    /// Measures two primary nodes together with their related nodes.
    ///
    /// Each related path is resolved from both primary nodes. Related nodes
    /// absent on both sides count as identical and still take part in the
    /// running average.
    pub fn aggregate_difference(
        &self,
        exist: &NodeRef,
        modified: &NodeRef,
        related_paths: &RelatedPaths,
        critical_fields: &CriticalFields,
    ) -> Result<DifferenceReport> {
        let mut aggregate = self.difference_degree(Some(exist), Some(modified), critical_fields);

        for path in related_paths.iter() {
            let related_exist = resolve_related(self.selector(), path, exist)?;
            let related_modified = resolve_related(self.selector(), path, modified)?;
            let related = match (&related_exist, &related_modified) {
                (None, None) => DifferenceReport::identical(),
                _ => self.difference_degree(
                    related_exist.as_ref(),
                    related_modified.as_ref(),
                    critical_fields,
                ),
            };
            aggregate.absorb(&related);
        }
        Ok(aggregate)
    }
}
