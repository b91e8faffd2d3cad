//! Whole-document comparison.
//!
//! A document usually holds several kinds of entities. Each kind is described
//! by a [`ForestSpec`]: where to find its nodes, which related nodes belong
//! to each of them and which fields identify them. The forests are compared
//! independently and their action maps collected by name.

use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::Level;

use crate::classify::{ActionKind, ActionMap};
use crate::compare::TreeComparer;
use crate::difference::{CriticalFields, RelatedPaths};
use crate::engine::ForestDiff;
use crate::error::Result;
use crate::log::Logger;
use crate::node::NodeRef;
use crate::path::PathSelector;

/// Describes one forest of comparable nodes inside a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForestSpec {
    /// Name used for the forest in results and reports.
    pub name: String,
    /// Path selecting the forest, evaluated from the document root.
    pub select: String,
    /// Paths from each selected node to its related nodes.
    pub related_paths: RelatedPaths,
    /// Fields that identify a node.
    pub critical_fields: CriticalFields,
}

impl ForestSpec {
    pub fn new(name: impl Into<String>, select: impl Into<String>) -> Self {
        ForestSpec {
            name: name.into(),
            select: select.into(),
            related_paths: RelatedPaths::new(),
            critical_fields: CriticalFields::new(),
        }
    }

    /// Adds a related path.
    pub fn with_related(mut self, path: impl Into<String>) -> Self {
        self.related_paths.push(path);
        self
    }

    /// Adds a critical field.
    pub fn with_critical(mut self, field: impl Into<String>) -> Self {
        self.critical_fields.insert(field);
        self
    }
}

/// Action maps of every forest that changed, keyed by forest name.
#[derive(Debug, Clone, Default)]
pub struct DocumentActions {
    forests: BTreeMap<String, ActionMap>,
}

impl DocumentActions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the actions of a forest. Empty maps are not kept.
    pub fn insert(&mut self, name: impl Into<String>, actions: ActionMap) {
        if actions.is_empty() {
            return;
        }
        let entry = self.forests.entry(name.into()).or_default();
        for (kind, nodes) in actions.iter() {
            for node in nodes {
                entry.push(kind, Rc::clone(node));
            }
        }
    }

    /// Actions of one forest.
    pub fn get(&self, name: &str) -> Option<&ActionMap> {
        self.forests.get(name)
    }

    /// Iterates over forests in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ActionMap)> {
        self.forests.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns true if no forest changed.
    pub fn is_empty(&self) -> bool {
        self.forests.is_empty()
    }

    /// Number of forests that changed.
    pub fn len(&self) -> usize {
        self.forests.len()
    }

    /// Number of nodes flagged with `kind` across all forests.
    pub fn count(&self, kind: ActionKind) -> usize {
        self.forests.values().map(|a| a.get(kind).len()).sum()
    }
}

impl<C: TreeComparer, S: PathSelector, L: Logger> ForestDiff<C, S, L> {
    /// Compares every described forest of two documents.
    ///
    /// Without an existing document every selected modified node is a
    /// creation, in document order.
    pub fn diff_documents(
        &self,
        existing: Option<&NodeRef>,
        modified: &NodeRef,
        forests: &[ForestSpec],
    ) -> Result<DocumentActions> {
        let mut result = DocumentActions::new();

        for spec in forests {
            let modified_forest = self.selector().select_all(&spec.select, modified)?;
            let actions = match existing {
                Some(root) => {
                    let existing_forest = self.selector().select_all(&spec.select, root)?;
                    self.logger().log(
                        Level::DEBUG,
                        &format!(
                            "forest `{}`: {} existing and {} modified node(s) selected by {}",
                            spec.name,
                            existing_forest.len(),
                            modified_forest.len(),
                            spec.select
                        ),
                    );
                    self.diff_forests(
                        &existing_forest,
                        &modified_forest,
                        &spec.related_paths,
                        &spec.critical_fields,
                    )?
                }
                None => {
                    self.logger().log(
                        Level::DEBUG,
                        &format!(
                            "forest `{}`: no existing document, {} node(s) to create",
                            spec.name,
                            modified_forest.len()
                        ),
                    );
                    let mut actions = ActionMap::new();
                    for node in modified_forest {
                        actions.push(ActionKind::Create, node);
                    }
                    actions
                }
            };
            result.insert(spec.name.clone(), actions);
        }
        Ok(result)
    }
}

/// Compares two documents with the default engine.
pub fn diff_documents(
    existing: Option<&NodeRef>,
    modified: &NodeRef,
    forests: &[ForestSpec],
) -> Result<DocumentActions> {
    ForestDiff::new().diff_documents(existing, modified, forests)
}
