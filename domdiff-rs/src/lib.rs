//! XML DomDiff - action classification between two XML forests
//!
//! This library decides, for two versions of an XML document, which entities
//! were created, updated or deleted. An entity is a node selected from the
//! document (a "forest" of comparable nodes, such as every `food` element of
//! a nutrition list), optionally together with related nodes found elsewhere
//! in the document.
//!
//! # Overview
//!
//! Classification runs in two stages:
//!
//! 1. **Exact matching** removes every pair of fully identical nodes.
//! 2. **Classification** pairs each remaining modified node greedily with an
//!    existing node. Pairs whose differences touch a critical field (an
//!    identifying element or attribute) are never paired: the old node is
//!    deleted and the new one created instead.
//!
//! The pairing is deterministic but order dependent; it does not search for
//! the pairing with the smallest total difference.
//!
//! # Example
//!
//! ```
//! use xml_domdiff::{diff_documents, parse_str, ActionKind, ForestSpec};
//!
//! let existing = parse_str("<list><food><name>A</name><mfr>X</mfr></food></list>").unwrap();
//! let modified = parse_str("<list><food><name>A</name><mfr>Y</mfr></food></list>").unwrap();
//! let forests = [ForestSpec::new("food", "/list/food").with_critical("mfr")];
//!
//! let actions = diff_documents(Some(&existing), &modified, &forests).unwrap();
//! let food = actions.get("food").unwrap();
//! assert_eq!(food.get(ActionKind::Create).len(), 1);
//! assert_eq!(food.get(ActionKind::Delete).len(), 1);
//! ```

pub mod classify;
pub mod compare;
pub mod constants;
pub mod difference;
pub mod document;
pub mod engine;
pub mod error;
pub mod exact_match;
pub mod log;
pub mod node;
pub mod path;
pub mod report;
pub mod xml;

// Re-export commonly used types
pub use classify::{ActionKind, ActionMap, MatchStrategy};
pub use compare::{
    CompareOptions, Comparison, DifferenceKind, DifferenceRecord, DomComparer, TreeComparer,
};
pub use constants::*;
pub use difference::{CriticalFields, DifferenceReport, RelatedPaths};
pub use document::{diff_documents, DocumentActions, ForestSpec};
pub use engine::{DiffConfig, ForestDiff};
pub use error::{Error, Result};
pub use exact_match::ExactMatchOutcome;
pub use log::{Logger, NullLogger, TracingLogger};
pub use node::{Forest, NodeInner, NodeRef, WeakNodeRef, XmlContent, XmlElement, XmlText};
pub use path::{NodePath, PathSelector, XPathSelector};
pub use report::{render_actions, write_actions};
pub use xml::{parse_file, parse_str, XmlParser, XmlPrinter};
