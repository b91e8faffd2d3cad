//! Structural tree comparison.
//!
//! A [`TreeComparer`] decides whether two trees are equal and, when they are
//! not, lists every difference it found. Each [`DifferenceRecord`] carries a
//! slash-separated path naming where the difference is:
//!
//! - `/food/@mfr` for an attribute of the compared `food` element,
//! - `/food/mfr` for the text of its `mfr` child or for a missing/extra `mfr` child,
//! - `/food/#comment` for a comment.
//!
//! The path of a difference is what critical-field detection looks at.

use std::fmt;

use bitflags::bitflags;
use md5::{Digest, Md5};

use crate::constants::{COMMENT_SEGMENT, TEXT_SEGMENT};
use crate::node::{ContentDigest, NodeInner, NodeRef, XmlContent, XmlElement};

bitflags! {
    /// Options controlling what [`DomComparer`] treats as significant.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CompareOptions: u8 {
        /// Compare comment nodes. When unset, comments are skipped entirely.
        const COMPARE_COMMENTS = 1;
        /// Collapse runs of whitespace in text before comparing it.
        const COLLAPSE_SPACES = 1 << 1;
    }
}

impl Default for CompareOptions {
    fn default() -> Self {
        CompareOptions::COLLAPSE_SPACES
    }
}

/// What kind of discrepancy a [`DifferenceRecord`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DifferenceKind {
    /// Nodes of different types, or elements with different names.
    KindMismatch,
    /// A node present on the expected side only.
    Missing,
    /// A node present on the actual side only.
    Extra,
    /// An attribute present on the expected side only.
    AttributeMissing,
    /// An attribute present on the actual side only.
    AttributeExtra,
    /// An attribute whose values differ.
    AttributeValue,
    /// Text content that differs.
    TextValue,
    /// Comment content that differs.
    CommentValue,
}

/// One discrepancy found while comparing two trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DifferenceRecord {
    /// Slash-separated path of the node or field that differs.
    pub path: String,
    /// What differs.
    pub kind: DifferenceKind,
    /// Value on the expected (existing) side, if any.
    pub expected: Option<String>,
    /// Value on the actual (modified) side, if any.
    pub actual: Option<String>,
    /// Path of the actual-side node when it is not the node at `path`.
    ///
    /// Set on [`DifferenceKind::KindMismatch`] records, where two different
    /// nodes sit at the same position.
    pub counterpart: Option<String>,
}

impl DifferenceRecord {
    fn new(
        path: String,
        kind: DifferenceKind,
        expected: Option<String>,
        actual: Option<String>,
    ) -> Self {
        DifferenceRecord {
            path,
            kind,
            expected,
            actual,
            counterpart: None,
        }
    }

    fn with_counterpart(mut self, counterpart: String) -> Self {
        self.counterpart = Some(counterpart);
        self
    }

    /// Returns the last segment of the path, e.g. `@mfr` or `mfr`.
    pub fn last_segment(&self) -> &str {
        last_segment(&self.path)
    }

    /// Returns true if the path, or the counterpart path of a mismatch,
    /// ends with the given element or attribute name.
    pub fn names_field(&self, field: &str) -> bool {
        let names = |path: &str| {
            let last = last_segment(path);
            last == field || last.strip_prefix('@') == Some(field)
        };
        names(self.path.as_str()) || self.counterpart.as_deref().is_some_and(names)
    }
}

impl fmt::Display for DifferenceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let expected = self.expected.as_deref().unwrap_or("");
        let actual = self.actual.as_deref().unwrap_or("");
        match self.kind {
            DifferenceKind::KindMismatch => {
                write!(f, "{}: expected {} instead of {}", self.path, expected, actual)
            }
            DifferenceKind::Missing => write!(f, "{}: {} is missing", self.path, expected),
            DifferenceKind::Extra => write!(f, "{}: extra {}", self.path, actual),
            DifferenceKind::AttributeMissing => {
                write!(f, "{}: attribute is missing", self.path)
            }
            DifferenceKind::AttributeExtra => write!(f, "{}: extra attribute", self.path),
            DifferenceKind::AttributeValue
            | DifferenceKind::TextValue
            | DifferenceKind::CommentValue => write!(
                f,
                "{}: expected value '{}' instead of '{}'",
                self.path, expected, actual
            ),
        }
    }
}

/// Result of comparing two trees.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comparison {
    /// Differences in discovery order (document order of the expected side).
    pub differences: Vec<DifferenceRecord>,
}

impl Comparison {
    /// Returns true when no difference was found.
    pub fn is_equal(&self) -> bool {
        self.differences.is_empty()
    }

    /// Number of differences found.
    pub fn len(&self) -> usize {
        self.differences.len()
    }

    /// Returns true when no difference was found.
    pub fn is_empty(&self) -> bool {
        self.differences.is_empty()
    }
}

/// Capability for structural comparison of two trees.
///
/// Implementations must be deterministic and free of side effects, and
/// should be symmetric in the number of differences they report.
pub trait TreeComparer {
    /// Compares two optional trees. Two absent trees are equal; an absent
    /// tree differs from any present one.
    fn compare(&self, expected: Option<&NodeRef>, actual: Option<&NodeRef>) -> Comparison;

    /// Returns a digest such that equal trees have equal digests, or `None`
    /// when the comparer cannot provide one.
    ///
    /// Callers only use digests to skip comparisons of trees that cannot be
    /// equal; equal digests are always confirmed with [`TreeComparer::compare`].
    fn fingerprint(&self, _node: &NodeRef) -> Option<ContentDigest> {
        None
    }

    /// Number of children of `node` that this comparer looks at.
    fn child_count(&self, node: &NodeRef) -> usize {
        node.borrow().child_count()
    }
}

/// Default [`TreeComparer`]: positional comparison of element names,
/// attributes, text and (optionally) comments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DomComparer {
    options: CompareOptions,
}

impl DomComparer {
    /// Creates a comparer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a comparer with the given options.
    pub fn with_options(options: CompareOptions) -> Self {
        DomComparer { options }
    }

    /// Returns the options in use.
    pub fn options(&self) -> CompareOptions {
        self.options
    }

    fn normalize_text<'a>(&self, text: &'a str) -> std::borrow::Cow<'a, str> {
        if self.options.contains(CompareOptions::COLLAPSE_SPACES) {
            std::borrow::Cow::Owned(text.split_whitespace().collect::<Vec<_>>().join(" "))
        } else {
            std::borrow::Cow::Borrowed(text)
        }
    }

    /// Children that take part in the comparison.
    fn significant_children(&self, node: &NodeInner) -> Vec<NodeRef> {
        let compare_comments = self.options.contains(CompareOptions::COMPARE_COMMENTS);
        node.children()
            .iter()
            .filter(|c| compare_comments || !c.borrow().content().is_some_and(XmlContent::is_comment))
            .cloned()
            .collect()
    }

    fn compare_nodes(
        &self,
        expected: &NodeRef,
        actual: &NodeRef,
        parent_path: &str,
        out: &mut Vec<DifferenceRecord>,
    ) {
        let a = expected.borrow();
        let b = actual.borrow();

        match (a.content(), b.content()) {
            (Some(XmlContent::Element(ea)), Some(XmlContent::Element(eb))) => {
                if ea.qname() != eb.qname() {
                    out.push(
                        DifferenceRecord::new(
                            format!("{}/{}", parent_path, ea.qname()),
                            DifferenceKind::KindMismatch,
                            Some(ea.qname().to_string()),
                            Some(eb.qname().to_string()),
                        )
                        .with_counterpart(format!("{}/{}", parent_path, eb.qname())),
                    );
                    return;
                }
                let path = format!("{}/{}", parent_path, ea.qname());
                self.compare_attributes(ea, eb, &path, out);
                self.compare_children(&a, &b, &path, out);
            }
            (Some(XmlContent::Text(ta)), Some(XmlContent::Text(tb))) => {
                let left = self.normalize_text(ta.text());
                let right = self.normalize_text(tb.text());
                if left != right {
                    let path = if parent_path.is_empty() {
                        format!("/{}", TEXT_SEGMENT)
                    } else {
                        parent_path.to_string()
                    };
                    out.push(DifferenceRecord::new(
                        path,
                        DifferenceKind::TextValue,
                        Some(left.into_owned()),
                        Some(right.into_owned()),
                    ));
                }
            }
            (Some(XmlContent::Comment(ca)), Some(XmlContent::Comment(cb))) => {
                if !ca.content_equals(cb) {
                    out.push(DifferenceRecord::new(
                        format!("{}/{}", parent_path, COMMENT_SEGMENT),
                        DifferenceKind::CommentValue,
                        Some(ca.text().to_string()),
                        Some(cb.text().to_string()),
                    ));
                }
            }
            (None, None) => self.compare_children(&a, &b, parent_path, out),
            _ => out.push(
                DifferenceRecord::new(
                    format!("{}/{}", parent_path, segment(&a)),
                    DifferenceKind::KindMismatch,
                    Some(describe(&a)),
                    Some(describe(&b)),
                )
                .with_counterpart(format!("{}/{}", parent_path, segment(&b))),
            ),
        }
    }

    fn compare_attributes(
        &self,
        a: &XmlElement,
        b: &XmlElement,
        path: &str,
        out: &mut Vec<DifferenceRecord>,
    ) {
        for (name, value) in a.sorted_attributes() {
            let attr_path = format!("{}/@{}", path, name);
            match b.attribute(name) {
                None => out.push(DifferenceRecord::new(
                    attr_path,
                    DifferenceKind::AttributeMissing,
                    Some(value.to_string()),
                    None,
                )),
                Some(other) if other != value => out.push(DifferenceRecord::new(
                    attr_path,
                    DifferenceKind::AttributeValue,
                    Some(value.to_string()),
                    Some(other.to_string()),
                )),
                Some(_) => {}
            }
        }
        for (name, value) in b.sorted_attributes() {
            if a.attribute(name).is_none() {
                out.push(DifferenceRecord::new(
                    format!("{}/@{}", path, name),
                    DifferenceKind::AttributeExtra,
                    None,
                    Some(value.to_string()),
                ));
            }
        }
    }

    fn compare_children(
        &self,
        a: &NodeInner,
        b: &NodeInner,
        path: &str,
        out: &mut Vec<DifferenceRecord>,
    ) {
        let left = self.significant_children(a);
        let right = self.significant_children(b);

        for (l, r) in left.iter().zip(&right) {
            self.compare_nodes(l, r, path, out);
        }
        for l in left.iter().skip(right.len()) {
            let l = l.borrow();
            out.push(DifferenceRecord::new(
                format!("{}/{}", path, segment(&l)),
                DifferenceKind::Missing,
                Some(describe(&l)),
                None,
            ));
        }
        for r in right.iter().skip(left.len()) {
            let r = r.borrow();
            out.push(DifferenceRecord::new(
                format!("{}/{}", path, segment(&r)),
                DifferenceKind::Extra,
                None,
                Some(describe(&r)),
            ));
        }
    }

    fn hash_node(&self, node: &NodeRef, hasher: &mut Md5) {
        let n = node.borrow();
        match n.content() {
            Some(XmlContent::Text(t)) => {
                hasher.update([2]);
                let text = self.normalize_text(t.text());
                hasher.update((text.len() as u64).to_le_bytes());
                hasher.update(text.as_bytes());
                return;
            }
            Some(XmlContent::Comment(c)) => {
                hasher.update([3]);
                hasher.update(c.digest());
                return;
            }
            Some(XmlContent::Element(e)) => {
                hasher.update([1]);
                hasher.update(e.digest());
            }
            None => hasher.update([0]),
        }
        let children = self.significant_children(&n);
        hasher.update((children.len() as u64).to_le_bytes());
        for child in &children {
            self.hash_node(child, hasher);
        }
    }
}

impl TreeComparer for DomComparer {
    fn compare(&self, expected: Option<&NodeRef>, actual: Option<&NodeRef>) -> Comparison {
        let mut differences = Vec::new();
        match (expected, actual) {
            (None, None) => {}
            (Some(a), None) => {
                let a = a.borrow();
                differences.push(DifferenceRecord::new(
                    format!("/{}", segment(&a)),
                    DifferenceKind::Missing,
                    Some(describe(&a)),
                    None,
                ));
            }
            (None, Some(b)) => {
                let b = b.borrow();
                differences.push(DifferenceRecord::new(
                    format!("/{}", segment(&b)),
                    DifferenceKind::Extra,
                    None,
                    Some(describe(&b)),
                ));
            }
            (Some(a), Some(b)) => self.compare_nodes(a, b, "", &mut differences),
        }
        Comparison { differences }
    }

    fn child_count(&self, node: &NodeRef) -> usize {
        self.significant_children(&node.borrow()).len()
    }

    fn fingerprint(&self, node: &NodeRef) -> Option<ContentDigest> {
        let mut hasher = Md5::new();
        self.hash_node(node, &mut hasher);
        Some(hasher.finalize().into())
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Path segment naming a node.
fn segment(node: &NodeInner) -> String {
    match node.content() {
        Some(XmlContent::Element(e)) => e.qname().to_string(),
        Some(XmlContent::Text(_)) => TEXT_SEGMENT.to_string(),
        Some(XmlContent::Comment(_)) => COMMENT_SEGMENT.to_string(),
        None => String::new(),
    }
}

/// Short human-readable description of a node for difference messages.
fn describe(node: &NodeInner) -> String {
    match node.content() {
        Some(XmlContent::Element(e)) => format!("element <{}>", e.qname()),
        Some(XmlContent::Text(t)) => format!("text '{}'", t.text()),
        Some(XmlContent::Comment(c)) => format!("comment '{}'", c.text()),
        None => "empty node".to_string(),
    }
}
