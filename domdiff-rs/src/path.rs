//! Path expressions for selecting nodes.
//!
//! Forests and related nodes are located with a small XPath subset:
//!
//! - absolute (`/nutrition/food`) and relative (`../prices/price`) location paths
//! - `.`, `..`, `*`, `//` (descendant-or-self), `text()`, `comment()`, `node()`
//! - predicates `[2]`, `[last()]`, `[@attr]`, `[@attr='v']` and `[child='v']`
//!
//! Absolute paths start at the topmost ancestor of the context node, which for
//! parsed documents is the synthetic `$ROOT$` element.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::node::{NodeInner, NodeRef, XmlContent};

/// Capability for resolving path expressions relative to a context node.
pub trait PathSelector {
    /// Returns every node selected by `path`, in selection order.
    fn select_all(&self, path: &str, context: &NodeRef) -> Result<Vec<NodeRef>>;

    /// Returns the first node selected by `path`, if any.
    fn select_one(&self, path: &str, context: &NodeRef) -> Result<Option<NodeRef>> {
        Ok(self.select_all(path, context)?.into_iter().next())
    }
}

/// Default [`PathSelector`] evaluating [`NodePath`] expressions.
///
/// Parsed expressions are cached, since the same related paths are evaluated
/// once per candidate pair.
#[derive(Debug, Default)]
pub struct XPathSelector {
    cache: RefCell<FxHashMap<String, Rc<NodePath>>>,
}

impl XPathSelector {
    /// Creates a selector with an empty expression cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn compiled(&self, path: &str) -> Result<Rc<NodePath>> {
        if let Some(compiled) = self.cache.borrow().get(path) {
            return Ok(Rc::clone(compiled));
        }
        let compiled = Rc::new(NodePath::parse(path)?);
        self.cache
            .borrow_mut()
            .insert(path.to_string(), Rc::clone(&compiled));
        Ok(compiled)
    }
}

impl PathSelector for XPathSelector {
    fn select_all(&self, path: &str, context: &NodeRef) -> Result<Vec<NodeRef>> {
        self.compiled(path)?.select(context)
    }
}

/// How a step moves away from its context node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Parent,
    SelfNode,
    DescendantOrSelf,
}

/// Which nodes a step keeps.
#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeTest {
    Name(String),
    AnyElement,
    Text,
    Comment,
    AnyNode,
}

impl NodeTest {
    fn matches(&self, node: &NodeInner) -> bool {
        match (self, node.content()) {
            (NodeTest::AnyNode, _) => true,
            (NodeTest::Name(name), Some(XmlContent::Element(e))) => e.qname() == name,
            (NodeTest::AnyElement, Some(XmlContent::Element(_))) => true,
            (NodeTest::Text, Some(XmlContent::Text(_))) => true,
            (NodeTest::Comment, Some(XmlContent::Comment(_))) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    /// 1-based position among the step's candidates.
    Position(usize),
    Last,
    HasAttribute(String),
    AttributeEquals(String, String),
    ChildTextEquals(String, String),
}

impl Predicate {
    fn apply(&self, candidates: Vec<NodeRef>) -> Vec<NodeRef> {
        match self {
            Predicate::Position(n) => candidates.into_iter().nth(n - 1).into_iter().collect(),
            Predicate::Last => candidates.into_iter().last().into_iter().collect(),
            Predicate::HasAttribute(name) => candidates
                .into_iter()
                .filter(|c| {
                    c.borrow()
                        .element()
                        .is_some_and(|e| e.attribute(name).is_some())
                })
                .collect(),
            Predicate::AttributeEquals(name, value) => candidates
                .into_iter()
                .filter(|c| {
                    c.borrow()
                        .element()
                        .is_some_and(|e| e.attribute(name) == Some(value.as_str()))
                })
                .collect(),
            Predicate::ChildTextEquals(name, value) => candidates
                .into_iter()
                .filter(|c| {
                    c.borrow().children().iter().any(|child| {
                        let child = child.borrow();
                        child.is_named(name) && child.text_content() == *value
                    })
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Predicate>,
}

impl Step {
    fn descendant_or_self() -> Self {
        Step {
            axis: Axis::DescendantOrSelf,
            test: NodeTest::AnyNode,
            predicates: Vec::new(),
        }
    }

    fn candidates(&self, context: &NodeRef, source: &str) -> Result<Vec<NodeRef>> {
        let mut found: Vec<NodeRef> = match self.axis {
            Axis::Child => context.borrow().children().to_vec(),
            Axis::Parent => match NodeInner::parent_of_ref(context) {
                Some(parent) => vec![parent],
                None if context.borrow().is_orphaned() => return Err(detached(source)),
                None => Vec::new(),
            },
            Axis::SelfNode => vec![Rc::clone(context)],
            Axis::DescendantOrSelf => DfsTreeIterator::new(Rc::clone(context)).collect(),
        };
        found.retain(|n| self.test.matches(&n.borrow()));
        for predicate in &self.predicates {
            found = predicate.apply(found);
        }
        Ok(found)
    }
}

fn detached(source: &str) -> Error {
    Error::DetachedNode {
        path: source.to_string(),
    }
}

/// A compiled path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePath {
    source: String,
    absolute: bool,
    steps: Vec<Step>,
}

impl NodePath {
    /// Parses a path expression.
    pub fn parse(source: &str) -> Result<Self> {
        PathParser::new(source).parse()
    }

    /// Returns the expression this path was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns true if the path starts at the document root.
    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    /// Evaluates the path against a context node.
    ///
    /// Each node is returned at most once. Fails with
    /// [`Error::DetachedNode`] when the path has to climb past a parent that
    /// was dropped.
    pub fn select(&self, context: &NodeRef) -> Result<Vec<NodeRef>> {
        let start = if self.absolute {
            let root = NodeInner::root_of_ref(context);
            if root.borrow().is_orphaned() {
                return Err(detached(&self.source));
            }
            root
        } else {
            Rc::clone(context)
        };

        let mut current = vec![start];
        for step in &self.steps {
            let mut next: Vec<NodeRef> = Vec::new();
            for node in &current {
                for candidate in step.candidates(node, &self.source)? {
                    if !next.iter().any(|n| Rc::ptr_eq(n, &candidate)) {
                        next.push(candidate);
                    }
                }
            }
            current = next;
            if current.is_empty() {
                break;
            }
        }
        Ok(current)
    }
}

impl std::fmt::Display for NodePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for NodePath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        NodePath::parse(s)
    }
}

/// Recursive-descent parser over the characters of a path expression.
struct PathParser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> PathParser<'a> {
    fn new(source: &'a str) -> Self {
        PathParser {
            source,
            chars: source.trim().chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, reason: impl Into<String>) -> Error {
        Error::invalid_path(self.source, reason)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, s: &str) -> bool {
        let len = s.chars().count();
        if self.chars.len() >= self.pos + len
            && self.chars[self.pos..self.pos + len].iter().copied().eq(s.chars())
        {
            self.pos += len;
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn parse(mut self) -> Result<NodePath> {
        if self.chars.is_empty() {
            return Err(self.error("empty expression"));
        }

        let mut steps = Vec::new();
        let absolute = self.peek() == Some('/');
        if self.eat_str("//") {
            steps.push(Step::descendant_or_self());
        } else if self.eat('/') && self.peek().is_none() {
            // "/" alone selects the document root.
            return Ok(NodePath {
                source: self.source.to_string(),
                absolute,
                steps,
            });
        }

        loop {
            steps.push(self.parse_step()?);
            if self.peek().is_none() {
                break;
            }
            if self.eat_str("//") {
                steps.push(Step::descendant_or_self());
            } else if !self.eat('/') {
                return Err(self.error(format!("unexpected character at offset {}", self.pos)));
            }
        }

        Ok(NodePath {
            source: self.source.to_string(),
            absolute,
            steps,
        })
    }

    fn parse_step(&mut self) -> Result<Step> {
        if self.eat_str("..") {
            return Ok(Step {
                axis: Axis::Parent,
                test: NodeTest::AnyNode,
                predicates: Vec::new(),
            });
        }
        if self.eat('.') {
            return Ok(Step {
                axis: Axis::SelfNode,
                test: NodeTest::AnyNode,
                predicates: Vec::new(),
            });
        }

        let test = if self.eat('*') {
            NodeTest::AnyElement
        } else {
            let name = self.parse_name()?;
            if self.eat_str("()") {
                match name.as_str() {
                    "text" => NodeTest::Text,
                    "comment" => NodeTest::Comment,
                    "node" => NodeTest::AnyNode,
                    other => return Err(self.error(format!("unsupported node test {}()", other))),
                }
            } else {
                NodeTest::Name(name)
            }
        };

        let mut predicates = Vec::new();
        while self.eat('[') {
            self.skip_ws();
            predicates.push(self.parse_predicate()?);
            self.skip_ws();
            if !self.eat(']') {
                return Err(self.error("unterminated predicate"));
            }
        }

        Ok(Step {
            axis: Axis::Child,
            test,
            predicates,
        })
    }

    fn parse_predicate(&mut self) -> Result<Predicate> {
        if self.peek().is_some_and(|c| c.is_ascii_digit()) {
            let start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
            let digits: String = self.chars[start..self.pos].iter().collect();
            return match digits.parse::<usize>() {
                Ok(n) if n > 0 => Ok(Predicate::Position(n)),
                _ => Err(self.error("positions start at 1")),
            };
        }
        if self.eat_str("last()") {
            return Ok(Predicate::Last);
        }

        let is_attribute = self.eat('@');
        let name = self.parse_name()?;
        self.skip_ws();
        if !self.eat('=') {
            return if is_attribute {
                Ok(Predicate::HasAttribute(name))
            } else {
                Err(self.error(format!("predicate on `{}` needs a value", name)))
            };
        }
        self.skip_ws();
        let value = self.parse_literal()?;
        Ok(if is_attribute {
            Predicate::AttributeEquals(name, value)
        } else {
            Predicate::ChildTextEquals(name, value)
        })
    }

    fn parse_name(&mut self) -> Result<String> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | ':' | '.' | '$'))
        {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error(format!("expected a name at offset {}", start)));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_literal(&mut self) -> Result<String> {
        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected a quoted literal")),
        };
        self.pos += 1;
        let start = self.pos;
        while self.peek().is_some_and(|c| c != quote) {
            self.pos += 1;
        }
        if self.peek().is_none() {
            return Err(self.error("unterminated literal"));
        }
        let value = self.chars[start..self.pos].iter().collect();
        self.pos += 1;
        Ok(value)
    }
}

/// Iterator for traversing a tree in depth-first pre-order, starting with the root.
pub struct DfsTreeIterator {
    /// Stack of (node, next_child_index) pairs for iterating.
    stack: Vec<(NodeRef, usize)>,
}

impl DfsTreeIterator {
    /// Creates a new DFS iterator starting at the given root.
    pub fn new(root: NodeRef) -> Self {
        DfsTreeIterator {
            stack: vec![(root, 0)],
        }
    }
}

impl Iterator for DfsTreeIterator {
    type Item = NodeRef;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((node, child_idx)) = self.stack.pop() {
            let next_child = node.borrow().child(child_idx).cloned();
            if child_idx == 0 {
                if let Some(child) = next_child {
                    self.stack.push((Rc::clone(&node), 1));
                    self.stack.push((child, 0));
                }
                return Some(node);
            }
            if let Some(child) = next_child {
                self.stack.push((node, child_idx + 1));
                self.stack.push((child, 0));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse_str;

    const DOC: &str = r#"
        <nutrition>
          <food id="1"><name>Avocado Dip</name><mfr>Sunnydale</mfr></food>
          <food id="2"><name>Bagels</name><mfr>Bagel Co</mfr></food>
          <prices>
            <price food="1">2.50</price>
            <price food="2">1.10</price>
          </prices>
        </nutrition>"#;

    fn names(nodes: &[NodeRef]) -> Vec<String> {
        nodes
            .iter()
            .map(|n| n.borrow().name().unwrap_or("#text").to_string())
            .collect()
    }

    #[test]
    fn test_absolute_and_descendant_paths() {
        let doc = parse_str(DOC).unwrap();
        let selector = XPathSelector::new();

        let foods = selector.select_all("/nutrition/food", &doc).unwrap();
        assert_eq!(foods.len(), 2);
        let foods_anywhere = selector.select_all("//nutrition/food", &doc).unwrap();
        assert_eq!(foods_anywhere.len(), 2);
        assert!(Rc::ptr_eq(&foods[0], &foods_anywhere[0]));

        let names_found = selector.select_all("//name", &doc).unwrap();
        assert_eq!(names_found.len(), 2);
        assert_eq!(names_found[1].borrow().text_content(), "Bagels");
    }

    #[test]
    fn test_absolute_path_from_nested_context() {
        let doc = parse_str(DOC).unwrap();
        let selector = XPathSelector::new();
        let food = selector.select_one("/nutrition/food", &doc).unwrap().unwrap();

        let prices = selector.select_all("/nutrition/prices/price", &food).unwrap();
        assert_eq!(prices.len(), 2);
    }

    #[test]
    fn test_relative_paths_and_parent() {
        let doc = parse_str(DOC).unwrap();
        let selector = XPathSelector::new();
        let food = selector.select_one("//food[@id='2']", &doc).unwrap().unwrap();

        let mfr = selector.select_one("mfr", &food).unwrap().unwrap();
        assert_eq!(mfr.borrow().text_content(), "Bagel Co");

        let price = selector
            .select_all("../prices/price[@food='2']", &food)
            .unwrap();
        assert_eq!(price.len(), 1);
        assert_eq!(price[0].borrow().text_content(), "1.10");

        let itself = selector.select_all(".", &food).unwrap();
        assert!(Rc::ptr_eq(&itself[0], &food));
    }

    #[test]
    fn test_climbing_out_of_a_dropped_document_fails() {
        let doc = parse_str(DOC).unwrap();
        let selector = XPathSelector::new();
        let food = selector.select_one("//food[@id='1']", &doc).unwrap().unwrap();
        drop(doc);

        assert_eq!(selector.select_all("mfr", &food).unwrap().len(), 1);
        match selector.select_all("../prices/price", &food) {
            Err(Error::DetachedNode { path }) => assert_eq!(path, "../prices/price"),
            other => panic!("expected detached node error, got {:?}", other),
        }
        assert!(matches!(
            selector.select_all("/nutrition/prices/price", &food),
            Err(Error::DetachedNode { .. })
        ));
    }

    #[test]
    fn test_parent_of_a_document_root_is_empty() {
        let doc = parse_str(DOC).unwrap();
        assert!(XPathSelector::new().select_all("..", &doc).unwrap().is_empty());
    }

    #[test]
    fn test_predicates() {
        let doc = parse_str(DOC).unwrap();
        let selector = XPathSelector::new();

        let second = selector.select_all("/nutrition/food[2]", &doc).unwrap();
        assert_eq!(second[0].borrow().element().unwrap().attribute("id"), Some("2"));

        let last = selector.select_all("/nutrition/food[last()]", &doc).unwrap();
        assert!(Rc::ptr_eq(&second[0], &last[0]));

        let by_child = selector
            .select_all("/nutrition/food[name='Avocado Dip']", &doc)
            .unwrap();
        assert_eq!(by_child.len(), 1);
        assert_eq!(by_child[0].borrow().element().unwrap().attribute("id"), Some("1"));

        let with_attr = selector.select_all("//*[@food]", &doc).unwrap();
        assert_eq!(names(&with_attr), vec!["price", "price"]);

        assert!(selector.select_all("/nutrition/food[3]", &doc).unwrap().is_empty());
    }

    #[test]
    fn test_text_node_test() {
        let doc = parse_str(DOC).unwrap();
        let selector = XPathSelector::new();
        let texts = selector.select_all("//food[1]/name/text()", &doc).unwrap();
        assert_eq!(texts.len(), 1);
        assert_eq!(names(&texts), vec!["#text"]);
    }

    #[test]
    fn test_invalid_paths() {
        for bad in ["", "food[", "food[@id='1'", "food[0]", "food/", "foo()", "food[name]"] {
            assert!(
                matches!(NodePath::parse(bad), Err(Error::InvalidPath { .. })),
                "expected `{}` to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_path_display_and_from_str() {
        let path: NodePath = "../prices/price".parse().unwrap();
        assert_eq!(path.to_string(), "../prices/price");
        assert!(!path.is_absolute());
        assert!(NodePath::parse("/a").unwrap().is_absolute());
    }

    #[test]
    fn test_dfs_iterator_order() {
        let doc = parse_str("<root><a><c/><d/></a><b/></root>").unwrap();
        let root = doc.borrow().children()[0].clone();
        let order = names(&DfsTreeIterator::new(root).collect::<Vec<_>>());
        assert_eq!(order, vec!["root", "a", "c", "d", "b"]);
    }
}
