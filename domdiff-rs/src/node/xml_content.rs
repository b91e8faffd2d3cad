//! XML content types for tree nodes.
//!
//! This module provides `XmlContent`, which represents the content of an XML node:
//! an element (tag with attributes), text, or a comment. Every content value
//! carries an MD5 digest so that equal content can be recognized without
//! walking strings again.

use md5::{Digest, Md5};
use std::collections::HashMap;

/// An MD5 digest of node content.
pub type ContentDigest = [u8; 16];

/// Represents the content of an XML node.
#[derive(Debug, Clone)]
pub enum XmlContent {
    /// An XML element with a qualified name and attributes.
    Element(XmlElement),
    /// XML text content.
    Text(XmlText),
    /// XML comment.
    Comment(XmlComment),
}

impl XmlContent {
    /// Tests content equality using digest comparison.
    pub fn content_equals(&self, other: &XmlContent) -> bool {
        match (self, other) {
            (XmlContent::Element(a), XmlContent::Element(b)) => a.content_equals(b),
            (XmlContent::Text(a), XmlContent::Text(b)) => a.content_equals(b),
            (XmlContent::Comment(a), XmlContent::Comment(b)) => a.content_equals(b),
            _ => false,
        }
    }

    /// Returns the content digest, tagged by content kind.
    pub fn digest(&self) -> ContentDigest {
        match self {
            XmlContent::Element(e) => e.digest(),
            XmlContent::Text(t) => t.digest(),
            XmlContent::Comment(c) => c.digest(),
        }
    }

    /// Returns true if this is an element node.
    pub fn is_element(&self) -> bool {
        matches!(self, XmlContent::Element(_))
    }

    /// Returns true if this is a text node.
    pub fn is_text(&self) -> bool {
        matches!(self, XmlContent::Text(_))
    }

    /// Returns true if this is a comment node.
    pub fn is_comment(&self) -> bool {
        matches!(self, XmlContent::Comment(_))
    }

    /// Returns a reference to the element, if this is an element node.
    pub fn as_element(&self) -> Option<&XmlElement> {
        match self {
            XmlContent::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Returns a reference to the text, if this is a text node.
    pub fn as_text(&self) -> Option<&XmlText> {
        match self {
            XmlContent::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Returns a reference to the comment, if this is a comment node.
    pub fn as_comment(&self) -> Option<&XmlComment> {
        match self {
            XmlContent::Comment(c) => Some(c),
            _ => None,
        }
    }
}

/// Hashes a kind tag followed by length-prefixed strings.
fn digest_parts(kind: u8, parts: &[&str]) -> ContentDigest {
    let mut hasher = Md5::new();
    hasher.update([kind]);
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    hasher.finalize().into()
}

const ELEMENT_TAG: u8 = 1;
const TEXT_TAG: u8 = 2;
const COMMENT_TAG: u8 = 3;

/// An XML element with a qualified name and attributes.
#[derive(Debug, Clone)]
pub struct XmlElement {
    /// The qualified name of the element (e.g., "food", "ns:element").
    name: String,
    /// Attributes as key-value pairs. The key is the qualified attribute name.
    attributes: HashMap<String, String>,
    /// MD5 hash of the name and the sorted attributes.
    digest: ContentDigest,
}

impl XmlElement {
    /// Creates a new XML element with the given name and attributes.
    pub fn new(name: String, attributes: HashMap<String, String>) -> Self {
        let mut element = XmlElement {
            name,
            attributes,
            digest: [0; 16],
        };
        element.rehash();
        element
    }

    fn rehash(&mut self) {
        let mut parts: Vec<&str> = vec![&self.name];
        for (name, value) in self.sorted_attributes() {
            parts.push(name);
            parts.push(value);
        }
        self.digest = digest_parts(ELEMENT_TAG, &parts);
    }

    /// Returns the qualified name of the element.
    pub fn qname(&self) -> &str {
        &self.name
    }

    /// Returns the attributes.
    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    /// Returns the value of one attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Returns the attributes sorted by name.
    pub fn sorted_attributes(&self) -> Vec<(&str, &str)> {
        let mut attrs: Vec<(&str, &str)> = self
            .attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        attrs.sort_unstable_by(|a, b| a.0.cmp(b.0));
        attrs
    }

    /// Tests content equality (name and attributes) using hash comparison.
    pub fn content_equals(&self, other: &XmlElement) -> bool {
        self.digest == other.digest
    }

    /// Returns the digest of the name and attributes.
    pub fn digest(&self) -> ContentDigest {
        self.digest
    }
}

impl std::fmt::Display for XmlElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {{", self.name)?;
        for (name, value) in self.sorted_attributes() {
            write!(f, " {}={}", name, value)?;
        }
        write!(f, " }}")
    }
}

/// XML text content.
#[derive(Debug, Clone)]
pub struct XmlText {
    text: String,
    digest: ContentDigest,
}

impl XmlText {
    /// Creates a new text node from a string.
    pub fn new(text: &str) -> Self {
        XmlText {
            text: text.to_string(),
            digest: digest_parts(TEXT_TAG, &[text]),
        }
    }

    /// Tests content equality using MD5 hash comparison.
    pub fn content_equals(&self, other: &XmlText) -> bool {
        self.digest == other.digest
    }

    /// Returns the text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the digest of the text.
    pub fn digest(&self) -> ContentDigest {
        self.digest
    }
}

impl std::fmt::Display for XmlText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// XML comment content.
#[derive(Debug, Clone)]
pub struct XmlComment {
    /// The comment text (without the <!-- and --> markers).
    text: String,
    digest: ContentDigest,
}

impl XmlComment {
    /// Creates a new comment node from a string.
    pub fn new(text: &str) -> Self {
        XmlComment {
            text: text.to_string(),
            digest: digest_parts(COMMENT_TAG, &[text]),
        }
    }

    /// Tests content equality using MD5 hash comparison.
    pub fn content_equals(&self, other: &XmlComment) -> bool {
        self.digest == other.digest
    }

    /// Returns the comment text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the digest of the comment text.
    pub fn digest(&self) -> ContentDigest {
        self.digest
    }
}

impl std::fmt::Display for XmlComment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<!-- {} -->", self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_text_node_equality() {
        let t1 = XmlText::new("hello world");
        let t2 = XmlText::new("hello world");
        let t3 = XmlText::new("hello world!");

        assert!(t1.content_equals(&t2));
        assert!(!t1.content_equals(&t3));
    }

    #[test]
    fn test_element_equality() {
        let e1 = XmlElement::new("food".to_string(), attrs(&[("id", "1"), ("mfr", "X")]));
        let e2 = XmlElement::new("food".to_string(), attrs(&[("mfr", "X"), ("id", "1")]));
        let e3 = XmlElement::new("food".to_string(), attrs(&[("id", "1"), ("mfr", "Y")]));
        let e4 = XmlElement::new("drink".to_string(), attrs(&[("id", "1"), ("mfr", "X")]));

        assert!(e1.content_equals(&e2));
        assert!(!e1.content_equals(&e3));
        assert!(!e1.content_equals(&e4));
    }

    #[test]
    fn test_digest_is_unambiguous() {
        // "ab" + "c" must not collide with "a" + "bc".
        let e1 = XmlElement::new("x".to_string(), attrs(&[("ab", "c")]));
        let e2 = XmlElement::new("x".to_string(), attrs(&[("a", "bc")]));
        assert!(!e1.content_equals(&e2));
    }

    #[test]
    fn test_text_and_comment_never_equal() {
        let text = XmlContent::Text(XmlText::new("same"));
        let comment = XmlContent::Comment(XmlComment::new("same"));
        assert!(!text.content_equals(&comment));
        assert_ne!(text.digest(), comment.digest());
    }

    #[test]
    fn test_xml_content_enum() {
        let elem = XmlContent::Element(XmlElement::new("div".to_string(), HashMap::new()));
        let text = XmlContent::Text(XmlText::new("hello"));

        assert!(elem.is_element());
        assert!(!elem.is_text());
        assert!(text.is_text());
        assert!(elem.as_element().is_some());
        assert!(elem.as_text().is_none());
        assert!(text.as_text().is_some());
        assert!(text.as_comment().is_none());
    }

    #[test]
    fn test_display_sorts_attributes() {
        let e = XmlElement::new("food".to_string(), attrs(&[("mfr", "X"), ("id", "1")]));
        assert_eq!(e.to_string(), "food { id=1 mfr=X }");
    }
}
