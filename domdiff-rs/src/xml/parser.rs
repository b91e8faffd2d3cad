//! XML parser that builds node trees.
//!
//! This parser uses quick-xml's streaming API. Text is trimmed and
//! whitespace-only text between tags is dropped, so indentation in either
//! document version never shows up as a difference.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::constants::ROOT_NAME;
use crate::error::{Error, Result};
use crate::node::{new_node, NodeInner, NodeRef, XmlComment, XmlContent, XmlElement, XmlText};

/// XML parser that builds node trees.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlParser;

impl XmlParser {
    /// Creates a new parser.
    pub fn new() -> Self {
        XmlParser
    }

    /// Parses XML from a string.
    pub fn parse_str(&self, xml: &str) -> Result<NodeRef> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;
        self.parse_reader(&mut reader)
    }

    /// Parses XML from a file.
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<NodeRef> {
        let file = File::open(path)?;
        let mut reader = Reader::from_reader(BufReader::new(file));
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;
        self.parse_reader(&mut reader)
    }

    /// Parses XML from a quick-xml Reader.
    ///
    /// The returned node is a synthetic `$ROOT$` element whose children are
    /// the top-level nodes of the document.
    fn parse_reader<R: BufRead>(&self, reader: &mut Reader<R>) -> Result<NodeRef> {
        let root = new_node(Some(XmlContent::Element(XmlElement::new(
            ROOT_NAME.to_string(),
            HashMap::new(),
        ))));

        let mut node_stack: Vec<NodeRef> = vec![root.clone()];
        let mut pending_text = String::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => {
                    flush_text(&mut pending_text, &node_stack);
                    let node = new_node(Some(XmlContent::Element(self.parse_element(e, reader)?)));
                    if let Some(parent) = node_stack.last() {
                        NodeInner::add_child_to_ref(parent, node.clone());
                    }
                    node_stack.push(node);
                }
                Event::End(_) => {
                    flush_text(&mut pending_text, &node_stack);
                    if node_stack.len() <= 1 {
                        return Err(Error::Parse("unexpected closing tag".to_string()));
                    }
                    node_stack.pop();
                }
                Event::Empty(ref e) => {
                    flush_text(&mut pending_text, &node_stack);
                    let node = new_node(Some(XmlContent::Element(self.parse_element(e, reader)?)));
                    if let Some(parent) = node_stack.last() {
                        NodeInner::add_child_to_ref(parent, node);
                    }
                }
                Event::Text(e) => {
                    let raw =
                        std::str::from_utf8(e.as_ref()).map_err(|e| Error::Parse(e.to_string()))?;
                    let text = unescape(raw).map_err(|e| Error::Parse(e.to_string()))?;
                    pending_text.push_str(&text);
                }
                Event::CData(ref e) => {
                    pending_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
                Event::GeneralRef(e) => {
                    let name =
                        std::str::from_utf8(e.as_ref()).map_err(|e| Error::Parse(e.to_string()))?;
                    pending_text.push_str(&resolve_reference(name)?);
                }
                Event::Comment(ref e) => {
                    flush_text(&mut pending_text, &node_stack);
                    let comment = String::from_utf8_lossy(e.as_ref());
                    let node = new_node(Some(XmlContent::Comment(XmlComment::new(comment.trim()))));
                    if let Some(parent) = node_stack.last() {
                        NodeInner::add_child_to_ref(parent, node);
                    }
                }
                Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
                Event::Eof => break,
            }
            buf.clear();
        }

        if node_stack.len() > 1 {
            return Err(Error::Parse(format!(
                "{} element(s) left unclosed at end of input",
                node_stack.len() - 1
            )));
        }

        Ok(root)
    }

    /// Parses an element's name and attributes.
    fn parse_element<R: BufRead>(&self, e: &BytesStart, reader: &Reader<R>) -> Result<XmlElement> {
        let name = reader
            .decoder()
            .decode(e.name().as_ref())
            .map_err(|e| Error::Parse(e.to_string()))?
            .to_string();

        let mut attributes = HashMap::new();
        for attr_result in e.attributes() {
            let attr = attr_result.map_err(|e| Error::Parse(format!("Attribute error: {}", e)))?;
            let key = reader
                .decoder()
                .decode(attr.key.as_ref())
                .map_err(|e| Error::Parse(e.to_string()))?
                .to_string();
            let value = attr
                .unescape_value()
                .map_err(|e| Error::Parse(e.to_string()))?
                .to_string();
            attributes.insert(key, value);
        }

        Ok(XmlElement::new(name, attributes))
    }
}

/// Adds the accumulated text, trimmed, as a text child of the current element.
fn flush_text(pending: &mut String, node_stack: &[NodeRef]) {
    let trimmed = pending.trim();
    if !trimmed.is_empty() {
        if let Some(parent) = node_stack.last() {
            let text_node = new_node(Some(XmlContent::Text(XmlText::new(trimmed))));
            NodeInner::add_child_to_ref(parent, text_node);
        }
    }
    pending.clear();
}

/// Resolves a predefined entity (`amp`) or character reference (`#38`, `#x26`).
fn resolve_reference(name: &str) -> Result<String> {
    if let Some(resolved) = resolve_predefined_entity(name) {
        return Ok(resolved.to_string());
    }
    let code = if let Some(hex) = name.strip_prefix("#x") {
        u32::from_str_radix(hex, 16).ok()
    } else if let Some(dec) = name.strip_prefix('#') {
        dec.parse::<u32>().ok()
    } else {
        None
    };
    code.and_then(char::from_u32)
        .map(String::from)
        .ok_or_else(|| Error::Parse(format!("unknown entity reference &{};", name)))
}

/// Parses XML from a file.
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<NodeRef> {
    XmlParser::new().parse_file(path)
}

/// Parses XML from a string.
pub fn parse_str(xml: &str) -> Result<NodeRef> {
    XmlParser::new().parse_str(xml)
}
