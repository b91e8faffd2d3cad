//! XML printer that outputs node trees.
//!
//! Besides whole documents, the printer can write single nodes as fragments
//! and open/close wrapper tags by hand, which is how action reports are
//! assembled around the classified nodes.

use std::io::Write;

use crate::constants::ROOT_NAME;
use crate::node::{NodeRef, XmlContent};

/// Options for XML printing.
#[derive(Debug, Clone, Default)]
pub struct XmlPrinterOptions {
    /// Whether to pretty-print with indentation.
    pub pretty_print: bool,
}

/// XML printer that outputs node trees.
pub struct XmlPrinter<W: Write> {
    writer: W,
    options: XmlPrinterOptions,
    indent: usize,
}

impl<W: Write> XmlPrinter<W> {
    /// Creates a new XML printer.
    pub fn new(writer: W) -> Self {
        Self::with_options(writer, XmlPrinterOptions::default())
    }

    /// Creates a new XML printer with the given options.
    pub fn with_options(writer: W, options: XmlPrinterOptions) -> Self {
        XmlPrinter {
            writer,
            options,
            indent: 0,
        }
    }

    /// Prints a document (XML declaration followed by the tree).
    pub fn print(&mut self, root: &NodeRef) -> std::io::Result<()> {
        self.declaration()?;
        self.print_fragment(root)?;
        self.writer.flush()
    }

    /// Writes the XML declaration.
    pub fn declaration(&mut self) -> std::io::Result<()> {
        write!(self.writer, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
        self.newline()
    }

    /// Prints a node tree as a fragment (no XML declaration).
    ///
    /// The synthetic `$ROOT$` element is transparent: only its children are printed.
    pub fn print_fragment(&mut self, node: &NodeRef) -> std::io::Result<()> {
        let borrowed = node.borrow();
        match borrowed.content() {
            Some(XmlContent::Text(text)) => {
                self.pad()?;
                write!(self.writer, "{}", to_entities(text.text()))?;
                self.newline()
            }
            Some(XmlContent::Comment(comment)) => {
                self.pad()?;
                write!(self.writer, "<!-- {} -->", comment.text())?;
                self.newline()
            }
            Some(XmlContent::Element(element)) if element.qname() == ROOT_NAME => {
                for child in borrowed.children() {
                    self.print_fragment(child)?;
                }
                Ok(())
            }
            Some(XmlContent::Element(element)) => {
                let attrs = element.sorted_attributes();
                let children = borrowed.children();
                if children.is_empty() {
                    self.pad()?;
                    write!(self.writer, "<{}{} />", element.qname(), attr_string(&attrs))?;
                    return self.newline();
                }
                let inline_text = match children {
                    [only] => only
                        .borrow()
                        .content()
                        .and_then(XmlContent::as_text)
                        .map(|t| to_entities(t.text())),
                    _ => None,
                };
                if let Some(text) = inline_text {
                    self.pad()?;
                    write!(
                        self.writer,
                        "<{q}{a}>{t}</{q}>",
                        q = element.qname(),
                        a = attr_string(&attrs),
                        t = text
                    )?;
                    return self.newline();
                }
                self.start_tag(element.qname(), &attrs)?;
                for child in children {
                    self.print_fragment(child)?;
                }
                self.end_tag(element.qname())
            }
            None => Ok(()),
        }
    }

    /// Writes an opening tag and indents following output.
    pub fn start_tag(&mut self, qname: &str, attrs: &[(&str, &str)]) -> std::io::Result<()> {
        self.pad()?;
        write!(self.writer, "<{}{}>", qname, attr_string(attrs))?;
        self.newline()?;
        self.indent += 1;
        Ok(())
    }

    /// Writes a closing tag.
    pub fn end_tag(&mut self, qname: &str) -> std::io::Result<()> {
        self.indent = self.indent.saturating_sub(1);
        self.pad()?;
        write!(self.writer, "</{}>", qname)?;
        self.newline()
    }

    /// Writes a self-closing tag.
    pub fn empty_tag(&mut self, qname: &str, attrs: &[(&str, &str)]) -> std::io::Result<()> {
        self.pad()?;
        write!(self.writer, "<{}{} />", qname, attr_string(attrs))?;
        self.newline()
    }

    /// Flushes and returns the underlying writer.
    pub fn into_inner(mut self) -> std::io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }

    fn pad(&mut self) -> std::io::Result<()> {
        if self.options.pretty_print {
            write!(self.writer, "{}", "  ".repeat(self.indent))?;
        }
        Ok(())
    }

    fn newline(&mut self) -> std::io::Result<()> {
        if self.options.pretty_print {
            writeln!(self.writer)?;
        }
        Ok(())
    }
}

fn attr_string(attrs: &[(&str, &str)]) -> String {
    let mut out = String::new();
    for (name, value) in attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&to_entities(value));
        out.push('"');
    }
    out
}

/// Converts special characters to XML entities.
fn to_entities(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '\'' => result.push_str("&apos;"),
            '"' => result.push_str("&quot;"),
            _ => result.push(c),
        }
    }
    result
}

/// Prints a node tree to a string.
pub fn print_to_string(root: &NodeRef) -> std::io::Result<String> {
    let mut output = Vec::new();
    XmlPrinter::new(&mut output).print(root)?;
    Ok(String::from_utf8_lossy(&output).to_string())
}

/// Prints a node tree to a string with pretty printing.
pub fn print_to_string_pretty(root: &NodeRef) -> std::io::Result<String> {
    let mut output = Vec::new();
    let options = XmlPrinterOptions { pretty_print: true };
    XmlPrinter::with_options(&mut output, options).print(root)?;
    Ok(String::from_utf8_lossy(&output).to_string())
}

/// Prints a single node without XML declaration or indentation.
pub fn fragment_to_string(node: &NodeRef) -> std::io::Result<String> {
    let mut output = Vec::new();
    XmlPrinter::new(&mut output).print_fragment(node)?;
    Ok(String::from_utf8_lossy(&output).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse_str;

    #[test]
    fn test_print_simple() {
        let root = parse_str(r#"<root>text</root>"#).unwrap();
        let output = print_to_string(&root).unwrap();

        assert_eq!(
            output,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><root>text</root>"
        );
    }

    #[test]
    fn test_print_sorted_attributes_and_empty_element() {
        let root = parse_str(r#"<food mfr="X" id="1"><serving/></food>"#).unwrap();
        let food = root.borrow().children()[0].clone();
        let output = fragment_to_string(&food).unwrap();

        assert_eq!(output, r#"<food id="1" mfr="X"><serving /></food>"#);
    }

    #[test]
    fn test_entity_encoding() {
        let root = parse_str(r#"<root attr="&amp;&lt;&gt;">&amp;&lt;&gt;</root>"#).unwrap();
        let output = print_to_string(&root).unwrap();

        assert!(output.contains(r#"attr="&amp;&lt;&gt;""#));
        assert!(output.contains(">&amp;&lt;&gt;<"));
    }

    #[test]
    fn test_pretty_print() {
        let root = parse_str(r#"<root><child>text</child><other/></root>"#).unwrap();
        let output = print_to_string_pretty(&root).unwrap();

        assert_eq!(
            output,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<root>\n  <child>text</child>\n  <other />\n</root>\n"
        );
    }

    #[test]
    fn test_double_round_trip() {
        let xml = r#"<doc><section id="s1"><para>First &amp; last.</para><!-- c --><para>Second.</para></section></doc>"#;
        let output1 = print_to_string(&parse_str(xml).unwrap()).unwrap();
        let output2 = print_to_string(&parse_str(&output1).unwrap()).unwrap();

        assert_eq!(output1, output2);
    }

    #[test]
    fn test_manual_wrapper_tags() {
        let root = parse_str("<food>A</food>").unwrap();
        let food = root.borrow().children()[0].clone();
        let mut printer = XmlPrinter::new(Vec::new());
        printer.start_tag("create", &[("count", "1")]).unwrap();
        printer.print_fragment(&food).unwrap();
        printer.end_tag("create").unwrap();
        printer.empty_tag("delete", &[]).unwrap();
        let out = String::from_utf8(printer.into_inner().unwrap()).unwrap();

        assert_eq!(out, r#"<create count="1"><food>A</food></create><delete />"#);
    }
}
