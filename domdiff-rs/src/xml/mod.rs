//! XML parsing and output.
//!
//! Documents are parsed into [`NodeRef`](crate::node::NodeRef) trees rooted at
//! a synthetic `$ROOT$` element, and nodes can be printed back either as whole
//! documents or as fragments.

mod parser;
mod printer;

pub use parser::{parse_file, parse_str, XmlParser};
pub use printer::{
    fragment_to_string, print_to_string, print_to_string_pretty, XmlPrinter, XmlPrinterOptions,
};
