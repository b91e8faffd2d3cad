//! XML rendering of classification results.
//!
//! ```text
//! <actions>
//!   <forest name="food">
//!     <create>...</create>
//!     <update>...</update>
//!     <delete>...</delete>
//!   </forest>
//! </actions>
//! ```

use std::io::Write;

use crate::document::DocumentActions;
use crate::error::Result;
use crate::xml::{XmlPrinter, XmlPrinterOptions};

const ACTIONS_TAG: &str = "actions";
const FOREST_TAG: &str = "forest";

/// Writes the report for `actions` to `writer`.
pub fn write_actions<W: Write>(writer: W, actions: &DocumentActions) -> Result<()> {
    let options = XmlPrinterOptions { pretty_print: true };
    let mut printer = XmlPrinter::with_options(writer, options);

    printer.declaration()?;
    if actions.is_empty() {
        printer.empty_tag(ACTIONS_TAG, &[])?;
        printer.into_inner()?;
        return Ok(());
    }

    printer.start_tag(ACTIONS_TAG, &[])?;
    for (name, forest) in actions.iter() {
        printer.start_tag(FOREST_TAG, &[("name", name)])?;
        for (kind, nodes) in forest.iter() {
            printer.start_tag(kind.as_str(), &[])?;
            for node in nodes {
                printer.print_fragment(node)?;
            }
            printer.end_tag(kind.as_str())?;
        }
        printer.end_tag(FOREST_TAG)?;
    }
    printer.end_tag(ACTIONS_TAG)?;
    printer.into_inner()?;
    Ok(())
}

/// Renders the report for `actions` as a string.
pub fn render_actions(actions: &DocumentActions) -> Result<String> {
    let mut output = Vec::new();
    write_actions(&mut output, actions)?;
    Ok(String::from_utf8_lossy(&output).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{ActionKind, ActionMap};
    use crate::xml::parse_str;

    #[test]
    fn test_empty_report() {
        let rendered = render_actions(&DocumentActions::new()).unwrap();
        assert_eq!(rendered, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<actions />\n");
    }

    #[test]
    fn test_report_layout() {
        let root = parse_str(r#"<n><food id="1"><name>A &amp; B</name></food><food id="2"/></n>"#)
            .unwrap();
        let n = root.borrow().children()[0].clone();
        let foods = n.borrow().children().to_vec();

        let mut map = ActionMap::new();
        map.push(ActionKind::Delete, foods[1].clone());
        map.push(ActionKind::Create, foods[0].clone());
        let mut actions = DocumentActions::new();
        actions.insert("food", map);

        let expected = concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
            "<actions>\n",
            "  <forest name=\"food\">\n",
            "    <create>\n",
            "      <food id=\"1\">\n",
            "        <name>A &amp; B</name>\n",
            "      </food>\n",
            "    </create>\n",
            "    <delete>\n",
            "      <food id=\"2\" />\n",
            "    </delete>\n",
            "  </forest>\n",
            "</actions>\n",
        );
        assert_eq!(render_actions(&actions).unwrap(), expected);
    }
}
