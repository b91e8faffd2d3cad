//! Error types for xml-domdiff.

use thiserror::Error;

/// Result type alias for xml-domdiff operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing documents or classifying forests.
#[derive(Error, Debug)]
pub enum Error {
    /// XML parsing error.
    #[error("XML parse error: {0}")]
    Parse(String),

    /// A path expression could not be parsed.
    #[error("invalid path expression `{path}`: {reason}")]
    InvalidPath {
        /// The offending expression.
        path: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A related path resolved to more than one node.
    #[error("ambiguous related node: `{path}` selected {count} nodes, expected at most one")]
    AmbiguousRelatedNode {
        /// The related path expression.
        path: String,
        /// Number of nodes it selected.
        count: usize,
    },

    /// A path climbed out of a node whose document has been dropped.
    #[error("path `{path}` climbs out of a node whose document was dropped")]
    DetachedNode {
        /// The path expression being evaluated.
        path: String,
    },

    /// Modified nodes were left without an action after classification.
    ///
    /// This is a logic defect, never a user error.
    #[error("{remaining} modified node(s) left unclassified after action classification")]
    UnclassifiedNodes {
        /// Number of modified nodes without an action.
        remaining: usize,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML error from quick-xml.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl Error {
    /// Builds an [`Error::InvalidPath`].
    pub(crate) fn invalid_path(path: &str, reason: impl Into<String>) -> Self {
        Error::InvalidPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}
