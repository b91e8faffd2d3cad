//! Constants used throughout xml-domdiff.

/// Upper bound of the difference degree. Degrees are normalized between 0 and MAX_DEGREE.
pub const MAX_DEGREE: f64 = 1.0;

/// Degree reported for two childless nodes without any difference.
pub const ZERO_CHILDREN_EQUAL: f64 = 0.0;

/// Degree reported for two childless nodes that differ.
pub const ZERO_CHILDREN_DIFFERENT: f64 = MAX_DEGREE;

/// Name of the synthetic element that holds the top-level nodes of a parsed document.
pub const ROOT_NAME: &str = "$ROOT$";

/// Forest name used when a caller does not name its forest.
pub const DEFAULT_FOREST_NAME: &str = "node";

/// Path segment used for text content in difference records.
pub const TEXT_SEGMENT: &str = "#text";

/// Path segment used for comments in difference records.
pub const COMMENT_SEGMENT: &str = "#comment";
