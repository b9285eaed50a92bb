//! Path dialects for json-delta.
//!
//! Paths address locations inside a JSON tree with a compact dotted syntax:
//!
//! ```text
//! root.orders[id=a].lines[2].qty      identity path
//! root.orders[3].lines[2].qty         index path
//! root.orders[].lines[].qty           array pattern path
//! left_root.orders[3].lines[2].qty    viewer path
//! ```
//!
//! Every dialect is its own type. Converting between identity and index
//! addressing needs a concrete tree and is done by the `json-delta` crate.
//!
//! # Example
//!
//! ```
//! use json_delta_path::{get, IdentityPath, IndexPath};
//! use serde_json::json;
//!
//! let path = IndexPath::parse("root.items[1].qty").unwrap();
//! let doc = json!({"items": [{"qty": 1}, {"qty": 5}]});
//! assert_eq!(get(&doc, &path), Some(&json!(5)));
//!
//! // Identity paths are a superset of index paths, never the other way.
//! let identity: IdentityPath = path.into_identity_path();
//! assert!(IndexPath::parse("root.items[id=a]").is_err());
//! # let _ = identity;
//! ```

use serde_json::Value;

pub mod types;
pub use types::{ParsedPath, Segment, Viewer, ROOT_MARKER};

mod parser;
pub use parser::{PathError, PathParser};

mod dialect;
pub use dialect::{ArrayPatternPath, IdentityPath, IndexPath, ViewerPath};

pub mod util;
pub use util::{
    is_boundary_prefix, is_strict_ancestor, parent_array_pattern, strip_root, strip_viewer,
    structural_depth, with_root,
};

/// Escape a property name for use in a path.
///
/// `.`, `[`, `]` and `\` are backslash-escaped. A leading property that would
/// read as the root marker or a viewer prefix gets its first character
/// escaped too.
///
/// # Example
///
/// ```
/// use json_delta_path::escape_property;
///
/// assert_eq!(escape_property("a.b", false), r"a\.b");
/// assert_eq!(escape_property("plain", false), "plain");
/// assert_eq!(escape_property("root", true), r"\root");
/// assert_eq!(escape_property("root", false), "root");
/// assert_eq!(escape_property("left_hand", true), r"\left_hand");
/// ```
pub fn escape_property(name: &str, leading: bool) -> String {
    let mut out = String::with_capacity(name.len());
    if leading && reads_as_prefix(name) {
        out.push('\\');
    }
    for c in name.chars() {
        if matches!(c, '.' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// A leading property that would otherwise parse as the root marker or a
/// viewer prefix.
fn reads_as_prefix(name: &str) -> bool {
    name == ROOT_MARKER || name.starts_with("left_") || name.starts_with("right_")
}

/// Escape a key or value inside an identity bracket.
///
/// # Example
///
/// ```
/// use json_delta_path::escape_identity_part;
///
/// assert_eq!(escape_identity_part("a|b"), r"a\|b");
/// assert_eq!(escape_identity_part("x=y]"), r"x\=y\]");
/// ```
pub fn escape_identity_part(part: &str) -> String {
    if !part.contains(['=', '|', ']', '\\']) {
        return part.to_string();
    }
    let mut out = String::with_capacity(part.len() + 2);
    for c in part.chars() {
        if matches!(c, '=' | '|' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Get a value from a JSON document by index path.
///
/// Returns `None` for a missing key, an out-of-bounds index, or a hop into
/// a scalar.
///
/// # Example
///
/// ```
/// use json_delta_path::{get, IndexPath};
/// use serde_json::json;
///
/// let doc = json!({"a": [10, 20]});
/// assert_eq!(get(&doc, &IndexPath::parse("root.a[0]").unwrap()), Some(&json!(10)));
/// assert_eq!(get(&doc, &IndexPath::parse("root.a[5]").unwrap()), None);
/// assert_eq!(get(&doc, &IndexPath::root()), Some(&doc));
/// ```
pub fn get<'a>(val: &'a Value, path: &IndexPath) -> Option<&'a Value> {
    get_by_segments(val, path.segments())
}

/// Walk property and index segments. Identity and pattern segments never
/// resolve here.
pub fn get_by_segments<'a>(val: &'a Value, segments: &[Segment]) -> Option<&'a Value> {
    let mut current = val;
    for segment in segments {
        current = match (segment, current) {
            (Segment::Property(key), Value::Object(map)) => map.get(key)?,
            (Segment::Index(i), Value::Array(arr)) => arr.get(*i)?,
            _ => return None,
        };
    }
    Some(current)
}
