//! Path helpers used by the converter and the highlight classifier.

use crate::dialect::ArrayPatternPath;
use crate::parser::{PathError, PathParser};
use crate::types::{ParsedPath, Segment, Viewer};

/// Split off the viewer prefix, returning the side and the untagged path.
/// The root marker is left as it was.
pub fn strip_viewer(path: &str) -> Result<(Option<Viewer>, String), PathError> {
    let parsed = PathParser::parse(path)?;
    let viewer = parsed.viewer;
    Ok((viewer, parsed.without_viewer().to_string()))
}

/// Drop viewer and root prefixes.
pub fn strip_root(path: &str) -> Result<String, PathError> {
    Ok(PathParser::parse(path)?.normalized())
}

/// Add the root marker if missing. A viewer prefix, if present, is kept.
pub fn with_root(path: &str) -> Result<String, PathError> {
    Ok(PathParser::parse(path)?.with_root().to_string())
}

/// Number of structural hops in a path string.
pub fn structural_depth(path: &str) -> Result<usize, PathError> {
    Ok(PathParser::parse(path)?.depth())
}

/// Whether `prefix` textually prefixes `path` and ends exactly on a segment
/// boundary, so `contributions` does not prefix `contributionType`.
///
/// Both arguments are expected in the same spelling (normally the
/// normalized one). The empty path prefixes every non-empty path.
pub fn is_boundary_prefix(prefix: &str, path: &str) -> bool {
    if path.len() <= prefix.len() {
        return false;
    }
    if prefix.is_empty() {
        return true;
    }
    if !path.starts_with(prefix) {
        return false;
    }
    matches!(path.as_bytes()[prefix.len()], b'.' | b'[')
}

/// Whether `ancestor` is a strict structural ancestor of `descendant`:
/// a boundary prefix that is also strictly shallower.
pub fn is_strict_ancestor(ancestor: &str, descendant: &str) -> bool {
    if !is_boundary_prefix(ancestor, descendant) {
        return false;
    }
    match (
        PathParser::parse(ancestor),
        PathParser::parse(descendant),
    ) {
        (Ok(a), Ok(d)) => d.depth() > a.depth() && is_segment_prefix(&a, &d),
        _ => false,
    }
}

fn is_segment_prefix(prefix: &ParsedPath, path: &ParsedPath) -> bool {
    prefix.segments.len() <= path.segments.len()
        && prefix
            .segments
            .iter()
            .zip(&path.segments)
            .all(|(a, b)| a == b)
}

/// Pattern of the nearest array enclosing the location described by
/// `pattern`.
///
/// Everything from the last `[]` hop on is dropped: `a[].b[].c` and
/// `a[].b[]` give `a[].b`; `a[].b` gives `a`. A pattern with no array hop
/// has no enclosing array.
pub fn parent_array_pattern(pattern: &ArrayPatternPath) -> Option<ArrayPatternPath> {
    let last = pattern
        .segments()
        .iter()
        .rposition(|s| matches!(s, Segment::Pattern))?;
    Some(pattern.truncate(last))
}
