//! Conversion between identity and index addressing against a concrete tree.
//!
//! The same identity can sit at different offsets on the two sides of a
//! comparison, so every conversion here needs the tree it is valid for.
//! A location that does not exist in that tree yields `None`.

use std::collections::BTreeSet;

use serde_json::Value;

use json_delta_path::{
    ArrayPatternPath, IdentityPath, IndexPath, ParsedPath, PathError, PathParser, Segment, Viewer,
    ViewerPath,
};

use crate::differ::IdentityKeyInfo;
use crate::identity::IdentityKey;

/// A tree together with the identity keys discovered for it.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    pub tree: &'a Value,
    pub keys: &'a [IdentityKeyInfo],
}

impl<'a> ResolveContext<'a> {
    pub fn new(tree: &'a Value, keys: &'a [IdentityKeyInfo]) -> Self {
        Self { tree, keys }
    }

    /// Keys registered for the array at `pattern`, in catalog order.
    fn keys_for(&self, pattern: &ParsedPath) -> Vec<IdentityKey> {
        let shape = pattern.normalized();
        self.keys
            .iter()
            .filter(|info| info.array_pattern_path.normalized() == shape)
            .filter_map(|info| info.identity_key.parse().ok())
            .collect()
    }
}

/// Resolve an identity path to the offsets it has in `ctx.tree`.
///
/// An identity hop only resolves when its field names form a key the
/// catalog records for that array shape, and exactly one element carries
/// those values.
///
/// Returns `None` when an identity value or property is absent, or an index
/// is out of bounds, which is the normal outcome for a location that only
/// exists on the other side.
pub fn identity_to_index(path: &IdentityPath, ctx: &ResolveContext<'_>) -> Option<IndexPath> {
    let mut out = if path.is_rooted() {
        IndexPath::root()
    } else {
        IndexPath::empty()
    };
    let mut shape = ParsedPath {
        viewer: None,
        rooted: path.is_rooted(),
        segments: Vec::new(),
    };
    let mut current = ctx.tree;
    for segment in path.segments() {
        match (segment, current) {
            (Segment::Property(name), Value::Object(map)) => {
                current = map.get(name)?;
                out = out.property(name.as_str());
                shape.push(Segment::Property(name.clone()));
            }
            (Segment::Index(i), Value::Array(items)) => {
                current = items.get(*i)?;
                out = out.index(*i);
                shape.push(Segment::Pattern);
            }
            (Segment::Identity(pairs), Value::Array(items)) => {
                let known = ctx.keys_for(&shape).iter().any(|key| {
                    key.fields().len() == pairs.len()
                        && key.fields().iter().zip(pairs).all(|(f, (name, _))| f == name)
                });
                if !known {
                    return None;
                }
                let mut hits = items
                    .iter()
                    .enumerate()
                    .filter(|(_, item)| IdentityKey::matches(pairs, item));
                let (i, item) = hits.next()?;
                if hits.next().is_some() {
                    return None;
                }
                current = item;
                out = out.index(i);
                shape.push(Segment::Pattern);
            }
            _ => return None,
        }
    }
    Some(out)
}

/// Re-address an index path by identity wherever the catalog has a key for
/// the array being traversed.
///
/// Arrays without a key, elements missing the key, and identities that
/// are not unique within this tree's array keep their `[n]` hop. Returns
/// `None` when the path does not resolve in `ctx.tree`.
pub fn index_to_identity(path: &IndexPath, ctx: &ResolveContext<'_>) -> Option<IdentityPath> {
    let mut out = if path.is_rooted() {
        IdentityPath::root()
    } else {
        IdentityPath::empty()
    };
    let mut shape = ParsedPath {
        viewer: None,
        rooted: path.is_rooted(),
        segments: Vec::new(),
    };
    let mut current = ctx.tree;
    for segment in path.segments() {
        match (segment, current) {
            (Segment::Property(name), Value::Object(map)) => {
                current = map.get(name)?;
                out = out.property(name.as_str());
                shape.push(Segment::Property(name.clone()));
            }
            (Segment::Index(i), Value::Array(items)) => {
                let item = items.get(*i)?;
                out = match unique_identity(&ctx.keys_for(&shape), items, item) {
                    Some(pairs) => out.identity(pairs),
                    None => out.index(*i),
                };
                current = item;
                shape.push(Segment::Pattern);
            }
            _ => return None,
        }
    }
    Some(out)
}

/// First key whose value on `item` identifies exactly one element.
fn unique_identity(keys: &[IdentityKey], items: &[Value], item: &Value) -> Option<Vec<(String, String)>> {
    let obj = item.as_object()?;
    keys.iter().find_map(|key| {
        let pairs = key.value_of(obj)?;
        let hits = items
            .iter()
            .filter(|other| IdentityKey::matches(&pairs, other))
            .count();
        (hits == 1).then_some(pairs)
    })
}

/// Identity path resolved and tagged for one side.
pub fn identity_to_viewer(
    path: &IdentityPath,
    side: Viewer,
    ctx: &ResolveContext<'_>,
) -> Option<ViewerPath> {
    identity_to_index(path, ctx).map(|p| p.for_viewer(side))
}

/// Viewer path re-addressed by identity. `ctx` must be the tree of the
/// path's own side.
pub fn viewer_to_identity(path: &ViewerPath, ctx: &ResolveContext<'_>) -> Option<IdentityPath> {
    index_to_identity(&path.index_path(), ctx)
}

/// Every known spelling of a path, with viewer and root prefixes stripped.
///
/// Without context this is just the stripped form. With context, the
/// index form and the identity form in that tree are added when the path
/// resolves there. Two references to the same node share at least one
/// spelling.
///
/// # Errors
///
/// Returns [`PathError`] if `path` is malformed.
pub fn normalize_for_comparison(
    path: &str,
    ctx: Option<&ResolveContext<'_>>,
) -> Result<BTreeSet<String>, PathError> {
    let parsed = PathParser::parse(path)?;
    let mut variants = BTreeSet::new();
    variants.insert(parsed.normalized());

    let Some(ctx) = ctx else {
        return Ok(variants);
    };
    // Pattern paths name a shape, not a node.
    let Ok(identity) = IdentityPath::from_parsed(parsed.without_viewer()) else {
        return Ok(variants);
    };
    if let Some(index) = identity_to_index(&identity, ctx) {
        variants.insert(index.normalized());
        if let Some(canonical) = index_to_identity(&index, ctx) {
            variants.insert(canonical.normalized());
        }
    }
    Ok(variants)
}

/// Pick concrete offsets for a shape-only path.
///
/// At each `[]` hop the first element whose subtree contains the rest of
/// the pattern is chosen; if none does, offset 0 is used.
pub fn resolve_array_pattern(pattern: &ArrayPatternPath, tree: &Value) -> IndexPath {
    let start = if pattern.is_rooted() {
        IndexPath::root()
    } else {
        IndexPath::empty()
    };
    resolve_from(start, Some(tree), pattern.segments())
}

fn resolve_from(mut out: IndexPath, mut current: Option<&Value>, segments: &[Segment]) -> IndexPath {
    for (n, segment) in segments.iter().enumerate() {
        match segment {
            Segment::Property(name) => {
                current = current.and_then(|v| v.get(name.as_str()));
                out = out.property(name.as_str());
            }
            _ => {
                let items = current.and_then(Value::as_array);
                let rest = &segments[n + 1..];
                let chosen = items
                    .and_then(|items| items.iter().position(|item| contains_shape(item, rest)))
                    .unwrap_or(0);
                current = items.and_then(|items| items.get(chosen));
                out = out.index(chosen);
            }
        }
    }
    out
}

/// Whether `value` has the structure described by `segments`.
fn contains_shape(value: &Value, segments: &[Segment]) -> bool {
    let Some((first, rest)) = segments.split_first() else {
        return true;
    };
    match (first, value) {
        (Segment::Property(name), Value::Object(map)) => {
            map.get(name).is_some_and(|child| contains_shape(child, rest))
        }
        (Segment::Pattern, Value::Array(items)) => {
            items.iter().any(|item| contains_shape(item, rest))
        }
        _ => false,
    }
}
