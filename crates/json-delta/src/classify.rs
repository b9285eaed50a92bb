//! Highlight classification.
//!
//! Decide how an arbitrary tree location relates to a diff set: it is a
//! diff itself, it sits inside a diffed subtree, it contains a diff, or it
//! is untouched. Container nodes are never recorded as diffs; their status
//! is derived here.

use std::collections::BTreeSet;

use serde::Serialize;

use json_delta_path::{is_boundary_prefix, PathError, PathParser, Viewer};

use crate::convert::{normalize_for_comparison, ResolveContext};
use crate::differ::{DiffKind, DiffRecord};

/// Relationship of a location to the diff set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "relation", content = "kind", rename_all = "lowercase")]
pub enum Classification {
    /// The location is itself a diff.
    Exact(DiffKind),
    /// The location lies inside a diffed subtree; carries the nearest
    /// enclosing diff's kind.
    Descendant(DiffKind),
    /// The location contains at least one diff.
    Ancestor,
    None,
}

impl Classification {
    pub fn is_highlighted(self) -> bool {
        !matches!(self, Classification::None)
    }
}

/// A normalized spelling together with its hop count.
#[derive(Debug, Clone)]
struct Spelling {
    text: String,
    depth: usize,
}

fn spellings(path: &str, ctx: Option<&ResolveContext<'_>>) -> Result<Vec<Spelling>, PathError> {
    normalize_for_comparison(path, ctx)?
        .into_iter()
        .map(|text| {
            let depth = PathParser::parse(&text)?.depth();
            Ok(Spelling { text, depth })
        })
        .collect()
}

struct Entry {
    kind: DiffKind,
    left: Vec<Spelling>,
    right: Vec<Spelling>,
}

impl Entry {
    fn on(&self, side: Viewer) -> &[Spelling] {
        match side {
            Viewer::Left => &self.left,
            Viewer::Right => &self.right,
        }
    }

    /// Added nodes only exist on the right, removed ones only on the left.
    fn exists_on(&self, side: Viewer) -> bool {
        match self.kind {
            DiffKind::Added => side == Viewer::Right,
            DiffKind::Removed => side == Viewer::Left,
            DiffKind::Changed => true,
        }
    }

    /// Spellings that may name the node itself on `side`.
    fn located_on(&self, side: Viewer) -> &[Spelling] {
        if self.exists_on(side) {
            self.on(side)
        } else {
            &[]
        }
    }
}

/// Classifier over one comparison's diff list.
///
/// Each diff's spellings are computed once at construction, so per-node
/// calls only normalize the query. Results depend only on the inputs, which
/// makes them safe to memoize by `(query, side)` for a given diff list.
pub struct Classifier<'a> {
    entries: Vec<Entry>,
    left: Option<ResolveContext<'a>>,
    right: Option<ResolveContext<'a>>,
}

impl<'a> Classifier<'a> {
    /// Build a classifier. Contexts are optional; without one, only the
    /// spellings the paths already carry are compared for that side.
    ///
    /// # Errors
    ///
    /// Returns [`PathError`] if a diff path fails to re-parse, which cannot
    /// happen for records produced by [`compare`](crate::compare).
    pub fn new(
        diffs: &[DiffRecord],
        left: Option<ResolveContext<'a>>,
        right: Option<ResolveContext<'a>>,
    ) -> Result<Self, PathError> {
        let entries = diffs
            .iter()
            .map(|diff| {
                let path = diff.path().as_str();
                let kind = diff.kind();
                // On the side where the node is absent its path is not
                // resolved: an offset there may name an unrelated element.
                let left_ctx = left.as_ref().filter(|_| kind != DiffKind::Added);
                let right_ctx = right.as_ref().filter(|_| kind != DiffKind::Removed);
                Ok(Entry {
                    kind,
                    left: spellings(path, left_ctx)?,
                    right: spellings(path, right_ctx)?,
                })
            })
            .collect::<Result<Vec<_>, PathError>>()?;
        Ok(Self {
            entries,
            left,
            right,
        })
    }

    /// Classify `query` (any dialect, with or without prefixes) as seen on
    /// `side`.
    ///
    /// # Errors
    ///
    /// Returns [`PathError`] if `query` is malformed.
    pub fn classify(&self, query: &str, side: Viewer) -> Result<Classification, PathError> {
        let ctx = match side {
            Viewer::Left => self.left.as_ref(),
            Viewer::Right => self.right.as_ref(),
        };
        let query = spellings(query, ctx)?;
        let query_texts: BTreeSet<&str> = query.iter().map(|s| s.text.as_str()).collect();
        for entry in &self.entries {
            if entry
                .located_on(side)
                .iter()
                .any(|s| query_texts.contains(s.text.as_str()))
            {
                return Ok(Classification::Exact(entry.kind));
            }
        }

        // Nearest enclosing diff decides the kind.
        let mut nearest: Option<(usize, DiffKind)> = None;
        for entry in &self.entries {
            for diff in entry.located_on(side) {
                if query.iter().any(|q| encloses(diff, q))
                    && nearest.map_or(true, |(depth, _)| diff.depth > depth)
                {
                    nearest = Some((diff.depth, entry.kind));
                }
            }
        }
        if let Some((_, kind)) = nearest {
            return Ok(Classification::Descendant(kind));
        }

        for entry in &self.entries {
            if entry
                .on(side)
                .iter()
                .any(|diff| query.iter().any(|q| encloses(q, diff)))
            {
                return Ok(Classification::Ancestor);
            }
        }

        Ok(Classification::None)
    }
}

/// `outer` is a boundary prefix of `inner` with strictly fewer hops.
fn encloses(outer: &Spelling, inner: &Spelling) -> bool {
    inner.depth > outer.depth && is_boundary_prefix(&outer.text, &inner.text)
}

/// One-shot classification against a single side.
///
/// # Errors
///
/// Returns [`PathError`] if `query` is malformed.
pub fn classify(
    diffs: &[DiffRecord],
    query: &str,
    side: Viewer,
    ctx: Option<ResolveContext<'_>>,
) -> Result<Classification, PathError> {
    let (left, right) = match side {
        Viewer::Left => (ctx, None),
        Viewer::Right => (None, ctx),
    };
    Classifier::new(diffs, left, right)?.classify(query, side)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::differ::compare;
    use serde_json::json;

    #[test]
    fn test_exact_descendant_ancestor_none() {
        let left = json!({
            "contributions": [{"id": "a", "amt": 7000}, {"id": "b", "amt": 1000}],
            "contributionType": "x"
        });
        let right = json!({
            "contributions": [{"id": "b", "amt": 1000}, {"id": "a", "amt": 3500}],
            "contributionType": "x"
        });
        let cmp = compare(&left, &right);
        let diffs = &cmp.diffs;

        let c = |q: &str| classify(diffs, q, Viewer::Left, None).unwrap();
        assert_eq!(c("root.contributions[id=a].amt"), Classification::Exact(DiffKind::Changed));
        assert_eq!(c("contributions[id=a].amt"), Classification::Exact(DiffKind::Changed));
        assert_eq!(c("root.contributions[id=a]"), Classification::Ancestor);
        assert_eq!(c("root.contributions"), Classification::Ancestor);
        assert_eq!(c("root"), Classification::Ancestor);
        assert_eq!(c("root.contributionType"), Classification::None);
        assert_eq!(c("root.contributions[id=b]"), Classification::None);
    }

    #[test]
    fn test_descendant_of_added_subtree() {
        let cmp = compare(&json!({"a": {}}), &json!({"a": {"b": {"c": 1}}}));
        let c = classify(&cmp.diffs, "right_root.a.b.c", Viewer::Right, None).unwrap();
        assert_eq!(c, Classification::Descendant(DiffKind::Added));
    }

    #[test]
    fn test_sibling_prefix_is_not_related() {
        let cmp = compare(
            &json!({"contribution": 1, "contributionType": 1}),
            &json!({"contribution": 2, "contributionType": 1}),
        );
        let c = classify(&cmp.diffs, "root.contributionType", Viewer::Left, None).unwrap();
        assert_eq!(c, Classification::None);
    }

    #[test]
    fn test_index_query_resolved_with_context() {
        let left = json!({"items": [{"id": "a", "v": 1}, {"id": "b", "v": 1}]});
        let right = json!({"items": [{"id": "b", "v": 2}, {"id": "a", "v": 1}]});
        let cmp = compare(&left, &right);
        let classifier = Classifier::new(
            &cmp.diffs,
            Some(ResolveContext::new(&left, &cmp.identity_keys)),
            Some(ResolveContext::new(&right, &cmp.identity_keys)),
        )
        .unwrap();

        assert_eq!(
            classifier.classify("left_root.items[1].v", Viewer::Left).unwrap(),
            Classification::Exact(DiffKind::Changed)
        );
        assert_eq!(
            classifier.classify("right_root.items[0].v", Viewer::Right).unwrap(),
            Classification::Exact(DiffKind::Changed)
        );
        assert_eq!(
            classifier.classify("right_root.items[1].v", Viewer::Right).unwrap(),
            Classification::None
        );
        assert_eq!(
            classifier.classify("right_root.items[0]", Viewer::Right).unwrap(),
            Classification::Ancestor
        );
    }

    #[test]
    fn test_removed_node_not_exact_on_other_side_by_index() {
        let left = json!({"items": [{"id": "a"}, {"id": "b"}]});
        let right = json!({"items": [{"id": "b"}, {"id": "c"}]});
        let cmp = compare(&left, &right);
        let classifier = Classifier::new(
            &cmp.diffs,
            Some(ResolveContext::new(&left, &cmp.identity_keys)),
            Some(ResolveContext::new(&right, &cmp.identity_keys)),
        )
        .unwrap();
        assert_eq!(
            classifier.classify("left_root.items[0]", Viewer::Left).unwrap(),
            Classification::Exact(DiffKind::Removed)
        );
        assert_eq!(
            classifier.classify("right_root.items[0]", Viewer::Right).unwrap(),
            Classification::None
        );
        assert_eq!(
            classifier.classify("right_root.items[1]", Viewer::Right).unwrap(),
            Classification::Exact(DiffKind::Added)
        );
    }

    #[test]
    fn test_keyless_elements_classify_on_their_own_side() {
        let left = json!([{"id": "a"}, {"id": "b"}, {"id": "c"}, {"id": "d"}, "x"]);
        let right = json!(["y", {"id": "a"}, {"id": "b"}, {"id": "c"}, {"id": "d"}]);
        let cmp = compare(&left, &right);
        let classifier = Classifier::new(
            &cmp.diffs,
            Some(ResolveContext::new(&left, &cmp.identity_keys)),
            Some(ResolveContext::new(&right, &cmp.identity_keys)),
        )
        .unwrap();

        let c = |q: &str, side| classifier.classify(q, side).unwrap();
        assert_eq!(c("root[id=d]", Viewer::Right), Classification::None);
        assert_eq!(c("right_root[4]", Viewer::Right), Classification::None);
        assert_eq!(c("right_root[0]", Viewer::Right), Classification::Exact(DiffKind::Added));
        assert_eq!(c("left_root[4]", Viewer::Left), Classification::Exact(DiffKind::Removed));
        assert_eq!(c("left_root[0]", Viewer::Left), Classification::None);
        assert_eq!(c("root", Viewer::Right), Classification::Ancestor);
    }

    #[test]
    fn test_unrooted_viewer_query() {
        let cmp = compare(&json!({"a": 1}), &json!({"a": 2}));
        assert_eq!(
            classify(&cmp.diffs, "left_a", Viewer::Left, None).unwrap(),
            Classification::Exact(DiffKind::Changed)
        );
        assert_eq!(
            classify(&cmp.diffs, "right_a", Viewer::Right, None).unwrap(),
            Classification::Exact(DiffKind::Changed)
        );
    }

    #[test]
    fn test_nearest_enclosing_kind_wins() {
        // The differ never nests records; build overlapping ones by hand.
        let diffs = vec![
            DiffRecord::added(json_delta_path::IdentityPath::parse("root.a").unwrap(), json!({})),
            DiffRecord::changed(
                json_delta_path::IdentityPath::parse("root.a.b").unwrap(),
                json!(1),
                json!(2),
            ),
        ];
        let c = classify(&diffs, "root.a.b.c", Viewer::Right, None).unwrap();
        assert_eq!(c, Classification::Descendant(DiffKind::Changed));
        // The added subtree is absent on the left; only the change encloses.
        let c = classify(&diffs, "root.a.c", Viewer::Left, None).unwrap();
        assert_eq!(c, Classification::None);
        let c = classify(&diffs, "root.a.c", Viewer::Right, None).unwrap();
        assert_eq!(c, Classification::Descendant(DiffKind::Added));
    }

    #[test]
    fn test_malformed_query() {
        let cmp = compare(&json!(1), &json!(2));
        assert!(classify(&cmp.diffs, "root[", Viewer::Left, None).is_err());
    }

    #[test]
    fn test_root_diff_encloses_everything() {
        let cmp = compare(&json!({"a": 1}), &json!([1]));
        assert_eq!(
            classify(&cmp.diffs, "root", Viewer::Left, None).unwrap(),
            Classification::Exact(DiffKind::Changed)
        );
        assert_eq!(
            classify(&cmp.diffs, "root.a", Viewer::Left, None).unwrap(),
            Classification::Descendant(DiffKind::Changed)
        );
    }
}
