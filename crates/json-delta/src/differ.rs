//! Structural differ.
//!
//! Walks two JSON trees depth first and emits one [`DiffRecord`] per leaf
//! divergence, addressed by [`IdentityPath`]. Arrays whose elements carry an
//! identity key are matched by that key, so reordering alone produces no
//! records.

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use json_delta_path::{ArrayPatternPath, IdentityPath};

use crate::config::CompareOptions;
use crate::error::DeltaResult;
use crate::identity::{detect_identity_key, known_key_applies, IdentityKey};
use crate::observer::{CompareObserver, TracingObserver};

// ── Records ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    Added,
    Removed,
    Changed,
}

impl DiffKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DiffKind::Added => "added",
            DiffKind::Removed => "removed",
            DiffKind::Changed => "changed",
        }
    }
}

impl fmt::Display for DiffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One divergence between the two trees.
///
/// `before` is present for removed and changed records, `after` for added
/// and changed ones. The constructors are the only way to build a record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffRecord {
    path: IdentityPath,
    kind: DiffKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    before: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    after: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    identity_key_used: Option<String>,
}

impl DiffRecord {
    pub fn added(path: IdentityPath, after: Value) -> Self {
        Self {
            path,
            kind: DiffKind::Added,
            before: None,
            after: Some(after),
            identity_key_used: None,
        }
    }

    pub fn removed(path: IdentityPath, before: Value) -> Self {
        Self {
            path,
            kind: DiffKind::Removed,
            before: Some(before),
            after: None,
            identity_key_used: None,
        }
    }

    pub fn changed(path: IdentityPath, before: Value, after: Value) -> Self {
        Self {
            path,
            kind: DiffKind::Changed,
            before: Some(before),
            after: Some(after),
            identity_key_used: None,
        }
    }

    /// Record the identity key of the innermost keyed array on the path.
    pub fn with_identity_key(mut self, key: Option<String>) -> Self {
        self.identity_key_used = key;
        self
    }

    pub fn path(&self) -> &IdentityPath {
        &self.path
    }

    pub fn kind(&self) -> DiffKind {
        self.kind
    }

    pub fn before(&self) -> Option<&Value> {
        self.before.as_ref()
    }

    pub fn after(&self) -> Option<&Value> {
        self.after.as_ref()
    }

    pub fn identity_key_used(&self) -> Option<&str> {
        self.identity_key_used.as_deref()
    }
}

/// An array shape for which an identity key was found.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityKeyInfo {
    pub array_pattern_path: ArrayPatternPath,
    /// Property name, or `+`-joined names for a composite key.
    pub identity_key: String,
    pub is_composite: bool,
    pub size_left: usize,
    pub size_right: usize,
}

/// Counts by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub added: usize,
    pub removed: usize,
    pub changed: usize,
}

/// The result of comparing two trees.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Comparison {
    pub diffs: Vec<DiffRecord>,
    /// One entry per distinct `(array_pattern_path, identity_key)`, in order
    /// of first discovery.
    pub identity_keys: Vec<IdentityKeyInfo>,
}

impl Comparison {
    /// Returns `true` if the trees are equal.
    pub fn is_empty(&self) -> bool {
        self.diffs.is_empty()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.diffs.len()
    }

    pub fn summary(&self) -> DiffSummary {
        let mut summary = DiffSummary::default();
        for record in &self.diffs {
            match record.kind {
                DiffKind::Added => summary.added += 1,
                DiffKind::Removed => summary.removed += 1,
                DiffKind::Changed => summary.changed += 1,
            }
        }
        summary
    }
}

// ── Public API ────────────────────────────────────────────────────────────

/// Compare two trees with default options, tracing detection decisions.
pub fn compare(left: &Value, right: &Value) -> Comparison {
    let options = CompareOptions::default();
    run(left, right, &options, &mut TracingObserver)
}

/// Compare two trees with explicit options and observer.
///
/// # Errors
///
/// Returns [`DeltaError::InvalidConfig`](crate::DeltaError::InvalidConfig)
/// if the detector thresholds are out of range.
pub fn compare_with(
    left: &Value,
    right: &Value,
    options: &CompareOptions,
    observer: &mut dyn CompareObserver,
) -> DeltaResult<Comparison> {
    options.detector.validate()?;
    Ok(run(left, right, options, observer))
}

fn run(
    left: &Value,
    right: &Value,
    options: &CompareOptions,
    observer: &mut dyn CompareObserver,
) -> Comparison {
    let mut differ = Differ {
        options,
        observer,
        diffs: Vec::new(),
        keys: IndexMap::new(),
    };
    differ.diff_at_path(&options.root, left, right, None);
    Comparison {
        diffs: differ.diffs,
        identity_keys: differ.keys.into_values().collect(),
    }
}

// ── Core recursive differ ─────────────────────────────────────────────────

struct Differ<'a> {
    options: &'a CompareOptions,
    observer: &'a mut dyn CompareObserver,
    diffs: Vec<DiffRecord>,
    keys: IndexMap<(ArrayPatternPath, String), IdentityKeyInfo>,
}

/// Keyed elements of one side with their offsets, ordered by identity value.
type KeyedElements<'v> = BTreeMap<Vec<(String, String)>, (usize, &'v Value)>;

impl Differ<'_> {
    fn push(&mut self, record: DiffRecord) {
        self.observer.on_diff(&record);
        self.diffs.push(record);
    }

    /// Containers are never compared as a whole; equal subtrees simply emit
    /// nothing on the way down.
    fn diff_at_path(&mut self, path: &IdentityPath, left: &Value, right: &Value, key: Option<&str>) {
        match (left, right) {
            (Value::Object(l), Value::Object(r)) => self.diff_obj(path, l, r, key),
            (Value::Array(l), Value::Array(r)) => self.diff_arr(path, l, r, key),
            _ if left == right => {}
            _ => {
                let record = DiffRecord::changed(path.clone(), left.clone(), right.clone())
                    .with_identity_key(key.map(str::to_string));
                self.push(record);
            }
        }
    }

    fn diff_obj(
        &mut self,
        path: &IdentityPath,
        left: &Map<String, Value>,
        right: &Map<String, Value>,
        key: Option<&str>,
    ) {
        for (name, l) in left {
            let child = path.property(name.as_str());
            match right.get(name) {
                Some(r) => self.diff_at_path(&child, l, r, key),
                None => {
                    let record = DiffRecord::removed(child, l.clone())
                        .with_identity_key(key.map(str::to_string));
                    self.push(record);
                }
            }
        }
        for (name, r) in right {
            if !left.contains_key(name) {
                let record = DiffRecord::added(path.property(name.as_str()), r.clone())
                    .with_identity_key(key.map(str::to_string));
                self.push(record);
            }
        }
    }

    /// Only arrays that differ (by content or by order) are reported to the
    /// observer and kept in the catalog.
    fn diff_arr(&mut self, path: &IdentityPath, left: &[Value], right: &[Value], key: Option<&str>) {
        let pattern = path.to_array_pattern();
        let before = self.diffs.len();
        match self.identity_key_for(&pattern, left, right) {
            Some(identity) => {
                let slot = (pattern, identity.to_string());
                let fresh = !self.keys.contains_key(&slot);
                if fresh {
                    self.keys.insert(
                        slot.clone(),
                        IdentityKeyInfo {
                            array_pattern_path: slot.0.clone(),
                            identity_key: slot.1.clone(),
                            is_composite: identity.is_composite(),
                            size_left: left.len(),
                            size_right: right.len(),
                        },
                    );
                }
                let moved = self.diff_arr_keyed(path, left, right, &identity);
                let differs = moved || left.len() != right.len() || self.diffs.len() > before;
                if differs {
                    if let Some(info) = self.keys.get(&slot).cloned() {
                        self.observer.on_identity_key(&info);
                    }
                } else if fresh {
                    self.keys.shift_remove(&slot);
                }
            }
            None => {
                self.diff_arr_positional(path, left, right, key);
                if self.diffs.len() > before && (left.len() > 1 || right.len() > 1) {
                    self.observer
                        .on_positional_fallback(&pattern, left.len(), right.len());
                }
            }
        }
    }

    /// A known key for this shape wins if it still qualifies; otherwise run
    /// detection.
    fn identity_key_for(
        &self,
        pattern: &ArrayPatternPath,
        left: &[Value],
        right: &[Value],
    ) -> Option<IdentityKey> {
        let detector = &self.options.detector;
        let shape = pattern.normalized();
        let known = self
            .options
            .known_keys
            .iter()
            .filter(|info| info.array_pattern_path.normalized() == shape)
            .filter_map(|info| info.identity_key.parse::<IdentityKey>().ok())
            .find(|k| {
                (left.len() > 1 || right.len() > 1) && known_key_applies(k, left, right, detector)
            });
        known.or_else(|| detect_identity_key(left, right, detector))
    }

    /// Returns whether any matched element sits at a different offset on
    /// the two sides.
    fn diff_arr_keyed(
        &mut self,
        path: &IdentityPath,
        left: &[Value],
        right: &[Value],
        identity: &IdentityKey,
    ) -> bool {
        let key_name = identity.to_string();
        let (left_keyed, left_rest) = split_keyed(left, identity);
        let (right_keyed, right_rest) = split_keyed(right, identity);

        for (pairs, (_, l)) in &left_keyed {
            if !right_keyed.contains_key(pairs) {
                let record = DiffRecord::removed(path.identity(pairs.clone()), (*l).clone())
                    .with_identity_key(Some(key_name.clone()));
                self.push(record);
            }
        }
        for (pairs, (_, r)) in &right_keyed {
            if !left_keyed.contains_key(pairs) {
                let record = DiffRecord::added(path.identity(pairs.clone()), (*r).clone())
                    .with_identity_key(Some(key_name.clone()));
                self.push(record);
            }
        }
        let mut moved = false;
        for (pairs, (li, l)) in &left_keyed {
            if let Some((ri, r)) = right_keyed.get(pairs) {
                moved |= li != ri;
                self.diff_at_path(&path.identity(pairs.clone()), l, r, Some(&key_name));
            }
        }

        // Elements without the key (non-objects within the tolerated share)
        // are addressed by offset. An offset names the same slot on both
        // sides only when both sides have a keyless element there.
        for (li, l) in &left_rest {
            match right_rest.iter().find(|(ri, _)| ri == li) {
                Some((_, r)) => self.diff_at_path(&path.index(*li), l, r, Some(&key_name)),
                None => {
                    let record = DiffRecord::removed(path.index(*li), (*l).clone())
                        .with_identity_key(Some(key_name.clone()));
                    self.push(record);
                }
            }
        }
        for (ri, r) in &right_rest {
            if !left_rest.iter().any(|(li, _)| li == ri) {
                let record = DiffRecord::added(path.index(*ri), (*r).clone())
                    .with_identity_key(Some(key_name.clone()));
                self.push(record);
            }
        }
        moved
    }

    fn diff_arr_positional(
        &mut self,
        path: &IdentityPath,
        left: &[Value],
        right: &[Value],
        key: Option<&str>,
    ) {
        let common = left.len().min(right.len());
        for i in 0..common {
            self.diff_at_path(&path.index(i), &left[i], &right[i], key);
        }
        for (i, l) in left.iter().enumerate().skip(common) {
            let record =
                DiffRecord::removed(path.index(i), l.clone()).with_identity_key(key.map(str::to_string));
            self.push(record);
        }
        for (i, r) in right.iter().enumerate().skip(common) {
            let record =
                DiffRecord::added(path.index(i), r.clone()).with_identity_key(key.map(str::to_string));
            self.push(record);
        }
    }
}

/// Split an array into elements carrying the key (sorted by key value) and
/// the rest with their original offsets.
fn split_keyed<'v>(items: &'v [Value], identity: &IdentityKey) -> (KeyedElements<'v>, Vec<(usize, &'v Value)>) {
    let mut keyed = BTreeMap::new();
    let mut rest = Vec::new();
    for (i, item) in items.iter().enumerate() {
        match item.as_object().and_then(|obj| identity.value_of(obj)) {
            Some(pairs) => {
                keyed.insert(pairs, (i, item));
            }
            None => rest.push((i, item)),
        }
    }
    (keyed, rest)
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{NoopObserver, RecordingObserver};
    use serde_json::json;

    fn paths(cmp: &Comparison) -> Vec<&str> {
        cmp.diffs.iter().map(|d| d.path().as_str()).collect()
    }

    #[test]
    fn diff_equal_docs() {
        let cmp = compare(&json!({"a": [1, {"b": null}]}), &json!({"a": [1, {"b": null}]}));
        assert!(cmp.is_empty());
        assert!(cmp.identity_keys.is_empty());
    }

    #[test]
    fn diff_replace_scalar_at_root() {
        let cmp = compare(&json!(1), &json!("1"));
        assert_eq!(cmp.len(), 1);
        assert_eq!(cmp.diffs[0].path().as_str(), "root");
        assert_eq!(cmp.diffs[0].kind(), DiffKind::Changed);
        assert_eq!(cmp.diffs[0].before(), Some(&json!(1)));
        assert_eq!(cmp.diffs[0].after(), Some(&json!("1")));
    }

    #[test]
    fn diff_type_mismatch_is_changed() {
        let cmp = compare(&json!({"a": {"x": 1}}), &json!({"a": [1]}));
        assert_eq!(paths(&cmp), vec!["root.a"]);
        assert_eq!(cmp.diffs[0].kind(), DiffKind::Changed);
    }

    #[test]
    fn diff_object_keys_in_union_order() {
        let cmp = compare(
            &json!({"b": 1, "gone": true, "a": 1}),
            &json!({"new": 0, "a": 2, "b": 1}),
        );
        assert_eq!(paths(&cmp), vec!["root.gone", "root.a", "root.new"]);
        let kinds: Vec<_> = cmp.diffs.iter().map(|d| d.kind()).collect();
        assert_eq!(kinds, vec![DiffKind::Removed, DiffKind::Changed, DiffKind::Added]);
        assert_eq!(cmp.diffs[0].after(), None);
        assert_eq!(cmp.diffs[2].before(), None);
    }

    #[test]
    fn diff_positional_array() {
        let cmp = compare(&json!({"v": [1, 2, 3]}), &json!({"v": [1, 5]}));
        assert_eq!(paths(&cmp), vec!["root.v[1]", "root.v[2]"]);
        assert_eq!(cmp.diffs[1].kind(), DiffKind::Removed);
    }

    #[test]
    fn diff_keyed_array_reordered() {
        let cmp = compare(
            &json!({"contributions": [{"id": "a", "amt": 7000}, {"id": "b", "amt": 1000}]}),
            &json!({"contributions": [{"id": "b", "amt": 1000}, {"id": "a", "amt": 3500}]}),
        );
        assert_eq!(paths(&cmp), vec!["root.contributions[id=a].amt"]);
        assert_eq!(cmp.diffs[0].identity_key_used(), Some("id"));
        assert_eq!(cmp.identity_keys.len(), 1);
        assert_eq!(cmp.identity_keys[0].array_pattern_path.as_str(), "root.contributions");
        assert_eq!(cmp.identity_keys[0].identity_key, "id");
        assert_eq!(cmp.identity_keys[0].size_left, 2);
    }

    #[test]
    fn diff_keyed_added_and_removed() {
        let cmp = compare(
            &json!([{"name": "X", "v": 1}, {"name": "Y", "v": 2}]),
            &json!([{"name": "X", "v": 1}, {"name": "Z", "v": 3}]),
        );
        assert_eq!(paths(&cmp), vec!["root[name=Y]", "root[name=Z]"]);
        assert_eq!(cmp.summary(), DiffSummary { added: 1, removed: 1, changed: 0 });
    }

    #[test]
    fn diff_catalog_dedups_repeated_shapes() {
        let cmp = compare(
            &json!({"orders": [
                {"id": 1, "lines": [{"sku": "a", "q": 1}, {"sku": "b", "q": 1}]},
                {"id": 2, "lines": [{"sku": "c", "q": 1}, {"sku": "d", "q": 1}]}
            ]}),
            &json!({"orders": [
                {"id": 2, "lines": [{"sku": "d", "q": 2}, {"sku": "c", "q": 1}]},
                {"id": 1, "lines": [{"sku": "b", "q": 1}, {"sku": "a", "q": 9}]}
            ]}),
        );
        assert_eq!(
            paths(&cmp),
            vec!["root.orders[id=1].lines[sku=a].q", "root.orders[id=2].lines[sku=d].q"]
        );
        let shapes: Vec<_> = cmp
            .identity_keys
            .iter()
            .map(|k| (k.array_pattern_path.as_str(), k.identity_key.as_str()))
            .collect();
        assert_eq!(shapes, vec![("root.orders", "id"), ("root.orders[].lines", "sku")]);
    }

    #[test]
    fn diff_known_key_is_preferred() {
        let left = json!({"items": [{"id": 1, "code": "x"}, {"id": 2, "code": "y"}]});
        let right = json!({"items": [{"id": 2, "code": "x"}, {"id": 1, "code": "y"}]});

        let detected = compare(&left, &right);
        assert_eq!(detected.identity_keys[0].identity_key, "id");

        let options = CompareOptions {
            known_keys: vec![IdentityKeyInfo {
                array_pattern_path: ArrayPatternPath::parse("root.items").unwrap(),
                identity_key: "code".into(),
                is_composite: false,
                size_left: 2,
                size_right: 2,
            }],
            ..CompareOptions::default()
        };
        let hinted = compare_with(&left, &right, &options, &mut RecordingObserver::default()).unwrap();
        assert_eq!(hinted.identity_keys[0].identity_key, "code");
        assert_eq!(paths(&hinted), vec!["root.items[code=x].id", "root.items[code=y].id"]);
    }

    #[test]
    fn diff_custom_root() {
        let options = CompareOptions {
            root: IdentityPath::parse("root.response").unwrap(),
            ..CompareOptions::default()
        };
        let cmp = compare_with(&json!({"a": 1}), &json!({"a": 2}), &options, &mut RecordingObserver::default())
            .unwrap();
        assert_eq!(paths(&cmp), vec!["root.response.a"]);
    }

    #[test]
    fn diff_observer_sees_decisions() {
        let mut observer = RecordingObserver::default();
        compare_with(
            &json!({"k": [{"id": 1}, {"id": 2}], "p": [1, 2]}),
            &json!({"k": [{"id": 2}], "p": [2, 1]}),
            &CompareOptions::default(),
            &mut observer,
        )
        .unwrap();
        assert_eq!(observer.identity_keys.len(), 1);
        assert_eq!(observer.positional.len(), 1);
        assert_eq!(observer.positional[0].as_str(), "root.p");
        assert_eq!(observer.diffs, 3);
    }

    #[test]
    fn diff_invalid_config_rejected() {
        let mut options = CompareOptions::default();
        options.detector.min_object_ratio = -1.0;
        let result = compare_with(&json!(1), &json!(2), &options, &mut NoopObserver);
        assert!(result.is_err());
    }

    #[test]
    fn diff_keyed_array_with_stray_scalar() {
        let cmp = compare(
            &json!([{"id": "a"}, {"id": "b"}, {"id": "c"}, {"id": "d"}, "note"]),
            &json!([{"id": "d"}, {"id": "c"}, {"id": "b"}, {"id": "a"}, "memo"]),
        );
        assert_eq!(paths(&cmp), vec!["root[4]"]);
        assert_eq!(cmp.diffs[0].kind(), DiffKind::Changed);
    }

    #[test]
    fn diff_keyed_array_scalars_at_different_offsets() {
        let cmp = compare(
            &json!([{"id": "a"}, {"id": "b"}, {"id": "c"}, {"id": "d"}, "x"]),
            &json!(["y", {"id": "a"}, {"id": "b"}, {"id": "c"}, {"id": "d"}]),
        );
        assert_eq!(paths(&cmp), vec!["root[4]", "root[0]"]);
        assert_eq!(cmp.diffs[0].kind(), DiffKind::Removed);
        assert_eq!(cmp.diffs[0].before(), Some(&json!("x")));
        assert_eq!(cmp.diffs[1].kind(), DiffKind::Added);
        assert_eq!(cmp.diffs[1].after(), Some(&json!("y")));
    }

    #[test]
    fn diff_keyed_pure_reorder_is_cataloged() {
        let mut observer = RecordingObserver::default();
        let cmp = compare_with(
            &json!({"items": [{"id": 1}, {"id": 2}]}),
            &json!({"items": [{"id": 2}, {"id": 1}]}),
            &CompareOptions::default(),
            &mut observer,
        )
        .unwrap();
        assert!(cmp.is_empty());
        assert_eq!(cmp.identity_keys.len(), 1);
        assert_eq!(observer.identity_keys.len(), 1);
    }

    #[test]
    fn diff_equal_nested_arrays_leave_no_trace() {
        let doc = json!({"a": {"rows": [{"id": 1, "tags": [{"k": "x"}, {"k": "y"}]}, {"id": 2, "tags": []}]}, "n": 1});
        let mut changed = doc.clone();
        changed["n"] = json!(2);
        let mut observer = RecordingObserver::default();
        let cmp = compare_with(&doc, &changed, &CompareOptions::default(), &mut observer).unwrap();
        assert_eq!(paths(&cmp), vec!["root.n"]);
        assert!(cmp.identity_keys.is_empty());
        assert!(observer.identity_keys.is_empty());
        assert!(observer.positional.is_empty());
    }

    #[test]
    fn diff_deep_chain_reports_only_the_leaf() {
        let wrap = |inner: Value, depth: usize| {
            let mut obj = Map::new();
            obj.insert(format!("level{depth}"), inner);
            obj.insert("same".into(), json!([1, 2, 3]));
            Value::Object(obj)
        };
        let mut left = json!(0);
        let mut right = json!(1);
        for depth in 0..200 {
            left = wrap(left, depth);
            right = wrap(right, depth);
        }
        let cmp = compare(&left, &right);
        assert_eq!(cmp.len(), 1);
        assert_eq!(cmp.diffs[0].path().depth(), 200);
        assert_eq!(cmp.diffs[0].kind(), DiffKind::Changed);
    }

    #[test]
    fn diff_serializes_machine_readable() {
        let cmp = compare(&json!({"a": 1}), &json!({"a": 2, "b": true}));
        let out = serde_json::to_value(&cmp.diffs).unwrap();
        assert_eq!(
            out,
            json!([
                {"path": "root.a", "kind": "changed", "before": 1, "after": 2},
                {"path": "root.b", "kind": "added", "after": true}
            ])
        );
    }
}
