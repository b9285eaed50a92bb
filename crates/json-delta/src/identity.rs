//! Identity-key detection for arrays of objects.
//!
//! Given the two versions of an array, pick a property (or a combination of
//! up to three properties) whose values identify each element on both sides,
//! so reordered elements can be matched instead of compared by position.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};
use tracing::debug;

use crate::config::DetectorConfig;
use crate::error::DeltaError;

/// One or more property names that together identify an array element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    fields: Vec<String>,
}

impl IdentityKey {
    pub fn single(field: impl Into<String>) -> Self {
        Self {
            fields: vec![field.into()],
        }
    }

    pub fn composite(fields: Vec<String>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn is_composite(&self) -> bool {
        self.fields.len() > 1
    }

    /// The element's `(field, value)` pairs for this key, or `None` if any
    /// field is missing or not a string/number.
    pub fn value_of(&self, obj: &Map<String, Value>) -> Option<Vec<(String, String)>> {
        self.fields
            .iter()
            .map(|f| obj.get(f).and_then(render_key_value).map(|v| (f.clone(), v)))
            .collect()
    }

    /// Whether `value` is an object whose key values equal `pairs`.
    pub fn matches(pairs: &[(String, String)], value: &Value) -> bool {
        let Value::Object(obj) = value else {
            return false;
        };
        pairs.iter().all(|(field, expected)| {
            obj.get(field)
                .and_then(render_key_value)
                .is_some_and(|actual| &actual == expected)
        })
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fields.join("+"))
    }
}

impl FromStr for IdentityKey {
    type Err = DeltaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<String> = s.split('+').map(str::to_string).collect();
        if fields.iter().any(String::is_empty) {
            return Err(DeltaError::InvalidIdentityKey(s.to_string()));
        }
        Ok(Self { fields })
    }
}

/// Text used for an identity value: strings verbatim, numbers as JSON text.
/// Anything else cannot take part in an identity.
pub fn render_key_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Pick an identity key for two versions of an array.
///
/// Returns `None` when both arrays hold at most one element, when fewer than
/// `min_object_ratio` of a non-empty side are objects, or when no candidate
/// is present, scalar, unique on each side and sufficiently overlapping.
/// Single properties are always tried before any pair, pairs before triples.
pub fn detect_identity_key(
    left: &[Value],
    right: &[Value],
    config: &DetectorConfig,
) -> Option<IdentityKey> {
    if left.len() <= 1 && right.len() <= 1 {
        return None;
    }

    let left_objs = objects_of(left, config)?;
    let right_objs = objects_of(right, config)?;

    let sample = left_objs.first().or_else(|| right_objs.first())?;
    let mut candidates: Vec<&String> = sample
        .iter()
        .filter(|(name, value)| !name.is_empty() && render_key_value(value).is_some())
        .map(|(name, _)| name)
        .collect();
    candidates.sort_by(|a, b| {
        config
            .preference_rank(a)
            .cmp(&config.preference_rank(b))
            .then_with(|| a.cmp(b))
    });

    for arity in 1..=config.max_composite_arity.min(candidates.len()) {
        let pool = if arity == 1 {
            &candidates[..]
        } else {
            &candidates[..candidates.len().min(config.max_composite_candidates)]
        };
        for combo in Combinations::new(pool.len(), arity) {
            let key = IdentityKey::composite(combo.iter().map(|&i| pool[i].clone()).collect());
            if key_qualifies(&key, &left_objs, &right_objs, config) {
                debug!(
                    key = %key,
                    left = left.len(),
                    right = right.len(),
                    "identity key detected"
                );
                return Some(key);
            }
        }
    }

    debug!(
        left = left.len(),
        right = right.len(),
        candidates = candidates.len(),
        "no identity key, comparing by position"
    );
    None
}

/// Whether a previously known key still identifies elements of these arrays.
pub fn known_key_applies(
    key: &IdentityKey,
    left: &[Value],
    right: &[Value],
    config: &DetectorConfig,
) -> bool {
    match (objects_of(left, config), objects_of(right, config)) {
        (Some(l), Some(r)) => key_qualifies(key, &l, &r, config),
        _ => false,
    }
}

/// Object elements of `items`, or `None` if the array is non-empty and
/// objects fall below the configured share.
fn objects_of<'a>(items: &'a [Value], config: &DetectorConfig) -> Option<Vec<&'a Map<String, Value>>> {
    let objs: Vec<_> = items.iter().filter_map(Value::as_object).collect();
    if !items.is_empty() && (objs.len() as f64 / items.len() as f64) < config.min_object_ratio {
        return None;
    }
    Some(objs)
}

fn key_qualifies(
    key: &IdentityKey,
    left: &[&Map<String, Value>],
    right: &[&Map<String, Value>],
    config: &DetectorConfig,
) -> bool {
    let Some(left_values) = unique_values(key, left) else {
        return false;
    };
    let Some(right_values) = unique_values(key, right) else {
        return false;
    };
    let smaller = left_values.len().min(right_values.len());
    if smaller == 0 {
        return true;
    }
    let common = left_values.intersection(&right_values).count();
    common as f64 / smaller as f64 >= config.min_overlap_ratio
}

/// Key values of every object, or `None` if one is missing or repeated.
fn unique_values(key: &IdentityKey, objs: &[&Map<String, Value>]) -> Option<HashSet<Vec<(String, String)>>> {
    let mut seen = HashSet::with_capacity(objs.len());
    for obj in objs {
        if !seen.insert(key.value_of(obj)?) {
            return None;
        }
    }
    Some(seen)
}

/// Index combinations of size `k` from `0..n`, in lexicographic order,
/// produced one at a time.
struct Combinations {
    n: usize,
    indices: Vec<usize>,
    started: bool,
    done: bool,
}

impl Combinations {
    fn new(n: usize, k: usize) -> Self {
        Self {
            n,
            indices: (0..k).collect(),
            started: false,
            done: k > n,
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            return Some(self.indices.clone());
        }
        let k = self.indices.len();
        // Rightmost position that can still move up.
        let Some(i) = (0..k).rev().find(|&i| self.indices[i] < self.n - k + i) else {
            self.done = true;
            return None;
        };
        self.indices[i] += 1;
        for j in i + 1..k {
            self.indices[j] = self.indices[j - 1] + 1;
        }
        Some(self.indices.clone())
    }
}
