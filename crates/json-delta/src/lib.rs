//! Structural JSON diff.
//!
//! Compares two JSON trees and reports every leaf-level divergence as an
//! added, removed or changed record addressed by an identity path. Arrays of
//! objects are matched by a detected identity key (`id`, `name`, or a
//! combination of properties) instead of by position, so moving an element
//! is not a change.
//!
//! Alongside the diff the crate converts paths between identity and index
//! addressing for either side, and classifies arbitrary tree locations
//! against the diff set for highlighting.
//!
//! # Example
//!
//! ```
//! use json_delta::{compare, identity_to_index, ResolveContext};
//! use serde_json::json;
//!
//! let left = json!({"contributions": [
//!     {"id": "a", "amt": 7000},
//!     {"id": "b", "amt": 1000}
//! ]});
//! let right = json!({"contributions": [
//!     {"id": "b", "amt": 1000},
//!     {"id": "a", "amt": 3500}
//! ]});
//!
//! let cmp = compare(&left, &right);
//! assert_eq!(cmp.len(), 1);
//! let path = cmp.diffs[0].path();
//! assert_eq!(path.as_str(), "root.contributions[id=a].amt");
//!
//! let ctx = ResolveContext::new(&right, &cmp.identity_keys);
//! let on_right = identity_to_index(path, &ctx).unwrap();
//! assert_eq!(on_right.as_str(), "root.contributions[1].amt");
//! ```

pub mod error;
pub use error::{DeltaError, DeltaResult};

pub mod config;
pub use config::{
    CompareOptions, DetectorConfig, DEFAULT_MAX_COMPOSITE_ARITY, DEFAULT_MAX_COMPOSITE_CANDIDATES,
    DEFAULT_MIN_OBJECT_RATIO, DEFAULT_MIN_OVERLAP_RATIO, DEFAULT_PREFERRED_KEYS,
};

pub mod identity;
pub use identity::{detect_identity_key, IdentityKey};

pub mod observer;
pub use observer::{CompareObserver, NoopObserver, RecordingObserver, TracingObserver};

pub mod differ;
pub use differ::{
    compare, compare_with, Comparison, DiffKind, DiffRecord, DiffSummary, IdentityKeyInfo,
};

pub mod convert;
pub use convert::{
    identity_to_index, identity_to_viewer, index_to_identity, normalize_for_comparison,
    resolve_array_pattern, viewer_to_identity, ResolveContext,
};

pub mod classify;
pub use classify::{classify, Classification, Classifier};

pub use json_delta_path::{
    ArrayPatternPath, IdentityPath, IndexPath, PathError, Segment, Viewer, ViewerPath,
};
