//! Hooks into a running comparison.
//!
//! The differ never prints. Callers that want to watch detection decisions
//! or stream records pass an observer; [`TracingObserver`] forwards to the
//! `tracing` facade and is what [`compare`](crate::compare) uses.

use json_delta_path::ArrayPatternPath;
use tracing::{debug, trace};

use crate::differ::{DiffRecord, IdentityKeyInfo};

/// Callbacks fired during a comparison. Every method defaults to a no-op.
pub trait CompareObserver {
    /// An array was matched by identity.
    fn on_identity_key(&mut self, _info: &IdentityKeyInfo) {}

    /// An array with more than one element on some side was compared by
    /// position.
    fn on_positional_fallback(&mut self, _pattern: &ArrayPatternPath, _left: usize, _right: usize) {}

    /// A record was appended to the result.
    fn on_diff(&mut self, _record: &DiffRecord) {}
}

/// Ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl CompareObserver for NoopObserver {}

/// Emits `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl CompareObserver for TracingObserver {
    fn on_identity_key(&mut self, info: &IdentityKeyInfo) {
        debug!(
            pattern = %info.array_pattern_path,
            key = %info.identity_key,
            size_left = info.size_left,
            size_right = info.size_right,
            "array matched by identity"
        );
    }

    fn on_positional_fallback(&mut self, pattern: &ArrayPatternPath, left: usize, right: usize) {
        debug!(pattern = %pattern, left, right, "array compared by position");
    }

    fn on_diff(&mut self, record: &DiffRecord) {
        trace!(path = %record.path(), kind = %record.kind(), "diff recorded");
    }
}

/// Collects every callback; handy for tests and for callers that want the
/// detection log next to the result.
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    pub identity_keys: Vec<IdentityKeyInfo>,
    pub positional: Vec<ArrayPatternPath>,
    pub diffs: usize,
}

impl CompareObserver for RecordingObserver {
    fn on_identity_key(&mut self, info: &IdentityKeyInfo) {
        self.identity_keys.push(info.clone());
    }

    fn on_positional_fallback(&mut self, pattern: &ArrayPatternPath, _left: usize, _right: usize) {
        self.positional.push(pattern.clone());
    }

    fn on_diff(&mut self, _record: &DiffRecord) {
        self.diffs += 1;
    }
}
