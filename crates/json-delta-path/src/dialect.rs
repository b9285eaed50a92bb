//! Nominal path dialects.
//!
//! Each dialect is a validated, immutable path string. None of them converts
//! implicitly into another; the only crossings are the explicit methods
//! below (for the syntactic ones) and the tree-aware converter in
//! `json-delta` (for everything else).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::parser::{PathError, PathParser};
use crate::types::{ParsedPath, Segment, Viewer};

/// `check` validates a parsed path and returns the dialect's tag, the part
/// of the path its type guarantees (`()` for most, the side for
/// `ViewerPath`).
macro_rules! path_dialect {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        path_dialect!($(#[$meta])* $name, $label, ());

        impl $name {
            fn new_unchecked(parsed: ParsedPath) -> Self {
                Self::from_parts(parsed, ())
            }
        }
    };
    ($(#[$meta:meta])* $name:ident, $label:literal, $tag:ty) => {
        $(#[$meta])*
        #[derive(Clone, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name {
            text: String,
            parsed: ParsedPath,
            tag: $tag,
        }

        // `text` is the canonical spelling of `parsed`, so it alone decides
        // identity and order.
        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.text == other.text
            }
        }

        impl Eq for $name {}

        impl std::hash::Hash for $name {
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                self.text.hash(state);
            }
        }

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $name {
            fn cmp(&self, other: &Self) -> std::cmp::Ordering {
                self.text.cmp(&other.text)
            }
        }

        impl $name {
            /// Parse and validate a path string of this dialect.
            pub fn parse(input: &str) -> Result<Self, PathError> {
                Self::from_parsed(PathParser::parse(input)?)
            }

            /// Validate an already parsed path against this dialect.
            pub fn from_parsed(parsed: ParsedPath) -> Result<Self, PathError> {
                let tag = Self::check(&parsed)?;
                Ok(Self::from_parts(parsed, tag))
            }

            fn from_parts(parsed: ParsedPath, tag: $tag) -> Self {
                Self {
                    text: parsed.to_string(),
                    parsed,
                    tag,
                }
            }

            pub fn as_str(&self) -> &str {
                &self.text
            }

            pub fn segments(&self) -> &[Segment] {
                &self.parsed.segments
            }

            pub fn parsed(&self) -> &ParsedPath {
                &self.parsed
            }

            pub fn is_rooted(&self) -> bool {
                self.parsed.rooted
            }

            /// Number of structural hops.
            pub fn depth(&self) -> usize {
                self.parsed.depth()
            }

            /// Canonical spelling without viewer and root prefixes.
            pub fn normalized(&self) -> String {
                self.parsed.normalized()
            }

            fn with_segment(&self, segment: Segment) -> Self {
                let mut parsed = self.parsed.clone();
                parsed.push(segment);
                Self::from_parts(parsed, self.tag)
            }

            /// Extend with an object property hop.
            pub fn property(&self, name: impl Into<String>) -> Self {
                self.with_segment(Segment::Property(name.into()))
            }

            /// Prefix of the first `len` segments.
            pub fn truncate(&self, len: usize) -> Self {
                let mut parsed = self.parsed.clone();
                parsed.segments.truncate(len);
                Self::from_parts(parsed, self.tag)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.text)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:?})", $label, self.text)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.text
            }
        }

        impl FromStr for $name {
            type Err = PathError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = PathError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::parse(&s)
            }
        }

        impl From<$name> for String {
            fn from(path: $name) -> String {
                path.text
            }
        }
    };
}

path_dialect!(
    /// Path where every array hop is a concrete offset: `root.items[2].qty`.
    IndexPath,
    "IndexPath"
);

path_dialect!(
    /// Path where array hops use a discovered identity when one exists:
    /// `root.items[id=a].qty`. Hops through arrays without an identity stay
    /// `[n]`.
    IdentityPath,
    "IdentityPath"
);

path_dialect!(
    /// Shape-only path where every array hop is `[]`: `root.items[].tags[]`.
    ArrayPatternPath,
    "ArrayPatternPath"
);

path_dialect!(
    /// Index path tagged with the tree it is valid against:
    /// `left_root.items[0]`, or unrooted `left_items[0]`.
    ViewerPath,
    "ViewerPath",
    Viewer
);

fn reject_viewer(parsed: &ParsedPath, dialect: &'static str) -> Result<(), PathError> {
    if parsed.viewer.is_some() {
        return Err(PathError::ViewerNotAllowed(dialect));
    }
    Ok(())
}

fn check_segments(
    parsed: &ParsedPath,
    dialect: &'static str,
    allowed: impl Fn(&Segment) -> bool,
) -> Result<(), PathError> {
    match parsed.segments.iter().find(|s| !allowed(s)) {
        Some(segment) => Err(PathError::WrongDialect {
            dialect,
            segment: segment.kind_name(),
        }),
        None => Ok(()),
    }
}

fn is_index_segment(segment: &Segment) -> bool {
    matches!(segment, Segment::Property(_) | Segment::Index(_))
}

/// Replace every array hop with `[]`.
fn pattern_of(parsed: &ParsedPath) -> ArrayPatternPath {
    ArrayPatternPath::new_unchecked(ParsedPath {
        viewer: None,
        rooted: parsed.rooted,
        segments: parsed
            .segments
            .iter()
            .map(|s| if s.is_array_hop() { Segment::Pattern } else { s.clone() })
            .collect(),
    })
}

impl IndexPath {
    fn check(parsed: &ParsedPath) -> Result<(), PathError> {
        reject_viewer(parsed, "index")?;
        check_segments(parsed, "index", is_index_segment)
    }

    /// The rooted empty path.
    pub fn root() -> Self {
        Self::new_unchecked(ParsedPath::root())
    }

    /// The unrooted empty path.
    pub fn empty() -> Self {
        Self::new_unchecked(ParsedPath::default())
    }

    /// Extend with an array offset hop.
    pub fn index(&self, index: usize) -> Self {
        self.with_segment(Segment::Index(index))
    }

    /// Every index path is a valid identity path.
    pub fn into_identity_path(self) -> IdentityPath {
        IdentityPath::new_unchecked(self.parsed)
    }

    pub fn to_array_pattern(&self) -> ArrayPatternPath {
        pattern_of(&self.parsed)
    }

    /// Tag this path with the tree it belongs to.
    pub fn for_viewer(&self, viewer: Viewer) -> ViewerPath {
        ViewerPath::new(viewer, self)
    }
}

impl IdentityPath {
    fn check(parsed: &ParsedPath) -> Result<(), PathError> {
        reject_viewer(parsed, "identity")?;
        check_segments(parsed, "identity", |s| !matches!(s, Segment::Pattern))
    }

    /// The rooted empty path.
    pub fn root() -> Self {
        Self::new_unchecked(ParsedPath::root())
    }

    /// The unrooted empty path.
    pub fn empty() -> Self {
        Self::new_unchecked(ParsedPath::default())
    }

    /// Extend with an array offset hop.
    pub fn index(&self, index: usize) -> Self {
        self.with_segment(Segment::Index(index))
    }

    /// Extend with an identity hop.
    pub fn identity(&self, pairs: Vec<(String, String)>) -> Self {
        self.with_segment(Segment::Identity(pairs))
    }

    /// Whether any hop is addressed by identity.
    pub fn has_identity(&self) -> bool {
        self.parsed
            .segments
            .iter()
            .any(|s| matches!(s, Segment::Identity(_)))
    }

    /// Reinterpret as an index path. Only succeeds when no hop is addressed
    /// by identity; anything else needs a tree to resolve.
    pub fn as_index_path(&self) -> Option<IndexPath> {
        if self.has_identity() {
            return None;
        }
        Some(IndexPath::new_unchecked(self.parsed.clone()))
    }

    pub fn to_array_pattern(&self) -> ArrayPatternPath {
        pattern_of(&self.parsed)
    }
}

impl ArrayPatternPath {
    fn check(parsed: &ParsedPath) -> Result<(), PathError> {
        reject_viewer(parsed, "array pattern")?;
        check_segments(parsed, "array pattern", |s| {
            matches!(s, Segment::Property(_) | Segment::Pattern)
        })
    }

    /// The rooted empty path.
    pub fn root() -> Self {
        Self::new_unchecked(ParsedPath::root())
    }

    /// Extend with an array shape hop.
    pub fn pattern(&self) -> Self {
        self.with_segment(Segment::Pattern)
    }

    /// Number of `[]` hops.
    pub fn array_depth(&self) -> usize {
        self.parsed
            .segments
            .iter()
            .filter(|s| matches!(s, Segment::Pattern))
            .count()
    }
}

impl ViewerPath {
    fn check(parsed: &ParsedPath) -> Result<Viewer, PathError> {
        let viewer = parsed.viewer.ok_or(PathError::MissingViewer)?;
        check_segments(parsed, "viewer", is_index_segment)?;
        Ok(viewer)
    }

    /// Tag an index path with a side. Rootedness is taken from `path`.
    pub fn new(viewer: Viewer, path: &IndexPath) -> Self {
        Self::from_parts(path.parsed.clone().with_viewer(viewer), viewer)
    }

    pub fn viewer(&self) -> Viewer {
        self.tag
    }

    /// The untagged index path.
    pub fn index_path(&self) -> IndexPath {
        IndexPath::new_unchecked(self.parsed.clone().without_viewer())
    }

    /// Extend with an array offset hop.
    pub fn index(&self, index: usize) -> Self {
        self.with_segment(Segment::Index(index))
    }
}
