//! Segment-level types shared by every path dialect.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::parser::PathError;
use crate::{escape_identity_part, escape_property};

/// Literal used for the root marker.
pub const ROOT_MARKER: &str = "root";

/// One hop of a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    /// Object property: `.name`
    Property(String),
    /// Array offset: `[3]`
    Index(usize),
    /// Array element addressed by identity: `[id=a]`, `[kind=x|seq=2]`
    Identity(Vec<(String, String)>),
    /// Array shape placeholder: `[]`
    Pattern,
}

impl Segment {
    /// Whether this segment traverses into an array.
    pub fn is_array_hop(&self) -> bool {
        !matches!(self, Segment::Property(_))
    }

    /// Short name used in dialect errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Segment::Property(_) => "property",
            Segment::Index(_) => "index",
            Segment::Identity(_) => "identity",
            Segment::Pattern => "pattern",
        }
    }

    fn write_bracket(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Index(i) => write!(f, "[{i}]"),
            Segment::Pattern => f.write_str("[]"),
            Segment::Identity(pairs) => {
                f.write_str("[")?;
                for (n, (key, value)) in pairs.iter().enumerate() {
                    if n > 0 {
                        f.write_str("|")?;
                    }
                    write!(
                        f,
                        "{}={}",
                        escape_identity_part(key),
                        escape_identity_part(value)
                    )?;
                }
                f.write_str("]")
            }
            Segment::Property(_) => Ok(()),
        }
    }
}

/// Which of the two compared trees a path is valid against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Viewer {
    Left,
    Right,
}

impl Viewer {
    pub fn as_str(self) -> &'static str {
        match self {
            Viewer::Left => "left",
            Viewer::Right => "right",
        }
    }

    /// The opposite side.
    pub fn other(self) -> Viewer {
        match self {
            Viewer::Left => Viewer::Right,
            Viewer::Right => Viewer::Left,
        }
    }
}

impl fmt::Display for Viewer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Viewer {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(Viewer::Left),
            "right" => Ok(Viewer::Right),
            other => Err(PathError::UnknownViewer(other.to_string())),
        }
    }
}

/// A path broken into its optional prefixes and its segments.
///
/// This is dialect-agnostic: any well-formed path string parses into a
/// `ParsedPath`, and `to_string()` gives the canonical spelling back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ParsedPath {
    pub viewer: Option<Viewer>,
    pub rooted: bool,
    pub segments: Vec<Segment>,
}

impl ParsedPath {
    /// The bare root path, `root`.
    pub fn root() -> Self {
        Self {
            viewer: None,
            rooted: true,
            segments: Vec::new(),
        }
    }

    /// Number of structural hops (property hops plus bracket hops).
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn without_viewer(mut self) -> Self {
        self.viewer = None;
        self
    }

    /// Drops the root marker. A viewer prefix is kept.
    pub fn without_root(mut self) -> Self {
        self.rooted = false;
        self
    }

    pub fn with_root(mut self) -> Self {
        self.rooted = true;
        self
    }

    pub fn with_viewer(mut self, viewer: Viewer) -> Self {
        self.viewer = Some(viewer);
        self
    }

    /// Canonical spelling with both prefixes stripped.
    pub fn normalized(&self) -> String {
        let stripped = ParsedPath {
            viewer: None,
            rooted: false,
            segments: self.segments.clone(),
        };
        stripped.to_string()
    }

    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }
}

impl fmt::Display for ParsedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(viewer) = self.viewer {
            write!(f, "{viewer}_")?;
        }
        let rooted = self.rooted;
        if rooted {
            f.write_str(ROOT_MARKER)?;
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Property(name) => {
                    let leading = i == 0 && !rooted;
                    if !leading {
                        f.write_str(".")?;
                    }
                    f.write_str(&escape_property(name, leading))?;
                }
                other => other.write_bracket(f)?,
            }
        }
        Ok(())
    }
}

impl FromStr for ParsedPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::parser::PathParser::parse(s)
    }
}
