use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;
use crate::ValidationError;

/// Separator between path segments.
pub const SEPARATOR: char = '/';

/// Hierarchical address of a record: `scope/child/child...`.
///
/// Paths form a strict tree. Every non-root path has exactly one parent,
/// computed by dropping the last segment. The first segment names the owning
/// scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// Parse a path from its canonical text form.
    ///
    /// # Errors
    ///
    /// - Return [`ValidationError::InvalidPath`] when the text is empty or
    ///   contains empty segments.
    pub fn parse(text: impl AsRef<str>) -> Result<Self> {
        let text = text.as_ref();
        if text.is_empty() {
            return Err(ValidationError::InvalidPath {
                path: text.to_string(),
                reason: "path is empty".to_string(),
            }
            .into());
        }

        let mut segments = Vec::new();
        for segment in text.split(SEPARATOR) {
            if segment.is_empty() {
                return Err(ValidationError::InvalidPath {
                    path: text.to_string(),
                    reason: "path contains an empty segment".to_string(),
                }
                .into());
            }
            segments.push(segment.to_string());
        }

        Ok(Self { segments })
    }

    /// Scope is the root context of a path: its first segment.
    pub fn scope(&self) -> &str {
        &self.segments[0]
    }

    /// Last segment of the path.
    pub fn base_name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Parent path, or `None` when the path names a scope root.
    pub fn parent(&self) -> Option<Path> {
        if self.segments.len() <= 1 {
            return None;
        }

        Some(Path {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Extend the path with one more segment.
    pub fn join(
        &self,
        segment: impl Into<String>,
    ) -> Path {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Path { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// True when the path names a scope root (single segment).
    pub fn is_scope_root(&self) -> bool {
        self.segments.len() == 1
    }

    /// Strict-prefix test: `a/b` is an ancestor of `a/b/c` but not of itself.
    pub fn is_ancestor_of(
        &self,
        other: &Path,
    ) -> bool {
        other.segments.len() > self.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }
}

impl fmt::Display for Path {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.segments.join(&SEPARATOR.to_string()))
    }
}

impl FromStr for Path {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Path::parse(s)
    }
}

impl TryFrom<String> for Path {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Path::parse(value)
    }
}

impl From<Path> for String {
    fn from(path: Path) -> Self {
        path.to_string()
    }
}
