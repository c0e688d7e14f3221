use std::fmt;
use std::str::FromStr;

use derive_more::{Deref, From, IntoIterator};
use snafu::Snafu;

pub const SEPARATOR: char = '/';

/// Address of a node: the names walked from the root, root included.
///
/// Paths are derived, never stored on nodes, so renaming a folder changes
/// the path of every descendant without touching them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Deref, From, IntoIterator)]
pub struct TreePath(Vec<String>);

impl TreePath {
    pub fn root(name: impl Into<String>) -> Self {
        TreePath(vec![name.into()])
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn join(&self, name: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.into());
        TreePath(segments)
    }

    pub fn parent(&self) -> Option<Self> {
        match self.0.split_last() {
            Some((_, rest)) if !rest.is_empty() => Some(TreePath(rest.to_vec())),
            _ => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Same path with the last segment swapped for `new_name`
    pub fn with_name(&self, new_name: impl Into<String>) -> Self {
        match self.parent() {
            Some(parent) => parent.join(new_name),
            None => TreePath::root(new_name),
        }
    }

    /// Proper ancestors, nearest first
    pub fn ancestors(&self) -> impl Iterator<Item = TreePath> + '_ {
        (1..self.0.len())
            .rev()
            .map(|len| TreePath(self.0[..len].to_vec()))
    }

    pub fn depth(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    /// Path below the root segment, whatever the root is called.
    /// The root itself becomes an empty string.
    pub fn without_root(&self) -> String {
        self.0
            .iter()
            .skip(1)
            .map(|segment| format!("{SEPARATOR}{segment}"))
            .collect()
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.0 {
            write!(f, "{SEPARATOR}{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for TreePath {
    type Err = PathParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim_start_matches(SEPARATOR).trim_end_matches(SEPARATOR);
        if trimmed.is_empty() {
            return Err(PathParseError::Empty);
        }

        let segments = trimmed
            .split(SEPARATOR)
            .map(|segment| {
                if segment.is_empty() {
                    Err(PathParseError::EmptySegment {
                        path: raw.to_string(),
                    })
                } else {
                    Ok(segment.to_string())
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TreePath(segments))
    }
}

#[derive(Debug, Snafu)]
pub enum PathParseError {
    #[snafu(display("A path needs at least the root segment"))]
    Empty,
    #[snafu(display("Path '{}' contains an empty segment", path))]
    EmptySegment { path: String },
}
