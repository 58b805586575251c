//! Slash-separated document paths.

use std::fmt;

use crate::error::{Result, StoreError};

const FORBIDDEN: [char; 5] = ['.', '#', '$', '[', ']'];

/// A validated location in the document tree, e.g. `items/-Nq3/available`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct DocPath {
    segments: Vec<String>,
}

impl DocPath {
    /// The root of the tree.
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from individual segments.
    pub fn new<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut path = Self::root();
        for segment in segments {
            path.push(segment.as_ref())?;
        }
        Ok(path)
    }

    /// Parse `a/b/c`.  Leading and trailing slashes are ignored.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        Self::new(trimmed.split('/'))
    }

    /// Return a new path one level below `self`.
    pub fn child(&self, segment: impl AsRef<str>) -> Result<Self> {
        let mut path = self.clone();
        path.push(segment.as_ref())?;
        Ok(path)
    }

    fn push(&mut self, segment: &str) -> Result<()> {
        if segment.is_empty() {
            return Err(StoreError::InvalidPath(format!(
                "empty segment after '{self}'"
            )));
        }
        if let Some(c) = segment
            .chars()
            .find(|c| *c == '/' || FORBIDDEN.contains(c) || c.is_control())
        {
            return Err(StoreError::InvalidPath(format!(
                "segment '{segment}' contains forbidden character {c:?}"
            )));
        }
        self.segments.push(segment.to_string());
        Ok(())
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Last segment, if any.
    pub fn key(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// True when `self` equals `other` or lies above it.
    pub fn contains(&self, other: &DocPath) -> bool {
        other.segments.starts_with(&self.segments)
    }

    /// True when a change at one path can affect a read at the other.
    pub fn overlaps(&self, other: &DocPath) -> bool {
        self.contains(other) || other.contains(self)
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("/");
        }
        f.write_str(&self.segments.join("/"))
    }
}
