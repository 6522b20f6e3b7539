use std::fmt;
use std::ops::Range;

use crate::constants::{EMPTY_NAME_PLACEHOLDER, NAME_SEPARATOR};

/// An immutable, ordered sequence of command-path segments.
///
/// Segments are non-empty and never contain the separator character; parsing
/// drops empty chunks, so `"a::b"` and `"a:b"` denote the same name. New
/// names are produced by slicing and concatenating, never by mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommandName {
    segments: Vec<String>,
}

impl CommandName {
    /// The name with no segments. Parsing an empty string yields the same.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Splits `text` on the separator character.
    pub fn parse(text: &str) -> Self {
        let segments = text
            .split(NAME_SEPARATOR)
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();
        Self { segments }
    }

    /// Builds a name from already-split segments. Empty segments are dropped.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments = segments
            .into_iter()
            .map(Into::into)
            .filter(|segment| !segment.is_empty())
            .collect();
        Self { segments }
    }

    /// Joins the segments back into their textual form. The empty name
    /// renders to an empty string; see [`Self::display_name`] for the
    /// user-facing placeholder.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                out.push(NAME_SEPARATOR);
            }
            out.push_str(segment);
        }
        out
    }

    /// Like [`Self::render`], but the empty name shows as `<none>`.
    pub fn display_name(&self) -> String {
        if self.is_empty() {
            EMPTY_NAME_PLACEHOLDER.to_string()
        } else {
            self.render()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn first(&self) -> Option<&str> {
        self.segments.first().map(String::as_str)
    }

    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(String::as_str)
    }

    /// Returns a new name holding the segments within `range`. An
    /// out-of-bounds range yields the empty name.
    pub fn slice(&self, range: Range<usize>) -> Self {
        let segments = self
            .segments
            .get(range)
            .map(<[String]>::to_vec)
            .unwrap_or_default();
        Self { segments }
    }

    /// Everything after the first segment.
    pub fn tail(&self) -> Self {
        self.slice(1..self.len())
    }

    /// Returns a new name with `other`'s segments appended.
    pub fn concat(&self, other: &Self) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    /// Returns a new name with one more trailing segment.
    pub fn join(&self, segment: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Self { segments }
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}
