//! Ordered, case-preserving header storage.
//!
//! This module provides the [`Headers`] store used by request descriptors. Unlike
//! [`http::HeaderMap`], which lowercase-folds names on insertion, this store keeps
//! the original casing and insertion order of every pair and only applies the
//! transport's case-insensitivity rule (ASCII lowercase folding) when *matching*
//! names or when translating to the wire form via [`Headers::to_header_map`].
//!
//! Multiple pairs may share a name; their relative order is preserved.
//!
//! # Examples
//!
//! ```rust
//! use request_kit::Headers;
//!
//! let mut headers = Headers::new();
//! headers.add("Accept", "application/json");
//! headers.add("ACCEPT", "text/html");
//! assert_eq!(headers.get("accept"), "application/json; text/html");
//! ```

use http::{HeaderMap, HeaderName, HeaderValue};
use std::fmt;

use crate::error::{Error, Result};

/// A single header pair with its original casing preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Header name as supplied by the caller.
    pub name: String,
    /// Header value.
    pub value: String,
}

impl Header {
    /// Creates a header pair.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Returns true if this pair's name matches `name` case-insensitively.
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

/// An ordered sequence of header pairs with case-insensitive lookup.
///
/// The store backs every header mutator on [`Request`](crate::Request); it can
/// also be used standalone. Name matching for `get`/`set`/`remove`/`has` is
/// case-insensitive (ASCII lowercase fold, matching the wire transport), while
/// storage keeps the caller's casing and insertion order intact.
///
/// # Examples
///
/// ```rust
/// use request_kit::Headers;
///
/// let mut headers = Headers::new();
/// headers.add("X-Trace", "abc");
/// headers.add("x-trace", "def");
/// assert_eq!(headers.get("X-TRACE"), "abc; def");
///
/// headers.set("x-trace", "only");
/// assert_eq!(headers.get("X-Trace"), "only");
/// assert_eq!(headers.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<Header>,
}

impl Headers {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a pair without touching existing pairs of the same name.
    ///
    /// The value may be anything display-able; callers needing a template use
    /// `format!` at the call site.
    pub fn add(&mut self, name: impl Into<String>, value: impl fmt::Display) {
        self.entries.push(Header::new(name, value.to_string()));
    }

    /// Removes every pair matching `name` case-insensitively, then appends a
    /// single pair with the given value.
    pub fn set(&mut self, name: impl Into<String>, value: impl fmt::Display) {
        let name = name.into();
        self.remove(&name);
        self.add(name, value);
    }

    /// Removes every pair matching `name` case-insensitively.
    ///
    /// Removing a name with no matching pairs is a no-op.
    pub fn remove(&mut self, name: impl AsRef<str>) {
        let name = name.as_ref();
        self.entries.retain(|header| !header.matches(name));
    }

    /// Returns all matching values joined with `"; "`, in insertion order.
    ///
    /// Empty stored values keep their separators: `["", "b"]` joins to
    /// `"; b"`. Returns an empty string when no pair matches, which is
    /// ambiguous with a single stored empty value; the behavior is documented
    /// and intentionally kept.
    pub fn get(&self, name: impl AsRef<str>) -> String {
        let name = name.as_ref();
        let values: Vec<&str> = self
            .entries
            .iter()
            .filter(|header| header.matches(name))
            .map(|header| header.value.as_str())
            .collect();
        values.join("; ")
    }

    /// Returns true if at least one pair matches `name` case-insensitively.
    pub fn has(&self, name: impl AsRef<str>) -> bool {
        let name = name.as_ref();
        self.entries.iter().any(|header| header.matches(name))
    }

    /// Returns the stored pairs in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Header> {
        self.entries.iter()
    }

    /// Returns the number of stored pairs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store holds no pairs.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Translates the store into the canonical wire representation.
    ///
    /// Each pair is appended into an [`http::HeaderMap`] in insertion order.
    /// `HeaderMap` keys by the same lowercase fold the transport applies, so
    /// pairs whose names differ only in case merge into one multi-valued entry
    /// with their original value order preserved.
    ///
    /// # Errors
    ///
    /// Fails if a stored name or value is not a valid wire header.
    pub fn to_header_map(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::with_capacity(self.entries.len());
        for header in &self.entries {
            let name = HeaderName::from_bytes(header.name.as_bytes())
                .map_err(|error| Error::invalid_header(&header.name, error))?;
            let value = HeaderValue::from_str(&header.value)
                .map_err(|error| Error::invalid_header(&header.name, error))?;
            map.append(name, value);
        }
        Ok(map)
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = &'a Header;
    type IntoIter = std::slice::Iter<'a, Header>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<Header> for Headers {
    fn from_iter<I: IntoIterator<Item = Header>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
