//! Immutable backing storage for one parsed document.

use std::sync::Arc;

use crate::options::ParseOptions;

/// The character buffer a [`crate::document::Document`] is parsed from.
///
/// JSON text is decoded once into a `Vec<char>` so that every scanner offset
/// is a code-point index, not a byte index — this keeps `\uXXXX` surrogate
/// handling and slicing arithmetic simple at the cost of one up-front copy.
#[derive(Debug)]
pub struct CharBuffer {
    chars: Vec<char>,
    /// Recursion guard for the recursive-descent operations (`value()`,
    /// `visit()`, `find()`) — `None` when `ParseOptions::guard_depth` is
    /// `false`. The scanner's own skip/interning walks stay iterative or
    /// bounded by the caller's path length, so only the recursive-descent
    /// materializers need this.
    max_depth: Option<usize>,
}

impl CharBuffer {
    pub fn new(text: &str) -> Arc<Self> {
        Self::new_with_options(text, ParseOptions::default())
    }

    pub fn new_with_options(text: &str, options: ParseOptions) -> Arc<Self> {
        Arc::new(Self {
            chars: text.chars().collect(),
            max_depth: options.guard_depth.then_some(options.max_depth),
        })
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<char> {
        self.chars.get(index).copied()
    }

    /// Slice `[start, end)` rendered back to a `String`. Panics if out of
    /// bounds — callers only ever slice ranges produced by the scanner.
    pub fn slice(&self, start: usize, end: usize) -> String {
        self.chars[start..end].iter().collect()
    }

    pub fn as_chars(&self) -> &[char] {
        &self.chars
    }

    /// A short, human-readable window around `index`, for format-error context.
    pub fn context_snippet(&self, index: usize, radius: usize) -> String {
        let start = index.saturating_sub(radius);
        let end = (index + radius).min(self.chars.len());
        self.chars[start..end].iter().collect()
    }
}
