//! Placement of node edges relative to whitespace and comments.
//!
//! When parsing finishes, every marker edge that sits next to a run of whitespace and comments is
//! moved to some position inside that run. Which position is decided by the edge's binder.

use std::{fmt, rc::Rc};

use text_size::TextSize;

use crate::{Kind, KindSet};

/// Text of the lexemes a binder is looking at, indexed like its `kinds` slice.
#[derive(Clone, Copy)]
pub struct TokenTexts<'a> {
    text:   &'a str,
    starts: &'a [TextSize],
}

impl<'a> TokenTexts<'a> {
    pub(crate) fn new(text: &'a str, starts: &'a [TextSize]) -> Self {
        Self { text, starts }
    }

    /// Text of the `index`-th lexeme of the run.
    pub fn get(&self, index: usize) -> &'a str {
        let start = usize::from(self.starts[index]);
        let end = usize::from(self.starts[index + 1]);
        &self.text[start..end]
    }
}

/// Decides where an edge goes inside a run of whitespace and comments.
pub trait WhitespaceBinder<K> {
    /// Returns the position of the edge within `kinds`, between `0` (before the run) and
    /// `kinds.len()` (after it). `at_stream_edge` is set if the run touches the start or end of the
    /// text.
    fn edge_position(&self, kinds: &[K], at_stream_edge: bool, texts: TokenTexts<'_>) -> usize;

    /// A recursive binder also moves the edges of markers that were recorded at the same lexeme
    /// before this one, so they stay in front of it.
    fn is_recursive(&self) -> bool {
        false
    }
}

/// The binder attached to one marker edge.
#[derive(Clone)]
pub enum EdgeBinder<K> {
    /// Edge after the run: leading whitespace stays outside the node.
    /// Default for the start of a node.
    Leading,
    /// Edge before the run: trailing whitespace stays outside the node.
    /// Default for the end of a node and for error items.
    Trailing,
    Custom(Rc<dyn WhitespaceBinder<K>>),
}

impl<K: Kind> EdgeBinder<K> {
    pub fn custom(binder: impl WhitespaceBinder<K> + 'static) -> Self {
        EdgeBinder::Custom(Rc::new(binder))
    }

    pub(crate) fn edge_position(&self, kinds: &[K], at_stream_edge: bool, texts: TokenTexts<'_>) -> usize {
        match self {
            EdgeBinder::Leading => kinds.len(),
            EdgeBinder::Trailing => 0,
            EdgeBinder::Custom(binder) => binder.edge_position(kinds, at_stream_edge, texts),
        }
    }

    pub(crate) fn is_recursive(&self) -> bool {
        match self {
            EdgeBinder::Custom(binder) => binder.is_recursive(),
            _ => false,
        }
    }
}

impl<K> fmt::Debug for EdgeBinder<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeBinder::Leading => f.write_str("Leading"),
            EdgeBinder::Trailing => f.write_str("Trailing"),
            EdgeBinder::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Pulls the comments directly in front of a node into it, like documentation comments.
///
/// Scanning backwards from the node, comments are taken as long as they are separated from the
/// node (and from each other) by whitespace without an empty line.
pub struct LeadingComments<K> {
    comments: KindSet<K>,
}

impl<K: Kind> LeadingComments<K> {
    pub fn new(comments: KindSet<K>) -> Self {
        Self { comments }
    }
}

impl<K: Kind> WhitespaceBinder<K> for LeadingComments<K> {
    fn edge_position(&self, kinds: &[K], _at_stream_edge: bool, texts: TokenTexts<'_>) -> usize {
        let mut edge = kinds.len();
        for index in (0..kinds.len()).rev() {
            if self.comments.contains(kinds[index]) {
                edge = index;
            } else if texts.get(index).matches('\n').count() > 1 {
                break;
            }
        }
        edge
    }
}
