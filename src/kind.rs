//! Syntax kinds as seen by the builder.

use std::{fmt, hash::Hash, iter::FromIterator};

use fxhash::FxHashSet;

/// How leaves of a kind are compared when an old tree is merged with a new parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeafCategory {
    /// Equal if kind, fingerprint and text match.
    Ordinary,
    /// A leaf whose contents are parsed on demand. Only its exact text decides equality.
    LazyParseable,
    /// A leaf parsed by some external means. Only its exact text decides equality.
    CustomParsed,
}

/// A syntax kind, the type tag of every lexeme, leaf and node.
///
/// Kinds are usually a plain `enum` shared between the lexer and the grammar. Apart from being
/// usable as a set key, a kind answers a few questions that influence how the builder lays out the
/// tree.
///
/// # Examples
/// ```
/// use marktree::Kind;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// enum SyntaxKind {
///     Ident,
///     Plus,
///     Whitespace,
///     Expr,
/// }
///
/// impl Kind for SyntaxKind {
///     fn static_text(self) -> Option<&'static str> {
///         match self {
///             SyntaxKind::Plus => Some("+"),
///             _ => None,
///         }
///     }
/// }
///
/// assert!(SyntaxKind::Expr.is_left_bound());
/// assert_eq!(SyntaxKind::Plus.static_text(), Some("+"));
/// ```
pub trait Kind: Copy + Eq + Hash + fmt::Debug {
    /// Whether a node of this kind that covers no significant token attaches to the token on its
    /// left, pulling in the whitespace and comments in front of its end.
    fn is_left_bound(self) -> bool {
        true
    }

    /// Whether an empty lexeme of this kind still becomes a leaf (e.g. synthetic indentation
    /// tokens). Empty lexemes of other kinds are skipped when the tree is materialized.
    fn is_zero_width_leaf(self) -> bool {
        false
    }

    /// Selects the strategy used to compare leaves of this kind during a merge.
    fn leaf_category(self) -> LeafCategory {
        LeafCategory::Ordinary
    }

    /// The text of this kind if it is always the same, like for keywords and punctuation.
    fn static_text(self) -> Option<&'static str> {
        None
    }
}

/// A set of kinds, used to classify whitespace and comments.
#[derive(Clone)]
pub struct KindSet<K> {
    kinds: FxHashSet<K>,
}

impl<K: Kind> KindSet<K> {
    pub fn empty() -> Self {
        Self {
            kinds: FxHashSet::default(),
        }
    }

    pub fn new(kinds: &[K]) -> Self {
        kinds.iter().copied().collect()
    }

    #[inline]
    pub fn contains(&self, kind: K) -> bool {
        self.kinds.contains(&kind)
    }

    pub fn union(&self, other: &KindSet<K>) -> KindSet<K> {
        self.kinds.union(&other.kinds).copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }
}

impl<K: Kind> Default for KindSet<K> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<K: Kind> FromIterator<K> for KindSet<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        Self {
            kinds: iter.into_iter().collect(),
        }
    }
}

impl<K: fmt::Debug> fmt::Debug for KindSet<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.kinds.iter()).finish()
    }
}
